use thiserror::Error;

/// 配置解析错误类型，启动阶段即为致命错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid port: {0} (expected 1-65535)")]
    InvalidPort(String),

    #[error("Unresolved variable ${{{variable}}} in field {field}")]
    UnresolvedVariable { field: String, variable: String },

    #[error("Malformed placeholder in field {field}")]
    MalformedPlaceholder { field: String },

    #[error("Zone {0} is not present in eureka_availability_zones")]
    UnknownZone(String),
}
