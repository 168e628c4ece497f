// 定义路由错误类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    UnknownZone(String),
    NoEndpoints(String),
}

impl std::fmt::Display for RouterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouterError::UnknownZone(zone) => write!(f, "Unknown zone: {zone}"),
            RouterError::NoEndpoints(zone) => write!(f, "No registry endpoints for zone: {zone}"),
        }
    }
}

impl std::error::Error for RouterError {}
