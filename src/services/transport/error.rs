use thiserror::Error;

/// 注册中心调用错误，全部可恢复，由状态机决定后续动作
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request to {endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("Connection to {endpoint} failed: {reason}")]
    ConnectionRefused { endpoint: String, reason: String },

    #[error("Registry {endpoint} responded with status {status}")]
    ProtocolError { endpoint: String, status: u16 },

    #[error("Instance {instance_id} is unknown to the registry")]
    NotFound { instance_id: String },
}

impl TransportError {
    /// 注册中心已不认识该实例，需要重新注册而不是继续心跳
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::NotFound { .. })
    }
}
