use thiserror::Error;

use crate::services::router::RouterError;
use crate::services::transport::TransportError;

/// 生命周期错误类型，由宿主进程决定如何处理
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Registration failed after trying {attempts} endpoint(s): {last_error}")]
    RegistrationFailed {
        attempts: usize,
        #[source]
        last_error: TransportError,
    },

    #[error("Registration was interrupted by shutdown")]
    Cancelled,

    #[error("Registration is in a terminal failed state: {0}")]
    Terminal(String),

    #[error(transparent)]
    Router(#[from] RouterError),
}
