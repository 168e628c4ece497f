//! Registry transport
//!
//! Wire-level register / heartbeat / deregister calls against a single
//! registry endpoint. `rest` holds the Eureka REST implementation.

pub mod error;
pub mod rest;
pub mod types;

use async_trait::async_trait;

pub use error::TransportError;
pub use rest::HttpRegistryTransport;
pub use types::{Ack, InstanceRecord};

/// 对单个注册中心地址的调用，不持有任何本地状态
#[async_trait]
pub trait RegistryTransport: Send + Sync {
    async fn register(
        &self,
        endpoint: &str,
        record: &InstanceRecord,
    ) -> Result<Ack, TransportError>;

    /// 实例已过期时返回 `TransportError::NotFound`
    async fn heartbeat(
        &self,
        endpoint: &str,
        record: &InstanceRecord,
    ) -> Result<Ack, TransportError>;

    async fn deregister(
        &self,
        endpoint: &str,
        record: &InstanceRecord,
    ) -> Result<Ack, TransportError>;
}
