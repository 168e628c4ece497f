pub mod config;
pub mod heartbeat;
pub mod lifecycle;
pub mod router;
pub mod state;
pub mod transport;

pub use config::{ConfigError, RawSettings, RegistryConfig};
pub use heartbeat::HeartbeatScheduler;
pub use lifecycle::{LifecycleError, RegistrationLifecycle, RegistryHooks};
pub use router::{EndpointCursor, ZoneFailoverRouter};
pub use state::{RegistrationState, StateHandle};
pub use transport::{Ack, HttpRegistryTransport, InstanceRecord, RegistryTransport, TransportError};
