pub mod cursor;
pub mod error;
pub mod failover;

pub use cursor::EndpointCursor;
pub use error::RouterError;
pub use failover::ZoneFailoverRouter;
