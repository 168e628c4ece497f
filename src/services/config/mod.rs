//! Registry configuration
//!
//! - `types`: raw settings and the validated `RegistryConfig`
//! - `resolver`: placeholder expansion and validation
//! - `error`: configuration errors

pub mod error;
pub mod resolver;
pub mod types;

pub use error::ConfigError;
pub use resolver::{Environment, ProcessEnv, interpolate, resolve, resolve_with_env};
pub use types::{PortValue, RawSettings, RegistryConfig, TimingConfig, UrlList};
