//! Registration lifecycle
//!
//! This module contains the orchestrating state machine split into:
//! - `manager`: startup registration, heartbeat ownership and deregistration
//! - `hooks`: start/shutdown hooks handed to the host process
//! - `error`: lifecycle errors surfaced to the host

pub mod error;
pub mod hooks;
pub mod manager;

pub use error::LifecycleError;
pub use hooks::RegistryHooks;
pub use manager::RegistrationLifecycle;
