//! Configuration management for the policy engine

pub mod loader;
pub mod model;
pub mod schema;
pub mod validator;

pub use loader::ConfigLoader;
pub use model::{Config, Incoming, Outgoing, TimedDenySite};
pub use schema::{ConfigFile, FailurePolicy, LogConfig, UnknownSourcePolicy};
pub use validator::ConfigValidator;
