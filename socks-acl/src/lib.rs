//! Access control for a SOCKS forward proxy
//!
//! A [`RuleSet`] is built once from a validated [`Config`] and answers one
//! question per connection: may this client reach this host and port now?

pub mod config;
pub mod dnsbl;
pub mod error;
pub mod filter;
pub mod handle;

// Re-export commonly used types
pub use config::{Config, ConfigLoader, FailurePolicy, UnknownSourcePolicy};
pub use dnsbl::{BlacklistLookup, DnsblChecker};
pub use error::{AclError, LookupError, Result, ValidationError};
pub use filter::{Denial, DenialSink, Request, RequestFilter, RuleSet, SourceAddr, TracingSink};
pub use handle::RuleSetHandle;
