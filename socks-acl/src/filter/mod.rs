//! Request filtering logic

pub mod hostname;
pub mod port;
pub mod ruleset;
pub mod sink;
pub mod subnet;

pub use hostname::{normalize_host, HostnamePolicy};
pub use port::{PortPolicy, DEFAULT_ALLOWED_PORTS};
pub use ruleset::{Request, RequestFilter, RuleSet, SourceAddr};
pub use sink::{Denial, DenialReason, DenialSink, TracingSink};
pub use subnet::SubnetMatcher;
