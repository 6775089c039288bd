//! Configuration file schema types
//!
//! These mirror the TOML document one-to-one. They are turned into a
//! validated [`Config`](super::Config) by [`ConfigValidator`](super::ConfigValidator).

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use toml::value::Datetime;

pub const DEFAULT_PORT: u16 = 1080;
pub const DEFAULT_DNSBL_TIMEOUT_MS: u64 = 2000;

/// Complete configuration document
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub incoming: IncomingSection,
    #[serde(default)]
    pub outgoing: OutgoingSection,
    #[serde(default)]
    pub log: LogConfig,
}

/// Client-facing side of the proxy
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IncomingSection {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Addresses to bind the listener to
    #[serde(default)]
    pub addresses: Vec<IpAddr>,
    /// Source subnets allowed to use the proxy
    #[serde(default)]
    pub allow_from: Vec<String>,
    #[serde(default)]
    pub unknown_source: UnknownSourcePolicy,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for IncomingSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            addresses: Vec::new(),
            allow_from: Vec::new(),
            unknown_source: UnknownSourcePolicy::default(),
        }
    }
}

/// Destination side of the proxy
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OutgoingSection {
    /// Destination hostnames or addresses clients may reach
    ///
    /// `allow_sites` is another name for the same key, so a document may set
    /// one or the other but not both.
    #[serde(default, alias = "allow_sites")]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub allowed_ports: Option<Vec<u16>>,
    #[serde(default)]
    pub denied_ports: Vec<u16>,
    #[serde(default)]
    pub dnsbl_domain: Option<String>,
    #[serde(default)]
    pub dnsbl_failure: FailurePolicy,
    #[serde(default = "default_dnsbl_timeout_ms")]
    pub dnsbl_timeout_ms: u64,
    #[serde(default)]
    pub timed_deny_sites: Vec<TimedDenySiteEntry>,
}

fn default_dnsbl_timeout_ms() -> u64 {
    DEFAULT_DNSBL_TIMEOUT_MS
}

impl Default for OutgoingSection {
    fn default() -> Self {
        Self {
            addresses: Vec::new(),
            allowed_ports: None,
            denied_ports: Vec::new(),
            dnsbl_domain: None,
            dnsbl_failure: FailurePolicy::default(),
            dnsbl_timeout_ms: default_dnsbl_timeout_ms(),
            timed_deny_sites: Vec::new(),
        }
    }
}

/// A `[[outgoing.timed_deny_sites]]` table
///
/// `begin` and `end` are TOML time values (`12:00:00`). Full datetimes are
/// accepted too; their date part is ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TimedDenySiteEntry {
    pub begin: Datetime,
    pub end: Datetime,
    #[serde(default)]
    pub deny_sites: Vec<String>,
}

/// Logging settings for the daemon
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// What to do with a client whose address carries no IP (e.g. a Unix socket peer)
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnknownSourcePolicy {
    /// Skip the subnet check
    #[default]
    Allow,
    /// Refuse the request
    Deny,
}

/// How a failed blacklist lookup is interpreted
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Treat the client as not listed
    #[default]
    Open,
    /// Treat the client as listed
    Closed,
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePolicy::Open => write!(f, "open"),
            FailurePolicy::Closed => write!(f, "closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document() {
        let file: ConfigFile = toml::from_str("").unwrap();
        assert_eq!(file.incoming.port, DEFAULT_PORT);
        assert!(file.incoming.addresses.is_empty());
        assert!(file.outgoing.addresses.is_empty());
        assert!(file.outgoing.allowed_ports.is_none());
        assert_eq!(file.outgoing.dnsbl_failure, FailurePolicy::Open);
        assert_eq!(file.log.level, "info");
    }

    #[test]
    fn test_parse_timed_deny_sites() {
        let toml_str = r#"
[[outgoing.timed_deny_sites]]
begin = 09:00:00
end = 17:30:00
deny_sites = ["www.example.com"]
"#;
        let file: ConfigFile = toml::from_str(toml_str).unwrap();
        let entry = &file.outgoing.timed_deny_sites[0];
        assert_eq!(entry.begin.time.unwrap().hour, 9);
        assert_eq!(entry.end.time.unwrap().minute, 30);
        assert_eq!(entry.deny_sites, vec!["www.example.com"]);
    }

    #[test]
    fn test_allow_sites_alias() {
        let file: ConfigFile = toml::from_str(
            r#"
[outgoing]
allow_sites = ["www.example.com"]
"#,
        )
        .unwrap();
        assert_eq!(file.outgoing.addresses, vec!["www.example.com"]);
    }

    #[test]
    fn test_allow_sites_and_addresses_exclusive() {
        let result: Result<ConfigFile, _> = toml::from_str(
            r#"
[outgoing]
addresses = ["www.example.com"]
allow_sites = ["www.example.org"]
"#,
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("duplicate field"), "{err}");
    }

    #[test]
    fn test_policy_enums() {
        let file: ConfigFile = toml::from_str(
            r#"
[incoming]
unknown_source = "deny"

[outgoing]
dnsbl_failure = "closed"
"#,
        )
        .unwrap();
        assert_eq!(file.incoming.unknown_source, UnknownSourcePolicy::Deny);
        assert_eq!(file.outgoing.dnsbl_failure, FailurePolicy::Closed);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: std::result::Result<ConfigFile, _> = toml::from_str(
            r#"
[incoming]
prot = 1080
"#,
        );
        assert!(result.is_err());
    }
}
