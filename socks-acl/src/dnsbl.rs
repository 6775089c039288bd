//! DNS blacklist checks for client addresses
//!
//! The resolver itself is supplied by the caller through [`BlacklistLookup`].
//! [`DnsblChecker`] builds the query name, bounds the lookup with a timeout
//! and maps any failure to the configured [`FailurePolicy`].

use crate::config::{Config, FailurePolicy};
use crate::error::LookupError;
use crate::filter::subnet::unmap;
use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Resolves DNSBL query names
#[async_trait]
pub trait BlacklistLookup: Send + Sync {
    /// Return `Ok(true)` if `query` has an address record, `Ok(false)` on NXDOMAIN
    async fn lookup(&self, query: &str) -> Result<bool, LookupError>;
}

/// Build the DNSBL query name for `ip` under `zone`
///
/// IPv4 octets are reversed (`1.2.3.4` → `4.3.2.1.zone`); IPv6 addresses are
/// expanded to reversed nibbles.
pub fn query_name(ip: IpAddr, zone: &str) -> String {
    let mut name = String::new();
    match unmap(ip) {
        IpAddr::V4(v4) => {
            for octet in v4.octets().iter().rev() {
                name.push_str(&format!("{}.", octet));
            }
        }
        IpAddr::V6(v6) => {
            for byte in v6.octets().iter().rev() {
                name.push_str(&format!("{:x}.{:x}.", byte & 0x0f, byte >> 4));
            }
        }
    }
    name.push_str(zone);
    name
}

pub struct DnsblChecker {
    lookup: Arc<dyn BlacklistLookup>,
    zone: String,
    timeout: Duration,
    failure: FailurePolicy,
}

impl DnsblChecker {
    pub fn new(
        lookup: Arc<dyn BlacklistLookup>,
        zone: impl Into<String>,
        timeout: Duration,
        failure: FailurePolicy,
    ) -> Self {
        Self {
            lookup,
            zone: zone.into(),
            timeout,
            failure,
        }
    }

    /// Build a checker when `outgoing.dnsbl_domain` is configured
    pub fn from_config(config: &Config, lookup: Arc<dyn BlacklistLookup>) -> Option<Self> {
        let outgoing = &config.outgoing;
        outgoing.dnsbl_domain.as_ref().map(|zone| {
            Self::new(
                lookup,
                zone.clone(),
                outgoing.dnsbl_timeout,
                outgoing.dnsbl_failure,
            )
        })
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// Check whether `ip` is listed
    ///
    /// Never fails: a timed-out or failed lookup counts as listed when the
    /// failure policy is `closed` and as not listed when it is `open`.
    pub async fn is_listed(&self, ip: IpAddr) -> bool {
        let query = query_name(ip, &self.zone);

        let result = match tokio::time::timeout(self.timeout, self.lookup.lookup(&query)).await {
            Ok(result) => result,
            Err(_) => Err(LookupError::Timeout(self.timeout)),
        };

        match result {
            Ok(listed) => {
                debug!(client_addr = %ip, query = %query, listed, "blacklist lookup");
                listed
            }
            Err(e) => {
                warn!(
                    client_addr = %ip,
                    query = %query,
                    policy = %self.failure,
                    "blacklist lookup failed: {}",
                    e
                );
                self.failure == FailurePolicy::Closed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Answers from a fixed set of listed query names
    struct StaticLookup {
        listed: HashSet<String>,
        queries: Mutex<Vec<String>>,
    }

    impl StaticLookup {
        fn new(listed: &[&str]) -> Self {
            Self {
                listed: listed.iter().map(|s| s.to_string()).collect(),
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl BlacklistLookup for StaticLookup {
        async fn lookup(&self, query: &str) -> Result<bool, LookupError> {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(self.listed.contains(query))
        }
    }

    struct FailingLookup;

    #[async_trait]
    impl BlacklistLookup for FailingLookup {
        async fn lookup(&self, _query: &str) -> Result<bool, LookupError> {
            Err(LookupError::Resolver("SERVFAIL".to_string()))
        }
    }

    struct SlowLookup;

    #[async_trait]
    impl BlacklistLookup for SlowLookup {
        async fn lookup(&self, _query: &str) -> Result<bool, LookupError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(false)
        }
    }

    fn checker(lookup: Arc<dyn BlacklistLookup>, failure: FailurePolicy) -> DnsblChecker {
        DnsblChecker::new(lookup, "zen.spamhaus.org", Duration::from_millis(50), failure)
    }

    #[test]
    fn test_query_name_ipv4() {
        assert_eq!(
            query_name("127.0.0.2".parse().unwrap(), "zen.spamhaus.org"),
            "2.0.0.127.zen.spamhaus.org"
        );
        assert_eq!(
            query_name("::ffff:1.2.3.4".parse().unwrap(), "bl.example"),
            "4.3.2.1.bl.example"
        );
    }

    #[test]
    fn test_query_name_ipv6() {
        let name = query_name("2001:db8::567:89ab".parse().unwrap(), "bl.example");
        assert_eq!(
            name,
            "b.a.9.8.7.6.5.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.8.b.d.0.1.0.0.2.bl.example"
        );
    }

    #[tokio::test]
    async fn test_listed_and_unlisted() {
        let lookup = Arc::new(StaticLookup::new(&["2.0.0.127.zen.spamhaus.org"]));
        let checker = checker(lookup.clone(), FailurePolicy::Open);

        assert!(checker.is_listed("127.0.0.2".parse().unwrap()).await);
        assert!(!checker.is_listed("127.0.0.3".parse().unwrap()).await);
        assert_eq!(
            *lookup.queries.lock().unwrap(),
            vec!["2.0.0.127.zen.spamhaus.org", "3.0.0.127.zen.spamhaus.org"]
        );
    }

    #[tokio::test]
    async fn test_lookup_error_follows_policy() {
        let ip: IpAddr = "192.0.2.1".parse().unwrap();

        assert!(!checker(Arc::new(FailingLookup), FailurePolicy::Open).is_listed(ip).await);
        assert!(checker(Arc::new(FailingLookup), FailurePolicy::Closed).is_listed(ip).await);
    }

    #[tokio::test]
    async fn test_timeout_follows_policy() {
        let ip: IpAddr = "192.0.2.1".parse().unwrap();

        assert!(!checker(Arc::new(SlowLookup), FailurePolicy::Open).is_listed(ip).await);
        assert!(checker(Arc::new(SlowLookup), FailurePolicy::Closed).is_listed(ip).await);
    }

    #[test]
    fn test_from_config() {
        let lookup: Arc<dyn BlacklistLookup> = Arc::new(FailingLookup);
        assert!(DnsblChecker::from_config(&Config::default(), lookup.clone()).is_none());

        let mut config = Config::default();
        config.outgoing.dnsbl_domain = Some("zen.spamhaus.org".to_string());
        config.outgoing.dnsbl_failure = FailurePolicy::Closed;
        let checker = DnsblChecker::from_config(&config, lookup).unwrap();
        assert_eq!(checker.zone(), "zen.spamhaus.org");
        assert_eq!(checker.failure, FailurePolicy::Closed);
    }
}
