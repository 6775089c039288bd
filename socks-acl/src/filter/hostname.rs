//! Destination hostname policy
//!
//! Two layers, evaluated in order:
//!
//! 1. a base allow-list of exact hostnames (empty allows everything)
//! 2. timed deny entries, which revoke access to their sites while the
//!    current time of day is inside their window
//!
//! Hostnames are compared after [`normalize_host`]; there is no suffix or
//! wildcard matching, so `bad.google.com` never matches `www.google.com`.

use crate::config::model::{in_daily_window, Outgoing, TimedDenySite};
use chrono::{NaiveTime, Timelike};
use std::collections::HashSet;
use std::net::IpAddr;

#[derive(Debug, Clone)]
struct TimedDenyRule {
    begin: NaiveTime,
    end: NaiveTime,
    sites: HashSet<String>,
}

impl TimedDenyRule {
    fn denies(&self, host: &str, t: NaiveTime) -> bool {
        in_daily_window(self.begin, self.end, t) && self.sites.contains(host)
    }
}

impl From<&TimedDenySite> for TimedDenyRule {
    fn from(site: &TimedDenySite) -> Self {
        Self {
            begin: site.begin,
            end: site.end,
            sites: site.sites.iter().map(|s| normalize_host(s)).collect(),
        }
    }
}

/// Allow-list plus time-scoped deny overrides for destination hostnames
#[derive(Debug, Clone, Default)]
pub struct HostnamePolicy {
    allowed: HashSet<String>,
    timed_deny: Vec<TimedDenyRule>,
}

impl HostnamePolicy {
    /// Create a policy that allows every hostname
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the policy from the `[outgoing]` section
    pub fn from_config(outgoing: &Outgoing) -> Self {
        let mut policy = Self::new();
        for host in &outgoing.addresses {
            policy.add_allowed(host);
        }
        for site in &outgoing.timed_deny_sites {
            policy.add_timed_deny(site);
        }
        policy
    }

    /// Add an exact hostname to the base allow-list
    pub fn add_allowed(&mut self, host: &str) {
        self.allowed.insert(normalize_host(host));
    }

    /// Add a time-scoped deny entry
    pub fn add_timed_deny(&mut self, site: &TimedDenySite) {
        self.timed_deny.push(TimedDenyRule::from(site));
    }

    /// Check whether `host` may be reached at time `now`
    ///
    /// Only the hour, minute and second of `now` are considered.
    pub fn allow_fqdn(&self, host: &str, now: impl Timelike) -> bool {
        let host = normalize_host(host);

        if !self.allowed.is_empty() && !self.allowed.contains(&host) {
            return false;
        }

        if self.timed_deny.is_empty() {
            return true;
        }

        let Some(t) = NaiveTime::from_hms_opt(now.hour(), now.minute(), now.second()) else {
            return true;
        };

        !self.timed_deny.iter().any(|rule| rule.denies(&host, t))
    }

    /// Check if the base allow-list is unrestricted
    pub fn allows_all(&self) -> bool {
        self.allowed.is_empty()
    }
}

/// Normalize a hostname for comparison
///
/// ASCII letters are lowercased and a single trailing dot is dropped. IP
/// literals, bracketed or not, are rendered in their canonical form so that
/// `[::1]` and `0:0::1` compare equal.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let host = host.strip_suffix('.').unwrap_or(host);
    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    match bare.parse::<IpAddr>() {
        Ok(ip) => ip.to_string(),
        Err(_) => host.to_ascii_lowercase(),
    }
}
