//! Validated, immutable policy configuration

use super::loader::ConfigLoader;
use super::schema::{
    FailurePolicy, LogConfig, UnknownSourcePolicy, DEFAULT_DNSBL_TIMEOUT_MS, DEFAULT_PORT,
};
use crate::error::Result;
use chrono::NaiveTime;
use ipnet::IpNet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

/// Complete policy configuration
///
/// Built once by [`ConfigLoader`] and shared read-only afterwards. Reloading
/// produces a new value instead of mutating a live one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub incoming: Incoming,
    pub outgoing: Outgoing,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Incoming {
    pub port: u16,
    pub addresses: Vec<IpAddr>,
    pub allow_from: Vec<IpNet>,
    pub unknown_source: UnknownSourcePolicy,
}

impl Default for Incoming {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            addresses: Vec::new(),
            allow_from: Vec::new(),
            unknown_source: UnknownSourcePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outgoing {
    /// Allowed destination hostnames and addresses; empty allows all
    pub addresses: Vec<String>,
    /// Replaces the built-in port list when set
    pub allowed_ports: Option<Vec<u16>>,
    pub denied_ports: Vec<u16>,
    pub dnsbl_domain: Option<String>,
    pub dnsbl_failure: FailurePolicy,
    pub dnsbl_timeout: Duration,
    pub timed_deny_sites: Vec<TimedDenySite>,
}

impl Default for Outgoing {
    fn default() -> Self {
        Self {
            addresses: Vec::new(),
            allowed_ports: None,
            denied_ports: Vec::new(),
            dnsbl_domain: None,
            dnsbl_failure: FailurePolicy::default(),
            dnsbl_timeout: Duration::from_millis(DEFAULT_DNSBL_TIMEOUT_MS),
            timed_deny_sites: Vec::new(),
        }
    }
}

/// Hostnames denied during a daily time-of-day window
///
/// `begin` and `end` are both inclusive. A window whose `begin` is later than
/// its `end` runs across midnight.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedDenySite {
    pub begin: NaiveTime,
    pub end: NaiveTime,
    pub sites: Vec<String>,
}

impl TimedDenySite {
    /// Check whether a time of day falls inside the window
    pub fn contains(&self, t: NaiveTime) -> bool {
        in_daily_window(self.begin, self.end, t)
    }
}

/// Inclusive time-of-day test, wrapping past midnight when `begin > end`
pub(crate) fn in_daily_window(begin: NaiveTime, end: NaiveTime, t: NaiveTime) -> bool {
    if begin <= end {
        begin <= t && t <= end
    } else {
        t >= begin || t <= end
    }
}

impl Config {
    /// Load a config from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        ConfigLoader::load_from_file(path)
    }

    /// Replace this config with the contents of a file
    ///
    /// On error `self` is left exactly as it was.
    pub fn update_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        *self = ConfigLoader::load_from_file(path)?;
        Ok(())
    }

    /// Socket addresses the listener should bind
    pub fn listen_addrs(&self) -> Vec<SocketAddr> {
        if self.incoming.addresses.is_empty() {
            return vec![SocketAddr::new(
                IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                self.incoming.port,
            )];
        }

        self.incoming
            .addresses
            .iter()
            .map(|ip| SocketAddr::new(*ip, self.incoming.port))
            .collect()
    }
}
