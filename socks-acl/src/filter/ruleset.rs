//! Rule set that decides whether a proxied connection is allowed

use super::hostname::HostnamePolicy;
use super::port::PortPolicy;
use super::sink::{Denial, DenialReason, DenialSink, TracingSink};
use super::subnet::SubnetMatcher;
use crate::config::{Config, UnknownSourcePolicy};
use chrono::{Local, Timelike};
use std::convert::Infallible;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Address of the client that issued a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceAddr {
    /// A TCP peer
    Inet(SocketAddr),
    /// A peer without an IP, e.g. a Unix domain socket
    Opaque(String),
}

impl SourceAddr {
    pub fn ip(&self) -> Option<IpAddr> {
        match self {
            SourceAddr::Inet(addr) => Some(addr.ip()),
            SourceAddr::Opaque(_) => None,
        }
    }
}

impl From<SocketAddr> for SourceAddr {
    fn from(addr: SocketAddr) -> Self {
        SourceAddr::Inet(addr)
    }
}

impl FromStr for SourceAddr {
    type Err = Infallible;

    /// Accepts `ip:port`, a bare IP (port 0), or anything else as opaque
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(addr) = s.parse::<SocketAddr>() {
            return Ok(SourceAddr::Inet(addr));
        }
        if let Ok(ip) = s.parse::<IpAddr>() {
            return Ok(SourceAddr::Inet(SocketAddr::new(ip, 0)));
        }
        Ok(SourceAddr::Opaque(s.to_string()))
    }
}

impl fmt::Display for SourceAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceAddr::Inet(addr) => write!(f, "{}", addr),
            SourceAddr::Opaque(s) => write!(f, "{}", s),
        }
    }
}

/// A connection request as extracted by the protocol layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub hostname: String,
    pub port: u16,
    pub source: SourceAddr,
}

impl Request {
    pub fn new(hostname: impl Into<String>, port: u16, source: impl Into<SourceAddr>) -> Self {
        Self {
            hostname: hostname.into(),
            port,
            source: source.into(),
        }
    }
}

/// The decision capability handed to the protocol layer
pub trait RequestFilter: Send + Sync {
    /// Return `true` if the request may be proxied
    fn matches(&self, request: &Request) -> bool;
}

/// Composes the hostname, source and port checks into one decision
///
/// Checks run in that order and the first failing one is reported to the
/// [`DenialSink`]. A `RuleSet` never changes after construction.
#[derive(Clone)]
pub struct RuleSet {
    config: Arc<Config>,
    hostnames: HostnamePolicy,
    subnets: SubnetMatcher,
    ports: PortPolicy,
    sink: Arc<dyn DenialSink>,
}

impl RuleSet {
    /// Create a rule set that logs denials through `tracing`
    pub fn new(config: Arc<Config>) -> Self {
        Self::with_sink(config, Arc::new(TracingSink))
    }

    pub fn with_sink(config: Arc<Config>, sink: Arc<dyn DenialSink>) -> Self {
        Self {
            hostnames: HostnamePolicy::from_config(&config.outgoing),
            subnets: SubnetMatcher::from_subnets(&config.incoming.allow_from),
            ports: PortPolicy::from_config(&config.outgoing),
            config,
            sink,
        }
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub(crate) fn sink(&self) -> Arc<dyn DenialSink> {
        Arc::clone(&self.sink)
    }

    pub fn allow_ip(&self, ip: IpAddr) -> bool {
        self.subnets.allow_ip(ip)
    }

    pub fn allow_fqdn(&self, host: &str, now: impl Timelike) -> bool {
        self.hostnames.allow_fqdn(host, now)
    }

    pub fn allow_port(&self, port: u16) -> bool {
        self.ports.allow_port(port)
    }

    /// Evaluate a request as if it arrived at time of day `now`
    pub fn matches_at(&self, request: &Request, now: impl Timelike) -> bool {
        if !self.allow_fqdn(&request.hostname, now) {
            return self.deny(request, DenialReason::Hostname(request.hostname.clone()));
        }

        match request.source.ip() {
            Some(ip) => {
                if !self.allow_ip(ip) {
                    return self.deny(request, DenialReason::Source);
                }
            }
            None => match self.config.incoming.unknown_source {
                UnknownSourcePolicy::Allow => {
                    debug!(client_addr = %request.source, "no client IP, skipping subnet check");
                }
                UnknownSourcePolicy::Deny => {
                    return self.deny(request, DenialReason::Source);
                }
            },
        }

        if !self.allow_port(request.port) {
            return self.deny(request, DenialReason::Port(request.port));
        }

        true
    }

    fn deny(&self, request: &Request, reason: DenialReason) -> bool {
        self.sink.denied(&Denial {
            client_addr: request.source.clone(),
            reason,
        });
        false
    }
}

impl RequestFilter for RuleSet {
    fn matches(&self, request: &Request) -> bool {
        self.matches_at(request, Local::now())
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSet")
            .field("hostnames", &self.hostnames)
            .field("subnets", &self.subnets)
            .field("ports", &self.ports)
            .finish_non_exhaustive()
    }
}
