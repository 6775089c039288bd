//! Source address matching

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use std::net::IpAddr;

/// Matcher for client source addresses
///
/// An empty matcher allows every address; restricting clients requires at
/// least one configured subnet.
#[derive(Debug, Clone, Default)]
pub struct SubnetMatcher {
    ipv4_ranges: Vec<Ipv4Net>,
    ipv6_ranges: Vec<Ipv6Net>,
}

impl SubnetMatcher {
    /// Create a new empty matcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a matcher from configured subnets
    pub fn from_subnets<'a, I>(subnets: I) -> Self
    where
        I: IntoIterator<Item = &'a IpNet>,
    {
        let mut matcher = Self::new();
        for net in subnets {
            matcher.add_subnet(*net);
        }
        matcher
    }

    /// Add a subnet of either address family
    pub fn add_subnet(&mut self, net: IpNet) {
        match net {
            IpNet::V4(v4) => self.ipv4_ranges.push(v4),
            IpNet::V6(v6) => self.ipv6_ranges.push(v6),
        }
    }

    /// Check whether a client address may use the proxy
    pub fn allow_ip(&self, ip: IpAddr) -> bool {
        if self.is_empty() {
            return true;
        }

        match unmap(ip) {
            IpAddr::V4(ipv4) => self.ipv4_ranges.iter().any(|net| net.contains(&ipv4)),
            IpAddr::V6(ipv6) => self.ipv6_ranges.iter().any(|net| net.contains(&ipv6)),
        }
    }

    /// Check if matcher has any ranges
    pub fn is_empty(&self) -> bool {
        self.ipv4_ranges.is_empty() && self.ipv6_ranges.is_empty()
    }
}

/// Treat `::ffff:a.b.c.d` as the IPv4 address it carries
pub(crate) fn unmap(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => ip,
        },
        IpAddr::V4(_) => ip,
    }
}
