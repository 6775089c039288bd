//! Destination port policy

use crate::config::model::Outgoing;
use std::collections::HashSet;

/// Ports allowed when `outgoing.allowed_ports` is not configured
///
/// FTP, SSH, HTTP, HTTPS and their common alternates. Mail submission and
/// transport ports (25, 465, 587) are deliberately absent.
pub const DEFAULT_ALLOWED_PORTS: [u16; 6] = [21, 22, 80, 443, 8080, 8443];

#[derive(Debug, Clone)]
pub struct PortPolicy {
    allowed: HashSet<u16>,
}

impl PortPolicy {
    /// Build a policy from an optional allow-list and a deny-list
    ///
    /// A configured allow-list replaces [`DEFAULT_ALLOWED_PORTS`] entirely.
    /// Denied ports are removed from whichever list is in effect.
    pub fn new(allowed: Option<&[u16]>, denied: &[u16]) -> Self {
        let base = allowed.unwrap_or(&DEFAULT_ALLOWED_PORTS);
        let allowed = base
            .iter()
            .copied()
            .filter(|port| !denied.contains(port))
            .collect();
        Self { allowed }
    }

    /// Build the policy from the `[outgoing]` section
    pub fn from_config(outgoing: &Outgoing) -> Self {
        Self::new(outgoing.allowed_ports.as_deref(), &outgoing.denied_ports)
    }

    pub fn allow_port(&self, port: u16) -> bool {
        self.allowed.contains(&port)
    }

    /// Effective allowed ports in ascending order
    pub fn allowed_ports(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = self.allowed.iter().copied().collect();
        ports.sort_unstable();
        ports
    }
}

impl Default for PortPolicy {
    fn default() -> Self {
        Self::new(None, &[])
    }
}
