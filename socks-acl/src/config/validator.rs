//! Configuration validation
//!
//! Turns a deserialized [`ConfigFile`] into a [`Config`], parsing subnets and
//! time values and rejecting entries the matchers cannot use.

use super::model::{Config, Incoming, Outgoing, TimedDenySite};
use super::schema::{ConfigFile, IncomingSection, LogConfig, OutgoingSection, TimedDenySiteEntry};
use crate::error::{Result, ValidationError};
use chrono::NaiveTime;
use ipnet::IpNet;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;
use toml::value::Datetime;
use tracing::level_filters::LevelFilter;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate an entire configuration document
    pub fn validate(file: ConfigFile) -> Result<Config> {
        Self::validate_log(&file.log)?;
        Ok(Config {
            incoming: Self::validate_incoming(file.incoming)?,
            outgoing: Self::validate_outgoing(file.outgoing)?,
            log: file.log,
        })
    }

    fn validate_incoming(section: IncomingSection) -> Result<Incoming> {
        let allow_from = section
            .allow_from
            .iter()
            .map(|s| parse_subnet("incoming.allow_from", s))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Incoming {
            port: section.port,
            addresses: section.addresses,
            allow_from,
            unknown_source: section.unknown_source,
        })
    }

    fn validate_outgoing(section: OutgoingSection) -> Result<Outgoing> {
        let addresses = Self::validate_hosts("outgoing.addresses", section.addresses)?;

        let dnsbl_domain = section
            .dnsbl_domain
            .map(|d| parse_domain("outgoing.dnsbl_domain", &d))
            .transpose()?;

        if section.dnsbl_timeout_ms == 0 {
            return Err(ValidationError::InvalidValue {
                field: "outgoing.dnsbl_timeout_ms",
                value: "0".to_string(),
            }
            .into());
        }

        let timed_deny_sites = section
            .timed_deny_sites
            .into_iter()
            .map(Self::validate_timed_deny_site)
            .collect::<Result<Vec<_>>>()?;

        Ok(Outgoing {
            addresses,
            allowed_ports: section.allowed_ports,
            denied_ports: section.denied_ports,
            dnsbl_domain,
            dnsbl_failure: section.dnsbl_failure,
            dnsbl_timeout: Duration::from_millis(section.dnsbl_timeout_ms),
            timed_deny_sites,
        })
    }

    fn validate_timed_deny_site(entry: TimedDenySiteEntry) -> Result<TimedDenySite> {
        Ok(TimedDenySite {
            begin: time_of_day("outgoing.timed_deny_sites.begin", &entry.begin)?,
            end: time_of_day("outgoing.timed_deny_sites.end", &entry.end)?,
            sites: Self::validate_hosts("outgoing.timed_deny_sites.deny_sites", entry.deny_sites)?,
        })
    }

    /// Reject entries that can never equal a requested hostname
    fn validate_hosts(field: &'static str, hosts: Vec<String>) -> Result<Vec<String>> {
        hosts
            .into_iter()
            .map(|host| {
                let trimmed = host.trim();
                let invalid = trimmed.is_empty()
                    || trimmed.contains('*')
                    || trimmed.contains('/')
                    || trimmed.chars().any(|c| c.is_whitespace() || c.is_control());
                if invalid {
                    Err(ValidationError::InvalidHostname { field, host }.into())
                } else {
                    Ok(trimmed.to_string())
                }
            })
            .collect()
    }

    fn validate_log(log: &LogConfig) -> Result<()> {
        LevelFilter::from_str(&log.level).map_err(|_| ValidationError::InvalidValue {
            field: "log.level",
            value: log.level.clone(),
        })?;
        Ok(())
    }
}

/// Parse `network/prefix` or a bare address (treated as a host route)
fn parse_subnet(field: &'static str, s: &str) -> std::result::Result<IpNet, ValidationError> {
    let s = s.trim();
    let invalid = || ValidationError::InvalidCidr {
        field,
        cidr: s.to_string(),
    };

    if let Ok(net) = s.parse::<IpNet>() {
        return Ok(net.trunc());
    }

    let ip = s.parse::<IpAddr>().map_err(|_| invalid())?;
    let prefix = match ip {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    };
    IpNet::new(ip, prefix).map_err(|_| invalid())
}

/// Keep only the hour, minute and second of a TOML time or datetime
fn time_of_day(field: &'static str, value: &Datetime) -> Result<NaiveTime> {
    let invalid = || ValidationError::InvalidTime {
        field,
        value: value.to_string(),
    };

    let t = value.time.ok_or_else(invalid)?;
    let time = NaiveTime::from_hms_opt(t.hour.into(), t.minute.into(), t.second.into())
        .ok_or_else(invalid)?;
    Ok(time)
}

fn parse_domain(field: &'static str, domain: &str) -> std::result::Result<String, ValidationError> {
    let normalized = domain.trim().trim_end_matches('.').to_ascii_lowercase();
    let valid = !normalized.is_empty()
        && normalized.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });

    if valid {
        Ok(normalized)
    } else {
        Err(ValidationError::InvalidDomain {
            field,
            domain: domain.to_string(),
        })
    }
}
