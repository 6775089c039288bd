use anyhow::Context;
use chrono::NaiveTime;
use clap::{Parser, Subcommand};
use socks_acl::filter::{DEFAULT_ALLOWED_PORTS, PortPolicy};
use socks_acl::{Config, ConfigLoader, Request, RequestFilter, RuleSet, SourceAddr};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, Registry};

#[derive(Parser, Debug)]
#[command(name = "socks-acl")]
#[command(about = "Check and evaluate SOCKS proxy access policies")]
struct Args {
    /// Config file path [default: $SOCKS_ACL_CONFIG or /etc/socks-acl.toml]
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the configuration and print a summary
    Check,

    /// Decide whether a single request would be allowed
    Eval {
        /// Destination hostname or address
        #[arg(long)]
        host: String,

        /// Destination port
        #[arg(long)]
        port: u16,

        /// Client address, e.g. 10.1.2.3:50000
        #[arg(long, default_value = "127.0.0.1:0")]
        source: SourceAddr,

        /// Evaluate at this time of day (HH:MM:SS) instead of now
        #[arg(long)]
        at: Option<NaiveTime>,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let log_filter = init_logging(args.verbose);

    let config = ConfigLoader::load_or_default(args.config.clone())
        .context("failed to load configuration")?;

    if !args.verbose {
        log_filter
            .reload(env_filter(config_level(&config)))
            .context("failed to apply configured log level")?;
    }

    let rules = RuleSet::new(Arc::new(config));

    match args.command {
        Command::Check => {
            summarize(&rules);
            println!("configuration OK");
            Ok(ExitCode::SUCCESS)
        }
        Command::Eval {
            host,
            port,
            source,
            at,
        } => {
            let request = Request::new(host, port, source);
            let allowed = match at {
                Some(t) => rules.matches_at(&request, t),
                None => rules.matches(&request),
            };

            if allowed {
                println!("allow");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("deny");
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

/// Install the subscriber before loading config so loader events are seen
///
/// The returned handle swaps in the configured level once it is known.
fn init_logging(verbose: bool) -> reload::Handle<EnvFilter, Registry> {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let (filter, handle) = reload::Layer::new(env_filter(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    handle
}

fn env_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::from_default_env().add_directive(level.into())
}

fn config_level(config: &Config) -> LevelFilter {
    // Validated at load time
    LevelFilter::from_str(&config.log.level).unwrap_or(LevelFilter::INFO)
}

fn summarize(rules: &RuleSet) {
    let config = rules.config();
    let listen: Vec<String> = config.listen_addrs().iter().map(|a| a.to_string()).collect();
    let allow_from: Vec<String> = config
        .incoming
        .allow_from
        .iter()
        .map(|n| n.to_string())
        .collect();
    let ports = PortPolicy::from_config(&config.outgoing).allowed_ports();

    info!("listen: {}", listen.join(", "));
    if allow_from.is_empty() {
        info!("allow_from: any");
    } else {
        info!("allow_from: {}", allow_from.join(", "));
    }
    if config.outgoing.addresses.is_empty() {
        info!("destinations: any");
    } else {
        info!("destinations: {}", config.outgoing.addresses.join(", "));
    }
    if config.outgoing.allowed_ports.is_none() {
        info!("ports: {:?} (default {:?})", ports, DEFAULT_ALLOWED_PORTS);
    } else {
        info!("ports: {:?}", ports);
    }
    for site in &config.outgoing.timed_deny_sites {
        info!(
            "timed deny {}-{}: {}",
            site.begin,
            site.end,
            site.sites.join(", ")
        );
    }
    if let Some(zone) = &config.outgoing.dnsbl_domain {
        info!(
            "dnsbl: {} (fail {}, timeout {:?})",
            zone, config.outgoing.dnsbl_failure, config.outgoing.dnsbl_timeout
        );
    }
}
