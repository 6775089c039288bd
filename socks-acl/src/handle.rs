//! Swappable rule set for long-running servers
//!
//! Connection tasks call [`RequestFilter::matches`] on a shared
//! [`RuleSetHandle`]. A reload builds a complete new [`RuleSet`] and swaps it
//! in atomically; calls already in flight finish against the snapshot they
//! started with.

use crate::config::{Config, ConfigLoader};
use crate::error::Result;
use crate::filter::{DenialSink, Request, RequestFilter, RuleSet};
use arc_swap::ArcSwap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub struct RuleSetHandle {
    current: ArcSwap<RuleSet>,
}

impl RuleSetHandle {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            current: ArcSwap::from_pointee(rules),
        }
    }

    pub fn from_config(config: Config) -> Self {
        Self::new(RuleSet::new(Arc::new(config)))
    }

    /// Snapshot of the rule set in effect right now
    pub fn current(&self) -> Arc<RuleSet> {
        self.current.load_full()
    }

    /// Swap in a rule set built from `config`, keeping the current denial sink
    pub fn replace(&self, config: Config) {
        let sink: Arc<dyn DenialSink> = self.current.load().sink();
        self.current
            .store(Arc::new(RuleSet::with_sink(Arc::new(config), sink)));
    }

    /// Load `path` and swap it in
    ///
    /// If the file cannot be loaded the current rule set stays in effect and
    /// the error is returned.
    pub fn reload_from_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        match ConfigLoader::load_from_file(path) {
            Ok(config) => {
                self.replace(config);
                info!("Configuration reloaded from {:?}", path);
                Ok(())
            }
            Err(e) => {
                warn!("Keeping previous configuration, reload from {:?} failed: {}", path, e);
                Err(e)
            }
        }
    }
}

impl RequestFilter for RuleSetHandle {
    fn matches(&self, request: &Request) -> bool {
        self.current.load().matches(request)
    }
}
