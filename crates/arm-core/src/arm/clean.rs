//! clean cache / clean sinks

use super::Arm;
use super::report::{CacheCleanReport, SinkCleanReport};
use crate::error::Result;

impl Arm {
    /// Drop cache entries not accessed within `max_age`, or the whole cache.
    pub fn clean_cache(&self, max_age: chrono::Duration, nuke: bool) -> Result<CacheCleanReport> {
        self.cancel.check()?;
        if nuke {
            self.cache.nuke()?;
            return Ok(CacheCleanReport {
                removed: Vec::new(),
                nuked: true,
            });
        }
        let removed = self.cache.clean(max_age)?;
        tracing::info!(removed = removed.len(), "Cleaned content cache");
        Ok(CacheCleanReport {
            removed,
            nuked: false,
        })
    }

    /// Delete unclaimed files from every sink; with `nuke`, everything arm
    /// put there.
    pub fn clean_sinks(&self, nuke: bool) -> Result<Vec<SinkCleanReport>> {
        let manifest = self.manifest.load()?;
        self.installers(&manifest)
            .iter()
            .map(|installer| {
                self.cancel.check()?;
                Ok(SinkCleanReport {
                    sink: installer.name().to_string(),
                    removed: installer.clean(nuke)?,
                })
            })
            .collect()
    }
}
