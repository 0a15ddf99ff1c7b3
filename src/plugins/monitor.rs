//! Bundle monitor: mtime polling over the LV2 search paths.
//!
//! Polling is used instead of OS file watchers for portability. A bundle
//! is any subdirectory carrying a `manifest.ttl`; whenever the set of
//! bundles or any manifest mtime changes, the catalog is rescanned.

use crate::plugins::PluginRegistry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Standard LV2 bundle locations.
pub fn default_bundle_directories() -> Vec<PathBuf> {
    let mut directories = vec![PathBuf::from("/usr/lib/lv2"), PathBuf::from("/usr/local/lib/lv2")];
    if let Ok(home) = std::env::var("HOME") {
        directories.push(PathBuf::from(home).join(".lv2"));
    }
    directories
}

pub struct BundleMonitor {
    registry: Arc<PluginRegistry>,
    directories: Vec<PathBuf>,
}

impl BundleMonitor {
    pub fn new(registry: Arc<PluginRegistry>, directories: Vec<PathBuf>) -> Self {
        Self {
            registry,
            directories,
        }
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    async fn run(self, shutdown: CancellationToken) {
        info!(
            "Monitoring {} plugin bundle directories for changes",
            self.directories.len()
        );

        // Establish the baseline without triggering a rescan.
        let baseline = scan_bundles(&self.directories);
        self.registry.refresh_bundles(baseline).await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }

            let current = scan_bundles(&self.directories);
            if self.registry.refresh_bundles(current).await {
                if let Err(e) = self.registry.rescan_plugins().await {
                    error!("Plugin rescan after bundle change failed: {}", e);
                }
            }
        }
        debug!("Bundle monitor stopped");
    }
}

/// Collect `(bundle path -> manifest mtime)` across the given directories.
/// Missing directories are skipped silently; they may appear later.
pub fn scan_bundles(directories: &[PathBuf]) -> HashMap<PathBuf, SystemTime> {
    let mut bundles = HashMap::new();
    for directory in directories {
        let entries = match std::fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(_) => continue,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if let Some(modified) = manifest_mtime(&path) {
                bundles.insert(path, modified);
            }
        }
    }
    bundles
}

fn manifest_mtime(bundle: &Path) -> Option<SystemTime> {
    std::fs::metadata(bundle.join("manifest.ttl"))
        .and_then(|metadata| metadata.modified())
        .ok()
}
