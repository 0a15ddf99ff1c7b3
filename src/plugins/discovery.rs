//! Plugin discovery adapter boundary.
//!
//! The registry consumes the host's LV2 discovery library through this
//! trait; everything behind it (Lilv scanning, preset parsing, bundle
//! loading) is external to the bridge.

use crate::error::Result;
use crate::types::{PluginEssentials, PluginGui, PluginGuiMini, PluginInfo, PluginPreset};
use std::collections::HashMap;
use tracing::warn;

pub trait PluginDiscovery: Send + Sync {
    /// Enumerate every available plugin, keyed by URI. Entries may be
    /// reduced records; `get_info` supplies the full description.
    fn scan_all(&self) -> Result<HashMap<String, PluginInfo>>;

    /// Full catalog entry for one URI, or `None` when unknown.
    fn get_info(&self, uri: &str) -> Result<Option<PluginInfo>>;

    fn get_presets(&self, plugin_uri: &str) -> Result<Vec<PluginPreset>>;

    fn load_preset(&self, plugin_uri: &str, preset_uri: &str) -> Result<Option<PluginPreset>>;

    fn save_preset(&self, plugin_uri: &str, preset: &PluginPreset) -> Result<bool>;

    fn validate_preset(&self, plugin_uri: &str, preset_uri: &str) -> Result<bool>;

    fn rescan_presets(&self, plugin_uri: &str) -> Result<()>;

    fn get_gui(&self, plugin_uri: &str) -> Result<Option<PluginGui>>;

    fn get_gui_mini(&self, plugin_uri: &str) -> Result<Option<PluginGuiMini>>;

    fn get_essentials(&self, plugin_uri: &str) -> Result<Option<PluginEssentials>>;

    fn is_bundle_loaded(&self, bundle_path: &str) -> Result<bool>;

    /// Load a bundle, returning the URIs it contributed.
    fn add_bundle(&self, bundle_path: &str) -> Result<Vec<String>>;

    /// Unload a bundle, returning the URIs it removed.
    fn remove_bundle(&self, bundle_path: &str, resource_path: &str) -> Result<Vec<String>>;

    fn list_in_bundle(&self, bundle_path: &str) -> Result<Vec<String>>;
}

/// Discovery adapter used when no LV2 discovery library is linked in.
/// Reports an empty catalog so the daemon still serves the raw command
/// surface.
// TODO: replace with the lilv-backed adapter once the mod-utils bindings land.
pub struct NullDiscovery;

impl NullDiscovery {
    pub fn new() -> Self {
        warn!("No plugin discovery library available; catalog will be empty");
        Self
    }
}

impl Default for NullDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginDiscovery for NullDiscovery {
    fn scan_all(&self) -> Result<HashMap<String, PluginInfo>> {
        Ok(HashMap::new())
    }

    fn get_info(&self, _uri: &str) -> Result<Option<PluginInfo>> {
        Ok(None)
    }

    fn get_presets(&self, _plugin_uri: &str) -> Result<Vec<PluginPreset>> {
        Ok(Vec::new())
    }

    fn load_preset(&self, _plugin_uri: &str, _preset_uri: &str) -> Result<Option<PluginPreset>> {
        Ok(None)
    }

    fn save_preset(&self, _plugin_uri: &str, _preset: &PluginPreset) -> Result<bool> {
        Ok(false)
    }

    fn validate_preset(&self, _plugin_uri: &str, _preset_uri: &str) -> Result<bool> {
        Ok(false)
    }

    fn rescan_presets(&self, _plugin_uri: &str) -> Result<()> {
        Ok(())
    }

    fn get_gui(&self, _plugin_uri: &str) -> Result<Option<PluginGui>> {
        Ok(None)
    }

    fn get_gui_mini(&self, _plugin_uri: &str) -> Result<Option<PluginGuiMini>> {
        Ok(None)
    }

    fn get_essentials(&self, _plugin_uri: &str) -> Result<Option<PluginEssentials>> {
        Ok(None)
    }

    fn is_bundle_loaded(&self, _bundle_path: &str) -> Result<bool> {
        Ok(false)
    }

    fn add_bundle(&self, _bundle_path: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn remove_bundle(&self, _bundle_path: &str, _resource_path: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn list_in_bundle(&self, _bundle_path: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}
