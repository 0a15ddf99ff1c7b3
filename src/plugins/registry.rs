//! Authoritative store of loaded plugin instances and the available-plugin
//! catalog.
//!
//! Every mutating operation serializes through one async mutex. Engine I/O
//! is performed while holding it; the engine is single-writer with respect
//! to instance lifecycle, so the long hold is a deliberate simplicity
//! choice rather than a performance path.

use crate::bus::EventPublisher;
use crate::engine::{parse_resp, EngineClient};
use crate::error::{BridgeError, Result};
use crate::plugins::discovery::PluginDiscovery;
use crate::plugins::{search, validator};
use crate::types::{
    PluginEssentials, PluginGui, PluginGuiMini, PluginInfo, PluginInstance, PluginPreset,
    PluginSearchCriteria,
};
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

struct RegistryState {
    catalog: HashMap<String, PluginInfo>,
    instances: HashMap<String, PluginInstance>,
    bundles: HashMap<PathBuf, SystemTime>,
}

pub struct PluginRegistry {
    engine: EngineClient,
    discovery: Arc<dyn PluginDiscovery>,
    publisher: EventPublisher,
    state: Mutex<RegistryState>,
    /// Next numeric slot requested from the engine. Monotonic for the
    /// process lifetime; slots are never reused, not even after a failed
    /// load or an unload.
    next_engine_slot: AtomicI32,
}

impl PluginRegistry {
    pub fn new(
        engine: EngineClient,
        discovery: Arc<dyn PluginDiscovery>,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            engine,
            discovery,
            publisher,
            state: Mutex::new(RegistryState {
                catalog: HashMap::new(),
                instances: HashMap::new(),
                bundles: HashMap::new(),
            }),
            next_engine_slot: AtomicI32::new(0),
        }
    }

    /// Load the initial catalog. Unlike an explicit rescan this does not
    /// emit a `plugins_rescanned` event.
    pub async fn initialize(&self) -> Result<()> {
        let catalog = self.scan_catalog()?;
        if catalog.is_empty() {
            warn!("No valid plugins found during scan");
        }

        let mut state = self.state.lock().await;
        state.catalog = catalog;
        info!(
            "Plugin registry initialized with {} available plugins",
            state.catalog.len()
        );
        Ok(())
    }

    /// Remove every live instance from the engine. Called on daemon
    /// shutdown; failures are logged per instance.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        info!("Shutting down plugin registry");
        for instance_id in state.instances.keys() {
            if let Err(e) = self.engine.send(&format!("remove {instance_id}")).await {
                error!("Error removing plugin {} during shutdown: {}", instance_id, e);
            }
        }
        state.instances.clear();
    }

    pub async fn load_plugin(
        &self,
        uri: String,
        x: f64,
        y: f64,
        parameters: HashMap<String, f64>,
    ) -> Result<PluginInstance> {
        let mut state = self.state.lock().await;

        let info = state
            .catalog
            .get(&uri)
            .ok_or_else(|| BridgeError::PluginNotFound(uri.clone()))?
            .clone();

        let instance_id = generate_instance_id(state.instances.len());
        let requested = self.next_engine_slot.fetch_add(1, Ordering::SeqCst);

        let body = self.engine.send(&format!("add {uri} {requested}")).await?;
        let engine_instance = match parse_resp(&body) {
            Ok(n) => n,
            Err(e) => {
                error!("Failed to parse mod-host response {:?} for add", body);
                return Err(e);
            }
        };
        if engine_instance < 0 {
            return Err(BridgeError::Engine(engine_instance));
        }
        info!(
            "mod-host confirmed plugin loaded with instance {}",
            engine_instance
        );

        // Initial parameters are best effort; a failed send is logged and
        // the value is simply not recorded.
        let mut applied = HashMap::new();
        for (symbol, value) in &parameters {
            match self
                .engine
                .send(&format!("param_set {instance_id} {symbol} {value}"))
                .await
            {
                Ok(_) => {
                    applied.insert(symbol.clone(), *value);
                }
                Err(e) => {
                    warn!(
                        "Failed to set initial parameter {} on {}: {}",
                        symbol, instance_id, e
                    );
                }
            }
        }

        let instance = PluginInstance {
            instance_id: instance_id.clone(),
            engine_instance,
            uri: uri.clone(),
            name: info.name.clone(),
            brand: info.brand.clone(),
            version: info.version.clone(),
            parameters: applied.clone(),
            ports: info.ports.clone(),
            x,
            y,
            enabled: true,
            preset: String::new(),
            created_at: Utc::now(),
        };
        state.instances.insert(instance_id.clone(), instance.clone());

        self.publisher.publish_lifecycle(
            "plugin_loaded",
            json!({"instance_id": instance_id, "uri": uri, "name": instance.name}),
        );
        for (symbol, value) in &applied {
            self.publisher.publish_lifecycle(
                "parameter_changed",
                json!({"instance_id": instance_id, "parameter": symbol, "value": value}),
            );
        }

        info!("Loaded plugin {} as {}", uri, instance_id);
        Ok(instance)
    }

    pub async fn unload_plugin(&self, instance_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        self.unload_locked(&mut state, instance_id).await
    }

    async fn unload_locked(&self, state: &mut RegistryState, instance_id: &str) -> Result<()> {
        let uri = state
            .instances
            .get(instance_id)
            .ok_or_else(|| BridgeError::InstanceNotFound(instance_id.to_string()))?
            .uri
            .clone();

        if let Err(e) = self.engine.send(&format!("remove {instance_id}")).await {
            warn!("Failed to remove plugin {} from mod-host: {}", instance_id, e);
        }

        state.instances.remove(instance_id);

        self.publisher.publish_lifecycle(
            "plugin_unloaded",
            json!({"instance_id": instance_id, "uri": uri}),
        );
        info!("Unloaded plugin {}", instance_id);
        Ok(())
    }

    pub async fn set_parameter(&self, instance_id: &str, parameter: &str, value: f64) -> Result<f64> {
        let mut state = self.state.lock().await;
        if !state.instances.contains_key(instance_id) {
            return Err(BridgeError::InstanceNotFound(instance_id.to_string()));
        }

        let body = self
            .engine
            .send(&format!("param_set {instance_id} {parameter} {value}"))
            .await?;
        let code = parse_resp(&body)?;
        if code < 0 {
            return Err(BridgeError::Engine(code));
        }

        if let Some(instance) = state.instances.get_mut(instance_id) {
            instance.parameters.insert(parameter.to_string(), value);
        }
        drop(state);

        self.publisher.publish_lifecycle(
            "parameter_changed",
            json!({"instance_id": instance_id, "parameter": parameter, "value": value}),
        );
        debug!("Set parameter {}.{} = {}", instance_id, parameter, value);
        Ok(value)
    }

    /// Ask the engine for the live value, fall back to the cached one,
    /// then to 0.0. Never errors for a known instance.
    pub async fn get_parameter(&self, instance_id: &str, parameter: &str) -> Result<f64> {
        let state = self.state.lock().await;
        let cached = state
            .instances
            .get(instance_id)
            .ok_or_else(|| BridgeError::InstanceNotFound(instance_id.to_string()))?
            .parameters
            .get(parameter)
            .copied();

        if let Ok(body) = self
            .engine
            .send(&format!("param_get {instance_id} {parameter}"))
            .await
        {
            if let Ok(value) = body.trim().parse::<f64>() {
                return Ok(value);
            }
        }

        Ok(cached.unwrap_or(0.0))
    }

    pub async fn get_plugin_info(&self, instance_id: &str) -> Result<PluginInstance> {
        let state = self.state.lock().await;
        state
            .instances
            .get(instance_id)
            .cloned()
            .ok_or_else(|| BridgeError::InstanceNotFound(instance_id.to_string()))
    }

    pub async fn list_instances(&self) -> HashMap<String, PluginInstance> {
        self.state.lock().await.instances.clone()
    }

    /// Unload every instance. Per-instance failures are logged; the
    /// operation itself always succeeds.
    pub async fn clear_all(&self) {
        let mut state = self.state.lock().await;
        let instance_ids: Vec<String> = state.instances.keys().cloned().collect();
        for instance_id in instance_ids {
            if let Err(e) = self.unload_locked(&mut state, &instance_id).await {
                error!(
                    "Error unloading plugin {} during clear_all: {}",
                    instance_id, e
                );
            }
        }
        info!("Cleared all plugin instances");
    }

    pub async fn get_available_plugins(&self) -> HashMap<String, PluginInfo> {
        self.state.lock().await.catalog.clone()
    }

    pub async fn search_plugins(
        &self,
        query: &str,
        criteria: Option<&PluginSearchCriteria>,
    ) -> Vec<PluginInfo> {
        let state = self.state.lock().await;
        let results = if let Some(criteria) = criteria {
            search::filter_plugins(criteria, &state.catalog)
        } else if !query.is_empty() {
            search::search_by_text(query, &state.catalog)
        } else {
            let mut all: Vec<PluginInfo> = state.catalog.values().cloned().collect();
            all.sort_by(|a, b| a.uri.cmp(&b.uri));
            all
        };
        debug!("Plugin search returned {} results", results.len());
        results
    }

    /// Re-enumerate the catalog and swap it in, returning how many URIs
    /// were added and removed compared to the previous catalog.
    pub async fn rescan_plugins(&self) -> Result<(usize, usize)> {
        info!("Rescanning plugins for changes");
        let new_catalog = self.scan_catalog()?;

        let mut state = self.state.lock().await;
        let added = new_catalog
            .keys()
            .filter(|uri| !state.catalog.contains_key(*uri))
            .count();
        let removed = state
            .catalog
            .keys()
            .filter(|uri| !new_catalog.contains_key(*uri))
            .count();
        state.catalog = new_catalog;
        let plugin_count = state.catalog.len();
        drop(state);

        self.publisher
            .publish_lifecycle("plugins_rescanned", json!({"plugin_count": plugin_count}));

        if added > 0 || removed > 0 {
            info!(
                "Plugin rescan: {} added, {} removed, total: {}",
                added, removed, plugin_count
            );
        } else {
            debug!("Plugin rescan completed, no changes");
        }
        Ok((added, removed))
    }

    pub async fn get_plugin_presets(&self, plugin_uri: &str) -> Result<Vec<PluginPreset>> {
        self.ensure_known(plugin_uri).await?;
        let presets = self.discovery.get_presets(plugin_uri)?;
        debug!(
            "Retrieved {} presets for plugin {}",
            presets.len(),
            plugin_uri
        );
        Ok(presets)
    }

    pub async fn load_preset(&self, plugin_uri: &str, preset_uri: &str) -> Result<()> {
        self.ensure_known(plugin_uri).await?;
        match self.discovery.load_preset(plugin_uri, preset_uri)? {
            Some(_) => {
                info!("Loaded preset {} for plugin {}", preset_uri, plugin_uri);
                Ok(())
            }
            None => Err(BridgeError::Adapter(format!(
                "Failed to load preset: {preset_uri}"
            ))),
        }
    }

    pub async fn save_preset(&self, plugin_uri: &str, preset: &PluginPreset) -> Result<()> {
        self.ensure_known(plugin_uri).await?;
        if self.discovery.save_preset(plugin_uri, preset)? {
            info!("Saved preset {} for plugin {}", preset.uri, plugin_uri);
            Ok(())
        } else {
            Err(BridgeError::Adapter(format!(
                "Failed to save preset: {}",
                preset.uri
            )))
        }
    }

    pub async fn validate_preset(&self, plugin_uri: &str, preset_uri: &str) -> Result<bool> {
        self.ensure_known(plugin_uri).await?;
        self.discovery.validate_preset(plugin_uri, preset_uri)
    }

    pub async fn rescan_presets(&self, plugin_uri: &str) -> Result<()> {
        self.ensure_known(plugin_uri).await?;
        self.discovery.rescan_presets(plugin_uri)?;
        info!("Triggered preset rescan for plugin {}", plugin_uri);
        Ok(())
    }

    pub async fn get_plugin_gui(&self, plugin_uri: &str) -> Result<Option<PluginGui>> {
        self.ensure_known(plugin_uri).await?;
        self.discovery.get_gui(plugin_uri)
    }

    pub async fn get_plugin_gui_mini(&self, plugin_uri: &str) -> Result<Option<PluginGuiMini>> {
        self.ensure_known(plugin_uri).await?;
        self.discovery.get_gui_mini(plugin_uri)
    }

    pub async fn get_plugin_essentials(&self, plugin_uri: &str) -> Result<Option<PluginEssentials>> {
        self.ensure_known(plugin_uri).await?;
        self.discovery.get_essentials(plugin_uri)
    }

    pub async fn is_bundle_loaded(&self, bundle_path: &str) -> Result<bool> {
        self.discovery.is_bundle_loaded(bundle_path)
    }

    pub async fn add_bundle(&self, bundle_path: &str) -> Result<Vec<String>> {
        let added = self.discovery.add_bundle(bundle_path)?;
        info!("Added bundle {} with {} plugins", bundle_path, added.len());
        Ok(added)
    }

    pub async fn remove_bundle(&self, bundle_path: &str, resource_path: &str) -> Result<Vec<String>> {
        let removed = self.discovery.remove_bundle(bundle_path, resource_path)?;
        info!(
            "Removed bundle {} with {} plugins",
            bundle_path,
            removed.len()
        );
        Ok(removed)
    }

    pub async fn list_bundle_plugins(&self, bundle_path: &str) -> Result<Vec<String>> {
        let plugins = self.discovery.list_in_bundle(bundle_path)?;
        debug!("Bundle {} contains {} plugins", bundle_path, plugins.len());
        Ok(plugins)
    }

    /// Swap in a freshly scanned bundle mtime map and report whether
    /// anything was added, removed or modified since the previous poll.
    pub async fn refresh_bundles(&self, current: HashMap<PathBuf, SystemTime>) -> bool {
        let mut state = self.state.lock().await;
        let mut changed = false;

        for (path, modified) in &current {
            match state.bundles.get(path) {
                None => {
                    info!("New plugin bundle detected: {}", path.display());
                    changed = true;
                }
                Some(previous) if previous != modified => {
                    info!("Plugin bundle changed: {}", path.display());
                    changed = true;
                }
                Some(_) => {}
            }
        }
        for path in state.bundles.keys() {
            if !current.contains_key(path) {
                info!("Plugin bundle removed: {}", path.display());
                changed = true;
            }
        }

        state.bundles = current;
        changed
    }

    fn scan_catalog(&self) -> Result<HashMap<String, PluginInfo>> {
        let discovered = self.discovery.scan_all()?;

        let mut catalog = HashMap::new();
        for uri in discovered.keys() {
            match self.discovery.get_info(uri) {
                Ok(Some(info)) => match validator::validate(&info) {
                    Ok(()) => {
                        catalog.insert(uri.clone(), info);
                    }
                    Err(reason) => {
                        warn!("Plugin {} failed validation: {}", uri, reason);
                    }
                },
                Ok(None) => {
                    warn!("Failed to get detailed info for plugin {}", uri);
                }
                Err(e) => {
                    warn!("Failed to get detailed info for plugin {}: {}", uri, e);
                }
            }
        }
        Ok(catalog)
    }

    async fn ensure_known(&self, plugin_uri: &str) -> Result<()> {
        let state = self.state.lock().await;
        if state.catalog.contains_key(plugin_uri) {
            Ok(())
        } else {
            Err(BridgeError::PluginNotFound(plugin_uri.to_string()))
        }
    }
}

/// Opaque client-facing handle: `plugin_<live count>_<8 hex chars>`.
fn generate_instance_id(live_instances: usize) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("plugin_{}_{}", live_instances, &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_id_format() {
        let id = generate_instance_id(3);
        assert!(id.starts_with("plugin_3_"));
        let suffix = id.rsplit('_').next().unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_instance_ids_are_unique() {
        let a = generate_instance_id(0);
        let b = generate_instance_id(0);
        assert_ne!(a, b);
    }
}
