//! Command endpoint handler.
//!
//! Routes by the `action` field: `"plugin"` to the registry, `"audio"` to
//! the audio adapter, anything else down the legacy raw-command path. The
//! method surfaces are serde-tagged enums, so request decoding is derived
//! rather than hand-written.

use crate::audio::AudioSystem;
use crate::bus::RequestHandler;
use crate::engine::EngineClient;
use crate::error::Result;
use crate::plugins::PluginRegistry;
use crate::types::{PluginPreset, PluginSearchCriteria};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;

#[derive(Debug, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
enum PluginRequest {
    LoadPlugin {
        uri: String,
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
        #[serde(default)]
        parameters: HashMap<String, f64>,
    },
    UnloadPlugin {
        instance_id: String,
    },
    SetParameter {
        instance_id: String,
        parameter: String,
        value: f64,
    },
    GetParameter {
        instance_id: String,
        parameter: String,
    },
    GetPluginInfo {
        instance_id: String,
    },
    ListInstances,
    ClearAll,
    GetAvailablePlugins,
    SearchPlugins {
        #[serde(default)]
        query: String,
        #[serde(default)]
        criteria: Option<PluginSearchCriteria>,
    },
    GetPluginPresets {
        plugin_uri: String,
    },
    LoadPreset {
        plugin_uri: String,
        preset_uri: String,
    },
    SavePreset {
        plugin_uri: String,
        preset: PluginPreset,
    },
    RescanPlugins,
    ValidatePreset {
        plugin_uri: String,
        preset_uri: String,
    },
    RescanPresets {
        plugin_uri: String,
    },
    GetPluginGui {
        plugin_uri: String,
    },
    GetPluginGuiMini {
        plugin_uri: String,
    },
    GetPluginEssentials {
        plugin_uri: String,
    },
    IsBundleLoaded {
        bundle_path: String,
    },
    AddBundle {
        bundle_path: String,
    },
    RemoveBundle {
        bundle_path: String,
        #[serde(default)]
        resource_path: String,
    },
    ListBundlePlugins {
        bundle_path: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
enum AudioRequest {
    Init,
    Close,
    GetData {
        #[serde(default)]
        with_transport: bool,
    },
    GetBufferSize,
    SetBufferSize {
        size: u32,
    },
    GetSampleRate,
    GetPortAlias {
        port_name: String,
    },
    GetHardwarePorts {
        is_audio: bool,
        is_output: bool,
    },
    HasMidiBeatClockSenderPort,
    HasSerialMidiInputPort,
    HasSerialMidiOutputPort,
    HasMidiMergerOutputPort,
    HasMidiBroadcasterInputPort,
    HasDuoxSplitSpdif,
    ConnectPorts {
        port1: String,
        port2: String,
    },
    ConnectMidiOutputPorts {
        port: String,
    },
    DisconnectPorts {
        port1: String,
        port2: String,
    },
    DisconnectAllPorts {
        port: String,
    },
    ResetXruns,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LegacyRequest {
    Raw { command: String },
    Structured { name: String, args: Vec<String> },
}

pub struct CommandHandler {
    registry: Arc<PluginRegistry>,
    audio: Arc<dyn AudioSystem>,
    engine: EngineClient,
}

impl CommandHandler {
    pub fn new(
        registry: Arc<PluginRegistry>,
        audio: Arc<dyn AudioSystem>,
        engine: EngineClient,
    ) -> Self {
        Self {
            registry,
            audio,
            engine,
        }
    }

    async fn handle_plugin(&self, request: Value) -> Value {
        let request: PluginRequest = match serde_json::from_value(request) {
            Ok(request) => request,
            Err(e) => return json!({"error": format!("Plugin command failed: {e}")}),
        };
        match self.dispatch_plugin(request).await {
            Ok(response) => response,
            Err(e) => json!({"error": format!("Plugin command failed: {e}")}),
        }
    }

    async fn dispatch_plugin(&self, request: PluginRequest) -> Result<Value> {
        match request {
            PluginRequest::LoadPlugin {
                uri,
                x,
                y,
                parameters,
            } => {
                let instance = self.registry.load_plugin(uri, x, y, parameters).await?;
                Ok(json!({"instance_id": instance.instance_id, "plugin": instance}))
            }
            PluginRequest::UnloadPlugin { instance_id } => {
                self.registry.unload_plugin(&instance_id).await?;
                Ok(json!({"status": "ok", "instance_id": instance_id}))
            }
            PluginRequest::SetParameter {
                instance_id,
                parameter,
                value,
            } => {
                let value = self
                    .registry
                    .set_parameter(&instance_id, &parameter, value)
                    .await?;
                Ok(json!({"status": "ok", "value": value}))
            }
            PluginRequest::GetParameter {
                instance_id,
                parameter,
            } => {
                let value = self.registry.get_parameter(&instance_id, &parameter).await?;
                Ok(json!({"parameter": parameter, "value": value}))
            }
            PluginRequest::GetPluginInfo { instance_id } => {
                let instance = self.registry.get_plugin_info(&instance_id).await?;
                Ok(json!({"plugin": instance}))
            }
            PluginRequest::ListInstances => {
                let instances = self.registry.list_instances().await;
                Ok(json!({"instances": instances}))
            }
            PluginRequest::ClearAll => {
                self.registry.clear_all().await;
                Ok(json!({"status": "ok"}))
            }
            PluginRequest::GetAvailablePlugins => {
                let plugins = self.registry.get_available_plugins().await;
                Ok(json!({"plugins": plugins}))
            }
            PluginRequest::SearchPlugins { query, criteria } => {
                let plugins = self
                    .registry
                    .search_plugins(&query, criteria.as_ref())
                    .await;
                Ok(json!({"plugins": plugins}))
            }
            PluginRequest::GetPluginPresets { plugin_uri } => {
                let presets = self.registry.get_plugin_presets(&plugin_uri).await?;
                Ok(json!({"plugin_uri": plugin_uri, "presets": presets}))
            }
            PluginRequest::LoadPreset {
                plugin_uri,
                preset_uri,
            } => {
                self.registry.load_preset(&plugin_uri, &preset_uri).await?;
                Ok(json!({"status": "ok", "preset_uri": preset_uri}))
            }
            PluginRequest::SavePreset { plugin_uri, preset } => {
                self.registry.save_preset(&plugin_uri, &preset).await?;
                Ok(json!({"status": "ok", "preset_uri": preset.uri}))
            }
            PluginRequest::RescanPlugins => {
                let (added, removed) = self.registry.rescan_plugins().await?;
                Ok(json!({
                    "status": "ok",
                    "plugins_added": added,
                    "plugins_removed": removed,
                }))
            }
            PluginRequest::ValidatePreset {
                plugin_uri,
                preset_uri,
            } => {
                let is_valid = self.registry.validate_preset(&plugin_uri, &preset_uri).await?;
                Ok(json!({"is_valid": is_valid}))
            }
            PluginRequest::RescanPresets { plugin_uri } => {
                self.registry.rescan_presets(&plugin_uri).await?;
                Ok(json!({"status": "ok"}))
            }
            PluginRequest::GetPluginGui { plugin_uri } => {
                let gui = self.registry.get_plugin_gui(&plugin_uri).await?;
                Ok(json!({"plugin_uri": plugin_uri, "gui": gui}))
            }
            PluginRequest::GetPluginGuiMini { plugin_uri } => {
                let gui_mini = self.registry.get_plugin_gui_mini(&plugin_uri).await?;
                Ok(json!({"plugin_uri": plugin_uri, "gui_mini": gui_mini}))
            }
            PluginRequest::GetPluginEssentials { plugin_uri } => {
                let essentials = self.registry.get_plugin_essentials(&plugin_uri).await?;
                Ok(json!({"plugin_uri": plugin_uri, "essentials": essentials}))
            }
            PluginRequest::IsBundleLoaded { bundle_path } => {
                let is_loaded = self.registry.is_bundle_loaded(&bundle_path).await?;
                Ok(json!({"is_loaded": is_loaded}))
            }
            PluginRequest::AddBundle { bundle_path } => {
                let added = self.registry.add_bundle(&bundle_path).await?;
                Ok(json!({"added_plugins": added}))
            }
            PluginRequest::RemoveBundle {
                bundle_path,
                resource_path,
            } => {
                let removed = self
                    .registry
                    .remove_bundle(&bundle_path, &resource_path)
                    .await?;
                Ok(json!({"removed_plugins": removed}))
            }
            PluginRequest::ListBundlePlugins { bundle_path } => {
                let plugins = self.registry.list_bundle_plugins(&bundle_path).await?;
                Ok(json!({"plugins": plugins}))
            }
        }
    }

    async fn handle_audio(&self, request: Value) -> Value {
        let request: AudioRequest = match serde_json::from_value(request) {
            Ok(request) => request,
            Err(e) => return json!({"error": format!("Audio command failed: {e}")}),
        };
        match request {
            AudioRequest::Init => json!({"success": self.audio.init().await}),
            AudioRequest::Close => {
                self.audio.close().await;
                json!({"success": true})
            }
            AudioRequest::GetData { with_transport } => {
                json!({"data": self.audio.get_data(with_transport).await})
            }
            AudioRequest::GetBufferSize => {
                json!({"buffer_size": self.audio.buffer_size().await})
            }
            AudioRequest::SetBufferSize { size } => {
                json!({"buffer_size": self.audio.set_buffer_size(size).await})
            }
            AudioRequest::GetSampleRate => {
                json!({"sample_rate": self.audio.sample_rate().await})
            }
            AudioRequest::GetPortAlias { port_name } => {
                json!({"alias": self.audio.port_alias(&port_name).await})
            }
            AudioRequest::GetHardwarePorts { is_audio, is_output } => {
                json!({"ports": self.audio.hardware_ports(is_audio, is_output).await})
            }
            AudioRequest::HasMidiBeatClockSenderPort => {
                json!({"has_port": self.audio.has_midi_beat_clock_sender_port().await})
            }
            AudioRequest::HasSerialMidiInputPort => {
                json!({"has_port": self.audio.has_serial_midi_input_port().await})
            }
            AudioRequest::HasSerialMidiOutputPort => {
                json!({"has_port": self.audio.has_serial_midi_output_port().await})
            }
            AudioRequest::HasMidiMergerOutputPort => {
                json!({"has_port": self.audio.has_midi_merger_output_port().await})
            }
            AudioRequest::HasMidiBroadcasterInputPort => {
                json!({"has_port": self.audio.has_midi_broadcaster_input_port().await})
            }
            AudioRequest::HasDuoxSplitSpdif => {
                json!({"has_feature": self.audio.has_duox_split_spdif().await})
            }
            AudioRequest::ConnectPorts { port1, port2 } => {
                json!({"success": self.audio.connect_ports(&port1, &port2).await})
            }
            AudioRequest::ConnectMidiOutputPorts { port } => {
                json!({"success": self.audio.connect_midi_output_ports(&port).await})
            }
            AudioRequest::DisconnectPorts { port1, port2 } => {
                json!({"success": self.audio.disconnect_ports(&port1, &port2).await})
            }
            AudioRequest::DisconnectAllPorts { port } => {
                json!({"success": self.audio.disconnect_all_ports(&port).await})
            }
            AudioRequest::ResetXruns => {
                json!({"success": self.audio.reset_xruns().await})
            }
        }
    }

    async fn handle_legacy(&self, request: Value) -> Value {
        let request: LegacyRequest = match serde_json::from_value(request) {
            Ok(request) => request,
            Err(e) => {
                error!("Failed to parse command request: {}", e);
                return json!({"error": "Invalid request format"});
            }
        };

        let command = match request {
            LegacyRequest::Raw { command } => command,
            LegacyRequest::Structured { name, args } => {
                let mut command = name;
                for arg in &args {
                    command.push(' ');
                    command.push_str(arg);
                }
                command
            }
        };

        match self.engine.send(&command).await {
            Ok(raw) => json!({"status": raw, "raw": raw}),
            Err(_) => json!({"error": "Failed to communicate with mod-host"}),
        }
    }
}

#[async_trait]
impl RequestHandler for CommandHandler {
    async fn handle(&self, request: Value) -> Value {
        let action = request
            .get("action")
            .and_then(Value::as_str)
            .map(str::to_owned);
        match action.as_deref() {
            Some("plugin") => self.handle_plugin(request).await,
            Some("audio") => self.handle_audio(request).await,
            _ => self.handle_legacy(request).await,
        }
    }
}
