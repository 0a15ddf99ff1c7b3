//! Data model for the plugin catalog and loaded instances.
//!
//! All bus-visible types derive serde so the JSON surface is a mechanical
//! mapping of the structs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginAuthor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub homepage: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginUnits {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginScalePoint {
    pub value: f64,
    pub label: String,
}

/// One port of a plugin, as reported by the discovery library.
///
/// Value range fields are meaningful for control and CV ports only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginPort {
    pub index: u32,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub designation: String,
    #[serde(default)]
    pub min_value: f64,
    #[serde(default)]
    pub max_value: f64,
    #[serde(default)]
    pub default_value: f64,
    #[serde(default)]
    pub units: PluginUnits,
    #[serde(default)]
    pub properties: Vec<String>,
    #[serde(default)]
    pub scale_points: Vec<PluginScalePoint>,
}

/// Ports grouped by direction and kind, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginPorts {
    #[serde(default)]
    pub audio_inputs: Vec<PluginPort>,
    #[serde(default)]
    pub audio_outputs: Vec<PluginPort>,
    #[serde(default)]
    pub control_inputs: Vec<PluginPort>,
    #[serde(default)]
    pub control_outputs: Vec<PluginPort>,
    #[serde(default)]
    pub cv_inputs: Vec<PluginPort>,
    #[serde(default)]
    pub cv_outputs: Vec<PluginPort>,
    #[serde(default)]
    pub midi_inputs: Vec<PluginPort>,
    #[serde(default)]
    pub midi_outputs: Vec<PluginPort>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginPreset {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub path: String,
}

/// One available plugin in the catalog, keyed by URI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub category: Vec<String>,
    #[serde(default)]
    pub author: PluginAuthor,
    #[serde(default)]
    pub ports: PluginPorts,
    #[serde(default)]
    pub presets: Vec<PluginPreset>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginGuiPort {
    pub valid: bool,
    pub index: u32,
    pub name: String,
    pub symbol: String,
}

/// Full GUI description blob for a plugin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginGui {
    #[serde(default)]
    pub resources_directory: String,
    #[serde(default)]
    pub icon_template: String,
    #[serde(default)]
    pub settings_template: String,
    #[serde(default)]
    pub javascript: String,
    #[serde(default)]
    pub stylesheet: String,
    #[serde(default)]
    pub screenshot: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub discussion_url: String,
    #[serde(default)]
    pub documentation: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub panel: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub knob: String,
    #[serde(default)]
    pub ports: Vec<PluginGuiPort>,
    #[serde(default)]
    pub monitored_outputs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginGuiMini {
    #[serde(default)]
    pub resources_directory: String,
    #[serde(default)]
    pub screenshot: String,
    #[serde(default)]
    pub thumbnail: String,
}

/// A parameter exposed through the patch interface (as opposed to a
/// control port).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginParameter {
    pub valid: bool,
    pub readable: bool,
    pub writable: bool,
    pub uri: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub ranges: serde_json::Value,
    #[serde(default)]
    pub units: PluginUnits,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub file_types: Vec<String>,
    #[serde(default)]
    pub supported_extensions: Vec<String>,
}

/// Reduced catalog record for hosts that only drive the control surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginEssentials {
    #[serde(default)]
    pub control_inputs: Vec<PluginPort>,
    #[serde(default)]
    pub monitored_outputs: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<PluginParameter>,
    #[serde(default)]
    pub build_environment: String,
    #[serde(default)]
    pub micro_version: i32,
    #[serde(default)]
    pub minor_version: i32,
    #[serde(default)]
    pub release: i32,
    #[serde(default)]
    pub builder: i32,
}

/// One loaded plugin inside the engine.
///
/// `instance_id` is the opaque client-facing handle; `engine_instance` is
/// the numeric slot confirmed by mod-host on `add`. Both are unique for the
/// process lifetime and map 1:1.
#[derive(Debug, Clone, Serialize)]
pub struct PluginInstance {
    pub instance_id: String,
    pub engine_instance: i32,
    pub uri: String,
    pub name: String,
    pub brand: String,
    pub version: String,
    pub parameters: HashMap<String, f64>,
    pub ports: PluginPorts,
    pub x: f64,
    pub y: f64,
    pub enabled: bool,
    pub preset: String,
    pub created_at: DateTime<Utc>,
}

/// Search filter. Unset fields are wildcards; string matching is
/// case-insensitive substring.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginSearchCriteria {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub min_audio_inputs: Option<i32>,
    #[serde(default)]
    pub min_audio_outputs: Option<i32>,
    #[serde(default)]
    pub max_audio_inputs: Option<i32>,
    #[serde(default)]
    pub max_audio_outputs: Option<i32>,
    #[serde(default)]
    pub has_parameter: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_info_roundtrip() {
        let info = PluginInfo {
            uri: "urn:example:chorus".into(),
            name: "Chorus".into(),
            category: vec!["Modulator".into()],
            ..Default::default()
        };
        let json = serde_json::to_string(&info).unwrap();
        let back: PluginInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);
    }

    #[test]
    fn test_plugin_info_accepts_sparse_json() {
        let back: PluginInfo =
            serde_json::from_str(r#"{"uri":"urn:example:eq","name":"EQ"}"#).unwrap();
        assert_eq!(back.uri, "urn:example:eq");
        assert!(back.ports.audio_inputs.is_empty());
        assert!(back.category.is_empty());
    }

    #[test]
    fn test_search_criteria_partial_json() {
        let criteria: PluginSearchCriteria =
            serde_json::from_str(r#"{"category":"rev","min_audio_inputs":2}"#).unwrap();
        assert_eq!(criteria.category, "rev");
        assert_eq!(criteria.min_audio_inputs, Some(2));
        assert_eq!(criteria.max_audio_inputs, None);
        assert!(criteria.author.is_empty());
    }

    #[test]
    fn test_parameter_type_field_rename() {
        let param: PluginParameter = serde_json::from_str(
            r#"{"valid":true,"readable":true,"writable":false,"uri":"urn:p","type":"path"}"#,
        )
        .unwrap();
        assert_eq!(param.kind, "path");
        let json = serde_json::to_value(&param).unwrap();
        assert_eq!(json["type"], "path");
    }
}
