//! Catalog entry validation.
//!
//! Applied during the initial scan and every rescan. A rejected entry is
//! omitted from the catalog with a warning; it is never a hard error.

use crate::types::PluginInfo;
use tracing::warn;

/// URIs that crash or misbehave inside mod-host and must never be offered.
const KNOWN_INCOMPATIBLE: &[&str] = &[];

/// mod-host wires at most 8 audio channels per direction.
const MAX_AUDIO_PORTS: usize = 8;

/// Control values beyond this magnitude are suspicious but tolerated.
const EXTREME_RANGE: f64 = 1_000_000.0;

/// Check one catalog entry. Returns the rejection reason on failure.
pub fn validate(plugin: &PluginInfo) -> Result<(), String> {
    if KNOWN_INCOMPATIBLE.contains(&plugin.uri.as_str()) {
        return Err("plugin is known to be incompatible with mod-host".into());
    }

    let audio_inputs = plugin.ports.audio_inputs.len();
    let audio_outputs = plugin.ports.audio_outputs.len();

    if audio_inputs == 0 && audio_outputs == 0 {
        return Err("plugin has no audio ports".into());
    }
    if audio_inputs > MAX_AUDIO_PORTS {
        return Err(format!(
            "too many audio inputs: {audio_inputs} (max: {MAX_AUDIO_PORTS})"
        ));
    }
    if audio_outputs > MAX_AUDIO_PORTS {
        return Err(format!(
            "too many audio outputs: {audio_outputs} (max: {MAX_AUDIO_PORTS})"
        ));
    }

    for port in plugin
        .ports
        .control_inputs
        .iter()
        .chain(plugin.ports.control_outputs.iter())
    {
        if port.min_value > port.max_value {
            return Err(format!(
                "invalid parameter range for '{}': min > max",
                port.name
            ));
        }
        if port.min_value < -EXTREME_RANGE || port.max_value > EXTREME_RANGE {
            warn!(
                "Parameter '{}' of {} has extreme range [{}, {}]",
                port.name, plugin.uri, port.min_value, port.max_value
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PluginPort, PluginPorts};

    fn audio_port(index: u32) -> PluginPort {
        PluginPort {
            index,
            symbol: format!("audio_{index}"),
            name: format!("Audio {index}"),
            ..Default::default()
        }
    }

    fn plugin_with_audio(inputs: usize, outputs: usize) -> PluginInfo {
        PluginInfo {
            uri: "urn:example:fx".into(),
            name: "Fx".into(),
            ports: PluginPorts {
                audio_inputs: (0..inputs as u32).map(audio_port).collect(),
                audio_outputs: (0..outputs as u32).map(audio_port).collect(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_accepts_simple_stereo_plugin() {
        assert!(validate(&plugin_with_audio(2, 2)).is_ok());
    }

    #[test]
    fn test_accepts_generator_without_inputs() {
        assert!(validate(&plugin_with_audio(0, 1)).is_ok());
    }

    #[test]
    fn test_rejects_no_audio_ports() {
        let err = validate(&plugin_with_audio(0, 0)).unwrap_err();
        assert!(err.contains("no audio ports"));
    }

    #[test]
    fn test_rejects_too_many_ports() {
        let err = validate(&plugin_with_audio(9, 2)).unwrap_err();
        assert!(err.contains("audio inputs"));

        let err = validate(&plugin_with_audio(2, 9)).unwrap_err();
        assert!(err.contains("audio outputs"));

        assert!(validate(&plugin_with_audio(8, 8)).is_ok());
    }

    #[test]
    fn test_rejects_inverted_control_range() {
        let mut plugin = plugin_with_audio(1, 1);
        plugin.ports.control_inputs.push(PluginPort {
            index: 0,
            symbol: "gain".into(),
            name: "Gain".into(),
            min_value: 1.0,
            max_value: -1.0,
            ..Default::default()
        });
        let err = validate(&plugin).unwrap_err();
        assert!(err.contains("min > max"));
    }

    #[test]
    fn test_extreme_range_is_warning_only() {
        let mut plugin = plugin_with_audio(1, 1);
        plugin.ports.control_inputs.push(PluginPort {
            index: 0,
            symbol: "freq".into(),
            name: "Freq".into(),
            min_value: 0.0,
            max_value: 2_000_000.0,
            ..Default::default()
        });
        assert!(validate(&plugin).is_ok());
    }
}
