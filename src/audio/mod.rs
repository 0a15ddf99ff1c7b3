//! Audio system adapter boundary.
//!
//! The bridge does not own the audio graph; it queries and patches it
//! through this trait. The shipped implementation delegates port routing
//! through the engine command port, which is all mod-host needs for the
//! connect/disconnect surface.

use crate::engine::{parse_resp, EngineClient};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Transport and load snapshot of the audio system.
#[derive(Debug, Clone, Serialize)]
pub struct AudioSystemData {
    pub cpu_load: f64,
    pub xruns: u32,
    pub rolling: bool,
    pub bpb: f64,
    pub bpm: f64,
}

#[async_trait]
pub trait AudioSystem: Send + Sync {
    async fn init(&self) -> bool;
    async fn close(&self);

    async fn get_data(&self, with_transport: bool) -> Option<AudioSystemData>;
    async fn buffer_size(&self) -> u32;
    async fn set_buffer_size(&self, size: u32) -> u32;
    async fn sample_rate(&self) -> f32;
    async fn port_alias(&self, port_name: &str) -> String;
    async fn hardware_ports(&self, is_audio: bool, is_output: bool) -> Vec<String>;

    async fn has_midi_beat_clock_sender_port(&self) -> bool;
    async fn has_serial_midi_input_port(&self) -> bool;
    async fn has_serial_midi_output_port(&self) -> bool;
    async fn has_midi_merger_output_port(&self) -> bool;
    async fn has_midi_broadcaster_input_port(&self) -> bool;
    async fn has_duox_split_spdif(&self) -> bool;

    async fn connect_ports(&self, port1: &str, port2: &str) -> bool;
    async fn connect_midi_output_ports(&self, port: &str) -> bool;
    async fn disconnect_ports(&self, port1: &str, port2: &str) -> bool;
    async fn disconnect_all_ports(&self, port: &str) -> bool;
    async fn reset_xruns(&self) -> bool;
}

/// Adapter that routes port patching through the engine command port and
/// answers capability queries conservatively. Graph introspection (buffer
/// size, sample rate, hardware ports) needs a native audio API and reports
/// defaults here.
pub struct EngineAudio {
    engine: EngineClient,
    initialized: AtomicBool,
}

impl EngineAudio {
    pub fn new(engine: EngineClient) -> Self {
        Self {
            engine,
            initialized: AtomicBool::new(false),
        }
    }

    async fn port_command(&self, command: String) -> bool {
        match self.engine.send(&command).await {
            Ok(body) => match parse_resp(&body) {
                Ok(code) if code >= 0 => true,
                Ok(code) => {
                    warn!("Engine rejected {:?}: code {}", command, code);
                    false
                }
                Err(_) => {
                    warn!("Unparseable engine reply to {:?}: {:?}", command, body);
                    false
                }
            },
            Err(e) => {
                warn!("Engine command {:?} failed: {}", command, e);
                false
            }
        }
    }
}

#[async_trait]
impl AudioSystem for EngineAudio {
    async fn init(&self) -> bool {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return true;
        }
        info!("Audio adapter initialized (engine-delegated routing)");
        true
    }

    async fn close(&self) {
        if self.initialized.swap(false, Ordering::SeqCst) {
            info!("Audio adapter closed");
        }
    }

    async fn get_data(&self, _with_transport: bool) -> Option<AudioSystemData> {
        None
    }

    async fn buffer_size(&self) -> u32 {
        0
    }

    async fn set_buffer_size(&self, _size: u32) -> u32 {
        0
    }

    async fn sample_rate(&self) -> f32 {
        0.0
    }

    async fn port_alias(&self, _port_name: &str) -> String {
        String::new()
    }

    async fn hardware_ports(&self, _is_audio: bool, _is_output: bool) -> Vec<String> {
        Vec::new()
    }

    async fn has_midi_beat_clock_sender_port(&self) -> bool {
        false
    }

    async fn has_serial_midi_input_port(&self) -> bool {
        false
    }

    async fn has_serial_midi_output_port(&self) -> bool {
        false
    }

    async fn has_midi_merger_output_port(&self) -> bool {
        false
    }

    async fn has_midi_broadcaster_input_port(&self) -> bool {
        false
    }

    async fn has_duox_split_spdif(&self) -> bool {
        false
    }

    async fn connect_ports(&self, port1: &str, port2: &str) -> bool {
        self.port_command(format!("connect {port1} {port2}")).await
    }

    async fn connect_midi_output_ports(&self, port: &str) -> bool {
        warn!(
            "connect_midi_output_ports({}) requires a native audio API; not available",
            port
        );
        false
    }

    async fn disconnect_ports(&self, port1: &str, port2: &str) -> bool {
        self.port_command(format!("disconnect {port1} {port2}")).await
    }

    async fn disconnect_all_ports(&self, port: &str) -> bool {
        self.port_command(format!("disconnect_all {port}")).await
    }

    async fn reset_xruns(&self) -> bool {
        false
    }
}
