//! Event types published on the bus.
//!
//! Two families share the publish socket: feedback events mirrored from the
//! engine wire (flat objects tagged by `type`) and bridge lifecycle events
//! (wrapped in `{type, timestamp, data}` envelopes).

use serde::{Deserialize, Serialize};

/// One record from the engine feedback port, parsed into its typed form.
///
/// Serializes flat with a `type` tag matching the wire keyword, e.g.
/// `{"type":"param_set","effect_id":7,"symbol":"gain","value":0.25}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedbackEvent {
    ParamSet {
        effect_id: u32,
        symbol: String,
        value: f64,
    },
    OutputSet {
        effect_id: u32,
        symbol: String,
        value: f64,
    },
    AudioMonitor {
        index: u32,
        value: f64,
    },
    MidiMapped {
        effect_id: u32,
        symbol: String,
        channel: u32,
        controller: u32,
    },
    MidiControlChange {
        channel: u32,
        control: u32,
        value: u32,
    },
    MidiProgramChange {
        program: u32,
        channel: u32,
    },
    Transport {
        rolling: bool,
        bpb: f64,
        bpm: f64,
    },
    PatchSet {
        instance: u32,
        symbol: String,
        value: serde_json::Value,
    },
    Log {
        level: u32,
        message: String,
    },
    CpuLoad {
        load: f64,
        max_load: f64,
        xruns: u32,
    },
    DataFinish,
    CcMap {
        raw: String,
    },
    /// Anything the parser did not recognize, carried verbatim.
    Unknown {
        raw: String,
    },
}
