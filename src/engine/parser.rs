//! Parser for the engine feedback wire format.
//!
//! Records are whitespace-separated tokens after a leading type keyword.
//! Parsing never fails: unrecognized keywords and malformed payloads both
//! degrade to [`FeedbackEvent::Unknown`] carrying the raw line.

use crate::events::FeedbackEvent;

/// Parse one NUL-delimited feedback record.
pub fn parse_feedback_line(line: &str) -> FeedbackEvent {
    parse_known(line).unwrap_or_else(|| FeedbackEvent::Unknown {
        raw: line.to_string(),
    })
}

fn parse_known(line: &str) -> Option<FeedbackEvent> {
    let (kind, rest) = take_token(line)?;

    match kind {
        "param_set" => {
            let (effect_id, rest) = take_u32(rest)?;
            let (symbol, rest) = take_token(rest)?;
            let (value, _) = take_f64(rest)?;
            Some(FeedbackEvent::ParamSet {
                effect_id,
                symbol: symbol.to_string(),
                value,
            })
        }
        "output_set" => {
            let (effect_id, rest) = take_u32(rest)?;
            let (symbol, rest) = take_token(rest)?;
            let (value, _) = take_f64(rest)?;
            Some(FeedbackEvent::OutputSet {
                effect_id,
                symbol: symbol.to_string(),
                value,
            })
        }
        "audio_monitor" => {
            let (index, rest) = take_u32(rest)?;
            let (value, _) = take_f64(rest)?;
            Some(FeedbackEvent::AudioMonitor { index, value })
        }
        "midi_mapped" => {
            let (effect_id, rest) = take_u32(rest)?;
            let (symbol, rest) = take_token(rest)?;
            let (channel, rest) = take_u32(rest)?;
            let (controller, _) = take_u32(rest)?;
            Some(FeedbackEvent::MidiMapped {
                effect_id,
                symbol: symbol.to_string(),
                channel,
                controller,
            })
        }
        "midi_control_change" => {
            let (channel, rest) = take_u32(rest)?;
            let (control, rest) = take_u32(rest)?;
            let (value, _) = take_u32(rest)?;
            Some(FeedbackEvent::MidiControlChange {
                channel,
                control,
                value,
            })
        }
        "midi_program_change" => {
            let (program, rest) = take_u32(rest)?;
            let (channel, _) = take_u32(rest)?;
            Some(FeedbackEvent::MidiProgramChange { program, channel })
        }
        "transport" => {
            let (rolling, rest) = take_u32(rest)?;
            let (bpb, rest) = take_f64(rest)?;
            let (bpm, _) = take_f64(rest)?;
            Some(FeedbackEvent::Transport {
                rolling: rolling != 0,
                bpb,
                bpm,
            })
        }
        "patch_set" => {
            let (instance, rest) = take_u32(rest)?;
            let (symbol, rest) = take_token(rest)?;
            let value = serde_json::from_str(rest_of_line(rest)).ok()?;
            Some(FeedbackEvent::PatchSet {
                instance,
                symbol: symbol.to_string(),
                value,
            })
        }
        "log" => {
            let (level, rest) = take_u32(rest)?;
            Some(FeedbackEvent::Log {
                level,
                message: rest_of_line(rest).to_string(),
            })
        }
        "cpu_load" => {
            let (load, rest) = take_f64(rest)?;
            let (max_load, rest) = take_f64(rest)?;
            let (xruns, _) = take_u32(rest)?;
            Some(FeedbackEvent::CpuLoad {
                load,
                max_load,
                xruns,
            })
        }
        "data_finish" => Some(FeedbackEvent::DataFinish),
        "cc_map" => Some(FeedbackEvent::CcMap {
            raw: rest_of_line(rest).to_string(),
        }),
        _ => None,
    }
}

/// Split off the next whitespace-delimited token; the remainder keeps its
/// leading separator so rest-of-line payloads stay intact.
fn take_token(input: &str) -> Option<(&str, &str)> {
    let trimmed = input.trim_start();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.find(char::is_whitespace) {
        Some(end) => Some((&trimmed[..end], &trimmed[end..])),
        None => Some((trimmed, "")),
    }
}

fn take_u32(input: &str) -> Option<(u32, &str)> {
    let (token, rest) = take_token(input)?;
    Some((token.parse().ok()?, rest))
}

fn take_f64(input: &str) -> Option<(f64, &str)> {
    let (token, rest) = take_token(input)?;
    Some((token.parse().ok()?, rest))
}

/// Remainder after fixed tokens, with the single separating space removed.
fn rest_of_line(rest: &str) -> &str {
    rest.strip_prefix(' ').unwrap_or(rest)
}
