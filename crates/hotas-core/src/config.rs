//! Parses the bit-map and persisted mapping record formats consumed by the
//! core (`spec.md` §6). Loading the underlying CSV/JSON *files* is an
//! external collaborator's job (`spec.md` §1); this module only turns
//! already-deserialized records into the crate's internal types.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{
    Action, AxisId, ButtonId, Device, MappingEntry, SignalDescriptor, SignalKey, VK,
    DEFAULT_AXIS_DEADBAND,
};

/// Wire format for one bit-map row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitMapEntry {
    pub device: Device,
    pub id: String,
    pub display_name: String,
    pub bit_start: u16,
    pub bit_count: u8,
    pub analog: bool,
}

/// Validates and converts a parsed bit-map into the immutable descriptor
/// table, rejecting out-of-range bit counts and overlapping/duplicate
/// signals.
pub fn build_descriptors(entries: &[BitMapEntry]) -> Result<Vec<SignalDescriptor>, ConfigError> {
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        if !(1..=32).contains(&entry.bit_count) {
            return Err(ConfigError::InvalidBitCount { id: entry.id.clone(), bit_count: entry.bit_count });
        }
        let key = SignalKey::new(entry.device, entry.id.clone());
        if out.iter().any(|d: &SignalDescriptor| d.key == key) {
            return Err(ConfigError::DuplicateSignalKey(key.to_prefixed()));
        }
        let start = entry.bit_start;
        let end = entry.bit_start + entry.bit_count as u16;
        for existing in &out {
            let e: &SignalDescriptor = existing;
            if e.key.device != key.device {
                continue;
            }
            let e_start = e.bit_start;
            let e_end = e.bit_start + e.bit_count as u16;
            if start < e_end && e_start < end {
                return Err(ConfigError::OverlappingDescriptors {
                    id: key.to_prefixed(),
                    other: e.key.to_prefixed(),
                    start,
                    end,
                });
            }
        }
        out.push(SignalDescriptor {
            key,
            display_name: entry.display_name.clone(),
            bit_start: entry.bit_start,
            bit_count: entry.bit_count,
            analog: entry.analog,
        });
    }
    Ok(out)
}

/// Wire format for one persisted mapping record (`spec.md` §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedMapping {
    pub id: String,
    pub signal_id: String,
    pub action: String,
    pub priority: i32,
    #[serde(default)]
    pub deadband: Option<f32>,
}

/// Resolves a (possibly unprefixed, legacy) `signal_id` against the known
/// descriptor set. Returns the prefixed `"device:id"` form if the record
/// already carries a prefix, or if an unprefixed id resolves to exactly one
/// device; otherwise returns `None` (unmigrated).
fn migrate_signal_id(signal_id: &str, descriptors: &[SignalDescriptor]) -> Option<String> {
    if signal_id.contains(':') {
        return Some(signal_id.to_string());
    }
    let mut matches = descriptors.iter().filter(|d| d.key.id == signal_id);
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(format!("{}:{}", first.key.device.prefix(), signal_id))
    }
}

fn parse_signal_key(prefixed: &str) -> Option<SignalKey> {
    let (prefix, id) = prefixed.split_once(':')?;
    let device = Device::from_prefix(prefix)?;
    Some(SignalKey::new(device, id))
}

/// Well-known virtual-key names accepted in the `"keyboard:VK_*"` action
/// form. Not exhaustive; a host can extend the table by pre-normalizing
/// unrecognized names before calling [`parse_action`].
fn vk_from_name(name: &str) -> Option<VK> {
    Some(match name {
        "VK_SPACE" => 0x20,
        "VK_RETURN" | "VK_ENTER" => 0x0D,
        "VK_ESCAPE" => 0x1B,
        "VK_TAB" => 0x09,
        "VK_SHIFT" => 0x10,
        "VK_CONTROL" => 0x11,
        "VK_MENU" | "VK_ALT" => 0x12,
        "VK_LEFT" => 0x25,
        "VK_UP" => 0x26,
        "VK_RIGHT" => 0x27,
        "VK_DOWN" => 0x28,
        other => {
            if let Some(letter) = other.strip_prefix("VK_").filter(|s| s.len() == 1) {
                let c = letter.chars().next()?;
                if c.is_ascii_alphanumeric() {
                    return Some(c.to_ascii_uppercase() as VK);
                }
            }
            return None;
        }
    })
}

/// Parses the `action` field of a persisted mapping record.
pub fn parse_action(action: &str) -> Option<Action> {
    let (kind, rest) = action.split_once(':')?;
    match kind {
        "x360" => Some(match rest {
            "left_x" => Action::Axis(AxisId::LX),
            "left_y" => Action::Axis(AxisId::LY),
            "right_x" => Action::Axis(AxisId::RX),
            "right_y" => Action::Axis(AxisId::RY),
            "left_trigger" => Action::Axis(AxisId::LT),
            "right_trigger" => Action::Axis(AxisId::RT),
            "button_a" => Action::Button(ButtonId::A),
            "button_b" => Action::Button(ButtonId::B),
            "button_x" => Action::Button(ButtonId::X),
            "button_y" => Action::Button(ButtonId::Y),
            "left_bumper" => Action::Button(ButtonId::LB),
            "right_bumper" => Action::Button(ButtonId::RB),
            "start" => Action::Button(ButtonId::Start),
            "back" => Action::Button(ButtonId::Back),
            "left_stick" => Action::Button(ButtonId::L3),
            "right_stick" => Action::Button(ButtonId::R3),
            "dpad_up" => Action::Button(ButtonId::DPadUp),
            "dpad_down" => Action::Button(ButtonId::DPadDown),
            "dpad_left" => Action::Button(ButtonId::DPadLeft),
            "dpad_right" => Action::Button(ButtonId::DPadRight),
            _ => return None,
        }),
        "keyboard" => Some(Action::Key(vk_from_name(rest)?)),
        "mouse" => Some(Action::Mouse(crate::model::MouseOp(rest.to_string()))),
        _ => None,
    }
}

/// Converts one persisted record into a runtime [`MappingEntry`]. Returns
/// `None` (after logging a warning) if the signal id cannot be migrated or
/// the action string is unrecognized; the caller simply does not add such a
/// record to the [`crate::mapping::MappingTable`], which has the same
/// observable effect as `spec.md` §7's "mapping retained but inactive"
/// rule for an unknown signal.
pub fn to_mapping_entry(record: &PersistedMapping, descriptors: &[SignalDescriptor]) -> Option<MappingEntry> {
    let signal_id = match migrate_signal_id(&record.signal_id, descriptors) {
        Some(id) => id,
        None => {
            tracing::warn!(id = %record.id, signal_id = %record.signal_id, "could not migrate legacy signal_id; leaving unmigrated");
            return None;
        }
    };
    let signal_key = parse_signal_key(&signal_id)?;
    let action = match parse_action(&record.action) {
        Some(a) => a,
        None => {
            tracing::warn!(id = %record.id, action = %record.action, "unrecognized action string");
            return None;
        }
    };
    Some(MappingEntry {
        id: record.id.clone(),
        signal_key,
        action,
        priority: record.priority,
        deadband: record.deadband.unwrap_or(DEFAULT_AXIS_DEADBAND),
    })
}
