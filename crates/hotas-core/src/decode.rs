//! Applies a bit-map to a raw device report, normalizing known axis types
//! to a canonical logical range.

use crate::bits::extract_bits;
use crate::model::{SignalDescriptor, SignalKey};

/// One decoded `(signal_key, logical_value)` pair for a single tick.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSignal {
    pub key: SignalKey,
    pub value: f32,
}

/// Kind of normalization a descriptor's `id` implies. Determined purely from
/// the id string per `spec.md` §4.4; unknown ids fall back to `Raw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AxisKind {
    FullRangeJoystick,
    ThumbJoystick8Bit,
    ThrottleRail,
    Raw,
}

fn classify(id: &str) -> AxisKind {
    match id {
        "joy_x" | "joy_y" | "joy_z" => AxisKind::FullRangeJoystick,
        _ if id.starts_with("thumb_joy") => AxisKind::ThumbJoystick8Bit,
        _ if id.contains("throttle") && id.contains("rail") => AxisKind::ThrottleRail,
        _ => AxisKind::Raw,
    }
}

/// Decodes every descriptor against `report`, skipping (not aborting on) any
/// descriptor whose last bit index exceeds the report's available bits —
/// `spec.md` §7's "descriptor violation" case.
pub fn decode_report(descriptors: &[SignalDescriptor], report: &[u8]) -> Vec<DecodedSignal> {
    descriptors
        .iter()
        .filter_map(|d| decode_one(d, report).map(|value| DecodedSignal { key: d.key.clone(), value }))
        .collect()
}

fn decode_one(d: &SignalDescriptor, report: &[u8]) -> Option<f32> {
    let last_bit = d.bit_start as usize + d.bit_count as usize;
    let available_bits = report.len() * 8;
    if last_bit > available_bits {
        return None;
    }

    let raw = extract_bits(report, d.bit_start, d.bit_count);
    let max = if d.bit_count >= 64 { u64::MAX } else { (1u64 << d.bit_count) - 1 };

    let value = match classify(&d.key.id) {
        AxisKind::FullRangeJoystick => (raw as f32 / max as f32) * 2.0 - 1.0,
        AxisKind::ThumbJoystick8Bit => (raw as f32 / 255.0) * 2.0 - 1.0,
        AxisKind::ThrottleRail => raw as f32 / max as f32,
        AxisKind::Raw => {
            if d.analog {
                raw as f32
            } else if d.bit_count == 1 {
                if raw != 0 { 1.0 } else { 0.0 }
            } else {
                raw as f32
            }
        }
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Device;

    fn descriptor(id: &str, bit_start: u16, bit_count: u8, analog: bool) -> SignalDescriptor {
        SignalDescriptor {
            key: SignalKey::new(Device::Stick, id),
            display_name: id.to_string(),
            bit_start,
            bit_count,
            analog,
        }
    }

    #[test]
    fn full_range_joystick_normalizes_to_minus1_to_1() {
        let d = descriptor("joy_x", 0, 16, true);
        // raw = 0 -> -1.0, raw = max -> +1.0, raw = mid -> ~0.0
        assert_eq!(decode_one(&d, &[0x00, 0x00]), Some(-1.0));
        assert_eq!(decode_one(&d, &[0xFF, 0xFF]), Some(1.0));
    }

    #[test]
    fn thumb_joystick_uses_8_bit_max() {
        let d = descriptor("thumb_joy_x", 0, 8, true);
        assert_eq!(decode_one(&d, &[0x00]), Some(-1.0));
        assert_eq!(decode_one(&d, &[0xFF]), Some(1.0));
    }

    #[test]
    fn throttle_rail_normalizes_to_0_to_1() {
        let d = descriptor("throttle_rail_main", 0, 8, true);
        assert_eq!(decode_one(&d, &[0x00]), Some(0.0));
        assert_eq!(decode_one(&d, &[0xFF]), Some(1.0));
    }

    #[test]
    fn single_bit_digital_decodes_to_0_or_1() {
        let d = descriptor("button_fire", 0, 1, false);
        assert_eq!(decode_one(&d, &[0b0000_0001]), Some(1.0));
        assert_eq!(decode_one(&d, &[0b0000_0000]), Some(0.0));
    }

    #[test]
    fn multi_bit_digital_decodes_to_raw_integer() {
        let d = descriptor("hat", 0, 4, false);
        assert_eq!(decode_one(&d, &[0b0000_0101]), Some(5.0));
    }

    #[test]
    fn descriptor_exceeding_report_length_is_skipped() {
        let d = descriptor("joy_x", 8, 16, true);
        let report = [0x00u8; 2];
        assert_eq!(decode_one(&d, &report), None);
    }

    #[test]
    fn decode_report_skips_only_the_violating_descriptor() {
        let ok = descriptor("joy_x", 0, 8, true);
        let bad = descriptor("joy_y", 8, 16, true);
        let report = [0xFFu8; 2];
        let out = decode_report(&[ok, bad], &report);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].key.id, "joy_x");
    }
}
