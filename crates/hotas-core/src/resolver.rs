//! Groups mappings by output target and resolves one value per output per
//! publisher tick (`spec.md` §4.7).

use std::collections::HashMap;

use crate::model::{Action, AxisId, ButtonId, MappingEntry, MouseOp, SignalKey, VK};

/// The magnitude threshold used by key/mouse OR-aggregation; distinct from
/// (and smaller than) the per-mapping axis deadband.
pub(crate) const KEY_MOUSE_THRESHOLD: f32 = 0.01;
const BUTTON_THRESHOLD: f32 = 0.5;

/// The resolved state of every mapped output for one tick. `mouse` carries
/// the signed sampled magnitude (not just a down/up flag) so the publisher
/// can dispatch motion-type ops with a real delta (`spec.md` §4.8).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ResolvedOutputs {
    pub axes: HashMap<AxisId, f32>,
    pub buttons: HashMap<ButtonId, bool>,
    pub keys: HashMap<VK, bool>,
    pub mouse: HashMap<MouseOp, f32>,
}

/// Orders mappings within a group: priority descending, ties broken by id
/// lexicographic order for determinism.
fn sort_group(group: &mut [&MappingEntry]) {
    group.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
}

/// Resolves `mappings` against the current per-signal values returned by
/// `signal_value` (which should return `0.0` for a signal not yet sampled,
/// per `spec.md` §4.7 step 1).
pub fn resolve(mappings: &[MappingEntry], signal_value: impl Fn(&SignalKey) -> f32) -> ResolvedOutputs {
    let mut axis_groups: HashMap<AxisId, Vec<&MappingEntry>> = HashMap::new();
    let mut button_groups: HashMap<ButtonId, Vec<&MappingEntry>> = HashMap::new();
    let mut key_groups: HashMap<VK, Vec<&MappingEntry>> = HashMap::new();
    let mut mouse_groups: HashMap<MouseOp, Vec<&MappingEntry>> = HashMap::new();

    for m in mappings {
        match &m.action {
            Action::Axis(a) => axis_groups.entry(*a).or_default().push(m),
            Action::Button(b) => button_groups.entry(*b).or_default().push(m),
            Action::Key(vk) => key_groups.entry(*vk).or_default().push(m),
            Action::Mouse(op) => mouse_groups.entry(op.clone()).or_default().push(m),
        }
    }

    let mut out = ResolvedOutputs::default();

    for (axis, mut group) in axis_groups {
        sort_group(&mut group);
        out.axes.insert(axis, resolve_axis(&group, &signal_value));
    }

    for (button, group) in button_groups {
        let pressed = group.iter().any(|m| signal_value(&m.signal_key) > BUTTON_THRESHOLD);
        out.buttons.insert(button, pressed);
    }

    for (vk, group) in key_groups {
        let down = group.iter().any(|m| signal_value(&m.signal_key).abs() > KEY_MOUSE_THRESHOLD);
        out.keys.insert(vk, down);
    }

    for (op, group) in mouse_groups {
        let magnitude = group
            .iter()
            .map(|m| signal_value(&m.signal_key))
            .fold(0.0f32, |best, v| if v.abs() > best.abs() { v } else { best });
        out.mouse.insert(op, magnitude);
    }

    out
}

fn resolve_axis(group: &[&MappingEntry], signal_value: &impl Fn(&SignalKey) -> f32) -> f32 {
    for m in group {
        let v = signal_value(&m.signal_key);
        if v.abs() > m.deadband {
            return v;
        }
    }
    group
        .iter()
        .map(|m| signal_value(&m.signal_key))
        .fold(0.0f32, |best, v| if v.abs() > best.abs() { v } else { best })
}
