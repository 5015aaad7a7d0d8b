//! Builds the virtual-gamepad report, maintains keyboard auto-repeat state,
//! and dispatches mouse ops (`spec.md` §4.8).

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::PublishError;
use crate::model::{AxisId, ButtonId, KeyRepeatState, MouseOp, PadReport, VK};
use crate::ports::{SyntheticInput, VirtualPad};
use crate::resolver::ResolvedOutputs;

/// `Disabled -> Enabling -> Enabled -> Disabling -> Disabled` (`spec.md`
/// §4.8's virtual-output enable state machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputEnableState {
    Disabled,
    Enabling,
    Enabled,
    Disabling,
}

/// Maps a virtual key to the scan code / extended-key flag a host's
/// `SyntheticInput` expects. The concrete OS scan-code table lives outside
/// this crate (`spec.md` §1 names OS input injection as an external
/// collaborator); the default identity mapping is a placeholder a host
/// wires a real table into via [`Publisher::with_scan_code_lookup`].
pub type ScanCodeLookup = Box<dyn Fn(VK) -> (u16, bool) + Send + Sync>;

fn identity_scan_code_lookup() -> ScanCodeLookup {
    Box::new(|vk: VK| (vk as u16, false))
}

/// Converts a logical axis value in `[-1, 1]` to the little-endian `i16`
/// wire encoding: `v >= 0 ? v*32767 : v*32768`, clamped.
pub fn axis_to_i16(v: f32) -> i16 {
    let v = v.clamp(-1.0, 1.0);
    let raw = if v >= 0.0 { v * 32767.0 } else { v * 32768.0 };
    raw.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Converts a logical trigger value in `[0, 1]` to the wire `u8` encoding.
pub fn trigger_to_u8(v: f32) -> u8 {
    let v = v.clamp(0.0, 1.0);
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Assembles a [`PadReport`] from resolved axis/button outputs. `ly`/`ry`
/// are inverted before conversion (report convention is opposite to the
/// logical "up = positive" convention used everywhere else).
pub fn build_pad_report(resolved: &ResolvedOutputs) -> PadReport {
    let axis = |id: AxisId| resolved.axes.get(&id).copied().unwrap_or(0.0);

    let mut buttons = 0u16;
    for (&button, &pressed) in &resolved.buttons {
        if pressed {
            buttons |= 1 << button.bit();
        }
    }

    PadReport {
        buttons,
        lt: trigger_to_u8(axis(AxisId::LT)),
        rt: trigger_to_u8(axis(AxisId::RT)),
        lx: axis_to_i16(axis(AxisId::LX)),
        ly: axis_to_i16(-axis(AxisId::LY)),
        rx: axis_to_i16(axis(AxisId::RX)),
        ry: axis_to_i16(-axis(AxisId::RY)),
    }
}

/// Returns true if `op` names a click-type (edge-triggered) mouse
/// operation rather than a continuous motion-type one. The full op
/// catalogue is external to the core (`spec.md` §4.8); this crate only
/// needs to tell the two shapes apart, which it does from the token's
/// naming convention (`"mouse:left_click"` vs. `"mouse:move_x"`, per the
/// persisted-record examples in `spec.md` §6).
fn is_click_op(op: &MouseOp) -> bool {
    op.0.contains("click")
}

pub struct Publisher<P, S> {
    pad: Arc<P>,
    synth: Arc<S>,
    key_repeat: HashMap<VK, KeyRepeatState>,
    mouse_prev_down: HashMap<MouseOp, bool>,
    repeat_timing_queried: bool,
    initial_delay_sec: f64,
    interval_sec: f64,
    output_state: OutputEnableState,
    scan_code_lookup: ScanCodeLookup,
}

impl<P: VirtualPad, S: SyntheticInput> Publisher<P, S> {
    pub fn new(pad: Arc<P>, synth: Arc<S>) -> Self {
        Self {
            pad,
            synth,
            key_repeat: HashMap::new(),
            mouse_prev_down: HashMap::new(),
            repeat_timing_queried: false,
            initial_delay_sec: 0.0,
            interval_sec: 0.0,
            output_state: OutputEnableState::Disabled,
            scan_code_lookup: identity_scan_code_lookup(),
        }
    }

    pub fn with_scan_code_lookup(mut self, lookup: ScanCodeLookup) -> Self {
        self.scan_code_lookup = lookup;
        self
    }

    pub fn output_state(&self) -> OutputEnableState {
        self.output_state
    }

    fn ensure_repeat_timing_queried(&mut self) {
        if !self.repeat_timing_queried {
            let (initial_delay_ms, interval_ms) = self.synth.query_key_repeat();
            self.initial_delay_sec = initial_delay_ms / 1000.0;
            self.interval_sec = interval_ms / 1000.0;
            self.repeat_timing_queried = true;
        }
    }

    /// Performs the `Disabled -> Enabling -> Enabled` (or back to
    /// `Disabled` on failure) transition: re-plugs the virtual target and
    /// emits one neutral report to force host enumeration.
    pub fn enable(&mut self) -> Result<(), String> {
        self.output_state = OutputEnableState::Enabling;
        let _ = self.pad.unplug_target();
        if let Err(e) = self.pad.connect().and_then(|_| self.pad.plug_target()) {
            self.output_state = OutputEnableState::Disabled;
            return Err(e);
        }
        if let Err(e) = self.pad.update(PadReport::default()) {
            self.output_state = OutputEnableState::Disabled;
            return Err(e);
        }
        self.output_state = OutputEnableState::Enabled;
        Ok(())
    }

    /// Releases all pressed keys, neutralizes the pad, then disconnects.
    pub fn disable(&mut self) {
        self.output_state = OutputEnableState::Disabling;
        self.release_all_keys();
        let _ = self.pad.update(PadReport::default());
        let _ = self.pad.unplug_target();
        self.pad.disconnect();
        self.output_state = OutputEnableState::Disabled;
    }

    fn release_all_keys(&mut self) {
        let pressed: Vec<VK> = self
            .key_repeat
            .iter()
            .filter(|(_, s)| s.pressed)
            .map(|(vk, _)| *vk)
            .collect();
        for vk in pressed {
            let (scan, ext) = (self.scan_code_lookup)(vk);
            let _ = self.synth.key(vk, false, ext, scan);
            if let Some(s) = self.key_repeat.get_mut(&vk) {
                s.pressed = false;
            }
        }
    }

    /// Publishes one tick: builds and sends the pad report (if output is
    /// enabled and the backend is ready), then drives keyboard auto-repeat
    /// and mouse dispatch from `resolved`. Transient publish errors are
    /// captured and returned but never torn down the pipeline.
    pub fn publish_tick(&mut self, now: f64, resolved: &ResolvedOutputs) -> Option<PublishError> {
        let mut last_error = None;

        if self.output_state == OutputEnableState::Enabled && self.pad.ready() {
            let report = build_pad_report(resolved);
            if let Err(e) = self.pad.update(report) {
                last_error = Some(PublishError::new("pad.update", e));
            }
        }

        self.dispatch_keys(now, resolved);
        self.dispatch_mouse(resolved);

        last_error
    }

    fn dispatch_keys(&mut self, now: f64, resolved: &ResolvedOutputs) {
        self.ensure_repeat_timing_queried();

        for (&vk, &down) in &resolved.keys {
            let state = self.key_repeat.entry(vk).or_insert(KeyRepeatState {
                pressed: false,
                vk,
                press_time: 0.0,
                next_repeat: 0.0,
            });
            let (scan, ext) = (self.scan_code_lookup)(vk);

            if down {
                if !state.pressed {
                    let _ = self.synth.key(vk, true, ext, scan);
                    state.pressed = true;
                    state.press_time = now;
                    state.next_repeat = now + self.initial_delay_sec;
                } else if now >= state.next_repeat {
                    let _ = self.synth.key(vk, true, ext, scan);
                    state.next_repeat = now + self.interval_sec;
                }
            } else if state.pressed {
                let _ = self.synth.key(vk, false, ext, scan);
                state.pressed = false;
            }
        }

        let stale: Vec<VK> = self
            .key_repeat
            .iter()
            .filter(|(vk, s)| s.pressed && !resolved.keys.contains_key(vk))
            .map(|(vk, _)| *vk)
            .collect();
        for vk in stale {
            let (scan, ext) = (self.scan_code_lookup)(vk);
            let _ = self.synth.key(vk, false, ext, scan);
            if let Some(s) = self.key_repeat.get_mut(&vk) {
                s.pressed = false;
            }
        }
    }

    fn dispatch_mouse(&mut self, resolved: &ResolvedOutputs) {
        for (op, &magnitude) in &resolved.mouse {
            let down = magnitude.abs() > crate::resolver::KEY_MOUSE_THRESHOLD;
            if is_click_op(op) {
                let was_down = self.mouse_prev_down.get(op).copied().unwrap_or(false);
                if down && !was_down {
                    let _ = self.synth.mouse(&op.0, magnitude);
                }
            } else if down {
                // Motion-type ops dispatch every tick they're active, scaled
                // by the sampled magnitude (`spec.md` §4.8).
                let _ = self.synth.mouse(&op.0, magnitude);
            }
            self.mouse_prev_down.insert(op.clone(), down);
        }
    }
}
