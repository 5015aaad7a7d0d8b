//! Thread-safe setters/getters for window length, filter parameters,
//! per-signal mode, trigger-digital flags, and output enable (`spec.md`
//! §2 / §5).
//!
//! Scalar config is stored as atomics (release/acquire) so a store from a
//! control thread takes effect no later than the next acquisition/publisher
//! tick, with no lock held across a tick boundary. Per-signal mode is a
//! `HashMap` behind a short-held mutex: the lock is only taken for the
//! single lookup/store, never across a tick.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::model::{FilterParams, SignalKey, SignalMode};

const MAX_WINDOW_SECONDS: f64 = 60.0;

pub struct ControlSurface {
    analog_rate_pct_bits: AtomicU32,
    digital_min_hold_sec_bits: AtomicU64,
    window_seconds_bits: AtomicU64,
    virtual_output_enabled: AtomicBool,
    trigger_left_digital: AtomicBool,
    trigger_right_digital: AtomicBool,
    signal_modes: Mutex<HashMap<SignalKey, SignalMode>>,
    last_status: Mutex<String>,
}

impl ControlSurface {
    pub fn new(default_params: FilterParams, default_window_seconds: f64) -> Self {
        Self {
            analog_rate_pct_bits: AtomicU32::new(default_params.analog_rate_pct.to_bits()),
            digital_min_hold_sec_bits: AtomicU64::new(default_params.digital_min_hold_sec.to_bits()),
            window_seconds_bits: AtomicU64::new(default_window_seconds.to_bits()),
            virtual_output_enabled: AtomicBool::new(false),
            trigger_left_digital: AtomicBool::new(false),
            trigger_right_digital: AtomicBool::new(false),
            signal_modes: Mutex::new(HashMap::new()),
            last_status: Mutex::new(String::new()),
        }
    }

    pub fn filter_params(&self) -> FilterParams {
        FilterParams {
            analog_rate_pct: f32::from_bits(self.analog_rate_pct_bits.load(Ordering::Acquire)),
            digital_min_hold_sec: f64::from_bits(self.digital_min_hold_sec_bits.load(Ordering::Acquire)),
        }
    }

    /// Out-of-range values are clamped, with a one-shot warning (`spec.md`
    /// §7 "Configuration out of range").
    pub fn set_analog_rate_pct(&self, pct: f32) {
        let clamped = pct.clamp(0.0, 100.0);
        if clamped != pct {
            tracing::warn!(requested = pct, clamped, "analog_rate_pct out of range, clamped");
        }
        self.analog_rate_pct_bits.store(clamped.to_bits(), Ordering::Release);
    }

    pub fn set_digital_min_hold_sec(&self, sec: f64) {
        let clamped = sec.max(0.0);
        if clamped != sec {
            tracing::warn!(requested = sec, clamped, "digital_min_hold_sec out of range, clamped");
        }
        self.digital_min_hold_sec_bits.store(clamped.to_bits(), Ordering::Release);
    }

    pub fn window_seconds(&self) -> f64 {
        f64::from_bits(self.window_seconds_bits.load(Ordering::Acquire))
    }

    pub fn set_window_seconds(&self, sec: f64) {
        let clamped = sec.clamp(0.0, MAX_WINDOW_SECONDS);
        if clamped != sec {
            tracing::warn!(requested = sec, clamped, "window_seconds out of range, clamped");
        }
        self.window_seconds_bits.store(clamped.to_bits(), Ordering::Release);
    }

    pub fn virtual_output_enabled(&self) -> bool {
        self.virtual_output_enabled.load(Ordering::Acquire)
    }

    pub fn set_virtual_output_enabled(&self, enabled: bool) {
        self.virtual_output_enabled.store(enabled, Ordering::Release);
    }

    pub fn trigger_left_digital(&self) -> bool {
        self.trigger_left_digital.load(Ordering::Acquire)
    }

    pub fn set_trigger_left_digital(&self, forced: bool) {
        self.trigger_left_digital.store(forced, Ordering::Release);
    }

    pub fn trigger_right_digital(&self) -> bool {
        self.trigger_right_digital.load(Ordering::Acquire)
    }

    pub fn set_trigger_right_digital(&self, forced: bool) {
        self.trigger_right_digital.store(forced, Ordering::Release);
    }

    pub fn signal_mode(&self, key: &SignalKey) -> SignalMode {
        self.signal_modes
            .lock()
            .expect("signal mode mutex poisoned")
            .get(key)
            .copied()
            .unwrap_or(SignalMode::None)
    }

    pub fn set_signal_mode(&self, key: SignalKey, mode: SignalMode) {
        self.signal_modes
            .lock()
            .expect("signal mode mutex poisoned")
            .insert(key, mode);
    }

    pub fn last_status(&self) -> String {
        self.last_status.lock().expect("status mutex poisoned").clone()
    }

    pub fn set_last_status(&self, status: impl Into<String>) {
        *self.last_status.lock().expect("status mutex poisoned") = status.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Device;

    #[test]
    fn defaults_round_trip() {
        let params = FilterParams { analog_rate_pct: 12.0, digital_min_hold_sec: 0.02 };
        let cs = ControlSurface::new(params, 5.0);
        assert_eq!(cs.filter_params(), params);
        assert_eq!(cs.window_seconds(), 5.0);
        assert!(!cs.virtual_output_enabled());
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let cs = ControlSurface::new(FilterParams::default(), 1.0);
        cs.set_analog_rate_pct(150.0);
        assert_eq!(cs.filter_params().analog_rate_pct, 100.0);
        cs.set_analog_rate_pct(-5.0);
        assert_eq!(cs.filter_params().analog_rate_pct, 0.0);
        cs.set_digital_min_hold_sec(-1.0);
        assert_eq!(cs.filter_params().digital_min_hold_sec, 0.0);
        cs.set_window_seconds(1000.0);
        assert_eq!(cs.window_seconds(), MAX_WINDOW_SECONDS);
    }

    #[test]
    fn per_signal_mode_defaults_to_none_and_is_hot_swappable() {
        let cs = ControlSurface::new(FilterParams::default(), 1.0);
        let key = SignalKey::new(Device::Stick, "joy_x");
        assert_eq!(cs.signal_mode(&key), SignalMode::None);
        cs.set_signal_mode(key.clone(), SignalMode::Analog);
        assert_eq!(cs.signal_mode(&key), SignalMode::Analog);
    }

    #[test]
    fn last_status_round_trips() {
        let cs = ControlSurface::new(FilterParams::default(), 1.0);
        assert_eq!(cs.last_status(), "");
        cs.set_last_status("NO_FREE_SLOT");
        assert_eq!(cs.last_status(), "NO_FREE_SLOT");
    }
}
