//! Per-signal filter state machine: none / analog rate-limit / digital-gated
//! / multi-bit-discrete-gated (`spec.md` §4.5).

use crate::model::{FilterParams, FilterState, SignalMode};

/// The analog rate limiter's step cap is `(analog_rate_pct / 100) * range`.
/// `spec.md` §4.5 resolves the range to a constant `2.0` for every analog
/// signal (see `SPEC_FULL.md` / `DESIGN.md` for the open-question
/// resolution), rather than varying it between `[0,1]` trigger rails and
/// `[-1,1]` stick axes.
const ANALOG_RANGE: f32 = 2.0;

/// Applies one tick of filtering to `state` in place and returns the
/// filtered output value.
///
/// `force_binary` overrides `mode` entirely: a trigger forced into
/// binary-digital mode skips analog rate limiting (and the `None`
/// passthrough) regardless of its configured `SignalMode`, thresholds at
/// `>= 0.5`, then runs the pending/promoted gate (`spec.md` §4.5, "Triggers
/// may be forced into binary-digital mode by a per-trigger flag"). Absent
/// that override, `bit_count` selects the digital variant: a 1-bit signal
/// uses the pending/promoted gate, a wider digital signal (e.g. a 4-bit hat)
/// uses the value-change gate.
pub fn apply(
    state: &mut FilterState,
    mode: SignalMode,
    bit_count: u8,
    force_binary: bool,
    params: &FilterParams,
    t: f64,
    raw: f32,
) -> f32 {
    if force_binary {
        let thresholded = if raw >= 0.5 { 1.0 } else { 0.0 };
        return apply_digital_binary(state, params, t, thresholded);
    }

    match mode {
        SignalMode::None => {
            state.prev_raw = raw;
            state.initialized = true;
            raw
        }
        SignalMode::Analog => apply_analog(state, params, raw),
        SignalMode::Digital => {
            if bit_count <= 1 {
                apply_digital_binary(state, params, t, raw)
            } else {
                apply_multi_bit_discrete(state, params, t, raw)
            }
        }
    }
}

fn apply_analog(state: &mut FilterState, params: &FilterParams, raw: f32) -> f32 {
    if !state.initialized {
        state.prev_filtered = raw;
        state.prev_raw = raw;
        state.initialized = true;
        return raw;
    }

    let max_step = (params.analog_rate_pct / 100.0) * ANALOG_RANGE;
    let dv = raw - state.prev_filtered;
    let output = if dv > max_step {
        state.prev_filtered + max_step
    } else if dv < -max_step {
        state.prev_filtered - max_step
    } else {
        raw
    };

    state.prev_filtered = output;
    state.prev_raw = raw;
    output
}

fn apply_digital_binary(state: &mut FilterState, params: &FilterParams, t: f64, raw: f32) -> f32 {
    let now_hi = raw > 0.0;
    let prev_hi = state.prev_raw > 0.0;

    if now_hi && !prev_hi {
        state.rise_time = Some(t);
        state.active = false;
    } else if now_hi && prev_hi {
        if !state.active {
            if let Some(rise) = state.rise_time {
                if t - rise >= params.digital_min_hold_sec {
                    state.active = true;
                }
            }
        }
    } else if !now_hi && prev_hi {
        state.active = false;
        state.rise_time = None;
    } else {
        state.rise_time = None;
        state.active = false;
    }

    state.prev_raw = raw;
    state.initialized = true;
    if state.active {
        1.0
    } else {
        0.0
    }
}

fn apply_multi_bit_discrete(state: &mut FilterState, params: &FilterParams, t: f64, raw: f32) -> f32 {
    if !state.initialized {
        state.prev_filtered = raw;
        state.pending_value = raw;
        state.promoted_value = raw;
        state.rise_time = None;
        state.prev_raw = raw;
        state.initialized = true;
        return raw;
    }

    let output = if raw != state.prev_raw {
        state.rise_time = Some(t);
        state.pending_value = raw;
        state.prev_filtered
    } else if state.rise_time.is_some_and(|rt| t - rt >= params.digital_min_hold_sec)
        && state.pending_value == raw
        && raw != state.prev_filtered
    {
        state.prev_filtered = raw;
        state.promoted_value = raw;
        state.rise_time = None;
        raw
    } else {
        state.prev_filtered
    };

    state.prev_raw = raw;
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn params(analog_rate_pct: f32, digital_min_hold_sec: f64) -> FilterParams {
        FilterParams { analog_rate_pct, digital_min_hold_sec }
    }

    #[test]
    fn none_mode_passes_through_and_tracks_prev_raw() {
        let mut state = FilterState::default();
        let p = params(10.0, 0.0);
        assert_eq!(apply(&mut state, SignalMode::None, 1, false, &p, 0.0, 0.7), 0.7);
        assert_eq!(state.prev_raw, 0.7);
    }

    #[test]
    fn constant_input_is_unchanged_after_init_for_every_mode() {
        let p = params(10.0, 0.005);

        let mut s = FilterState::default();
        apply(&mut s, SignalMode::Analog, 16, false, &p, 0.0, 0.5);
        for i in 1..5 {
            assert_eq!(apply(&mut s, SignalMode::Analog, 16, false, &p, i as f64, 0.5), 0.5);
        }

        let mut s = FilterState::default();
        apply(&mut s, SignalMode::Digital, 4, false, &p, 0.0, 3.0);
        for i in 1..5 {
            let t = i as f64 * 0.01;
            assert_eq!(apply(&mut s, SignalMode::Digital, 4, false, &p, t, 3.0), 3.0);
        }
    }

    // S3 — Axis rate limit.
    #[test]
    fn scenario_s3_axis_rate_limit() {
        let mut state = FilterState::default();
        let p = params(10.0, 0.0);
        let inputs = [0.00f32, 0.50, 0.55, 0.10];
        let expected = [0.00f32, 0.20, 0.40, 0.20];
        for (i, (&raw, &exp)) in inputs.iter().zip(expected.iter()).enumerate() {
            let out = apply(&mut state, SignalMode::Analog, 16, false, &p, i as f64, raw);
            assert!((out - exp).abs() < 1e-6, "tick {i}: got {out}, want {exp}");
        }
    }

    #[test]
    fn analog_rate_limit_never_exceeds_max_step() {
        let p = params(5.0, 0.0);
        let max_step = 0.05 * ANALOG_RANGE;
        let mut state = FilterState::default();
        let mut prev_out = apply(&mut state, SignalMode::Analog, 16, false, &p, 0.0, -1.0);
        for (i, raw) in [1.0f32, -1.0, 1.0, -1.0, 0.3].into_iter().enumerate() {
            let out = apply(&mut state, SignalMode::Analog, 16, false, &p, (i + 1) as f64, raw);
            assert!((out - prev_out).abs() <= max_step + 1e-6);
            prev_out = out;
        }
    }

    // S1 — Ghost-press rejection.
    #[test]
    fn scenario_s1_ghost_press_rejected() {
        let mut state = FilterState::default();
        let p = params(0.0, 0.005);
        let inputs = [(0.000, 0.0f32), (0.001, 1.0), (0.003, 0.0), (0.010, 0.0)];
        let expected = [0.0f32, 0.0, 0.0, 0.0];
        for ((t, raw), exp) in inputs.iter().zip(expected.iter()) {
            let out = apply(&mut state, SignalMode::Digital, 1, false, &p, *t, *raw);
            assert_eq!(out, *exp);
        }
    }

    // S2 — Legitimate press.
    #[test]
    fn scenario_s2_legitimate_press() {
        let mut state = FilterState::default();
        let p = params(0.0, 0.005);
        let inputs = [
            (0.000, 0.0f32),
            (0.001, 1.0),
            (0.006, 1.0),
            (0.020, 1.0),
            (0.021, 0.0),
        ];
        let expected = [0.0f32, 0.0, 1.0, 1.0, 0.0];
        for ((t, raw), exp) in inputs.iter().zip(expected.iter()) {
            let out = apply(&mut state, SignalMode::Digital, 1, false, &p, *t, *raw);
            assert_eq!(out, *exp);
        }
    }

    #[test]
    fn digital_binary_pulse_shorter_than_hold_never_promotes() {
        let mut state = FilterState::default();
        let p = params(0.0, 0.010);
        let d = 0.003; // < 0.010
        let seq = [(0.0, 0.0f32), (0.0005, 1.0), (0.0005 + d, 0.0), (0.02, 0.0)];
        for (t, raw) in seq {
            assert_eq!(apply(&mut state, SignalMode::Digital, 1, false, &p, t, raw), 0.0);
        }
    }

    #[test]
    fn digital_binary_pulse_longer_than_hold_promotes_then_falls() {
        let mut state = FilterState::default();
        let hold = 0.005;
        let p = params(0.0, hold);
        assert_eq!(apply(&mut state, SignalMode::Digital, 1, false, &p, 0.0, 0.0), 0.0);
        assert_eq!(apply(&mut state, SignalMode::Digital, 1, false, &p, 0.001, 1.0), 0.0);
        // still below hold threshold
        assert_eq!(apply(&mut state, SignalMode::Digital, 1, false, &p, 0.004, 1.0), 0.0);
        // now at/after rise_time + hold
        assert_eq!(apply(&mut state, SignalMode::Digital, 1, false, &p, 0.006, 1.0), 1.0);
        assert_eq!(apply(&mut state, SignalMode::Digital, 1, false, &p, 0.010, 1.0), 1.0);
        assert_eq!(apply(&mut state, SignalMode::Digital, 1, false, &p, 0.011, 0.0), 0.0);
    }

    #[test]
    fn multi_bit_discrete_holds_during_transition_then_promotes() {
        let mut state = FilterState::default();
        let p = params(0.0, 0.010);
        assert_eq!(apply(&mut state, SignalMode::Digital, 4, false, &p, 0.0, 0.0), 0.0);
        // value changes: held at prior value until stable for the hold duration
        assert_eq!(apply(&mut state, SignalMode::Digital, 4, false, &p, 0.001, 5.0), 0.0);
        assert_eq!(apply(&mut state, SignalMode::Digital, 4, false, &p, 0.005, 5.0), 0.0);
        // stable for >= hold since the value started changing -> promotes
        assert_eq!(apply(&mut state, SignalMode::Digital, 4, false, &p, 0.012, 5.0), 5.0);
    }

    #[test]
    fn multi_bit_discrete_flicker_restarts_the_timer() {
        let mut state = FilterState::default();
        let p = params(0.0, 0.010);
        assert_eq!(apply(&mut state, SignalMode::Digital, 4, false, &p, 0.0, 0.0), 0.0);
        assert_eq!(apply(&mut state, SignalMode::Digital, 4, false, &p, 0.001, 5.0), 0.0);
        // flickers back before promotion; timer restarts, still holds at 0.0
        assert_eq!(apply(&mut state, SignalMode::Digital, 4, false, &p, 0.008, 0.0), 0.0);
        assert_eq!(apply(&mut state, SignalMode::Digital, 4, false, &p, 0.009, 5.0), 0.0);
        assert_eq!(apply(&mut state, SignalMode::Digital, 4, false, &p, 0.0195, 5.0), 5.0);
    }

    #[test]
    fn forced_binary_overrides_analog_and_none_modes() {
        // force_binary must win even when the signal's configured mode is
        // still Analog or None (e.g. before a host sets the per-trigger flag's
        // mode to Digital) — the flag overrides mode entirely.
        let p = params(0.0, 0.005);

        let mut state = FilterState::default();
        assert_eq!(apply(&mut state, SignalMode::Analog, 8, true, &p, 0.0, 0.1), 0.0);
        assert_eq!(apply(&mut state, SignalMode::Analog, 8, true, &p, 0.001, 0.9), 0.0);
        assert_eq!(apply(&mut state, SignalMode::Analog, 8, true, &p, 0.007, 0.9), 1.0);

        let mut state = FilterState::default();
        assert_eq!(apply(&mut state, SignalMode::None, 8, true, &p, 0.0, 0.1), 0.0);
        assert_eq!(apply(&mut state, SignalMode::None, 8, true, &p, 0.001, 0.9), 0.0);
        assert_eq!(apply(&mut state, SignalMode::None, 8, true, &p, 0.007, 0.9), 1.0);
    }

    #[test]
    fn forced_binary_trigger_thresholds_before_gating() {
        let mut state = FilterState::default();
        let p = params(0.0, 0.005);
        // raw analog-ish trigger values, thresholded at 0.5 before the digital gate
        assert_eq!(apply(&mut state, SignalMode::Digital, 8, true, &p, 0.0, 0.1), 0.0);
        assert_eq!(apply(&mut state, SignalMode::Digital, 8, true, &p, 0.001, 0.9), 0.0);
        assert_eq!(apply(&mut state, SignalMode::Digital, 8, true, &p, 0.007, 0.9), 1.0);
    }
}
