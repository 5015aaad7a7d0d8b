//! Core value types shared by every pipeline stage.
//!
//! These mirror the data model laid out in the bit-map / mapping
//! persistence formats this crate consumes: small, `Copy`-friendly enums
//! and structs with no behavior of their own.

use serde::{Deserialize, Serialize};

/// A single `(time, value)` observation written into a [`crate::ring::SampleRing`].
///
/// `t` is monotonic seconds since process start; `v` is the logical value in
/// the signal's canonical range (see [`SignalDescriptor`]).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sample {
    pub t: f64,
    pub v: f32,
}

impl Sample {
    pub const fn new(t: f64, v: f32) -> Self {
        Self { t, v }
    }
}

/// Which physical device a signal originates from.
///
/// The device prefix disambiguates identically named inputs across
/// devices (e.g. both the stick and the throttle may expose a `joy_x`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Device {
    Stick,
    Throttle,
    Gamepad,
}

impl Device {
    /// The prefix used in persisted `signal_id` strings, e.g. `"stick"`.
    pub fn prefix(self) -> &'static str {
        match self {
            Device::Stick => "stick",
            Device::Throttle => "throttle",
            Device::Gamepad => "gamepad",
        }
    }

    pub fn from_prefix(s: &str) -> Option<Self> {
        match s {
            "stick" => Some(Device::Stick),
            "throttle" => Some(Device::Throttle),
            "gamepad" => Some(Device::Gamepad),
            _ => None,
        }
    }
}

/// `(device, id)` — the unique key identifying a logical signal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignalKey {
    pub device: Device,
    pub id: String,
}

impl SignalKey {
    pub fn new(device: Device, id: impl Into<String>) -> Self {
        Self { device, id: id.into() }
    }

    /// Renders as the persisted `"device:id"` form, e.g. `"stick:joy_x"`.
    pub fn to_prefixed(&self) -> String {
        format!("{}:{}", self.device.prefix(), self.id)
    }
}

/// Immutable (post-load) description of one logical signal extracted from a
/// device's raw HID report, per the bit-map.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalDescriptor {
    pub key: SignalKey,
    pub display_name: String,
    pub bit_start: u16,
    pub bit_count: u8,
    pub analog: bool,
}

/// Hot-swappable per-signal processing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalMode {
    None,
    Digital,
    Analog,
}

/// Hot-swappable filter tuning, shared by every signal in a given mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    pub analog_rate_pct: f32,
    pub digital_min_hold_sec: f64,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            analog_rate_pct: 10.0,
            digital_min_hold_sec: 0.005,
        }
    }
}

/// Per-signal filter state machine, owned exclusively by the acquisition core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterState {
    pub prev_filtered: f32,
    pub prev_raw: f32,
    pub rise_time: Option<f64>,
    pub pending_value: f32,
    pub promoted_value: f32,
    pub active: bool,
    pub initialized: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            prev_filtered: 0.0,
            prev_raw: 0.0,
            rise_time: None,
            pending_value: 0.0,
            promoted_value: 0.0,
            active: false,
            initialized: false,
        }
    }
}

/// A virtual-gamepad axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisId {
    LX,
    LY,
    RX,
    RY,
    LT,
    RT,
}

/// A virtual-gamepad digital button (face buttons, bumpers, sticks, d-pad).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ButtonId {
    A,
    B,
    X,
    Y,
    LB,
    RB,
    Start,
    Back,
    L3,
    R3,
    DPadUp,
    DPadDown,
    DPadLeft,
    DPadRight,
}

/// An OS virtual-key code, as consumed by `SyntheticInput::key`.
pub type VK = u32;

/// An opaque mouse operation token; the catalogue of ops lives outside the
/// core (see `spec.md` §4.8), so this is deliberately a thin newtype.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MouseOp(pub String);

/// The output target of a [`MappingEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    Axis(AxisId),
    Button(ButtonId),
    Key(VK),
    Mouse(MouseOp),
}

/// One user-authored HOTAS-signal-to-output mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingEntry {
    pub id: String,
    pub signal_key: SignalKey,
    pub action: Action,
    pub priority: i32,
    pub deadband: f32,
}

/// Default deadband applied when loading legacy profiles that omit one.
pub const DEFAULT_AXIS_DEADBAND: f32 = 0.05;

/// Per-VK auto-repeat bookkeeping maintained by the publisher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyRepeatState {
    pub pressed: bool,
    pub vk: VK,
    pub press_time: f64,
    pub next_repeat: f64,
}

/// The virtual Xbox-360-style gamepad report published each tick.
///
/// `ly`/`ry` are transmitted with inverted sign relative to the logical
/// convention used everywhere else in this crate (logical up = positive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PadReport {
    pub buttons: u16,
    pub lt: u8,
    pub rt: u8,
    pub lx: i16,
    pub ly: i16,
    pub rx: i16,
    pub ry: i16,
}

impl ButtonId {
    /// Fixed button-id to bit assignment (`spec.md` §6 / §9 open question,
    /// resolved: digital triggers reserved at bits 10/11, 14/15 stay Y/X).
    pub fn bit(self) -> u16 {
        match self {
            ButtonId::DPadUp => 0,
            ButtonId::DPadDown => 1,
            ButtonId::DPadLeft => 2,
            ButtonId::DPadRight => 3,
            ButtonId::Start => 4,
            ButtonId::Back => 5,
            ButtonId::L3 => 6,
            ButtonId::R3 => 7,
            ButtonId::LB => 8,
            ButtonId::RB => 9,
            ButtonId::A => 12,
            ButtonId::B => 13,
            ButtonId::X => 14,
            ButtonId::Y => 15,
        }
    }
}
