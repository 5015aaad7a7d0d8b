//! External collaborator contracts (`spec.md` §6). These are capability
//! traits, not base classes: a host wires concrete implementations in at
//! construction time, and the core never downcasts or inspects a concrete
//! type behind one of these.

use crate::model::{PadReport, VK};

/// Identifies one enumerated HID device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub path: String,
    pub kind: DeviceKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Stick,
    Throttle,
    Gamepad,
}

/// An opaque device handle returned by [`DeviceSource::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(pub u64);

/// OS HID enumeration/open and overlapped reads. Implemented outside this
/// crate; the core only ever calls [`Self::read_latest`] and
/// [`Self::connected`] on the hot path.
pub trait DeviceSource: Send + Sync {
    fn enumerate(&self) -> Vec<DeviceIdentity>;
    fn open(&self, path: &str) -> Option<DeviceHandle>;
    fn close(&self, handle: DeviceHandle);

    /// Never blocks more than 200ms; returns `None` if the freshest known
    /// report is older than the 500ms staleness threshold.
    fn read_latest(&self, handle: DeviceHandle) -> Option<(Vec<u8>, f64)>;

    fn connected(&self, handle: DeviceHandle) -> bool;
}

/// A virtual-gamepad backend (e.g. an OS-level virtual Xbox-360 driver).
pub trait VirtualPad: Send + Sync {
    fn connect(&self) -> Result<(), String>;
    fn disconnect(&self);
    fn plug_target(&self) -> Result<(), String>;
    fn unplug_target(&self) -> Result<(), String>;
    fn update(&self, report: PadReport) -> Result<(), String>;
    fn ready(&self) -> bool;
    fn last_error(&self) -> Option<String>;
}

/// OS keyboard/mouse injection.
pub trait SyntheticInput: Send + Sync {
    fn key(&self, vk: VK, down: bool, extended: bool, scan_code: u16) -> Result<(), String>;
    fn mouse(&self, op: &str, magnitude: f32) -> Result<(), String>;
    fn query_key_repeat(&self) -> (f64, f64);
}
