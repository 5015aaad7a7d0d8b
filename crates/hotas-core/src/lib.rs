//! Core pipeline for remapping a HOTAS (joystick + throttle) pair and/or a
//! gamepad into a virtual Xbox-360-style controller plus keyboard/mouse
//! events, at a fixed 1 kHz tick. See each module for its slice of
//! `spec.md` §4.
//!
//! Host binaries (like `hotas-cli`) supply the [`ports::DeviceSource`],
//! [`ports::VirtualPad`], and [`ports::SyntheticInput`] implementations and
//! drive [`acquisition::AcquisitionCore::run`] on a dedicated thread.

pub mod acquisition;
pub mod atomic_f64;
pub mod bits;
pub mod clock;
pub mod config;
pub mod control;
pub mod decode;
pub mod error;
pub mod filter;
pub mod mapping;
pub mod model;
pub mod ports;
pub mod publisher;
pub mod resolver;
pub mod ring;
pub mod snapshot;

pub use acquisition::{AcquisitionCore, DeviceBinding};
pub use control::ControlSurface;
pub use error::{ConfigError, PublishError, SubsystemStatus};
pub use mapping::MappingTable;
pub use model::{
    Action, AxisId, ButtonId, Device, FilterParams, MappingEntry, Sample, SignalDescriptor,
    SignalKey, SignalMode,
};
pub use ports::{DeviceHandle, DeviceIdentity, DeviceKind, DeviceSource, SyntheticInput, VirtualPad};
pub use publisher::Publisher;
pub use snapshot::SnapshotApi;
