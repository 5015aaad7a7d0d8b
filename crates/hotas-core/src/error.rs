//! Typed errors for the minority of genuinely fallible operations, plus the
//! per-subsystem status enum that absorbs everything else (`spec.md` §7).

use thiserror::Error;

/// Failures building the immutable descriptor table from a parsed bit-map.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("signal {id:?} has out-of-range bit_count {bit_count} (expected 1..=32)")]
    InvalidBitCount { id: String, bit_count: u8 },

    #[error("signal {id:?} overlaps signal {other:?} (bits [{start}, {end}))")]
    OverlappingDescriptors {
        id: String,
        other: String,
        start: u16,
        end: u16,
    },

    #[error("duplicate signal key {0:?} in bit-map")]
    DuplicateSignalKey(String),
}

/// A transient failure from a `VirtualPad` or `SyntheticInput` call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{call} failed: {message}")]
pub struct PublishError {
    pub call: &'static str,
    pub message: String,
}

impl PublishError {
    pub fn new(call: &'static str, message: impl Into<String>) -> Self {
        Self { call, message: message.into() }
    }
}

/// Per-subsystem health, polled by consumers; the core never unwinds across
/// an acquisition or publisher tick because of one of these.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubsystemStatus {
    #[default]
    Ok,
    Degraded(String),
    Fatal(String),
}

impl SubsystemStatus {
    pub fn is_fatal(&self) -> bool {
        matches!(self, SubsystemStatus::Fatal(_))
    }
}
