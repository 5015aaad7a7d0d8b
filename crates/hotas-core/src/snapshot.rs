//! Windowed read of any signal's ring, for GUI/consumer threads
//! (`spec.md` §4.9 / SnapshotAPI).

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::atomic_f64::AtomicF64;
use crate::model::{Sample, SignalKey};
use crate::ring::SampleRing;

/// Read-only, cheaply cloneable handle onto every signal's ring plus the
/// writer's latest published timestamp. Consumers never touch filter state
/// or the write end of a ring.
#[derive(Clone)]
pub struct SnapshotApi {
    rings: Arc<HashMap<SignalKey, Arc<SampleRing<Sample>>>>,
    latest_time: Arc<AtomicF64>,
}

impl SnapshotApi {
    pub(crate) fn new(rings: Arc<HashMap<SignalKey, Arc<SampleRing<Sample>>>>, latest_time: Arc<AtomicF64>) -> Self {
        Self { rings, latest_time }
    }

    /// The acquisition thread's latest published timestamp. Every sample
    /// currently visible in any ring has `t <=` this value.
    pub fn latest_time(&self) -> f64 {
        self.latest_time.load(Ordering::Acquire)
    }

    pub fn signal_keys(&self) -> impl Iterator<Item = &SignalKey> {
        self.rings.keys()
    }

    /// Windowed read ending at the writer's latest published time.
    pub fn snapshot(&self, key: &SignalKey, window_seconds: f64) -> Vec<Sample> {
        match self.rings.get(key) {
            Some(ring) => ring.snapshot(self.latest_time(), window_seconds),
            None => Vec::new(),
        }
    }

    /// As [`Self::snapshot`], with a baseline sample prepended for
    /// edge-reconstruction (digital step plots).
    pub fn snapshot_with_baseline(&self, key: &SignalKey, window_seconds: f64) -> Vec<Sample> {
        match self.rings.get(key) {
            Some(ring) => ring.snapshot_with_baseline(self.latest_time(), window_seconds),
            None => Vec::new(),
        }
    }
}
