//! Fixed-capacity, power-of-two sample ring: single wait-free writer,
//! lock-free best-effort readers.
//!
//! The writer fetch-adds a monotonic write index and stores into
//! `data[index mod capacity]`; readers load the index with `Acquire`
//! ordering and walk backward from it. A reader that races a writer
//! wrapping through the exact slot it's reading may observe a torn
//! sample (half-old, half-new `t`/`v`); `spec.md` §4.1 chooses that
//! trade-off deliberately (option (a)) because every consumer here is a
//! visualizer or a filter that tolerates an occasional duplicated or
//! skipped edge. Callers needing a torn-free read should use the
//! two-step reserve/publish variant described in the spec instead.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::model::Sample;

/// Generic fixed-capacity ring storage shared by every per-signal sample
/// stream. Generic over the stored value so the same wait-free-writer
/// machinery isn't duplicated if a second kind of time series is ever
/// needed; the pipeline itself only instantiates it at `Sample`.
pub struct SampleRing<T: Copy> {
    capacity: usize,
    mask: usize,
    data: Box<[UnsafeCell<T>]>,
    write_index: AtomicU64,
}

// SAFETY: exactly one thread (the acquisition core) calls `push`; all other
// threads only call the read-only methods below, which tolerate torn reads
// by design (see module docs).
unsafe impl<T: Copy + Send> Sync for SampleRing<T> {}

impl<T: Copy + Default> SampleRing<T> {
    /// `capacity` must be a power of two and at least 2.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "ring capacity must be >= 2");
        assert!(capacity.is_power_of_two(), "ring capacity must be a power of two");
        let data = (0..capacity)
            .map(|_| UnsafeCell::new(T::default()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            capacity,
            mask: capacity - 1,
            data,
            write_index: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total number of writes ever issued (monotonic, never resets except
    /// via [`Self::clear`]).
    pub fn write_index(&self) -> u64 {
        self.write_index.load(Ordering::Acquire)
    }

    /// Logical number of valid samples currently held, `<= capacity`.
    pub fn len(&self) -> usize {
        self.write_index().min(self.capacity as u64) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a value. Never fails; the writer always has room because old
    /// slots are simply overwritten on wrap. Not safe to call from more
    /// than one thread concurrently.
    pub fn push(&self, value: T) {
        let idx = self.write_index.fetch_add(1, Ordering::Relaxed);
        let slot = (idx as usize) & self.mask;
        // SAFETY: each slot index is produced by a strictly increasing
        // fetch_add from the single writer thread, so no two pushes ever
        // target the same slot concurrently; readers only ever read, and
        // tearing between a concurrent push and a concurrent read is an
        // accepted trade-off (see module docs).
        unsafe { *self.data[slot].get() = value };
    }

    /// Copies out up to `capacity` most-recent values, oldest first.
    pub fn snapshot_all(&self) -> Vec<T> {
        let end = self.write_index();
        let start = end.saturating_sub(self.capacity as u64);
        let mut out = Vec::with_capacity((end - start) as usize);
        for idx in start..end {
            let slot = (idx as usize) & self.mask;
            // SAFETY: see `push`; this is a best-effort read that may race
            // a concurrent writer wrapping through this exact slot.
            let value = unsafe { *self.data[slot].get() };
            out.push(value);
        }
        out
    }

    /// Resets the ring to empty. Not safe to call concurrently with `push`;
    /// callers must pause acquisition first.
    pub fn clear(&self) {
        self.write_index.store(0, Ordering::Relaxed);
    }
}

impl SampleRing<Sample> {
    /// Copies all samples with `t >= latest_time - window_seconds`, in
    /// write order, bounded by capacity.
    pub fn snapshot(&self, latest_time: f64, window_seconds: f64) -> Vec<Sample> {
        let cutoff = latest_time - window_seconds;
        self.snapshot_all()
            .into_iter()
            .filter(|s| s.t >= cutoff)
            .collect()
    }

    /// As [`Self::snapshot`], but prepends the most recent sample strictly
    /// before the cutoff (if any) so digital edges can be reconstructed. If
    /// no sample falls inside the window but a baseline exists, returns just
    /// the baseline.
    pub fn snapshot_with_baseline(&self, latest_time: f64, window_seconds: f64) -> Vec<Sample> {
        let cutoff = latest_time - window_seconds;
        let all = self.snapshot_all();
        let baseline = all.iter().rev().find(|s| s.t < cutoff).copied();
        let mut in_window: Vec<Sample> = all.into_iter().filter(|s| s.t >= cutoff).collect();
        if let Some(base) = baseline {
            let mut out = Vec::with_capacity(in_window.len() + 1);
            out.push(base);
            out.append(&mut in_window);
            out
        } else {
            in_window
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_len() {
        let ring: SampleRing<Sample> = SampleRing::new(8);
        assert!(ring.is_empty());
        for i in 0..5 {
            ring.push(Sample::new(i as f64, i as f32));
        }
        assert_eq!(ring.len(), 5);
    }

    #[test]
    fn len_saturates_at_capacity() {
        let ring: SampleRing<Sample> = SampleRing::new(4);
        for i in 0..10 {
            ring.push(Sample::new(i as f64, i as f32));
        }
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.write_index(), 10);
    }

    #[test]
    fn snapshot_all_is_write_order() {
        let ring: SampleRing<Sample> = SampleRing::new(8);
        for i in 0..6 {
            ring.push(Sample::new(i as f64, i as f32));
        }
        let snap = ring.snapshot_all();
        let ts: Vec<f64> = snap.iter().map(|s| s.t).collect();
        assert_eq!(ts, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn snapshot_all_after_wrap_keeps_most_recent() {
        let ring: SampleRing<Sample> = SampleRing::new(4);
        for i in 0..10 {
            ring.push(Sample::new(i as f64, i as f32));
        }
        let snap = ring.snapshot_all();
        let ts: Vec<f64> = snap.iter().map(|s| s.t).collect();
        assert_eq!(ts, vec![6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn snapshot_window_filters_by_time() {
        let ring: SampleRing<Sample> = SampleRing::new(16);
        for i in 0..10 {
            ring.push(Sample::new(i as f64, i as f32));
        }
        let snap = ring.snapshot(9.0, 3.0);
        let ts: Vec<f64> = snap.iter().map(|s| s.t).collect();
        assert_eq!(ts, vec![6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn snapshot_with_baseline_prepends_prior_sample() {
        let ring: SampleRing<Sample> = SampleRing::new(16);
        for i in 0..10 {
            ring.push(Sample::new(i as f64, i as f32));
        }
        let snap = ring.snapshot_with_baseline(9.0, 2.0);
        let ts: Vec<f64> = snap.iter().map(|s| s.t).collect();
        // window is [7, 9]; baseline is the most recent sample strictly before 7 -> t=6
        assert_eq!(ts, vec![6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn snapshot_with_baseline_when_window_empty_returns_just_baseline() {
        let ring: SampleRing<Sample> = SampleRing::new(16);
        ring.push(Sample::new(0.0, 0.0));
        ring.push(Sample::new(1.0, 1.0));
        // window [100, 101] has nothing; baseline is the last sample, t=1
        let snap = ring.snapshot_with_baseline(101.0, 1.0);
        assert_eq!(snap, vec![Sample::new(1.0, 1.0)]);
    }

    #[test]
    fn clear_resets_to_empty() {
        let ring: SampleRing<Sample> = SampleRing::new(8);
        for i in 0..5 {
            ring.push(Sample::new(i as f64, i as f32));
        }
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.write_index(), 0);
    }

    #[test]
    fn samples_written_are_monotone_in_time() {
        let ring: SampleRing<Sample> = SampleRing::new(32);
        for i in 0..32 {
            ring.push(Sample::new(i as f64 * 0.001, i as f32));
        }
        let snap = ring.snapshot_all();
        for w in snap.windows(2) {
            assert!(w[0].t <= w[1].t);
        }
    }

    proptest::proptest! {
        #[test]
        fn snapshot_all_never_exceeds_capacity(n in 0usize..500) {
            let ring: SampleRing<Sample> = SampleRing::new(64);
            for i in 0..n {
                ring.push(Sample::new(i as f64, i as f32));
            }
            proptest::prop_assert!(ring.snapshot_all().len() <= 64);
        }
    }
}
