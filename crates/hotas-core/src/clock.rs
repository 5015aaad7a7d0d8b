//! Monotonic clock and fixed-interval deadline scheduler (`spec.md` §4.2).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Monotonic seconds-since-start time source shared by every component that
/// stamps a [`crate::model::Sample`].
#[derive(Clone)]
pub struct Clock {
    start: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }

    pub fn now_sec(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Loop-timing stats, published by the scheduler's owning thread and read
/// lock-free by any consumer thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollStats {
    pub effective_hz: f64,
    pub avg_loop_us: f64,
}

/// A cheap, cloneable handle consumers can poll for [`PollStats`] without
/// touching the scheduler itself.
#[derive(Clone)]
pub struct SchedulerStats {
    inner: Arc<SchedulerStatsInner>,
}

struct SchedulerStatsInner {
    effective_hz_bits: AtomicU64,
    avg_loop_us_bits: AtomicU64,
}

impl SchedulerStats {
    fn new(target_hz: f64) -> Self {
        Self {
            inner: Arc::new(SchedulerStatsInner {
                effective_hz_bits: AtomicU64::new(target_hz.to_bits()),
                avg_loop_us_bits: AtomicU64::new(0),
            }),
        }
    }

    pub fn get(&self) -> PollStats {
        PollStats {
            effective_hz: f64::from_bits(self.inner.effective_hz_bits.load(Ordering::Relaxed)),
            avg_loop_us: f64::from_bits(self.inner.avg_loop_us_bits.load(Ordering::Relaxed)),
        }
    }

    fn set_effective_hz(&self, hz: f64) {
        self.inner.effective_hz_bits.store(hz.to_bits(), Ordering::Relaxed);
    }

    fn set_avg_loop_us(&self, us: f64) {
        self.inner.avg_loop_us_bits.store(us.to_bits(), Ordering::Relaxed);
    }
}

/// Fixed-interval deadline scheduler: coarse sleep down to ~800us before the
/// deadline, then a short busy-wait tail for precision. Owned exclusively by
/// the thread that drives it; share [`SchedulerStats`] (via
/// [`Scheduler::stats_handle`]) with other threads instead.
pub struct Scheduler {
    period: Duration,
    wake: Instant,
    stats: SchedulerStats,
    ema_alpha: f64,
    window_ticks: u32,
    window_start: Instant,
}

const BUSY_WAIT_MARGIN: Duration = Duration::from_micros(800);
const STATS_WINDOW: Duration = Duration::from_millis(100);

impl Scheduler {
    pub fn new(target_hz: f64) -> Self {
        let now = Instant::now();
        let period = Duration::from_secs_f64(1.0 / target_hz);
        Self {
            period,
            wake: now + period,
            stats: SchedulerStats::new(target_hz),
            ema_alpha: 0.05,
            window_ticks: 0,
            window_start: now,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn stats_handle(&self) -> SchedulerStats {
        self.stats.clone()
    }

    /// Blocks (sleep, then busy-wait) until the next tick deadline, then
    /// advances internal state and publishes timing stats. `work_duration`
    /// is how long this tick's actual work took, used for the loop-duration
    /// EMA.
    pub fn wait_for_next_tick(&mut self, work_duration: Duration) {
        let sleep_target = self.wake.checked_sub(BUSY_WAIT_MARGIN).unwrap_or(self.wake);
        let now = Instant::now();
        if now < sleep_target {
            thread::sleep(sleep_target - now);
        }
        while Instant::now() < self.wake {
            std::hint::spin_loop();
        }

        let now = Instant::now();
        let mut next_wake = self.wake + self.period;
        if now > next_wake + self.period {
            // Fell behind by more than one period; reset rather than cascade.
            next_wake = now + self.period;
        }
        self.wake = next_wake;

        self.record_stats(work_duration);
    }

    fn record_stats(&mut self, work_duration: Duration) {
        let sample_us = work_duration.as_secs_f64() * 1_000_000.0;
        let prev = self.stats.get().avg_loop_us;
        let new_avg = if prev == 0.0 {
            sample_us
        } else {
            self.ema_alpha * sample_us + (1.0 - self.ema_alpha) * prev
        };
        self.stats.set_avg_loop_us(new_avg);

        self.window_ticks += 1;
        let elapsed = self.window_start.elapsed();
        if elapsed >= STATS_WINDOW {
            let hz = self.window_ticks as f64 / elapsed.as_secs_f64();
            self.stats.set_effective_hz(hz);
            self.window_ticks = 0;
            self.window_start = Instant::now();
        }
    }
}
