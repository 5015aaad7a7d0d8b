//! Owns the 1 kHz loop: pulls the latest raw report per device, decodes,
//! filters, fans out to sample rings, resolves mappings, and publishes
//! (`spec.md` §4, §5, §7).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::atomic_f64::AtomicF64;
use crate::clock::{Clock, Scheduler, SchedulerStats};
use crate::control::ControlSurface;
use crate::decode::decode_report;
use crate::error::SubsystemStatus;
use crate::filter;
use crate::mapping::MappingTable;
use crate::model::{Device, FilterState, Sample, SignalDescriptor, SignalKey, SignalMode};
use crate::ports::{DeviceHandle, DeviceSource, SyntheticInput, VirtualPad};
use crate::publisher::Publisher;
use crate::resolver::resolve;
use crate::snapshot::SnapshotApi;

/// Descriptor ids treated as the left/right trigger for the
/// `trigger_{left,right}_digital` config keys (`spec.md` §6). The bit-map's
/// device/id scheme does not otherwise single these two signals out, so the
/// core recognizes them by this fixed id convention.
const TRIGGER_LEFT_ID: &str = "trigger_left";
const TRIGGER_RIGHT_ID: &str = "trigger_right";

/// Ring capacity per signal: `2^19` samples at 1 kHz covers 60 s of history
/// plus headroom (`spec.md` §3 lifecycle note).
const RING_CAPACITY: usize = 1 << 19;

/// A device this core polls each tick, bound to an already-open handle.
#[derive(Debug, Clone, Copy)]
pub struct DeviceBinding {
    pub device: Device,
    pub handle: DeviceHandle,
}

/// Owns exclusively: filter state, ring write ends, the device source
/// handles, and the publisher. Everything else (mapping table, control
/// surface) is shared with the rest of the process via `Arc`.
pub struct AcquisitionCore<D, P, S> {
    descriptors: Vec<SignalDescriptor>,
    descriptors_by_device: HashMap<Device, Vec<SignalDescriptor>>,
    bindings: Vec<DeviceBinding>,
    device_source: Arc<D>,
    rings: Arc<HashMap<SignalKey, Arc<crate::ring::SampleRing<Sample>>>>,
    latest_time: Arc<AtomicF64>,
    filter_states: HashMap<SignalKey, FilterState>,
    latest_values: HashMap<SignalKey, f32>,
    clock: Clock,
    scheduler: Scheduler,
    control: Arc<ControlSurface>,
    mapping: Arc<MappingTable>,
    publisher: Publisher<P, S>,
    running: Arc<AtomicBool>,
    status: Mutex<HashMap<Device, SubsystemStatus>>,
}

impl<D: DeviceSource, P: VirtualPad, S: SyntheticInput> AcquisitionCore<D, P, S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        descriptors: Vec<SignalDescriptor>,
        bindings: Vec<DeviceBinding>,
        device_source: Arc<D>,
        mapping: Arc<MappingTable>,
        control: Arc<ControlSurface>,
        publisher: Publisher<P, S>,
        target_hz: f64,
    ) -> (Self, SnapshotApi) {
        let mut descriptors_by_device: HashMap<Device, Vec<SignalDescriptor>> = HashMap::new();
        let mut rings = HashMap::new();
        for d in &descriptors {
            descriptors_by_device.entry(d.key.device).or_default().push(d.clone());
            rings.insert(d.key.clone(), Arc::new(crate::ring::SampleRing::new(RING_CAPACITY)));
        }
        let rings = Arc::new(rings);
        let latest_time = Arc::new(AtomicF64::new(0.0));
        let snapshot_api = SnapshotApi::new(rings.clone(), latest_time.clone());

        let core = Self {
            descriptors,
            descriptors_by_device,
            bindings,
            device_source,
            rings,
            latest_time,
            filter_states: HashMap::new(),
            latest_values: HashMap::new(),
            clock: Clock::new(),
            scheduler: Scheduler::new(target_hz),
            control,
            mapping,
            publisher,
            running: Arc::new(AtomicBool::new(false)),
            status: Mutex::new(HashMap::new()),
        };
        (core, snapshot_api)
    }

    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub fn descriptors(&self) -> &[SignalDescriptor] {
        &self.descriptors
    }

    pub fn stats_handle(&self) -> SchedulerStats {
        self.scheduler.stats_handle()
    }

    pub fn device_status(&self, device: Device) -> SubsystemStatus {
        self.status
            .lock()
            .expect("status mutex poisoned")
            .get(&device)
            .cloned()
            .unwrap_or_default()
    }

    fn set_device_status(&self, device: Device, status: SubsystemStatus) {
        self.status.lock().expect("status mutex poisoned").insert(device, status);
    }

    fn force_binary(&self, descriptor: &SignalDescriptor) -> bool {
        match descriptor.key.id.as_str() {
            TRIGGER_LEFT_ID => self.control.trigger_left_digital(),
            TRIGGER_RIGHT_ID => self.control.trigger_right_digital(),
            _ => false,
        }
    }

    /// Runs until `running` is cleared. Intended to be the body of the
    /// dedicated acquisition thread.
    pub fn run(&mut self) {
        self.running.store(true, Ordering::Release);
        while self.running.load(Ordering::Acquire) {
            let tick_start = Instant::now();
            self.tick();
            self.scheduler.wait_for_next_tick(tick_start.elapsed());
        }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// One full pipeline pass: decode -> filter -> ring write -> resolve ->
    /// publish. Public so tests and `hotas-cli` can drive single ticks
    /// without spinning up the scheduler's real-time loop.
    pub fn tick(&mut self) {
        let now = self.clock.now_sec();

        // Cloned out (bindings are a handful of `Copy` device/handle pairs)
        // so the loop is free to call `&mut self` methods per device.
        let bindings = self.bindings.clone();
        for binding in &bindings {
            self.poll_device(binding, now);
        }

        // Advance the published timestamp even if every device read was
        // transient/stale this tick (`spec.md` §7, "Transient I/O").
        self.latest_time.store(now, Ordering::Release);

        let mappings = self.mapping.list();
        let latest_values = &self.latest_values;
        let resolved = resolve(&mappings, |key| latest_values.get(key).copied().unwrap_or(0.0));

        if let Some(err) = self.publisher.publish_tick(now, &resolved) {
            self.control.set_last_status(err.to_string());
        }
    }

    fn poll_device(&mut self, binding: &DeviceBinding, now: f64) {
        // Cloned out rather than borrowed so the loop body below is free to
        // take disjoint `&mut self.{filter_states,latest_values,rings}`
        // borrows without fighting a live borrow of `self.descriptors_by_device`.
        let Some(descriptors) = self.descriptors_by_device.get(&binding.device).cloned() else {
            return;
        };

        match self.device_source.read_latest(binding.handle) {
            Some((report, _device_t)) => {
                self.set_device_status(binding.device, SubsystemStatus::Ok);
                let decoded = decode_report(&descriptors, &report);
                for signal in decoded {
                    let descriptor = descriptors.iter().find(|d| d.key == signal.key).expect("decoded key must match a descriptor");
                    let mode = self.control.signal_mode(&signal.key);
                    let force_binary = self.force_binary(descriptor);
                    let state = self.filter_states.entry(signal.key.clone()).or_default();
                    let value = filter::apply(
                        state,
                        mode,
                        descriptor.bit_count,
                        force_binary,
                        &self.control.filter_params(),
                        now,
                        signal.value,
                    );
                    self.latest_values.insert(signal.key.clone(), value);
                    if let Some(ring) = self.rings.get(&signal.key) {
                        ring.push(Sample::new(now, value));
                    }
                }
            }
            None => {
                self.set_device_status(
                    binding.device,
                    SubsystemStatus::Degraded("stale or unavailable report".to_string()),
                );
            }
        }
    }
}
