//! CLI front-end for the HOTAS remapping pipeline.
//!
//! Wires a JSON bit-map and mapping file into [`hotas_core`], using demo
//! (stdout-logging) implementations of the external `DeviceSource`,
//! `VirtualPad`, and `SyntheticInput` ports, since the real OS-level
//! backends are out of scope for this crate (`spec.md` §1).

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use hotas_core::acquisition::{AcquisitionCore, DeviceBinding};
use hotas_core::config::{build_descriptors, to_mapping_entry, BitMapEntry, PersistedMapping};
use hotas_core::control::ControlSurface;
use hotas_core::mapping::MappingTable;
use hotas_core::model::{Device, FilterParams, PadReport, VK};
use hotas_core::ports::{DeviceHandle, DeviceIdentity, DeviceKind, DeviceSource, SyntheticInput, VirtualPad};
use hotas_core::publisher::Publisher;

#[derive(Parser)]
#[command(name = "hotas", about = "HOTAS/gamepad remapping pipeline", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the acquisition/publisher loop for a fixed duration against a
    /// bit-map and mapping file, then print loop timing stats.
    Run {
        #[arg(long)]
        bitmap: PathBuf,
        #[arg(long)]
        mappings: PathBuf,
        #[arg(long, default_value_t = 2.0)]
        duration_secs: f64,
        #[arg(long, default_value_t = 1000.0)]
        target_hz: f64,
    },
    /// Validate a bit-map file without running the pipeline.
    Validate {
        #[arg(long)]
        bitmap: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run { bitmap, mappings, duration_secs, target_hz } => run(bitmap, mappings, duration_secs, target_hz),
        Command::Validate { bitmap } => validate(bitmap),
    }
}

fn load_bitmap(path: &PathBuf) -> Result<Vec<BitMapEntry>> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading bit-map {path:?}"))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing bit-map {path:?}"))
}

fn validate(bitmap: PathBuf) -> Result<()> {
    let entries = load_bitmap(&bitmap)?;
    let descriptors = build_descriptors(&entries).context("bit-map failed validation")?;
    tracing::info!(signal_count = descriptors.len(), "bit-map is valid");
    Ok(())
}

fn run(bitmap: PathBuf, mappings_path: PathBuf, duration_secs: f64, target_hz: f64) -> Result<()> {
    let entries = load_bitmap(&bitmap)?;
    let descriptors = build_descriptors(&entries).context("bit-map failed validation")?;

    let raw_mappings: Vec<PersistedMapping> = {
        let raw = fs::read_to_string(&mappings_path).with_context(|| format!("reading mappings {mappings_path:?}"))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing mappings {mappings_path:?}"))?
    };

    let mapping_table = Arc::new(MappingTable::new());
    for record in &raw_mappings {
        match to_mapping_entry(record, &descriptors) {
            Some(entry) => mapping_table.add(entry),
            None => tracing::warn!(id = %record.id, "dropping unresolvable mapping record"),
        }
    }

    let control = Arc::new(ControlSurface::new(FilterParams::default(), 5.0));
    control.set_virtual_output_enabled(true);

    let device_source = Arc::new(DemoDeviceSource);
    let bindings = vec![
        DeviceBinding { device: Device::Stick, handle: DeviceHandle(0) },
        DeviceBinding { device: Device::Throttle, handle: DeviceHandle(1) },
        DeviceBinding { device: Device::Gamepad, handle: DeviceHandle(2) },
    ];

    let pad = Arc::new(DemoVirtualPad);
    let synth = Arc::new(DemoSyntheticInput);
    let mut publisher = Publisher::new(pad, synth);
    if let Err(e) = publisher.enable() {
        tracing::warn!(error = %e, "failed to enable virtual output; continuing in decode-only mode");
    }

    let (mut core, snapshot) = AcquisitionCore::new(
        descriptors,
        bindings,
        device_source,
        mapping_table,
        control,
        publisher,
        target_hz,
    );
    let running = core.running_flag();
    let stats = core.stats_handle();

    let handle = thread::spawn(move || core.run());
    thread::sleep(Duration::from_secs_f64(duration_secs));
    running.store(false, Ordering::Release);
    handle.join().expect("acquisition thread panicked");

    let poll_stats = stats.get();
    tracing::info!(
        effective_hz = poll_stats.effective_hz,
        avg_loop_us = poll_stats.avg_loop_us,
        "acquisition loop stopped"
    );
    for key in snapshot.signal_keys() {
        let samples = snapshot.snapshot(key, 1.0);
        if let Some(last) = samples.last() {
            tracing::info!(signal = %key.to_prefixed(), value = last.v, "last sample");
        }
    }
    Ok(())
}

/// Synthesizes a constant idle report per device: all-zero bytes long
/// enough for any descriptor. A real backend plugs in OS HID reads here.
struct DemoDeviceSource;

impl DeviceSource for DemoDeviceSource {
    fn enumerate(&self) -> Vec<DeviceIdentity> {
        vec![
            DeviceIdentity { path: "demo:stick".into(), kind: DeviceKind::Stick },
            DeviceIdentity { path: "demo:throttle".into(), kind: DeviceKind::Throttle },
            DeviceIdentity { path: "demo:gamepad".into(), kind: DeviceKind::Gamepad },
        ]
    }

    fn open(&self, _path: &str) -> Option<DeviceHandle> {
        Some(DeviceHandle(0))
    }

    fn close(&self, _handle: DeviceHandle) {}

    fn read_latest(&self, _handle: DeviceHandle) -> Option<(Vec<u8>, f64)> {
        Some((vec![0u8; 8], 0.0))
    }

    fn connected(&self, _handle: DeviceHandle) -> bool {
        true
    }
}

/// Logs updates instead of driving a real virtual-gamepad driver.
struct DemoVirtualPad;

impl VirtualPad for DemoVirtualPad {
    fn connect(&self) -> Result<(), String> {
        Ok(())
    }
    fn disconnect(&self) {}
    fn plug_target(&self) -> Result<(), String> {
        Ok(())
    }
    fn unplug_target(&self) -> Result<(), String> {
        Ok(())
    }
    fn update(&self, report: PadReport) -> Result<(), String> {
        tracing::debug!(?report, "virtual pad update");
        Ok(())
    }
    fn ready(&self) -> bool {
        true
    }
    fn last_error(&self) -> Option<String> {
        None
    }
}

/// Logs key/mouse dispatch instead of injecting real OS input events.
struct DemoSyntheticInput;

impl SyntheticInput for DemoSyntheticInput {
    fn key(&self, vk: VK, down: bool, extended: bool, scan_code: u16) -> Result<(), String> {
        tracing::debug!(vk, down, extended, scan_code, "key event");
        Ok(())
    }
    fn mouse(&self, op: &str, magnitude: f32) -> Result<(), String> {
        tracing::debug!(op, magnitude, "mouse event");
        Ok(())
    }
    fn query_key_repeat(&self) -> (f64, f64) {
        (250.0, 33.0)
    }
}
