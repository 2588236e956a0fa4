//! # Blackbox - Crash-Resilient Firmware Diagnostics
//!
//! `blackbox-rs` captures diagnostic artifacts (coredumps, batched events,
//! reboot reasons) across reboots for later transmission to a collection
//! backend:
//!
//! - **Reboot tracking** in a checksummed 256-byte persistent region, with
//!   boot-loop detection via a crash counter
//! - **Coredump capture** with storage-size negotiation, safe to run from
//!   fault-handler context
//! - **Batched events** packaged behind a minimal CBOR array header
//! - **Build-id tagging** so every artifact maps to an exact binary
//!
//! Platform specifics (flash drivers, reset registers, transport) stay on
//! the integrator's side of the [`CoredumpStorage`] trait and the plain
//! data types passed in at boot.
//!
//! ## Quick Start
//!
//! ```rust
//! use blackbox_rs::{
//!     BlackboxBuilder, DeviceInfo, RamBackedStorage, REBOOT_TRACKING_REGION_SIZE,
//! };
//!
//! // The region lives in memory that survives resets (noinit section,
//! // battery-backed SRAM, ...). A plain array stands in for it here.
//! let mut region = [0u8; REBOOT_TRACKING_REGION_SIZE];
//!
//! let mut blackbox = BlackboxBuilder::new()
//!     .device_info(DeviceInfo {
//!         device_serial: "DEMOSERIAL".into(),
//!         software_type: "main-fw".into(),
//!         software_version: "1.0.0".into(),
//!         hardware_version: "proto".into(),
//!     })
//!     .boot(&mut region, None, RamBackedStorage::new(4096));
//!
//! // Anything left over from the previous boot?
//! if let Some(reset_info) = blackbox.consume_reset_info() {
//!     println!("last reboot: {:?}", reset_info.reason);
//! }
//!
//! blackbox.mark_system_started();
//! // ... application runs, watchdogs are fed, connectivity comes up ...
//! blackbox.mark_system_stable();
//! assert_eq!(blackbox.crash_count(), 0);
//! ```

// Core implementation
pub mod core;

// Re-export the types integrators need
pub use crate::core::{
    batched_events::{build_header, BatchedEventsHeader, BATCHED_EVENTS_HEADER_MAX_LEN},
    build_id::{BuildId, BUILD_ID_LEN},
    coredump::{Coredump, CoredumpRegion, CoredumpSaveInfo, RegionKind},
    device_info::{DeviceInfo, MachineType},
    error::{BlackboxError, Result},
    event_storage::EventStorage,
    reboot_tracking::{
        BootupInfo, RebootReason, RebootTracker, RegisterInfo, ResetInfo,
        REBOOT_TRACKING_REGION_SIZE,
    },
    storage::{CoredumpStorage, RamBackedStorage, StorageInfo},
};

use tracing::debug;

/// Configuration for the common integration path
///
/// Collects the pieces that identify the device and its capture strategy,
/// then wires the subsystems together via [`BlackboxBuilder::boot`].
///
/// # Examples
///
/// ```rust,no_run
/// use blackbox_rs::{BlackboxBuilder, DeviceInfo, MachineType, RamBackedStorage};
///
/// let mut region = [0u8; blackbox_rs::REBOOT_TRACKING_REGION_SIZE];
/// let blackbox = BlackboxBuilder::new()
///     .device_info(DeviceInfo::default())
///     .machine_type(MachineType::Arm)
///     .boot(&mut region, None, RamBackedStorage::new(8 * 1024));
/// ```
#[derive(Debug, Clone, Default)]
pub struct BlackboxBuilder {
    device_info: DeviceInfo,
    machine_type: MachineType,
    build_id: Option<BuildId>,
}

impl BlackboxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity stamped into every captured artifact
    pub fn device_info(mut self, device_info: DeviceInfo) -> Self {
        self.device_info = device_info;
        self
    }

    /// Processor architecture recorded in coredumps
    pub fn machine_type(mut self, machine_type: MachineType) -> Self {
        self.machine_type = machine_type;
        self
    }

    /// Build identifier resolution strategy
    pub fn build_id(mut self, build_id: BuildId) -> Self {
        self.build_id = Some(build_id);
        self
    }

    /// Initialize the diagnostics pipeline for this boot
    ///
    /// Validates (or cold-starts) the reboot tracking region, records the
    /// platform's reset cause, logs the build id, and stands up the
    /// coredump engine over `storage`. Call exactly once, as early in boot
    /// as the platform allows.
    pub fn boot<'a, S: CoredumpStorage>(
        self,
        region: &'a mut [u8; REBOOT_TRACKING_REGION_SIZE],
        bootup_info: Option<&BootupInfo>,
        storage: S,
    ) -> Blackbox<'a, S> {
        let reboot = RebootTracker::boot(region, bootup_info);

        let build_id = self.build_id.unwrap_or(BuildId::None);
        build_id.dump();

        debug!("Diagnostics pipeline booted");
        Blackbox {
            reboot,
            coredump: Coredump::new(storage, self.device_info, self.machine_type),
            build_id,
        }
    }
}

/// The wired-together diagnostics pipeline for one boot
///
/// Owns the reboot tracker and the coredump engine and keeps them
/// consistent: a successful coredump save also flags the reboot tracking
/// region, so the next boot knows a capture is waiting.
pub struct Blackbox<'a, S: CoredumpStorage> {
    reboot: RebootTracker<'a>,
    coredump: Coredump<S>,
    build_id: BuildId,
}

impl<'a, S: CoredumpStorage> Blackbox<'a, S> {
    /// Mark that the application entry point was reached (once per boot)
    pub fn mark_system_started(&mut self) {
        self.reboot.mark_system_started();
    }

    /// Mark this boot as successful, resetting the boot-loop counter
    pub fn mark_system_stable(&mut self) {
        self.reboot.mark_system_stable();
    }

    /// Unexpected restarts since the system was last stable
    pub fn crash_count(&self) -> u32 {
        self.reboot.crash_count()
    }

    /// Record a deliberate reset about to happen
    pub fn mark_reset_imminent(&mut self, reason: RebootReason, regs: Option<RegisterInfo>) {
        self.reboot.mark_reset_imminent(reason, regs);
    }

    /// Destructively read the previous boot's reboot information
    pub fn consume_reset_info(&mut self) -> Option<ResetInfo> {
        self.reboot.consume_reset_info()
    }

    /// Pre-flight check that the declared capture fits the storage
    pub fn check_coredump_size(&self, save_info: &CoredumpSaveInfo) -> bool {
        self.coredump.check_size(save_info)
    }

    /// Required coredump size and storage capacity, for display
    pub fn coredump_size_and_capacity(&self, save_info: &CoredumpSaveInfo) -> (usize, usize) {
        self.coredump.size_and_capacity(save_info)
    }

    /// Crash-path capture; also flags the reboot region on success
    pub fn save_coredump(&mut self, save_info: &CoredumpSaveInfo) -> Result<usize> {
        let written = self.coredump.save(save_info)?;
        self.reboot.mark_coredump_saved();
        Ok(written)
    }

    /// Size of the valid stored coredump, if any
    pub fn has_valid_coredump(&self) -> Option<usize> {
        self.coredump.has_valid_coredump()
    }

    /// Invalidate the stored coredump after it has been uploaded
    pub fn invalidate_coredump(&mut self) {
        self.coredump.invalidate();
    }

    /// The configured build identifier
    pub fn build_id(&self) -> BuildId {
        self.build_id
    }
}
