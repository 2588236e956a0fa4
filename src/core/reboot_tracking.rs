//! Reboot tracking region
//!
//! A fixed 256-byte region of persistent memory (RAM kept out of the
//! zero-init sections, battery-backed SRAM, RTC memory, ...) that records
//! boot and crash state across resets. The region is written before any
//! RTOS or heap setup exists and may be mutated from fault-handler context,
//! so every operation here is a bounded sequence of memory stores plus one
//! checksum recompute: no locks, no allocation, no blocking.
//!
//! The layout is byte-stable so firmware images sharing the region (e.g.
//! bootloader and main image, or pre/post OTA images) interoperate:
//!
//! ```text
//! offset  0  magic (u32 LE)
//! offset  4  layout version (u8)
//! offset  5  started flag (u8)
//! offset  6  stable flag (u8)
//! offset  7  coredump-saved flag (u8)
//! offset  8  crash count (u32 LE)
//! offset 12  last reboot reason (u32 LE, 0xFFFF_FFFF when unset)
//! offset 16  pc (u32 LE)
//! offset 20  lr (u32 LE)
//! offset 24  hardware reset reason register (u32 LE)
//! offset 28  reserved, zero filled
//! offset 254 crc16 (u16 LE, computed over bytes 0..254)
//! ```
//!
//! A region whose checksum does not match is treated as a cold start and
//! reinitialized to defaults; losing prior crash history on first boot or
//! after a layout change is expected.

use crate::core::crc::{crc16, CRC16_INITIAL_VALUE};
use crate::core::error::{BlackboxError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Size of the persistent region in bytes
pub const REBOOT_TRACKING_REGION_SIZE: usize = 256;

/// Sentinel stored in the reason field when no reboot reason was recorded
pub const REBOOT_REASON_NOT_SET: u32 = 0xFFFF_FFFF;

const REGION_MAGIC: u32 = 0x5842_4C42; // "BLBX"
const REGION_VERSION: u8 = 1;

const MAGIC_OFFSET: usize = 0;
const VERSION_OFFSET: usize = 4;
const STARTED_OFFSET: usize = 5;
const STABLE_OFFSET: usize = 6;
const COREDUMP_SAVED_OFFSET: usize = 7;
const CRASH_COUNT_OFFSET: usize = 8;
const REASON_OFFSET: usize = 12;
const PC_OFFSET: usize = 16;
const LR_OFFSET: usize = 20;
const RESET_REASON_REG_OFFSET: usize = 24;
const CRC_OFFSET: usize = 254;

/// Why a reboot happened
///
/// Values below 0x8000 are deliberate resets; values at or above 0x8000
/// (and `Unknown`) indicate a crash or error condition.
#[repr(u32)]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RebootReason {
    Unknown = 0x0000,

    // Expected resets
    UserShutdown = 0x0001,
    UserReset = 0x0002,
    FirmwareUpdate = 0x0003,
    LowPower = 0x0004,
    DebuggerHalted = 0x0005,
    ButtonReset = 0x0006,
    PowerOnReset = 0x0007,
    SoftwareReset = 0x0008,
    DeepSleep = 0x0009,
    PinReset = 0x000A,

    // Unexpected resets
    UnknownError = 0x8000,
    Assert = 0x8001,
    BrownOutReset = 0x8003,
    Nmi = 0x8004,
    HardwareWatchdog = 0x8005,
    SoftwareWatchdog = 0x8006,
    ClockFailure = 0x8007,
    KernelPanic = 0x8008,
    FirmwareUpdateError = 0x8009,
    OutOfMemory = 0x800A,
    StackOverflow = 0x800B,

    // Arm fault resets
    BusFault = 0x9100,
    MemFault = 0x9200,
    UsageFault = 0x9300,
    HardFault = 0x9400,
    Lockup = 0x9401,
}

impl RebootReason {
    /// Parse a reason from its stored value
    ///
    /// Unknown values map to `Unknown` for forward compatibility.
    pub fn from_u32(value: u32) -> Self {
        match value {
            0x0001 => Self::UserShutdown,
            0x0002 => Self::UserReset,
            0x0003 => Self::FirmwareUpdate,
            0x0004 => Self::LowPower,
            0x0005 => Self::DebuggerHalted,
            0x0006 => Self::ButtonReset,
            0x0007 => Self::PowerOnReset,
            0x0008 => Self::SoftwareReset,
            0x0009 => Self::DeepSleep,
            0x000A => Self::PinReset,
            0x8000 => Self::UnknownError,
            0x8001 => Self::Assert,
            0x8003 => Self::BrownOutReset,
            0x8004 => Self::Nmi,
            0x8005 => Self::HardwareWatchdog,
            0x8006 => Self::SoftwareWatchdog,
            0x8007 => Self::ClockFailure,
            0x8008 => Self::KernelPanic,
            0x8009 => Self::FirmwareUpdateError,
            0x800A => Self::OutOfMemory,
            0x800B => Self::StackOverflow,
            0x9100 => Self::BusFault,
            0x9200 => Self::MemFault,
            0x9300 => Self::UsageFault,
            0x9400 => Self::HardFault,
            0x9401 => Self::Lockup,
            _ => Self::Unknown,
        }
    }

    /// True for deliberate resets, false for crash-class reasons
    pub fn is_expected(&self) -> bool {
        let value = *self as u32;
        value != 0 && value < 0x8000
    }
}

/// Register snapshot recorded alongside a reboot reason
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RegisterInfo {
    pub pc: u32,
    pub lr: u32,
}

/// Reset cause information supplied by the platform at boot
///
/// Most MCUs expose a register revealing why the chip reset (brown-out,
/// watchdog, pin reset, ...); its raw value is preserved for postmortem
/// analysis alongside the decoded reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootupInfo {
    pub reset_reason_reg: u32,
    pub reason: RebootReason,
}

/// Reboot information recovered from the previous boot
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResetInfo {
    pub reason: RebootReason,
    pub pc: u32,
    pub lr: u32,
    pub reset_reason_reg: u32,
    pub coredump_saved: bool,
}

/// Validate the coherency of a reboot tracking region
///
/// A region is valid only when its magic, layout version and checksum all
/// match. Anything else is indistinguishable from uninitialized memory.
pub fn validate(region: &[u8; REBOOT_TRACKING_REGION_SIZE]) -> Result<()> {
    let magic = u32::from_le_bytes([region[0], region[1], region[2], region[3]]);
    if magic != REGION_MAGIC {
        return Err(BlackboxError::InvalidMagic);
    }

    let version = region[VERSION_OFFSET];
    if version != REGION_VERSION {
        return Err(BlackboxError::UnsupportedVersion(version));
    }

    let stored = u16::from_le_bytes([region[CRC_OFFSET], region[CRC_OFFSET + 1]]);
    if stored != crc16(CRC16_INITIAL_VALUE, &region[..CRC_OFFSET]) {
        return Err(BlackboxError::ChecksumMismatch);
    }

    Ok(())
}

/// State machine over the persistent reboot tracking region
///
/// Holds exclusive access to the region for the lifetime of the boot.
/// Constructed exactly once, very early, before any other diagnostics touch
/// the region.
pub struct RebootTracker<'a> {
    region: &'a mut [u8; REBOOT_TRACKING_REGION_SIZE],
}

impl<'a> RebootTracker<'a> {
    /// Validate or initialize the region and record this boot's reset cause
    ///
    /// An invalid region (first-ever boot, power loss, corruption, layout
    /// change) is zero-initialized to defaults; a valid one is preserved
    /// intact so crash counts and recorded reasons survive the reset.
    pub fn boot(
        region: &'a mut [u8; REBOOT_TRACKING_REGION_SIZE],
        bootup_info: Option<&BootupInfo>,
    ) -> Self {
        let mut tracker = RebootTracker { region };

        if let Err(err) = validate(tracker.region) {
            debug!("Reboot tracking region invalid ({err}), cold start");
            tracker.reinitialize();
        }

        if let Some(info) = bootup_info {
            tracker.write_u32(RESET_REASON_REG_OFFSET, info.reset_reason_reg);
            tracker.record_reason(info.reason, None);
            tracker.finalize();
        }

        tracker
    }

    /// Record why a deliberate reset is about to happen
    ///
    /// Called right before the platform reset primitive, possibly from
    /// fault-handler context with interrupts masked. An already-recorded
    /// reason is kept: the first reboot in a loop reveals what started it.
    pub fn mark_reset_imminent(&mut self, reason: RebootReason, regs: Option<RegisterInfo>) {
        self.record_reason(reason, regs);
        self.finalize();
    }

    /// Mark that the system reached its application entry point
    ///
    /// Call once per boot. If the previous boot started but never reached
    /// stable, the crash counter is incremented: repeated increments model
    /// a boot loop. The threshold that triggers rollback or recovery is the
    /// bootloader/OTA collaborator's decision.
    pub fn mark_system_started(&mut self) {
        let looped = self.region[STARTED_OFFSET] != 0 && self.region[STABLE_OFFSET] == 0;
        if looped {
            let count = self.read_u32(CRASH_COUNT_OFFSET).saturating_add(1);
            self.write_u32(CRASH_COUNT_OFFSET, count);
        }
        self.region[STARTED_OFFSET] = 1;
        self.region[STABLE_OFFSET] = 0;
        self.finalize();
    }

    /// Mark this boot as successful, resetting the boot-loop counter
    pub fn mark_system_stable(&mut self) {
        self.region[STABLE_OFFSET] = 1;
        self.write_u32(CRASH_COUNT_OFFSET, 0);
        self.finalize();
    }

    /// Number of unexpected restarts since the system was last stable
    pub fn crash_count(&self) -> u32 {
        self.read_u32(CRASH_COUNT_OFFSET)
    }

    /// Flag that the crash path persisted a coredump before resetting
    pub fn mark_coredump_saved(&mut self) {
        self.region[COREDUMP_SAVED_OFFSET] = 1;
        self.finalize();
    }

    /// Destructively read the reboot information left by the previous boot
    ///
    /// Returns `None` when nothing was recorded. The recorded reason and
    /// register snapshot are cleared afterwards so each reset is reported
    /// exactly once.
    pub fn consume_reset_info(&mut self) -> Option<ResetInfo> {
        let raw_reason = self.read_u32(REASON_OFFSET);
        let reset_reason_reg = self.read_u32(RESET_REASON_REG_OFFSET);
        if raw_reason == REBOOT_REASON_NOT_SET && reset_reason_reg == 0 {
            return None;
        }

        let info = ResetInfo {
            reason: RebootReason::from_u32(raw_reason),
            pc: self.read_u32(PC_OFFSET),
            lr: self.read_u32(LR_OFFSET),
            reset_reason_reg,
            coredump_saved: self.region[COREDUMP_SAVED_OFFSET] != 0,
        };

        self.write_u32(REASON_OFFSET, REBOOT_REASON_NOT_SET);
        self.write_u32(PC_OFFSET, 0);
        self.write_u32(LR_OFFSET, 0);
        self.write_u32(RESET_REASON_REG_OFFSET, 0);
        self.region[COREDUMP_SAVED_OFFSET] = 0;
        self.finalize();

        Some(info)
    }

    fn record_reason(&mut self, reason: RebootReason, regs: Option<RegisterInfo>) {
        if self.read_u32(REASON_OFFSET) != REBOOT_REASON_NOT_SET {
            return;
        }
        self.write_u32(REASON_OFFSET, reason as u32);
        if let Some(regs) = regs {
            self.write_u32(PC_OFFSET, regs.pc);
            self.write_u32(LR_OFFSET, regs.lr);
        }
    }

    fn reinitialize(&mut self) {
        self.region.fill(0);
        self.write_u32(MAGIC_OFFSET, REGION_MAGIC);
        self.region[VERSION_OFFSET] = REGION_VERSION;
        self.write_u32(REASON_OFFSET, REBOOT_REASON_NOT_SET);
        self.finalize();
    }

    /// Recompute the coherency checksum after a mutation
    fn finalize(&mut self) {
        let crc = crc16(CRC16_INITIAL_VALUE, &self.region[..CRC_OFFSET]);
        self.region[CRC_OFFSET..].copy_from_slice(&crc.to_le_bytes());
    }

    fn read_u32(&self, offset: usize) -> u32 {
        u32::from_le_bytes([
            self.region[offset],
            self.region[offset + 1],
            self.region[offset + 2],
            self.region[offset + 3],
        ])
    }

    fn write_u32(&mut self, offset: usize, value: u32) {
        self.region[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }
}
