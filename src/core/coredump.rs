//! Coredump capture & storage sizing
//!
//! Freezes register state and platform-declared memory regions into a
//! [`CoredumpStorage`] backend at crash time, and answers the sizing
//! questions an integrator needs before shipping: does my storage partition
//! fit everything I asked to capture?
//!
//! Stored format: a 12-byte header (magic, version, total size) followed by
//! typed blocks, each a 12-byte block header plus payload. The coredump
//! header is written **last**, so its magic doubles as the validity marker:
//! a crash mid-save leaves no magic and the partial capture is ignored.
//!
//! `save` runs in fault-handler context. Nothing on that path allocates,
//! locks, logs, or retries: a failed write aborts the capture rather than
//! risking an infinite fault loop.

use crate::core::device_info::{DeviceInfo, MachineType};
use crate::core::error::{BlackboxError, Result};
use crate::core::reboot_tracking::RebootReason;
use crate::core::storage::CoredumpStorage;
use tracing::{debug, error};

pub const COREDUMP_MAGIC: u32 = 0x4552_4F43; // "CORE"
pub const COREDUMP_VERSION: u32 = 1;

const HEADER_LEN: usize = 12;
const BLOCK_HEADER_LEN: usize = 12;
const WORD_SIZE: usize = 4;

/// Typed blocks within a stored coredump
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockType {
    CurrentRegisters = 0,
    MemoryRegion = 1,
    DeviceSerial = 2,
    SoftwareVersion = 3,
    HardwareRevision = 4,
    TraceReason = 5,
    Padding = 6,
    MachineType = 7,
}

/// What a platform-declared capture region contains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    /// A plain memory range (RAM sections, stacks, log buffers, ...)
    Memory,

    /// Bytes identifying the running image
    ImageIdentifier,
}

/// One memory range the platform wants captured on crash
#[derive(Debug, Clone, Copy)]
pub struct CoredumpRegion<'a> {
    pub kind: RegionKind,
    /// Original address of the range on the device, for the decoder
    pub address: u32,
    pub data: &'a [u8],
}

impl<'a> CoredumpRegion<'a> {
    /// Declare a plain memory capture region
    pub fn memory(address: u32, data: &'a [u8]) -> Self {
        CoredumpRegion {
            kind: RegionKind::Memory,
            address,
            data,
        }
    }
}

/// Everything the fault handler passes in at crash time
#[derive(Debug, Clone, Copy)]
pub struct CoredumpSaveInfo<'a> {
    /// Architecture-specific register frame captured by the fault handler
    pub regs: &'a [u8],

    /// Why the capture is happening
    pub trace_reason: RebootReason,

    /// The set of regions the platform declared for capture
    pub regions: &'a [CoredumpRegion<'a>],
}

// Every byte flows through a sink so the same block-writing code serves
// both the real save and the dry-run size computation.
trait BlockSink {
    fn put(&mut self, bytes: &[u8]) -> bool;
    fn offset(&self) -> usize;
}

struct StorageSink<'a, S: CoredumpStorage> {
    storage: &'a mut S,
    offset: usize,
}

impl<S: CoredumpStorage> BlockSink for StorageSink<'_, S> {
    fn put(&mut self, bytes: &[u8]) -> bool {
        if !self.storage.write(self.offset as u32, bytes) {
            return false;
        }
        self.offset += bytes.len();
        true
    }

    fn offset(&self) -> usize {
        self.offset
    }
}

struct SizeSink {
    offset: usize,
}

impl BlockSink for SizeSink {
    fn put(&mut self, bytes: &[u8]) -> bool {
        self.offset += bytes.len();
        true
    }

    fn offset(&self) -> usize {
        self.offset
    }
}

fn encode_header(total_size: usize) -> [u8; HEADER_LEN] {
    let mut bytes = [0u8; HEADER_LEN];
    bytes[0..4].copy_from_slice(&COREDUMP_MAGIC.to_le_bytes());
    bytes[4..8].copy_from_slice(&COREDUMP_VERSION.to_le_bytes());
    bytes[8..12].copy_from_slice(&(total_size as u32).to_le_bytes());
    bytes
}

fn write_block<W: BlockSink>(
    sink: &mut W,
    block_type: BlockType,
    address: u32,
    payload: &[u8],
) -> bool {
    let mut header = [0u8; BLOCK_HEADER_LEN];
    header[0] = block_type as u8;
    header[4..8].copy_from_slice(&address.to_le_bytes());
    header[8..12].copy_from_slice(&(payload.len() as u32).to_le_bytes());

    sink.put(&header) && (payload.is_empty() || sink.put(payload))
}

// Register and memory payloads must land word-aligned so decoders can do
// aligned accesses. Block headers are 12 bytes, so a padding block whose
// payload rounds the offset up restores alignment for everything after it.
fn align_to_word<W: BlockSink>(sink: &mut W) -> bool {
    let remainder = sink.offset() % WORD_SIZE;
    if remainder == 0 {
        return true;
    }
    let pad = [0u8; WORD_SIZE - 1];
    write_block(sink, BlockType::Padding, 0, &pad[..WORD_SIZE - remainder])
}

/// Coredump capture engine over a platform storage backend
pub struct Coredump<S: CoredumpStorage> {
    storage: S,
    device_info: DeviceInfo,
    machine_type: MachineType,
}

impl<S: CoredumpStorage> Coredump<S> {
    pub fn new(storage: S, device_info: DeviceInfo, machine_type: MachineType) -> Self {
        Coredump {
            storage,
            device_info,
            machine_type,
        }
    }

    /// The underlying storage backend, for readout
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Bytes a coredump for `save_info` would occupy
    ///
    /// A dry run of the save path through a counting sink, so the result
    /// tracks the real format exactly: header, register block, device-info
    /// blocks, trace reason, declared regions and alignment padding.
    pub fn compute_size_required(&self, save_info: &CoredumpSaveInfo) -> usize {
        let mut sink = SizeSink { offset: HEADER_LEN };
        // The counting sink cannot fail.
        let _ = write_body(&mut sink, save_info, &self.device_info, self.machine_type);
        sink.offset()
    }

    /// Pre-flight check: will the declared capture fit the storage?
    ///
    /// Run this at boot in development builds to size the storage partition
    /// correctly. A shortfall is a configuration error, logged with both
    /// numbers; it never blocks boot. An exact fit passes.
    pub fn check_size(&self, save_info: &CoredumpSaveInfo) -> bool {
        let (required, capacity) = self.size_and_capacity(save_info);
        if required <= capacity {
            return true;
        }
        error!(
            "Coredump storage too small: need {} bytes, have {}",
            required, capacity
        );
        false
    }

    /// Required size and storage capacity, for diagnostic display
    pub fn size_and_capacity(&self, save_info: &CoredumpSaveInfo) -> (usize, usize) {
        (
            self.compute_size_required(save_info),
            self.storage.info().size,
        )
    }

    /// Crash-path capture: freeze registers and declared regions to storage
    ///
    /// Safe against re-entrant faults: a valid coredump already in storage
    /// is never overwritten, so a fault during fault handling cannot
    /// corrupt an earlier capture. Best-effort beyond that: a storage
    /// failure aborts without retry. Returns the total bytes written.
    pub fn save(&mut self, save_info: &CoredumpSaveInfo) -> Result<usize> {
        let capacity = self.storage.info().size;
        if capacity == 0 {
            return Err(BlackboxError::InsufficientStorage {
                required: HEADER_LEN,
                capacity: 0,
            });
        }

        match self.read_header() {
            None => return Err(BlackboxError::StorageRead(0)),
            Some((magic, _, _)) if magic == COREDUMP_MAGIC => {
                return Err(BlackboxError::CoredumpPresent);
            }
            Some(_) => {}
        }

        if save_info.regions.is_empty() {
            return Err(BlackboxError::NoRegions);
        }

        if !self.storage.erase(0, capacity) {
            return Err(BlackboxError::StorageErase);
        }

        let mut sink = StorageSink {
            storage: &mut self.storage,
            offset: HEADER_LEN,
        };
        if !write_body(&mut sink, save_info, &self.device_info, self.machine_type) {
            return Err(BlackboxError::StorageWrite(sink.offset as u32));
        }
        let total = sink.offset;

        // Header last: its magic marks the capture valid.
        if !self.storage.write(0, &encode_header(total)) {
            return Err(BlackboxError::StorageWrite(0));
        }

        Ok(total)
    }

    /// Size of the valid coredump in storage, if one is present
    pub fn has_valid_coredump(&self) -> Option<usize> {
        let (magic, version, total_size) = self.read_header()?;
        if magic != COREDUMP_MAGIC || version != COREDUMP_VERSION {
            return None;
        }
        Some(total_size as usize)
    }

    /// Invalidate the stored coredump so the next crash can be captured
    pub fn invalidate(&mut self) {
        debug!("Invalidating stored coredump");
        self.storage.clear();
    }

    fn read_header(&self) -> Option<(u32, u32, u32)> {
        let mut bytes = [0u8; HEADER_LEN];
        if !self.storage.read(0, &mut bytes) {
            return None;
        }
        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let total_size = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        Some((magic, version, total_size))
    }
}

fn write_body<W: BlockSink>(
    sink: &mut W,
    save_info: &CoredumpSaveInfo,
    device_info: &DeviceInfo,
    machine_type: MachineType,
) -> bool {
    if !save_info.regs.is_empty()
        && !write_block(sink, BlockType::CurrentRegisters, 0, save_info.regs)
    {
        return false;
    }

    for (block_type, value) in [
        (BlockType::DeviceSerial, &device_info.device_serial),
        (BlockType::SoftwareVersion, &device_info.software_version),
        (BlockType::HardwareRevision, &device_info.hardware_version),
    ] {
        if !value.is_empty() && !write_block(sink, block_type, 0, value.as_bytes()) {
            return false;
        }
    }

    let machine = (machine_type as u32).to_le_bytes();
    if !write_block(sink, BlockType::MachineType, 0, &machine) {
        return false;
    }

    let reason = (save_info.trace_reason as u32).to_le_bytes();
    if !write_block(sink, BlockType::TraceReason, 0, &reason) {
        return false;
    }

    for region in save_info.regions {
        if !align_to_word(sink) {
            return false;
        }
        // Both region kinds are stored as memory blocks; the decoder tells
        // them apart by address.
        if !write_block(sink, BlockType::MemoryRegion, region.address, region.data) {
            return false;
        }
    }

    true
}
