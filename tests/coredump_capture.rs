//! End-to-end coredump capture against a file-backed storage collaborator
//!
//! The platform side of the storage trait is implemented over a temp file,
//! the way a host-side integration or a filesystem-bearing device would
//! provide it. Exercises the full save/query/invalidate cycle plus the
//! sizing pre-flight.

use std::fs::File;
use std::os::unix::fs::FileExt;

use blackbox_rs::{
    Coredump, CoredumpRegion, CoredumpSaveInfo, CoredumpStorage, DeviceInfo, MachineType,
    RebootReason, StorageInfo,
};

/// A coredump partition backed by a fixed-size file
struct FileStorage {
    file: File,
    capacity: usize,
}

impl FileStorage {
    fn new(capacity: usize) -> Self {
        let file = tempfile::tempfile().unwrap();
        file.set_len(capacity as u64).unwrap();
        FileStorage { file, capacity }
    }
}

impl CoredumpStorage for FileStorage {
    fn info(&self) -> StorageInfo {
        StorageInfo {
            size: self.capacity,
            sector_size: 1,
        }
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> bool {
        if offset as usize + data.len() > self.capacity {
            return false;
        }
        self.file.write_all_at(data, u64::from(offset)).is_ok()
    }

    fn read(&self, offset: u32, buf: &mut [u8]) -> bool {
        if offset as usize + buf.len() > self.capacity {
            return false;
        }
        self.file.read_exact_at(buf, u64::from(offset)).is_ok()
    }

    fn erase(&mut self, offset: u32, len: usize) -> bool {
        self.write(offset, &vec![0u8; len])
    }

    fn clear(&mut self) {
        self.file.write_all_at(&[0u8; 4], 0).ok();
    }
}

fn device_info() -> DeviceInfo {
    DeviceInfo {
        device_serial: "INTEG-0001".to_string(),
        software_type: "main-fw".to_string(),
        software_version: "2.1.0".to_string(),
        hardware_version: "evt3".to_string(),
    }
}

const FAKE_REGS: [u8; 68] = [0xC4; 68]; // Cortex-M style register frame
const FAKE_STACK: [u8; 512] = [0xA5; 512];
const FAKE_BSS: [u8; 300] = [0x3C; 300];

#[test]
fn test_capture_cycle_on_file_storage() {
    let regions = [
        CoredumpRegion::memory(0x2000_0000, &FAKE_STACK),
        CoredumpRegion::memory(0x2000_8000, &FAKE_BSS),
    ];
    let save_info = CoredumpSaveInfo {
        regs: &FAKE_REGS,
        trace_reason: RebootReason::HardFault,
        regions: &regions,
    };

    let mut core = Coredump::new(FileStorage::new(8192), device_info(), MachineType::Arm);

    // Pre-flight passes, nothing stored yet
    assert!(core.check_size(&save_info));
    assert_eq!(core.has_valid_coredump(), None);

    // Crash happens
    let written = core.save(&save_info).unwrap();
    assert_eq!(core.has_valid_coredump(), Some(written));

    // A re-entrant fault must not disturb the capture
    assert!(core.save(&save_info).is_err());
    assert_eq!(core.has_valid_coredump(), Some(written));

    // Uploaded; make room for the next crash
    core.invalidate();
    assert_eq!(core.has_valid_coredump(), None);
    core.save(&save_info).unwrap();
}

#[test]
fn test_sizing_against_undersized_partition() {
    let regions = [CoredumpRegion::memory(0x2000_0000, &FAKE_STACK)];
    let save_info = CoredumpSaveInfo {
        regs: &FAKE_REGS,
        trace_reason: RebootReason::SoftwareWatchdog,
        regions: &regions,
    };

    let probe = Coredump::new(FileStorage::new(16), device_info(), MachineType::Arm);
    let (required, _) = probe.size_and_capacity(&save_info);

    let exact = Coredump::new(FileStorage::new(required), device_info(), MachineType::Arm);
    assert!(exact.check_size(&save_info));

    let short = Coredump::new(
        FileStorage::new(required - 1),
        device_info(),
        MachineType::Arm,
    );
    assert!(!short.check_size(&save_info));
    let (need, have) = short.size_and_capacity(&save_info);
    assert_eq!(need, required);
    assert_eq!(have, required - 1);
}

#[test]
fn test_capture_contains_identity_and_payloads() {
    let regions = [CoredumpRegion::memory(0x2000_0000, &FAKE_STACK)];
    let save_info = CoredumpSaveInfo {
        regs: &FAKE_REGS,
        trace_reason: RebootReason::Assert,
        regions: &regions,
    };

    let mut core = Coredump::new(FileStorage::new(8192), device_info(), MachineType::Arm);
    let written = core.save(&save_info).unwrap();

    let mut dump = vec![0u8; written];
    assert!(core.storage().read(0, &mut dump));

    // Header: magic "CORE", version, total size
    assert_eq!(&dump[0..4], &0x4552_4F43u32.to_le_bytes());
    assert_eq!(
        u32::from_le_bytes([dump[8], dump[9], dump[10], dump[11]]) as usize,
        written
    );

    // The identity strings and captured payloads are in the image
    let haystack = dump.as_slice();
    for needle in [&b"INTEG-0001"[..], b"2.1.0", b"evt3"] {
        assert!(
            haystack.windows(needle.len()).any(|w| w == needle),
            "missing identity bytes"
        );
    }
    assert!(haystack
        .windows(FAKE_STACK.len())
        .any(|w| w == FAKE_STACK));
}

#[test]
fn test_failing_storage_aborts_without_header() {
    /// Storage that accepts the erase but fails all subsequent writes,
    /// like flash that lost power mid-crash.
    struct FlakyStorage {
        inner: blackbox_rs::RamBackedStorage,
        writes_allowed: usize,
    }

    impl CoredumpStorage for FlakyStorage {
        fn info(&self) -> StorageInfo {
            self.inner.info()
        }
        fn write(&mut self, offset: u32, data: &[u8]) -> bool {
            if self.writes_allowed == 0 {
                return false;
            }
            self.writes_allowed -= 1;
            self.inner.write(offset, data)
        }
        fn read(&self, offset: u32, buf: &mut [u8]) -> bool {
            self.inner.read(offset, buf)
        }
        fn erase(&mut self, offset: u32, len: usize) -> bool {
            self.inner.erase(offset, len)
        }
        fn clear(&mut self) {
            self.inner.clear();
        }
    }

    let regions = [CoredumpRegion::memory(0x2000_0000, &FAKE_BSS)];
    let save_info = CoredumpSaveInfo {
        regs: &FAKE_REGS,
        trace_reason: RebootReason::BrownOutReset,
        regions: &regions,
    };

    let storage = FlakyStorage {
        inner: blackbox_rs::RamBackedStorage::new(4096),
        writes_allowed: 3,
    };
    let mut core = Coredump::new(storage, device_info(), MachineType::Arm);

    assert!(core.save(&save_info).is_err());
    // No header was written, so the partial capture is invisible
    assert_eq!(core.has_valid_coredump(), None);
}
