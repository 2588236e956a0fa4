//! Coredump storage collaborator
//!
//! The capture engine is storage-agnostic: the platform supplies a backend
//! (flash partition, noinit RAM section, file, ...) through the
//! [`CoredumpStorage`] trait. All methods report failure with a plain
//! `bool` and must not allocate or block: they are invoked from
//! fault-handler context with interrupts masked.

use serde::{Deserialize, Serialize};

/// Capacity characteristics of a coredump storage backend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StorageInfo {
    /// Total capacity in bytes available for a coredump
    pub size: usize,

    /// Erase granularity of the medium (1 for RAM-like backends)
    pub sector_size: usize,
}

/// Backend the platform provides for persisting coredumps
pub trait CoredumpStorage {
    /// Capacity of the storage region; recomputed on each query
    fn info(&self) -> StorageInfo;

    /// Write `data` at `offset` within the region
    fn write(&mut self, offset: u32, data: &[u8]) -> bool;

    /// Read into `buf` from `offset` within the region
    fn read(&self, offset: u32, buf: &mut [u8]) -> bool;

    /// Erase `len` bytes starting at `offset`
    fn erase(&mut self, offset: u32, len: usize) -> bool;

    /// Invalidate any stored coredump so the next crash can be captured
    ///
    /// Zeroing the first bytes is sufficient: validity hinges on the
    /// header magic.
    fn clear(&mut self);
}

/// RAM-backed reference storage
///
/// Useful on systems that park coredumps in a noinit RAM section to be
/// read out after the post-crash reboot, and as the test double for the
/// capture engine.
#[derive(Debug, Clone)]
pub struct RamBackedStorage {
    buf: Vec<u8>,
}

impl RamBackedStorage {
    pub fn new(capacity: usize) -> Self {
        RamBackedStorage {
            buf: vec![0u8; capacity],
        }
    }

    /// Raw view of the backing buffer, for readout and tests
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

impl CoredumpStorage for RamBackedStorage {
    fn info(&self) -> StorageInfo {
        StorageInfo {
            size: self.buf.len(),
            sector_size: 1,
        }
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> bool {
        let start = offset as usize;
        let Some(end) = start.checked_add(data.len()) else {
            return false;
        };
        if end > self.buf.len() {
            return false;
        }
        self.buf[start..end].copy_from_slice(data);
        true
    }

    fn read(&self, offset: u32, buf: &mut [u8]) -> bool {
        let start = offset as usize;
        let Some(end) = start.checked_add(buf.len()) else {
            return false;
        };
        if end > self.buf.len() {
            return false;
        }
        buf.copy_from_slice(&self.buf[start..end]);
        true
    }

    fn erase(&mut self, offset: u32, len: usize) -> bool {
        let start = offset as usize;
        let Some(end) = start.checked_add(len) else {
            return false;
        };
        if end > self.buf.len() {
            return false;
        }
        self.buf[start..end].fill(0);
        true
    }

    fn clear(&mut self) {
        let len = self.buf.len().min(4);
        self.buf[..len].fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ram_storage_round_trip() {
        let mut storage = RamBackedStorage::new(64);
        assert!(storage.write(8, b"hello"));

        let mut buf = [0u8; 5];
        assert!(storage.read(8, &mut buf));
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn test_ram_storage_bounds_checked() {
        let mut storage = RamBackedStorage::new(16);
        assert!(!storage.write(12, b"too long"));
        let mut buf = [0u8; 8];
        assert!(!storage.read(12, &mut buf));
        assert!(!storage.erase(0, 17));
    }

    #[test]
    fn test_clear_wipes_leading_bytes() {
        let mut storage = RamBackedStorage::new(16);
        assert!(storage.write(0, &[0xAA; 16]));
        storage.clear();
        assert_eq!(&storage.as_bytes()[..4], &[0, 0, 0, 0]);
        assert_eq!(storage.as_bytes()[4], 0xAA);
    }
}
