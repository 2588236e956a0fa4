//! Core capture subsystems
//!
//! Each module exposes a narrow contract the one above depends on but
//! never reaches back into: CRC primitives at the bottom, then build-id
//! resolution and header encoding, then the reboot-tracking region, then
//! the coredump engine on top.

pub mod batched_events;
pub mod build_id;
pub mod coredump;
pub mod crc;
pub mod device_info;
pub mod error;
pub mod event_storage;
pub mod reboot_tracking;
pub mod storage;
