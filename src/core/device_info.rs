//! Device identity stamped into captured artifacts

use serde::{Deserialize, Serialize};

/// Identity of the device and firmware that produced a capture
///
/// These strings are written as dedicated blocks into every coredump so the
/// collection backend can attribute the artifact to an exact device and
/// firmware build.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DeviceInfo {
    /// Globally unique device identifier (e.g. "DEMOSERIAL-0001")
    pub device_serial: String,

    /// Firmware image flavor running on the device (e.g. "main-fw")
    pub software_type: String,

    /// Version of the running firmware (e.g. "1.4.0")
    pub software_version: String,

    /// Board or hardware revision (e.g. "evt2")
    pub hardware_version: String,
}

/// Processor architecture recorded in a coredump
///
/// Values follow the ELF machine enum so the capture can be decoded with
/// standard tooling.
#[repr(u32)]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum MachineType {
    #[default]
    None = 0,
    Arm = 40,
    Xtensa = 94,
}
