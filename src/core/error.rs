use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlackboxError {
    #[error("Invalid magic number in reboot tracking region")]
    InvalidMagic,

    #[error("Unsupported reboot tracking layout version: {0}")]
    UnsupportedVersion(u8),

    #[error("Region checksum verification failed")]
    ChecksumMismatch,

    #[error("Encoded header does not fit in a {0}-byte buffer")]
    EncodeOverflow(usize),

    #[error("Event storage full: need {needed} bytes, {free} free")]
    OutOfSpace { needed: usize, free: usize },

    #[error("Zero-length events cannot be stored")]
    EmptyEvent,

    #[error("Coredump storage too small: need {required} bytes, have {capacity}")]
    InsufficientStorage { required: usize, capacity: usize },

    #[error("Coredump storage write failed at offset {0}")]
    StorageWrite(u32),

    #[error("Coredump storage read failed at offset {0}")]
    StorageRead(u32),

    #[error("Coredump storage erase failed")]
    StorageErase,

    #[error("No capture regions declared")]
    NoRegions,

    #[error("A valid coredump is already present")]
    CoredumpPresent,
}

pub type Result<T> = std::result::Result<T, BlackboxError>;
