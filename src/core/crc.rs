//! Checksum primitives used for region coherency and data integrity
//!
//! Both variants are pure functions that support incremental computation:
//! feed the value returned from one call as the `init`/`state` argument of
//! the next and the result matches a single pass over the whole buffer.
//! Nothing here allocates or blocks, so both are safe to call from fault
//! handler context.

/// Initial accumulator for a fresh CRC-16/XMODEM computation
pub const CRC16_INITIAL_VALUE: u16 = 0x0000;

/// CRC-16/XMODEM (polynomial 0x1021, MSB-first, no reflection)
///
/// Used to protect the reboot tracking region; also available as a generic
/// end-to-end integrity check.
///
/// # Examples
///
/// ```
/// use blackbox_rs::core::crc::{crc16, CRC16_INITIAL_VALUE};
///
/// assert_eq!(crc16(CRC16_INITIAL_VALUE, b"123456789"), 0x31C3);
/// ```
pub fn crc16(init: u16, data: &[u8]) -> u16 {
    let mut crc = init;
    for &byte in data {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// CRC-32 (IEEE) over a whole buffer
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Continue a CRC-32 computation from a previous result
pub fn crc32_update(state: u32, data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new_with_initial(state);
    hasher.update(data);
    hasher.finalize()
}
