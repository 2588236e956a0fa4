//! Batched-event header encoding
//!
//! When several stored events are drained as one transmission payload, a
//! small CBOR prefix tells the reader how many discrete events follow. A
//! single event is stored unwrapped, so readers distinguish "N batched
//! events" from "one bare event" by the presence of this header alone. The
//! writer never needs to know the events' total byte length in advance.

use crate::core::error::{BlackboxError, Result};

/// Worst-case encoded size of the header: 1-byte CBOR type marker plus a
/// 4-byte big-endian count.
pub const BATCHED_EVENTS_HEADER_MAX_LEN: usize = 5;

/// A CBOR definite-length array prefix for a batch of events
///
/// `length` is 0 when no header is needed (zero or one event).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchedEventsHeader {
    pub data: [u8; BATCHED_EVENTS_HEADER_MAX_LEN],
    pub length: usize,
}

impl BatchedEventsHeader {
    /// The encoded header bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.length]
    }
}

// CBOR major type 4 (array), definite length
const CBOR_MAJOR_TYPE_ARRAY: u8 = 4 << 5;

/// Encode a CBOR array-begin marker for `count` elements into `out`
///
/// Writes only the prefix, never any array elements. Fails with
/// [`BlackboxError::EncodeOverflow`] instead of writing past the end of
/// `out`.
fn encode_array_begin(count: u32, out: &mut [u8]) -> Result<usize> {
    let needed = match count {
        0..=23 => 1,
        24..=0xff => 2,
        0x100..=0xffff => 3,
        _ => 5,
    };
    if out.len() < needed {
        return Err(BlackboxError::EncodeOverflow(out.len()));
    }

    match needed {
        1 => out[0] = CBOR_MAJOR_TYPE_ARRAY | count as u8,
        2 => {
            out[0] = CBOR_MAJOR_TYPE_ARRAY | 24;
            out[1] = count as u8;
        }
        3 => {
            out[0] = CBOR_MAJOR_TYPE_ARRAY | 25;
            out[1..3].copy_from_slice(&(count as u16).to_be_bytes());
        }
        _ => {
            out[0] = CBOR_MAJOR_TYPE_ARRAY | 26;
            out[1..5].copy_from_slice(&count.to_be_bytes());
        }
    }
    Ok(needed)
}

/// Build the header for a batch of `num_events` events
///
/// Zero or one event needs no header and yields `length == 0`.
///
/// # Examples
///
/// ```
/// use blackbox_rs::core::batched_events::build_header;
///
/// assert_eq!(build_header(1).length, 0);
/// assert_eq!(build_header(2).as_bytes(), &[0x82]);
/// ```
pub fn build_header(num_events: u32) -> BatchedEventsHeader {
    let mut header = BatchedEventsHeader::default();
    if num_events <= 1 {
        return header;
    }

    // The buffer is sized for the largest encoding, so this cannot fail.
    match encode_array_begin(num_events, &mut header.data) {
        Ok(len) => header.length = len,
        Err(_) => header.length = 0,
    }
    header
}
