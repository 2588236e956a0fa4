//! Event storage and batched-header integration
//!
//! A reader of the drained payload must be able to tell "N batched events
//! follow" from "one bare event" using only the CBOR prefix.

use blackbox_rs::{build_header, BlackboxError, EventStorage};

#[test]
fn test_reader_distinguishes_single_from_batched() {
    let mut storage = EventStorage::new(256);
    storage.store(b"\xA1\x01\x02").unwrap(); // some CBOR map event

    // One event: payload is bare, first byte is the event itself
    let single = storage.drain_batch().unwrap();
    assert_eq!(single[0], 0xA1);

    storage.store(b"\xA1\x01\x02").unwrap();
    storage.store(b"\xA1\x03\x04").unwrap();

    // Two events: array-of-2 prefix, then both payloads
    let batch = storage.drain_batch().unwrap();
    assert_eq!(batch[0], 0x82);
    assert_eq!(&batch[1..4], b"\xA1\x01\x02");
    assert_eq!(&batch[4..], b"\xA1\x03\x04");
}

#[test]
fn test_header_grows_with_batch_size() {
    let mut storage = EventStorage::new(4096);
    for _ in 0..30 {
        storage.store(b"e").unwrap();
    }

    let batch = storage.drain_batch().unwrap();
    // 30 events needs the two-byte header form
    assert_eq!(&batch[0..2], &[0x98, 30]);
    assert_eq!(batch.len(), 2 + 30);
}

#[test]
fn test_storage_refills_after_drain() {
    let mut storage = EventStorage::new(12);
    storage.store(b"0123456789").unwrap();
    assert_eq!(
        storage.store(b"x"),
        Err(BlackboxError::OutOfSpace { needed: 3, free: 0 })
    );

    storage.drain_batch().unwrap();
    assert_eq!(storage.bytes_free(), 12);
    storage.store(b"x").unwrap();
    assert_eq!(storage.drain_batch().unwrap(), b"x");
}

#[test]
fn test_known_header_encodings() {
    assert_eq!(build_header(0).as_bytes(), &[] as &[u8]);
    assert_eq!(build_header(1).as_bytes(), &[] as &[u8]);
    assert_eq!(build_header(2).as_bytes(), &[0x82]);
    assert_eq!(
        build_header(1_000_000).as_bytes(),
        &[0x9a, 0x00, 0x0f, 0x42, 0x40]
    );
}
