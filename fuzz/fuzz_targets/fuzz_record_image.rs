//! Fuzzes the persisted record image decoder.
//!
//! Any accepted image must re-encode to the same 52 bytes.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_record_image

#![deny(static_mut_refs)]
#![no_main]

use libfuzzer_sys::fuzz_target;
use lq_diagnostics::{DiagnosticRecord, IMAGE_LEN};

fuzz_target!(|data: &[u8]| {
    // Must never panic on arbitrary bytes.
    if let Ok(record) = DiagnosticRecord::from_image(data) {
        assert_eq!(&record.to_image()[..], &data[..IMAGE_LEN]);
    }
});
