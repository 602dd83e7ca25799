//! Fuzzes restoring a store from an arbitrary backend image, then running
//! the boot sequence on it.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_restore

#![deny(static_mut_refs)]
#![no_main]

use libfuzzer_sys::fuzz_target;
use lq_diagnostics::{Diagnostics, IMAGE_LEN, MemoryBackend};

fuzz_target!(|data: &[u8]| {
    let Some((&cause, rest)) = data.split_first() else {
        return;
    };
    let Ok(image) = <[u8; IMAGE_LEN]>::try_from(rest.get(..IMAGE_LEN).unwrap_or_default()) else {
        return;
    };

    let diag = Diagnostics::new();
    let restored = diag.restore(&mut MemoryBackend::with_image(image)).unwrap_or(false);
    let before = diag.diagnostics();
    let disposition = diag.set_reset_cause_raw(cause);

    let after = diag.diagnostics();
    if disposition.is_retained() {
        assert!(after.boot_flag >= before.boot_flag);
        assert_eq!(after.pc, before.pc);
    } else {
        assert!(after.is_empty());
        assert_eq!(after.boot_flag, before.boot_flag);
    }
    assert!(restored || before.is_empty());
});
