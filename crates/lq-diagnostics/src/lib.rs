//! # lq-diagnostics
//!
//! Crash and reset diagnostics for cellular IoT firmware.
//!
//! This crate provides a `#![no_std]` diagnostics recorder with:
//! - `Diagnostics`, one state block that survives device resets
//! - Reset-cause-driven retention: fault resets keep the record and count
//!   consecutive fault boots, normal resets clear it
//! - A checksum-guarded application notification callback
//! - Fatal assert and warning entry points (`diag_assert!`,
//!   `diag_assert_warn!`) that capture file id, line, PC and LR
//! - A CRC-protected record image for targets without retained RAM
//!
//! ## Safety Guarantees
//!
//! - **No heap allocations** on any path
//! - **No locks** on the record; writers never wait
//! - **Fail-safe notification**: a corrupted callback handle is skipped,
//!   never called
//! - **Cold-boot contract**: on bare-metal ARM the record keeps its contents
//!   across a warm reset; `set_reset_cause` must run first on every boot so
//!   a cold boot's stale contents are cleared before anything reads them
//!
//! ## Boot Sequence
//!
//! ```text
//!  reset ──► set_reset_cause(cause)
//!              │
//!              ├─ watchdog / system fault ─► keep record, boot_flag += 1
//!              │
//!              └─ anything else ───────────► clear record (boot_flag kept)
//!
//!  register_notify_callback(cb) ──► application runs ──► set_*_state(..)
//!                                                     └─► diag_assert!(..)
//!                                                          │ fails
//!                                                          ▼
//!                                  record pc/lr/file/line, cb(AssertFailed), halt
//! ```
//!
//! ## Example
//!
//! ```rust
//! use lq_diagnostics::prelude::*;
//!
//! static DIAG: Diagnostics = Diagnostics::new();
//!
//! // Early in boot
//! let disposition = DIAG.set_reset_cause(ResetCause::Watchdog);
//! assert!(disposition.is_retained());
//!
//! // Application reports its state as it goes
//! DIAG.set_network_state(1);
//! DIAG.set_application_message(3, "MQTT UP");
//!
//! // Host reads and clears the record
//! let record = DIAG.take().expect("record is set");
//! assert_eq!(record.boot_flag, 1);
//! assert!(DIAG.is_empty());
//! ```

#![no_std]
#![deny(
    unsafe_op_in_unsafe_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![warn(clippy::pedantic)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(any(test, feature = "std"))]
extern crate std;

mod logging;
mod macros;

pub mod arch;
pub mod assert;
pub mod backend;
pub mod error;
pub mod global;
pub mod image;
pub mod notify;
pub mod prelude;
pub mod record;
pub mod reset;
pub mod store;

pub(crate) use logging::{diag_debug, diag_info, diag_warn};

pub use assert::{BreakpointHalt, FaultSite, Halt, line_id};
#[cfg(feature = "std")]
pub use backend::FileBackend;
pub use backend::{MemoryBackend, RetentionBackend};
pub use error::{DiagnosticsError, DiagnosticsResult};
pub use global::{
    DIAGNOSTICS, assert_invoke, assert_warning, clear_diagnostics, diagnostics,
    diagnostics_info, register_notify_callback, set_application_diagnostics,
    set_application_message, set_boot_safe, set_comm_state, set_network_state,
    set_reset_cause, set_reset_cause_raw, set_signal_state,
};
pub use image::IMAGE_LEN;
pub use notify::{NotifyFn, NotifyGate, NotifyKind};
pub use record::{BOOT_FLAG_MAX, DIAGNOSTICS_MAGIC, DiagnosticRecord, NotifyMessage};
pub use reset::{ResetCause, ResetCauses, ResetDisposition, RetentionPolicy};
pub use store::Diagnostics;
