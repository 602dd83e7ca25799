//! The process-wide diagnostics instance and its free-function entry points.
//!
//! On bare-metal ARM [`DIAGNOSTICS`] lives in `.uninit.lq_diagnostics`, which
//! the `cortex-m-rt` startup code neither zero-fills nor initializes. Its
//! contents therefore survive a warm reset and start out as whatever the RAM
//! held on a cold boot. Rust only treats that memory as initialized once it
//! has been written, so boards must initialize the section on a power-on
//! reset (startup code or bootloader) and call [`set_reset_cause`] before
//! anything reads the record. The callback handle is only ever called
//! through its fingerprint check.
//!
//! On other targets the instance is an ordinary static; combine it with a
//! [`RetentionBackend`](crate::RetentionBackend) for persistence.

use crate::assert::{BreakpointHalt, FaultSite};
use crate::notify::NotifyFn;
use crate::record::DiagnosticRecord;
use crate::reset::{ResetCause, ResetDisposition};
use crate::store::Diagnostics;

/// The device's diagnostics state block.
#[cfg_attr(
    all(target_arch = "arm", target_os = "none"),
    expect(unsafe_code, reason = "retained placement needs a link section"),
    unsafe(link_section = ".uninit.lq_diagnostics")
)]
pub static DIAGNOSTICS: Diagnostics = Diagnostics::new();

/// The device's diagnostics state block.
#[inline]
#[must_use]
pub fn diagnostics() -> &'static Diagnostics {
    &DIAGNOSTICS
}

/// Register the application notification callback.
pub fn register_notify_callback(callback: NotifyFn) {
    DIAGNOSTICS.register_notify_callback(callback);
}

/// Apply this boot's reset cause. Call once, early.
pub fn set_reset_cause(cause: ResetCause) -> ResetDisposition {
    DIAGNOSTICS.set_reset_cause(cause)
}

/// Apply this boot's raw platform reset cause code. Call once, early.
pub fn set_reset_cause_raw(raw_cause: u8) -> ResetDisposition {
    DIAGNOSTICS.set_reset_cause_raw(raw_cause)
}

/// Wipe the record and set the safe-mode marker.
pub fn set_boot_safe() {
    DIAGNOSTICS.set_boot_safe();
}

/// Snapshot of the current record.
#[must_use]
pub fn diagnostics_info() -> DiagnosticRecord {
    DIAGNOSTICS.diagnostics()
}

/// Record communication, network and signal indicators.
pub fn set_application_diagnostics(comm_state: i16, ntwk_state: i16, signal_state: i16) {
    DIAGNOSTICS.set_application_diagnostics(comm_state, ntwk_state, signal_state);
}

/// Record the protocol state.
pub fn set_comm_state(state: i16) {
    DIAGNOSTICS.set_comm_state(state);
}

/// Record the network attach state.
pub fn set_network_state(state: i16) {
    DIAGNOSTICS.set_network_state(state);
}

/// Record the signal quality indicator.
pub fn set_signal_state(state: i16) {
    DIAGNOSTICS.set_signal_state(state);
}

/// Record an application notification code and message.
pub fn set_application_message(notify_code: u8, msg: &str) {
    DIAGNOSTICS.set_application_message(notify_code, msg);
}

/// Zero the record.
pub fn clear_diagnostics() {
    DIAGNOSTICS.clear();
}

/// Fatal assert: record the fault site, notify, then halt.
///
/// If the callback resets the device this never reaches the halt.
pub fn assert_invoke(pc: u32, lr: u32, file_id: u16, line: u16) -> ! {
    DIAGNOSTICS.assert_failed(FaultSite::new(pc, lr, file_id, line), &BreakpointHalt)
}

/// Non-fatal assert: notify and return.
pub fn assert_warning(file_id: u16, line: u16, text: &str) {
    DIAGNOSTICS.assert_warning(file_id, line, text);
}
