//! Tests for the process-wide instance, its free functions and the macros.
//!
//! Every test touches `DIAGNOSTICS`, so they run serially.

#![cfg(test)]

use lq_diagnostics::{
    DIAGNOSTICS, NotifyKind, ResetCause, ResetDisposition, clear_diagnostics, diag_assert,
    diag_assert_warn, diagnostics, diagnostics_info, register_notify_callback,
    set_application_diagnostics, set_application_message, set_boot_safe, set_comm_state,
    set_network_state, set_reset_cause, set_reset_cause_raw, set_signal_state,
};
use serial_test::serial;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

const FILE_ID: u16 = 0x2A;

static WARNINGS: AtomicUsize = AtomicUsize::new(0);
static LAST_WARNING: Mutex<String> = Mutex::new(String::new());

fn on_notify(kind: NotifyKind, msg: &str) {
    if kind == NotifyKind::AssertWarning {
        WARNINGS.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = LAST_WARNING.lock() {
            last.clear();
            last.push_str(msg);
        }
    }
}

fn fresh() {
    clear_diagnostics();
    DIAGNOSTICS.unregister_notify_callback();
}

#[test]
#[serial]
fn test_accessor_returns_global() {
    fresh();
    assert!(std::ptr::eq(diagnostics(), &DIAGNOSTICS));
}

#[test]
#[serial]
fn test_free_functions_drive_global_record() {
    fresh();
    set_application_diagnostics(1, 2, 3);
    assert!(diagnostics_info().is_empty());

    set_comm_state(4);
    set_network_state(5);
    set_signal_state(-90);
    set_application_message(8, "CELL LOST");

    let record = diagnostics_info();
    assert!(!record.is_empty());
    assert_eq!(
        (record.comm_state, record.ntwk_state, record.signal_state),
        (4, 5, -90)
    );
    assert_eq!(record.notify_code, 8);
    assert_eq!(record.notify_msg.as_str(), "CELL LOST");

    clear_diagnostics();
    assert!(diagnostics_info().is_empty());
}

#[test]
#[serial]
fn test_reset_cause_entry_points() {
    fresh();
    set_comm_state(1);
    assert_eq!(
        set_reset_cause(ResetCause::Watchdog),
        ResetDisposition::Retained { boot_flag: 1 }
    );
    assert_eq!(set_reset_cause_raw(0), ResetDisposition::Cleared);
    let record = diagnostics_info();
    assert!(record.is_empty());
    assert_eq!(record.boot_flag, 1);

    set_boot_safe();
    assert_eq!(diagnostics_info().boot_flag, u8::MAX);
}

#[test]
#[serial]
fn test_warn_macro_reports_call_site() {
    fresh();
    register_notify_callback(on_notify);
    let before = WARNINGS.load(Ordering::SeqCst);

    let depth = 9;
    diag_assert_warn!(FILE_ID, depth < 8, "stack deep");
    let line = line!() - 1;

    assert_eq!(WARNINGS.load(Ordering::SeqCst), before + 1);
    let expected = format!("WARN f:2A,l:{line}-stack deep\r");
    assert_eq!(
        LAST_WARNING.lock().map(|m| m.clone()).unwrap_or_default(),
        expected
    );
    assert!(diagnostics_info().is_empty());
}

#[test]
#[serial]
fn test_passing_macros_do_nothing() {
    fresh();
    register_notify_callback(on_notify);
    let before = WARNINGS.load(Ordering::SeqCst);

    let link_up = true;
    diag_assert!(FILE_ID, link_up);
    diag_assert_warn!(FILE_ID, true, "never shown");

    assert_eq!(WARNINGS.load(Ordering::SeqCst), before);
    assert!(diagnostics_info().is_empty());
}
