//! Integration tests for the full fault-to-next-boot cycle.

#![cfg(test)]

use lq_diagnostics::IMAGE_LEN;
use lq_diagnostics::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, mpsc};
use std::thread;
use std::time::Duration;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Route crate logging to the test output.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .with_test_writer()
        .try_init()
        .unwrap_or(()); // Already installed by another test
}

/// Halt that reports it was reached and then parks the thread for good.
struct ParkHalt(mpsc::Sender<()>);

impl Halt for ParkHalt {
    fn halt(&self) -> ! {
        let _ = self.0.send(());
        loop {
            thread::park();
        }
    }
}

mod fatal_assert {
    use super::*;

    static DIAG: Diagnostics = Diagnostics::new();
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    static LAST_MESSAGE: Mutex<String> = Mutex::new(String::new());

    fn on_notify(kind: NotifyKind, msg: &str) {
        if kind == NotifyKind::AssertFailed {
            CALLS.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut last) = LAST_MESSAGE.lock() {
                last.clear();
                last.push_str(msg);
            }
        }
    }

    #[test]
    fn test_fatal_assert_records_notifies_and_halts() -> TestResult {
        init_tracing();
        DIAG.register_notify_callback(on_notify);
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            DIAG.assert_failed(FaultSite::new(0x0800_2000, 0x0800_1F01, 3, 17), &ParkHalt(tx));
        });
        rx.recv_timeout(Duration::from_secs(5))?;

        let record = DIAG.diagnostics();
        assert_eq!(record.file_id, 3);
        assert_eq!(record.line, 17);
        assert_eq!(record.pc, 0x0800_2000);
        assert_eq!(record.lr, 0x0800_1F01);
        assert_ne!(record.diag_magic, 0);

        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
        let message = LAST_MESSAGE.lock().map_err(|e| e.to_string())?.clone();
        assert!(message.contains('3'));
        assert!(message.contains("17"));
        assert_eq!(message, "ASSERT f:3,l:17-pc=0x08002000,lr=0x08001F01");
        Ok(())
    }
}

mod halt_without_callback {
    use super::*;

    static DIAG: Diagnostics = Diagnostics::new();

    #[test]
    fn test_fatal_assert_halts_with_no_callback() -> TestResult {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            DIAG.assert_failed(FaultSite::new(0x100, 0x200, 9, 1), &ParkHalt(tx));
        });
        rx.recv_timeout(Duration::from_secs(5))?;
        assert_eq!(DIAG.diagnostics().file_id, 9);
        Ok(())
    }
}

mod boot_cycle {
    use super::*;

    #[test]
    fn test_fault_survives_file_backed_reset() -> TestResult {
        init_tracing();
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("diagnostics.bin");

        // Boot 1: application runs, then faults.
        let boot1 = Diagnostics::new();
        boot1.set_reset_cause(ResetCause::PowerOn);
        boot1.set_application_diagnostics(2, 1, -67);
        boot1.set_application_message(7, "TLS HANDSHAKE");
        boot1.capture_fault(FaultSite::new(0x0800_4000, 0x0800_3001, 11, 250));
        boot1.persist(&mut FileBackend::new(&path))?;

        // Boot 2: fresh RAM, record restored before the reset cause is applied.
        let boot2 = Diagnostics::new();
        assert!(boot2.restore(&mut FileBackend::new(&path))?);
        let disposition = boot2.set_reset_cause(ResetCause::SystemFault);
        assert_eq!(disposition, ResetDisposition::Retained { boot_flag: 1 });

        let record = boot2.take().ok_or("fault context should survive")?;
        assert_eq!(record.file_id, 11);
        assert_eq!(record.line, 250);
        assert_eq!(record.signal_state, -67);
        assert_eq!(record.notify_msg.as_str(), "TLS HANDSHAKE");
        assert!(boot2.is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_file_restores_nothing() -> TestResult {
        let dir = tempfile::tempdir()?;
        let mut backend = FileBackend::new(dir.path().join("absent.bin"));
        let diag = Diagnostics::new();
        assert!(!diag.restore(&mut backend)?);
        assert!(diag.is_empty());
        Ok(())
    }

    #[test]
    fn test_truncated_file_is_rejected() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("short.bin");
        std::fs::write(&path, [0u8; 10])?;

        let diag = Diagnostics::new();
        let result = diag.restore(&mut FileBackend::new(&path));
        assert!(matches!(
            result,
            Err(DiagnosticsError::ImageTooShort {
                expected: 52,
                actual: 10
            })
        ));
        Ok(())
    }

    #[test]
    fn test_persist_overwrites_previous_image() -> TestResult {
        let dir = tempfile::tempdir()?;
        let mut backend = FileBackend::new(dir.path().join("diag.bin"));

        let diag = Diagnostics::new();
        diag.set_comm_state(1);
        diag.persist(&mut backend)?;
        diag.set_comm_state(2);
        diag.persist(&mut backend)?;

        let restored = Diagnostics::new();
        restored.restore(&mut backend)?;
        assert_eq!(restored.diagnostics().comm_state, 2);
        Ok(())
    }

    #[test]
    fn test_store_leaves_no_staging_file() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("diag.bin");
        let mut backend = FileBackend::new(&path);

        let diag = Diagnostics::new();
        diag.set_network_state(3);
        diag.persist(&mut backend)?;

        assert_eq!(std::fs::read(&path)?.len(), IMAGE_LEN);
        assert!(!dir.path().join("diag.bin.tmp").exists());
        let names: Vec<_> = std::fs::read_dir(dir.path())?.collect::<Result<_, _>>()?;
        assert_eq!(names.len(), 1);
        Ok(())
    }

    #[test]
    fn test_stable_snapshots_are_never_torn() -> TestResult {
        static DIAG: Diagnostics = Diagnostics::new();
        let writers: Vec<_> = (0..4i16)
            .map(|id| {
                thread::spawn(move || {
                    for n in 0..2_000i16 {
                        let value = id * 2_000 + n;
                        DIAG.set_application_diagnostics(value, value, value);
                    }
                })
            })
            .collect();

        for _ in 0..20_000 {
            if let Some(record) = DIAG.try_snapshot() {
                assert_eq!(record.comm_state, record.ntwk_state);
                assert_eq!(record.ntwk_state, record.signal_state);
            }
        }
        for writer in writers {
            writer.join().map_err(|_| "writer panicked")?;
        }

        let settled = DIAG.try_snapshot().ok_or("no writer left in flight")?;
        assert_eq!(settled.comm_state, settled.signal_state);
        Ok(())
    }
}
