//! Retained diagnostic state block.
//!
//! [`Diagnostics`] holds the record cells, a write bracket and the
//! notification gate. Every field is an individual atomic so the block can be
//! shared between task context and fault/interrupt context without locks.
//!
//! # Concurrency
//!
//! Writers never wait. A fault-path write that preempts a task-level write
//! can interleave with it, leaving fields from two points in time; fault
//! capture wins over application state consistency.
//!
//! Each write path increments an in-flight writer count before touching
//! fields, and on exit bumps the version and decrements the count. Both are
//! atomic read-modify-writes, so a write nested inside another keeps the
//! count raised until the outer one finishes. A read is stable when no writer
//! was in flight on either side of it and the version did not move.
//! [`Diagnostics::try_snapshot`] returns only stable reads;
//! [`Diagnostics::diagnostics`] retries a bounded number of times and
//! otherwise returns its last attempt.

use portable_atomic::{AtomicI16, AtomicU8, AtomicU16, AtomicU32, Ordering, fence};

use crate::notify::{NotifyFn, NotifyGate, NotifyKind};
use crate::record::{
    BOOT_FLAG_MAX, DIAGNOSTICS_MAGIC, DiagnosticRecord, NOTIFY_MSG_LEN, NotifyMessage,
};
use crate::reset::{ResetCause, ResetDisposition, RetentionPolicy};

/// Read attempts before a snapshot is given up as unstable.
pub const SNAPSHOT_ATTEMPTS: usize = 4;

/// Live record fields.
#[derive(Debug)]
struct RecordCells {
    diag_magic: AtomicU8,
    boot_flag: AtomicU8,
    reset_cause: AtomicU8,
    notify_code: AtomicU8,
    comm_state: AtomicI16,
    ntwk_state: AtomicI16,
    signal_state: AtomicI16,
    file_id: AtomicU16,
    line: AtomicU16,
    notify_msg: [AtomicU8; NOTIFY_MSG_LEN],
    pc: AtomicU32,
    lr: AtomicU32,
}

impl RecordCells {
    const fn new() -> Self {
        Self {
            diag_magic: AtomicU8::new(0),
            boot_flag: AtomicU8::new(0),
            reset_cause: AtomicU8::new(0),
            notify_code: AtomicU8::new(0),
            comm_state: AtomicI16::new(0),
            ntwk_state: AtomicI16::new(0),
            signal_state: AtomicI16::new(0),
            file_id: AtomicU16::new(0),
            line: AtomicU16::new(0),
            notify_msg: [const { AtomicU8::new(0) }; NOTIFY_MSG_LEN],
            pc: AtomicU32::new(0),
            lr: AtomicU32::new(0),
        }
    }

    fn load(&self) -> DiagnosticRecord {
        let mut msg = [0u8; NOTIFY_MSG_LEN];
        for (dst, cell) in msg.iter_mut().zip(&self.notify_msg) {
            *dst = cell.load(Ordering::Relaxed);
        }
        DiagnosticRecord {
            diag_magic: self.diag_magic.load(Ordering::Relaxed),
            boot_flag: self.boot_flag.load(Ordering::Relaxed),
            reset_cause: self.reset_cause.load(Ordering::Relaxed),
            notify_code: self.notify_code.load(Ordering::Relaxed),
            comm_state: self.comm_state.load(Ordering::Relaxed),
            ntwk_state: self.ntwk_state.load(Ordering::Relaxed),
            signal_state: self.signal_state.load(Ordering::Relaxed),
            file_id: self.file_id.load(Ordering::Relaxed),
            line: self.line.load(Ordering::Relaxed),
            notify_msg: NotifyMessage::from_array(msg),
            pc: self.pc.load(Ordering::Relaxed),
            lr: self.lr.load(Ordering::Relaxed),
        }
    }

    fn store(&self, record: &DiagnosticRecord) {
        self.diag_magic.store(record.diag_magic, Ordering::Relaxed);
        self.boot_flag.store(record.boot_flag, Ordering::Relaxed);
        self.reset_cause.store(record.reset_cause, Ordering::Relaxed);
        self.notify_code.store(record.notify_code, Ordering::Relaxed);
        self.comm_state.store(record.comm_state, Ordering::Relaxed);
        self.ntwk_state.store(record.ntwk_state, Ordering::Relaxed);
        self.signal_state.store(record.signal_state, Ordering::Relaxed);
        self.file_id.store(record.file_id, Ordering::Relaxed);
        self.line.store(record.line, Ordering::Relaxed);
        self.store_message(&record.notify_msg);
        self.pc.store(record.pc, Ordering::Relaxed);
        self.lr.store(record.lr, Ordering::Relaxed);
    }

    fn store_message(&self, msg: &NotifyMessage) {
        for (cell, byte) in self.notify_msg.iter().zip(msg.as_bytes()) {
            cell.store(*byte, Ordering::Relaxed);
        }
    }

    /// Zero every field except `boot_flag`.
    fn zero_keep_boot_flag(&self) {
        let boot_flag = self.boot_flag.load(Ordering::Relaxed);
        self.store(&DiagnosticRecord {
            boot_flag,
            ..DiagnosticRecord::EMPTY
        });
    }
}

/// The process-wide diagnostics state block.
///
/// One instance per device, normally the crate's retained
/// [`DIAGNOSTICS`](crate::DIAGNOSTICS) static. `new` is `const` so further
/// instances can be placed in whatever retained region a board provides.
///
/// # Example
///
/// ```rust
/// use lq_diagnostics::prelude::*;
///
/// static DIAG: Diagnostics = Diagnostics::new();
///
/// DIAG.set_reset_cause(ResetCause::PowerOn);
/// DIAG.set_application_message(5, "LINK DOWN");
///
/// let record = DIAG.diagnostics();
/// assert!(!record.is_empty());
/// assert_eq!(record.notify_msg.as_str(), "LINK DOWN");
///
/// DIAG.clear();
/// assert!(DIAG.diagnostics().is_empty());
/// ```
#[derive(Debug)]
pub struct Diagnostics {
    writers: AtomicU8,
    version: AtomicU32,
    cells: RecordCells,
    notify: NotifyGate,
}

impl Diagnostics {
    /// Create a zeroed state block with no callback registered.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            writers: AtomicU8::new(0),
            version: AtomicU32::new(0),
            cells: RecordCells::new(),
            notify: NotifyGate::new(),
        }
    }

    /// Run `f` against the cells inside the writer bracket.
    ///
    /// Safe to nest: a fault-path write preempting a task-level write leaves
    /// the writer count raised until the task-level write completes.
    fn write<R>(&self, f: impl FnOnce(&RecordCells) -> R) -> R {
        self.writers.fetch_add(1, Ordering::SeqCst);
        fence(Ordering::Release);
        let out = f(&self.cells);
        self.version.fetch_add(1, Ordering::SeqCst);
        self.writers.fetch_sub(1, Ordering::SeqCst);
        out
    }

    /// One read of the cells and whether it was stable.
    fn read_once(&self) -> (DiagnosticRecord, bool) {
        let before = self.version.load(Ordering::SeqCst);
        let idle_before = self.writers.load(Ordering::SeqCst) == 0;
        let record = self.cells.load();
        fence(Ordering::Acquire);
        let idle_after = self.writers.load(Ordering::SeqCst) == 0;
        let after = self.version.load(Ordering::SeqCst);
        (record, idle_before && idle_after && before == after)
    }

    /// Register the application notification callback.
    ///
    /// Only the handle's bit pattern is protected; the target is not checked.
    pub fn register_notify_callback(&self, callback: NotifyFn) {
        self.notify.register(callback);
        crate::diag_debug!("notify callback registered");
    }

    /// Remove the application notification callback.
    pub fn unregister_notify_callback(&self) {
        self.notify.unregister();
    }

    /// The notification gate guarding the application callback.
    #[must_use]
    pub fn notify_gate(&self) -> &NotifyGate {
        &self.notify
    }

    /// Send an application-level notification through the gate.
    ///
    /// Returns whether the callback ran.
    pub fn notify(&self, kind: NotifyKind, msg: &str) -> bool {
        self.notify.invoke_if_valid(kind, msg)
    }

    /// Apply the boot's reset cause with the default retention policy.
    ///
    /// Call once, early, on every boot.
    pub fn set_reset_cause(&self, cause: ResetCause) -> ResetDisposition {
        self.apply_reset_cause(cause.to_raw(), &RetentionPolicy::DEFAULT)
    }

    /// Apply a raw platform cause code with the default retention policy.
    pub fn set_reset_cause_raw(&self, raw_cause: u8) -> ResetDisposition {
        self.apply_reset_cause(raw_cause, &RetentionPolicy::DEFAULT)
    }

    /// Apply a raw platform cause code under `policy`.
    ///
    /// Fault causes advance the boot flag (saturating at
    /// [`BOOT_FLAG_MAX`]) and keep every other field. Any other cause zeroes
    /// the record except the boot flag. The cause is stored in both cases.
    pub fn apply_reset_cause(&self, raw_cause: u8, policy: &RetentionPolicy) -> ResetDisposition {
        let disposition = self.write(|cells| {
            let disposition = if policy.is_fault(raw_cause) {
                let boot_flag = cells.boot_flag.load(Ordering::Relaxed).saturating_add(1);
                cells.boot_flag.store(boot_flag, Ordering::Relaxed);
                ResetDisposition::Retained { boot_flag }
            } else {
                cells.zero_keep_boot_flag();
                ResetDisposition::Cleared
            };
            cells.reset_cause.store(raw_cause, Ordering::Relaxed);
            disposition
        });
        if disposition.is_retained() {
            crate::diag_info!(raw_cause, ?disposition, "fault reset, prior diagnostics retained");
        } else {
            crate::diag_debug!(raw_cause, "normal reset, diagnostics cleared");
        }
        disposition
    }

    /// Set only the safe-mode marker (boot flag at [`BOOT_FLAG_MAX`]).
    pub fn mark_boot_safe(&self) {
        self.write(|cells| cells.boot_flag.store(BOOT_FLAG_MAX, Ordering::Relaxed));
    }

    /// Enter safe mode: wipe the record, then set the safe-mode marker.
    ///
    /// The marker is written after the wipe, so it survives.
    pub fn set_boot_safe(&self) {
        self.write(|cells| {
            cells.store(&DiagnosticRecord {
                boot_flag: BOOT_FLAG_MAX,
                ..DiagnosticRecord::EMPTY
            });
        });
        crate::diag_info!("boot-safe marker set, diagnostics wiped");
    }

    /// Record the application's communication, network and signal indicators.
    ///
    /// Does not touch the validity sentinel.
    pub fn set_application_diagnostics(&self, comm_state: i16, ntwk_state: i16, signal_state: i16) {
        self.write(|cells| {
            cells.comm_state.store(comm_state, Ordering::Relaxed);
            cells.ntwk_state.store(ntwk_state, Ordering::Relaxed);
            cells.signal_state.store(signal_state, Ordering::Relaxed);
        });
    }

    /// Record the protocol (communication) state and mark the record valid.
    pub fn set_comm_state(&self, state: i16) {
        self.write(|cells| {
            cells.diag_magic.store(DIAGNOSTICS_MAGIC, Ordering::Relaxed);
            cells.comm_state.store(state, Ordering::Relaxed);
        });
    }

    /// Record the network attach state and mark the record valid.
    pub fn set_network_state(&self, state: i16) {
        self.write(|cells| {
            cells.diag_magic.store(DIAGNOSTICS_MAGIC, Ordering::Relaxed);
            cells.ntwk_state.store(state, Ordering::Relaxed);
        });
    }

    /// Record the signal quality indicator and mark the record valid.
    pub fn set_signal_state(&self, state: i16) {
        self.write(|cells| {
            cells.diag_magic.store(DIAGNOSTICS_MAGIC, Ordering::Relaxed);
            cells.signal_state.store(state, Ordering::Relaxed);
        });
    }

    /// Record an application notification code and message.
    ///
    /// The message is truncated to 20 bytes on a character boundary and
    /// zero-padded. Marks the record valid.
    pub fn set_application_message(&self, notify_code: u8, msg: &str) {
        self.store_application_message(notify_code, &NotifyMessage::from_str_truncated(msg));
    }

    /// Record an application notification code and raw message bytes.
    ///
    /// At most 20 bytes are read from `msg`. Marks the record valid.
    pub fn set_application_message_bytes(&self, notify_code: u8, msg: &[u8]) {
        self.store_application_message(notify_code, &NotifyMessage::from_bytes(msg));
    }

    fn store_application_message(&self, notify_code: u8, msg: &NotifyMessage) {
        self.write(|cells| {
            cells.diag_magic.store(DIAGNOSTICS_MAGIC, Ordering::Relaxed);
            cells.notify_code.store(notify_code, Ordering::Relaxed);
            cells.store_message(msg);
        });
    }

    /// Write fault context and mark the record valid.
    pub(crate) fn store_fault_context(&self, pc: u32, lr: u32, file_id: u16, line: u16) {
        self.write(|cells| {
            cells.diag_magic.store(DIAGNOSTICS_MAGIC, Ordering::Relaxed);
            cells.pc.store(pc, Ordering::Relaxed);
            cells.lr.store(lr, Ordering::Relaxed);
            cells.line.store(line, Ordering::Relaxed);
            cells.file_id.store(file_id, Ordering::Relaxed);
        });
    }

    /// Replace the whole record, sentinel included.
    pub(crate) fn load_record(&self, record: &DiagnosticRecord) {
        self.write(|cells| cells.store(record));
    }

    /// Snapshot of the current record.
    ///
    /// Reflects the most recently completed write unless writers keep
    /// preempting the read for [`SNAPSHOT_ATTEMPTS`] attempts, or a write
    /// never finished (a fault halted it). The last attempt is returned then.
    #[must_use]
    pub fn diagnostics(&self) -> DiagnosticRecord {
        let mut record = DiagnosticRecord::EMPTY;
        for _ in 0..SNAPSHOT_ATTEMPTS {
            let (read, stable) = self.read_once();
            record = read;
            if stable {
                break;
            }
        }
        record
    }

    /// Snapshot that no write overlapped.
    ///
    /// Returns `None` when every one of [`SNAPSHOT_ATTEMPTS`] attempts raced
    /// a writer.
    #[must_use]
    pub fn try_snapshot(&self) -> Option<DiagnosticRecord> {
        (0..SNAPSHOT_ATTEMPTS).find_map(|_| match self.read_once() {
            (record, true) => Some(record),
            (_, false) => None,
        })
    }

    /// Whether the record is empty (sentinel zero).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.diag_magic.load(Ordering::Relaxed) == 0
    }

    /// Zero the whole record, returning it to the empty state.
    pub fn clear(&self) {
        self.write(|cells| cells.store(&DiagnosticRecord::EMPTY));
        crate::diag_debug!("diagnostics cleared");
    }

    /// Hand the record to the host and clear it.
    ///
    /// Returns `None` (and leaves the store alone) when the record is empty.
    pub fn take(&self) -> Option<DiagnosticRecord> {
        let record = self.diagnostics();
        if record.is_empty() {
            return None;
        }
        self.clear();
        Some(record)
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}
