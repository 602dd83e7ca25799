//! Checksum-guarded application notification callback.
//!
//! The callback handle lives in retained memory next to the diagnostic record,
//! so the fault being reported may well have scribbled over it. A one-byte
//! fingerprint of the handle's address is stored at registration and
//! recomputed before every call; on mismatch the call is skipped.
//!
//! # Real-Time Safety
//!
//! - No heap allocations
//! - The critical section only covers copying the handle, never the call
//! - A corrupted handle is never dereferenced

use core::cell::Cell;
use core::fmt;

use critical_section::Mutex;
use portable_atomic::{AtomicU8, Ordering};

/// Application callback: notification kind plus a short message.
///
/// The callback may reset the device and never return.
pub type NotifyFn = fn(NotifyKind, &str);

/// Kind of notification handed to the application callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NotifyKind {
    /// Informational application event.
    Info = 0,
    /// Non-fatal assert warning.
    AssertWarning = 1,
    /// Fatal assert; the device halts if the callback returns.
    AssertFailed = 2,
}

impl NotifyKind {
    /// Numeric notification code.
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Kind for a numeric code, `None` if unknown.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Info),
            1 => Some(Self::AssertWarning),
            2 => Some(Self::AssertFailed),
            _ => None,
        }
    }

    /// Whether this kind is followed by a halt.
    #[must_use]
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::AssertFailed)
    }
}

impl fmt::Display for NotifyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => f.write_str("Info"),
            Self::AssertWarning => f.write_str("AssertWarning"),
            Self::AssertFailed => f.write_str("AssertFailed"),
        }
    }
}

/// One-byte dispersion checksum over a handle address.
///
/// XOR of the address bytes at shifts 0, 4, 12 and 20. Every single-bit change
/// in address bits 0..28 changes the result. Not a cryptographic check.
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "each term is masked to its low byte"
)]
pub const fn callback_checksum(addr: usize) -> u8 {
    let mut sum = (addr & 0xFF) as u8;
    sum ^= ((addr >> 4) & 0xFF) as u8;
    sum ^= ((addr >> 12) & 0xFF) as u8;
    sum ^= ((addr >> 20) & 0xFF) as u8;
    sum
}

/// Fingerprint of a callback handle.
#[must_use]
pub fn fingerprint(callback: NotifyFn) -> u8 {
    callback_checksum((callback as *const ()).addr())
}

/// Callback slot plus its registration-time fingerprint.
///
/// There is deliberately no way to call the stored handle except through
/// [`NotifyGate::invoke_if_valid`].
pub struct NotifyGate {
    handle: Mutex<Cell<Option<NotifyFn>>>,
    checksum: AtomicU8,
}

impl NotifyGate {
    /// Create an empty gate.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            handle: Mutex::new(Cell::new(None)),
            checksum: AtomicU8::new(0),
        }
    }

    /// Store `callback` and its fingerprint.
    pub fn register(&self, callback: NotifyFn) {
        critical_section::with(|cs| {
            self.handle.borrow(cs).set(Some(callback));
            self.checksum.store(fingerprint(callback), Ordering::Relaxed);
        });
    }

    /// Empty the slot.
    pub fn unregister(&self) {
        critical_section::with(|cs| {
            self.handle.borrow(cs).set(None);
            self.checksum.store(0, Ordering::Relaxed);
        });
    }

    /// Whether a handle is stored, valid or not.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        critical_section::with(|cs| self.handle.borrow(cs).get().is_some())
    }

    /// Whether a handle is stored and still matches its fingerprint.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.checked_handle().is_some()
    }

    /// Call the stored callback if its fingerprint still matches.
    ///
    /// Returns whether the callback ran (and returned). A missing or
    /// corrupted handle is skipped without any error.
    pub fn invoke_if_valid(&self, kind: NotifyKind, msg: &str) -> bool {
        match self.checked_handle() {
            Some(callback) => {
                callback(kind, msg);
                true
            }
            None => false,
        }
    }

    /// Fault-injection hook: replace the stored handle without refreshing
    /// its fingerprint, as a stray write into retained RAM would.
    #[doc(hidden)]
    pub fn overwrite_handle_unchecked(&self, callback: NotifyFn) {
        critical_section::with(|cs| self.handle.borrow(cs).set(Some(callback)));
    }

    fn checked_handle(&self) -> Option<NotifyFn> {
        let (handle, stored) = critical_section::with(|cs| {
            (
                self.handle.borrow(cs).get(),
                self.checksum.load(Ordering::Relaxed),
            )
        });
        let callback = handle?;
        if fingerprint(callback) == stored {
            Some(callback)
        } else {
            crate::diag_debug!(stored, "notify callback fingerprint mismatch, call suppressed");
            None
        }
    }
}

impl Default for NotifyGate {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NotifyGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyGate")
            .field("registered", &self.is_registered())
            .field("valid", &self.is_valid())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portable_atomic::AtomicUsize;

    static CALLS: AtomicUsize = AtomicUsize::new(0);

    fn counting(_kind: NotifyKind, _msg: &str) {
        CALLS.fetch_add(1, Ordering::SeqCst);
    }

    fn other_a(_kind: NotifyKind, _msg: &str) {}
    fn other_b(_kind: NotifyKind, _msg: &str) {}
    fn other_c(_kind: NotifyKind, _msg: &str) {}

    #[test]
    fn test_checksum_reference_values() {
        assert_eq!(callback_checksum(0), 0);
        assert_eq!(callback_checksum(0x01), 0x01);
        // 0x10: low byte 0x10, >>4 gives 0x01.
        assert_eq!(callback_checksum(0x10), 0x11);
        assert_eq!(callback_checksum(0x0800_1235), 0x35 ^ 0x23 ^ 0x01 ^ 0x80);
    }

    #[test]
    fn test_checksum_single_bit_sensitivity() {
        let base = 0x0800_4C21usize;
        for bit in 0..28 {
            assert_ne!(
                callback_checksum(base),
                callback_checksum(base ^ (1 << bit)),
                "bit {bit} flip undetected"
            );
        }
    }

    #[test]
    fn test_empty_gate_does_not_invoke() {
        let gate = NotifyGate::new();
        assert!(!gate.is_registered());
        assert!(!gate.invoke_if_valid(NotifyKind::Info, "x"));
    }

    #[test]
    fn test_register_and_invoke() {
        let gate = NotifyGate::new();
        gate.register(counting);
        let before = CALLS.load(Ordering::SeqCst);
        assert!(gate.invoke_if_valid(NotifyKind::Info, "hello"));
        assert!(CALLS.load(Ordering::SeqCst) > before);
    }

    #[test]
    fn test_corrupted_handle_is_suppressed() {
        let gate = NotifyGate::new();
        gate.register(other_a);
        let corrupt = [other_b as NotifyFn, other_c as NotifyFn, counting as NotifyFn]
            .into_iter()
            .find(|f| fingerprint(*f) != fingerprint(other_a));
        if let Some(corrupt) = corrupt {
            gate.overwrite_handle_unchecked(corrupt);
            assert!(gate.is_registered());
            assert!(!gate.is_valid());
            assert!(!gate.invoke_if_valid(NotifyKind::AssertFailed, "boom"));
        }
    }

    #[test]
    fn test_unregister() {
        let gate = NotifyGate::new();
        gate.register(other_a);
        gate.unregister();
        assert!(!gate.is_registered());
        assert!(!gate.invoke_if_valid(NotifyKind::Info, "x"));
    }

    #[test]
    fn test_kind_codes() {
        assert_eq!(NotifyKind::from_code(2), Some(NotifyKind::AssertFailed));
        assert_eq!(NotifyKind::from_code(3), None);
        assert!(NotifyKind::AssertFailed.is_fatal());
        assert!(!NotifyKind::AssertWarning.is_fatal());
    }
}
