//! Diagnostic record snapshot and fixed-size notification message.
//!
//! [`DiagnosticRecord`] is the plain, copyable view of the retained state that
//! host-facing code reads. The live, concurrently written cells live in
//! [`crate::store`].

use core::fmt;

use crate::reset::ResetCause;

/// Sentinel stored in `diag_magic` whenever meaningful state has been recorded.
pub const DIAGNOSTICS_MAGIC: u8 = 0x5A;

/// Saturation ceiling of the consecutive fault-boot counter.
pub const BOOT_FLAG_MAX: u8 = u8::MAX;

/// Capacity of the application notification message, in bytes.
pub const NOTIFY_MSG_LEN: usize = 20;

/// Fixed 20-byte application notification message.
///
/// Copies are bounded: at most [`NOTIFY_MSG_LEN`] bytes are taken from the
/// source and the remainder is zero-padded. A message that fills the buffer
/// exactly carries no terminator.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct NotifyMessage([u8; NOTIFY_MSG_LEN]);

impl NotifyMessage {
    /// An all-zero (empty) message.
    pub const EMPTY: Self = Self([0; NOTIFY_MSG_LEN]);

    /// Build a message from raw bytes, copying `min(bytes.len(), 20)` bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut buf = [0u8; NOTIFY_MSG_LEN];
        for (dst, src) in buf.iter_mut().zip(bytes) {
            *dst = *src;
        }
        Self(buf)
    }

    /// Build a message from text, truncating on a character boundary.
    #[must_use]
    pub fn from_str_truncated(text: &str) -> Self {
        let mut end = text.len().min(NOTIFY_MSG_LEN);
        while !text.is_char_boundary(end) {
            end = end.saturating_sub(1);
        }
        Self::from_bytes(text.as_bytes().get(..end).unwrap_or_default())
    }

    /// Wrap an already-sized buffer without copying.
    #[must_use]
    pub const fn from_array(bytes: [u8; NOTIFY_MSG_LEN]) -> Self {
        Self(bytes)
    }

    /// Full 20-byte buffer, padding included.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; NOTIFY_MSG_LEN] {
        &self.0
    }

    /// Message length up to the first NUL (or the full buffer).
    #[must_use]
    pub fn len(&self) -> usize {
        self.0
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NOTIFY_MSG_LEN)
    }

    /// Whether the message is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Message text up to the first NUL.
    ///
    /// Bytes written through [`NotifyMessage::from_bytes`] may not be UTF-8;
    /// the longest valid prefix is returned in that case.
    #[must_use]
    pub fn as_str(&self) -> &str {
        let bytes = self.0.get(..self.len()).unwrap_or_default();
        match core::str::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => bytes
                .get(..err.valid_up_to())
                .and_then(|valid| core::str::from_utf8(valid).ok())
                .unwrap_or_default(),
        }
    }
}

impl fmt::Debug for NotifyMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NotifyMessage({:?})", self.as_str())
    }
}

impl fmt::Display for NotifyMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the persistent diagnostic record.
///
/// A record whose `diag_magic` is zero is empty, whatever the other fields
/// contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(C)]
pub struct DiagnosticRecord {
    /// Validity sentinel; nonzero once something has been recorded.
    pub diag_magic: u8,
    /// Consecutive fault-triggered boots, saturating at [`BOOT_FLAG_MAX`].
    pub boot_flag: u8,
    /// Raw reset cause code of the current boot.
    pub reset_cause: u8,
    /// Last application notification code.
    pub notify_code: u8,
    /// Application protocol state (TCP/UDP/SSL/MQTT).
    pub comm_state: i16,
    /// Network attach state (LTE PDP context).
    pub ntwk_state: i16,
    /// Signal quality indicator (RSSI).
    pub signal_state: i16,
    /// Numeric id of the source file holding the failed assert.
    pub file_id: u16,
    /// Source line of the failed assert.
    pub line: u16,
    /// Last application notification message.
    pub notify_msg: NotifyMessage,
    /// Program counter at the failed assert.
    pub pc: u32,
    /// Link register at the failed assert.
    pub lr: u32,
}

impl DiagnosticRecord {
    /// An all-zero record.
    pub const EMPTY: Self = Self {
        diag_magic: 0,
        boot_flag: 0,
        reset_cause: 0,
        notify_code: 0,
        comm_state: 0,
        ntwk_state: 0,
        signal_state: 0,
        file_id: 0,
        line: 0,
        notify_msg: NotifyMessage::EMPTY,
        pc: 0,
        lr: 0,
    };

    /// Whether the record holds nothing to report.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diag_magic == 0
    }

    /// Typed reset cause, if the stored code is known.
    #[must_use]
    pub fn reset_cause(&self) -> Option<ResetCause> {
        ResetCause::from_raw(self.reset_cause)
    }

    /// Whether fault context (an assert location) has been captured.
    #[must_use]
    pub fn has_fault_context(&self) -> bool {
        !self.is_empty() && (self.pc != 0 || self.file_id != 0 || self.line != 0)
    }

    /// Whether the device is stuck in a crash loop of at least `threshold` boots.
    #[must_use]
    pub fn is_crash_looping(&self, threshold: u8) -> bool {
        threshold > 0 && self.boot_flag >= threshold
    }
}
