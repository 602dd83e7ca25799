//! Fatal assert and warning entry points.
//!
//! A fatal assert writes its fault context into the store, tells the
//! application through the notification gate and then halts. The callback is
//! allowed to reset the device itself; the halt only runs if it returns.
//! Warnings notify and return, leaving the record untouched.

use core::fmt::{self, Write};

use heapless::String;

use crate::notify::NotifyKind;
use crate::store::Diagnostics;

/// Capacity of the fatal assert notification text.
pub const ASSERT_MSG_LEN: usize = 64;

/// Capacity of the warning notification text.
pub const WARNING_MSG_LEN: usize = 80;

/// Where a fatal assert fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FaultSite {
    /// Program counter.
    pub pc: u32,
    /// Link register.
    pub lr: u32,
    /// Numeric source file id.
    pub file_id: u16,
    /// Source line.
    pub line: u16,
}

impl FaultSite {
    /// Create a fault site from explicit values.
    #[must_use]
    pub const fn new(pc: u32, lr: u32, file_id: u16, line: u16) -> Self {
        Self {
            pc,
            lr,
            file_id,
            line,
        }
    }

    /// Capture PC and LR at the call site.
    #[inline(always)]
    #[must_use]
    pub fn here(file_id: u16, line: u32) -> Self {
        Self::new(
            crate::arch::program_counter(),
            crate::arch::link_register(),
            file_id,
            line_id(line),
        )
    }
}

/// Compact a `line!()` value into the record's 16-bit line field.
#[must_use]
pub const fn line_id(line: u32) -> u16 {
    if line > u16::MAX as u32 {
        u16::MAX
    } else {
        #[expect(clippy::cast_possible_truncation, reason = "range checked above")]
        let line = line as u16;
        line
    }
}

/// Stops the device after a fatal assert.
pub trait Halt {
    /// Never returns.
    fn halt(&self) -> !;
}

/// Breakpoint-then-wait halt for the running target.
#[derive(Debug, Clone, Copy, Default)]
pub struct BreakpointHalt;

impl Halt for BreakpointHalt {
    fn halt(&self) -> ! {
        crate::arch::halt()
    }
}

/// Fixed-capacity writer that drops whatever does not fit.
struct Truncating<const N: usize>(String<N>);

impl<const N: usize> Write for Truncating<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

fn bounded<const N: usize>(args: fmt::Arguments<'_>) -> String<N> {
    let mut out = Truncating(String::new());
    out.write_fmt(args).unwrap_or(());
    out.0
}

/// Text handed to the callback for a fatal assert.
#[must_use]
pub fn format_assert_message(site: &FaultSite) -> String<ASSERT_MSG_LEN> {
    bounded(format_args!(
        "ASSERT f:{},l:{}-pc=0x{:08X},lr=0x{:08X}",
        site.file_id, site.line, site.pc, site.lr
    ))
}

/// Text handed to the callback for a warning.
#[must_use]
pub fn format_warning_message(file_id: u16, line: u16, text: &str) -> String<WARNING_MSG_LEN> {
    bounded(format_args!("WARN f:{file_id:X},l:{line}-{text}\r"))
}

impl Diagnostics {
    /// Record fault context, mark the record valid and notify the callback.
    ///
    /// Returns whether the callback ran and returned. This is the fatal
    /// assert without the halt.
    pub fn capture_fault(&self, site: FaultSite) -> bool {
        self.store_fault_context(site.pc, site.lr, site.file_id, site.line);
        crate::diag_warn!(
            file_id = site.file_id,
            line = site.line,
            pc = site.pc,
            lr = site.lr,
            "fatal assert captured"
        );
        let msg = format_assert_message(&site);
        self.notify(NotifyKind::AssertFailed, &msg)
    }

    /// Service a failed fatal assert: capture, notify, then halt.
    pub fn assert_failed<H: Halt + ?Sized>(&self, site: FaultSite, halt: &H) -> ! {
        self.capture_fault(site);
        halt.halt()
    }

    /// Service a failed warning assert.
    ///
    /// Notifies the callback and returns; the record is not touched. Returns
    /// whether the callback ran.
    pub fn assert_warning(&self, file_id: u16, line: u16, text: &str) -> bool {
        crate::diag_debug!(file_id, line, text, "assert warning");
        let msg = format_warning_message(file_id, line, text);
        self.notify(NotifyKind::AssertWarning, &msg)
    }
}
