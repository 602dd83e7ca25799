//! Target-specific register capture and halt.
//!
//! On bare-metal ARM the program counter and link register are read with a
//! single `mov` each and the halt is a `BKPT #9` followed by an endless wait.
//! Hosts have no meaningful register values to record, so capture yields
//! zero and the halt spins.

/// Program counter at the call site.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[inline(always)]
#[must_use]
#[expect(unsafe_code, reason = "register reads need inline assembly")]
pub fn program_counter() -> u32 {
    let pc: u32;
    // SAFETY: copies PC into a scratch register; no memory or flags touched.
    unsafe {
        core::arch::asm!("mov {}, pc", out(reg) pc, options(nomem, nostack, preserves_flags));
    }
    pc
}

/// Link register at the call site.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[inline(always)]
#[must_use]
#[expect(unsafe_code, reason = "register reads need inline assembly")]
pub fn link_register() -> u32 {
    let lr: u32;
    // SAFETY: copies LR into a scratch register; no memory or flags touched.
    unsafe {
        core::arch::asm!("mov {}, lr", out(reg) lr, options(nomem, nostack, preserves_flags));
    }
    lr
}

/// Program counter at the call site (always zero on this target).
#[cfg(not(all(target_arch = "arm", target_os = "none")))]
#[inline]
#[must_use]
pub fn program_counter() -> u32 {
    0
}

/// Link register at the call site (always zero on this target).
#[cfg(not(all(target_arch = "arm", target_os = "none")))]
#[inline]
#[must_use]
pub fn link_register() -> u32 {
    0
}

/// Breakpoint immediate that marks a fatal diagnostics assert.
pub const ASSERT_BKPT_IMM: u8 = 9;

/// Stop execution for good.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[expect(unsafe_code, reason = "BKPT with an immediate needs inline assembly")]
pub fn halt() -> ! {
    // SAFETY: BKPT only traps to an attached debugger or the debug monitor.
    unsafe {
        core::arch::asm!(
            "bkpt #{imm}",
            imm = const ASSERT_BKPT_IMM,
            options(nomem, nostack, preserves_flags)
        );
    }
    loop {
        cortex_m::asm::wfi();
    }
}

/// Stop execution for good.
#[cfg(not(all(target_arch = "arm", target_os = "none")))]
pub fn halt() -> ! {
    loop {
        core::hint::spin_loop();
    }
}
