//! Reset causes and the retention policy applied at boot.
//!
//! The boot-time collaborator reads the platform reset-cause register and
//! hands the result to [`crate::Diagnostics::set_reset_cause`]. The policy
//! decides whether the previous boot's record survives:
//!
//! ```text
//!            cause in fault set?
//!          ┌────────yes──────────┐
//!          │                     ▼
//!   (boot) ┤             boot_flag += 1 (saturating)
//!          │             everything else retained
//!          │
//!          └────────no───────────► zero record, keep boot_flag
//! ```

use core::fmt;

use bitflags::bitflags;

use crate::error::{DiagnosticsError, DiagnosticsResult};

/// Platform-reported reason for the last restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ResetCause {
    /// Cause not reported or not recognised.
    #[default]
    Other = 0,
    /// Power applied.
    PowerOn = 1,
    /// External reset pin asserted.
    ExternalPin = 2,
    /// Supply voltage dropped below the brown-out threshold.
    Brownout = 3,
    /// Watchdog expired.
    Watchdog = 4,
    /// System fault or fault-driven system reset request.
    SystemFault = 5,
    /// Restart requested by the application or the host.
    User = 6,
}

impl ResetCause {
    /// Convert from a raw cause code.
    #[must_use]
    pub fn from_raw(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Other),
            1 => Some(Self::PowerOn),
            2 => Some(Self::ExternalPin),
            3 => Some(Self::Brownout),
            4 => Some(Self::Watchdog),
            5 => Some(Self::SystemFault),
            6 => Some(Self::User),
            _ => None,
        }
    }

    /// Convert to the raw cause code.
    #[must_use]
    pub fn to_raw(self) -> u8 {
        self as u8
    }

    /// Get the cause as a string slice.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Other => "Other",
            Self::PowerOn => "PowerOn",
            Self::ExternalPin => "ExternalPin",
            Self::Brownout => "Brownout",
            Self::Watchdog => "Watchdog",
            Self::SystemFault => "SystemFault",
            Self::User => "User",
        }
    }
}

impl fmt::Display for ResetCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u8> for ResetCause {
    type Error = DiagnosticsError;

    fn try_from(value: u8) -> DiagnosticsResult<Self> {
        Self::from_raw(value).ok_or(DiagnosticsError::UnknownResetCause(value))
    }
}

bitflags! {
    /// Set of reset causes; bit `n` stands for raw cause code `n`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResetCauses: u8 {
        /// [`ResetCause::Other`].
        const OTHER = 1 << 0;
        /// [`ResetCause::PowerOn`].
        const POWER_ON = 1 << 1;
        /// [`ResetCause::ExternalPin`].
        const EXTERNAL_PIN = 1 << 2;
        /// [`ResetCause::Brownout`].
        const BROWNOUT = 1 << 3;
        /// [`ResetCause::Watchdog`].
        const WATCHDOG = 1 << 4;
        /// [`ResetCause::SystemFault`].
        const SYSTEM_FAULT = 1 << 5;
        /// [`ResetCause::User`].
        const USER = 1 << 6;
    }
}

impl ResetCauses {
    /// Set holding the single raw cause code, empty for codes without a bit.
    #[must_use]
    pub const fn from_raw_cause(raw: u8) -> Self {
        if raw < 8 {
            Self::from_bits_truncate(1 << raw)
        } else {
            Self::empty()
        }
    }

    /// Whether the raw cause code is a member of this set.
    #[must_use]
    pub const fn contains_raw(self, raw: u8) -> bool {
        let bit = Self::from_raw_cause(raw);
        !bit.is_empty() && self.contains(bit)
    }
}

impl From<ResetCause> for ResetCauses {
    fn from(cause: ResetCause) -> Self {
        Self::from_raw_cause(cause.to_raw())
    }
}

/// Outcome of applying a reset cause to the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetDisposition {
    /// Fault boot: prior record retained, boot flag advanced.
    Retained {
        /// Boot flag after the increment.
        boot_flag: u8,
    },
    /// Normal boot: record cleared, boot flag preserved.
    Cleared,
}

impl ResetDisposition {
    /// Whether the previous boot's record survived.
    #[must_use]
    pub fn is_retained(self) -> bool {
        matches!(self, Self::Retained { .. })
    }
}

/// Which reset causes count as faults and therefore keep the prior record.
///
/// The policy is not part of the retained block: it is supplied on every boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct RetentionPolicy {
    /// Causes whose boots retain the previous record.
    ///
    /// Default: watchdog and system fault.
    pub fault_causes: ResetCauses,
}

impl RetentionPolicy {
    /// Watchdog and system-fault resets retain; everything else clears.
    pub const DEFAULT: Self = Self {
        fault_causes: ResetCauses::WATCHDOG.union(ResetCauses::SYSTEM_FAULT),
    };

    /// Create a policy with the given fault set.
    ///
    /// # Errors
    ///
    /// Returns an error if `fault_causes` is empty.
    pub fn new(fault_causes: ResetCauses) -> DiagnosticsResult<Self> {
        let policy = Self { fault_causes };
        policy.validate()?;
        Ok(policy)
    }

    /// Create a policy builder.
    #[must_use]
    pub fn builder() -> RetentionPolicyBuilder {
        RetentionPolicyBuilder::default()
    }

    /// Validate the policy.
    ///
    /// # Errors
    ///
    /// Returns an error if no cause is treated as a fault, or if power-on is:
    /// a power-on boot never has a predecessor whose context is worth keeping.
    pub fn validate(&self) -> DiagnosticsResult<()> {
        if self.fault_causes.is_empty() {
            return Err(DiagnosticsError::InvalidPolicy(
                "fault_causes must name at least one cause",
            ));
        }
        if self.fault_causes.contains(ResetCauses::POWER_ON) {
            return Err(DiagnosticsError::InvalidPolicy(
                "power-on resets cannot retain diagnostics",
            ));
        }
        Ok(())
    }

    /// Whether the raw cause code is a fault cause under this policy.
    #[must_use]
    pub fn is_fault(&self, raw_cause: u8) -> bool {
        self.fault_causes.contains_raw(raw_cause)
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Builder for `RetentionPolicy`.
#[derive(Debug, Default)]
pub struct RetentionPolicyBuilder {
    policy: RetentionPolicy,
}

impl RetentionPolicyBuilder {
    /// Treat `cause` as a fault cause.
    #[must_use]
    pub fn retain_on(mut self, cause: ResetCause) -> Self {
        self.policy.fault_causes |= ResetCauses::from(cause);
        self
    }

    /// Treat `cause` as a normal boot.
    #[must_use]
    pub fn clear_on(mut self, cause: ResetCause) -> Self {
        self.policy.fault_causes -= ResetCauses::from(cause);
        self
    }

    /// Replace the whole fault set.
    #[must_use]
    pub fn fault_causes(mut self, causes: ResetCauses) -> Self {
        self.policy.fault_causes = causes;
        self
    }

    /// Build the policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the policy is invalid.
    pub fn build(self) -> DiagnosticsResult<RetentionPolicy> {
        self.policy.validate()?;
        Ok(self.policy)
    }
}
