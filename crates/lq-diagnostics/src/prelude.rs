//! Prelude for lq-diagnostics.
//!
//! This module re-exports the most commonly used types for convenient importing.
//!
//! # Example
//!
//! ```rust
//! use lq_diagnostics::prelude::*;
//!
//! let diag = Diagnostics::new();
//! diag.set_reset_cause(ResetCause::PowerOn);
//! assert!(diag.diagnostics().is_empty());
//! ```

pub use crate::assert::{BreakpointHalt, FaultSite, Halt};
#[cfg(feature = "std")]
pub use crate::backend::FileBackend;
pub use crate::backend::{MemoryBackend, RetentionBackend};
pub use crate::error::{DiagnosticsError, DiagnosticsResult};
pub use crate::notify::{NotifyFn, NotifyKind};
pub use crate::record::{DiagnosticRecord, NotifyMessage};
pub use crate::reset::{
    ResetCause, ResetCauses, ResetDisposition, RetentionPolicy, RetentionPolicyBuilder,
};
pub use crate::store::Diagnostics;
