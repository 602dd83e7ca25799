//! Structured logging shims.
//!
//! With the `tracing` feature the macros forward to `tracing`; without it they
//! expand to nothing so bare-metal builds carry no subscriber machinery.

#[cfg(feature = "tracing")]
macro_rules! diag_debug {
    ($($arg:tt)*) => { ::tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! diag_debug {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "tracing")]
macro_rules! diag_info {
    ($($arg:tt)*) => { ::tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! diag_info {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "tracing")]
macro_rules! diag_warn {
    ($($arg:tt)*) => { ::tracing::warn!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! diag_warn {
    ($($arg:tt)*) => {};
}

pub(crate) use {diag_debug, diag_info, diag_warn};
