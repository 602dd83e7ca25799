//! Assert macros that capture the call site.

/// Fatal assert against the global instance.
///
/// When `cond` is false, records the file id, `line!()`, PC and LR, notifies
/// the registered callback and halts.
///
/// ```rust,no_run
/// const FILE_ID: u16 = 7;
/// let queue_len = 3;
/// lq_diagnostics::diag_assert!(FILE_ID, queue_len < 8);
/// ```
#[macro_export]
macro_rules! diag_assert {
    ($file_id:expr, $cond:expr $(,)?) => {
        if !($cond) {
            let site = $crate::FaultSite::here($file_id, ::core::line!());
            $crate::assert_invoke(site.pc, site.lr, site.file_id, site.line);
        }
    };
}

/// Warning assert against the global instance.
///
/// When `cond` is false, notifies the callback with `text` and the call site,
/// then carries on.
#[macro_export]
macro_rules! diag_assert_warn {
    ($file_id:expr, $cond:expr, $text:expr $(,)?) => {
        if !($cond) {
            $crate::assert_warning($file_id, $crate::line_id(::core::line!()), $text);
        }
    };
}
