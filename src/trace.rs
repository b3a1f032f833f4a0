//! Logging hooks that vanish unless the `tracing` feature is on.
//!
//! Library code never talks to `tracing` directly; it goes through these
//! macros so builds without the feature carry no logging cost.

/// Info-level span around one matching pass.
///
/// Without the feature it yields a [`NoopSpan`] so `.entered()` still works
/// at the call site.
#[cfg(feature = "tracing")]
macro_rules! trace_span {
    ($name:expr, $($field:tt)+) => {
        tracing::info_span!($name, $($field)+)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_span {
    ($name:expr, $($field:tt)+) => {
        $crate::trace::NoopSpan
    };
}

/// Info-level progress event (chunks, regions, match counts).
///
/// Field values are still evaluated when the feature is off.
#[cfg(feature = "tracing")]
macro_rules! trace_event {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        tracing::info!(name: $name, $($key = $value),+)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_event {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        let _ = ($(&$value,)+);
    };
}

/// Warn-level event for conditions the run recovers from: retries,
/// rollbacks, skipped snapshots and failed chunks.
///
/// Fields take the full `tracing` syntax, `%` and `?` sigils included.
#[cfg(feature = "tracing")]
macro_rules! trace_warn {
    ($name:expr, $($field:tt)+) => {
        tracing::warn!(name: $name, $($field)+)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_warn {
    ($name:expr, $($field:tt)+) => {};
}

pub(crate) use trace_event;
pub(crate) use trace_span;
pub(crate) use trace_warn;

/// Stand-in span guard for builds without `tracing`.
#[cfg(not(feature = "tracing"))]
pub struct NoopSpan;

#[cfg(not(feature = "tracing"))]
impl NoopSpan {
    #[inline]
    pub fn entered(self) -> Self {
        self
    }
}
