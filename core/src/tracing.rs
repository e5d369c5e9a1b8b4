//! Tracing utilities for query, traversal and transaction observability.
//!
//! Enable the `tracing` feature to emit events via the `tracing` crate.
//! These macros no-op when the feature is disabled, avoiding `#[cfg]` boilerplate
//! at every call site.

/// Emit a debug-level event with the SQL text and parameter count.
///
/// ```ignore
/// fluent_trace_query!(&sql, params.len());
/// ```
#[macro_export]
macro_rules! fluent_trace_query {
    ($sql:expr, $param_count:expr) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(sql = %$sql, params = $param_count, "fluentql.query");
    };
}

/// Emit an info-level event for transaction lifecycle (begin, commit, rollback).
///
/// ```ignore
/// fluent_trace_tx!("begin", driver.name());
/// ```
#[macro_export]
macro_rules! fluent_trace_tx {
    ($event:literal, $driver:expr) => {
        #[cfg(feature = "tracing")]
        tracing::info!(event = $event, driver = $driver, "fluentql.transaction");
    };
}

/// Debug-level event for traversal progress.
///
/// ```ignore
/// fluent_trace_page!("chunk", "keyset", rows.len(), elapsed);
/// ```
#[macro_export]
macro_rules! fluent_trace_page {
    ($consumer:expr, $strategy:expr, $rows:expr, $elapsed:expr) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            consumer = $consumer,
            strategy = %$strategy,
            rows = $rows,
            elapsed_ms = $elapsed.as_secs_f64() * 1000.0,
            "fluentql.page"
        );
    };
}

/// Warn-level diagnostic that never affects control flow.
#[macro_export]
macro_rules! fluent_warn {
    ($($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        tracing::warn!($($arg)+);
    };
}

/// Error-level diagnostic for failures that were swallowed or rolled back.
#[macro_export]
macro_rules! fluent_error {
    ($($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        tracing::error!($($arg)+);
    };
}

/// Debug-level diagnostic.
#[macro_export]
macro_rules! fluent_debug {
    ($($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        tracing::debug!($($arg)+);
    };
}
