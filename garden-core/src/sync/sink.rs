//! Reporting of recovered failures.

use std::error::Error;

/// Receives failures the sync layer recovered from instead of surfacing.
///
/// `context` carries small key/value pairs such as the collection name or the
/// record id involved.
pub trait ErrorSink: Send + Sync {
    fn log_error(
        &self,
        category: &str,
        message: &str,
        error: &dyn Error,
        context: &[(&str, &str)],
    );
}

/// Forwards recovered failures to `tracing` as warnings.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn log_error(
        &self,
        category: &str,
        message: &str,
        error: &dyn Error,
        context: &[(&str, &str)],
    ) {
        let context = context
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(" ");
        tracing::warn!(category, context = %context, error = %error, "{}", message);
    }
}
