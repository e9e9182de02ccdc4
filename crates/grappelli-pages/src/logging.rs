//! Logging abstraction layer for grappelli-pages
//!
//! Thin macros over `tracing`, all emitting under the `grappelli` target so
//! applications can filter runtime diagnostics in one place. The library never
//! installs a subscriber.
//!
//! ## Macro Overview
//!
//! | Macro | Level | Feature Required |
//! |-------|-------|------------------|
//! | `debug_log!` | `DEBUG` | `debug-hooks` |
//! | `info_log!` | `INFO` | None |
//! | `warn_log!` | `WARN` | None |
//! | `error_log!` | `ERROR` | None |
//!
//! All macros accept `tracing` field syntax before the message.
//!
//! ## Example
//!
//! ```ignore
//! use grappelli_pages::{debug_log, error_log};
//!
//! debug_log!("compiled template with {} bindings", count);
//! error_log!(expression = %expr, "evaluation failed: {}", err);
//! ```

/// Tracing target used by every grappelli log event.
pub const LOG_TARGET: &str = "grappelli";

/// Logs a debug message (requires `debug-hooks` feature)
///
/// Compiles to a no-op when the feature is off.
#[macro_export]
#[cfg(feature = "debug-hooks")]
macro_rules! debug_log {
	($($arg:tt)*) => {{
		$crate::__tracing::debug!(target: "grappelli", $($arg)*);
	}};
}

/// No-op debug_log when `debug-hooks` is disabled
#[macro_export]
#[cfg(not(feature = "debug-hooks"))]
macro_rules! debug_log {
	($($arg:tt)*) => {{}};
}

/// Logs an info message
///
/// # Example
///
/// ```ignore
/// info_log!("mounted {} into the document", name);
/// ```
#[macro_export]
macro_rules! info_log {
	($($arg:tt)*) => {{
		$crate::__tracing::info!(target: "grappelli", $($arg)*);
	}};
}

/// Logs a warning message
///
/// # Example
///
/// ```ignore
/// warn_log!(key = ?key, "duplicate key in each block");
/// ```
#[macro_export]
macro_rules! warn_log {
	($($arg:tt)*) => {{
		$crate::__tracing::warn!(target: "grappelli", $($arg)*);
	}};
}

/// Logs an error message
///
/// # Example
///
/// ```ignore
/// error_log!(expression = %expr, "evaluation failed: {}", error);
/// ```
#[macro_export]
macro_rules! error_log {
	($($arg:tt)*) => {{
		$crate::__tracing::error!(target: "grappelli", $($arg)*);
	}};
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	#[rstest]
	fn test_logging_macros_compile() {
		debug_log!("Debug message: {}", 42);
		info_log!("Info message: {}", "test");
		warn_log!("Warning message: {:?}", vec![1, 2, 3]);
		error_log!("Error message: {}", "error");
	}

	#[rstest]
	fn test_logging_macros_with_fields() {
		let expr = "count() + 1";
		warn_log!(expression = %expr, "Simple warning");
		error_log!(expression = %expr, keys = ?["count"], "Simple error");
	}
}
