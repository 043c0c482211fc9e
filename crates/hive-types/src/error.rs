//! Unified error interface for hive.
//!
//! Every error enum in the workspace implements [`ErrorCode`] so that
//! callers (and the Lua boundary) can handle failures by stable code
//! instead of by display string.
//!
//! # Example
//!
//! ```
//! use hive_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     NotFound,
//!     QueueFull,
//! }
//!
//! impl ErrorCode for MyError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::NotFound => "MY_NOT_FOUND",
//!             Self::QueueFull => "MY_QUEUE_FULL",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::QueueFull)
//!     }
//! }
//!
//! assert_eq!(MyError::NotFound.code(), "MY_NOT_FOUND");
//! assert!(MyError::QueueFull.is_recoverable());
//! ```

/// Stable machine-readable error code interface.
///
/// # Code Format
///
/// - **UPPER_SNAKE_CASE**: e.g. `"POOL_INVALID_ARGUMENT"`
/// - **Domain-prefixed**: `POOL_`, `PROCESS_`, `CHANNEL_`, `QUEUE_`,
///   `CONTEXT_`, `RUNTIME_`, `LUA_`
/// - **Stable**: codes are an API contract and must not change once
///   published
///
/// # Recoverability
///
/// An error is recoverable when retrying (or draining) can succeed:
/// a full bounded channel is recoverable, a double `wrap` is not.
pub trait ErrorCode {
    /// Returns the machine-readable code for this error.
    fn code(&self) -> &'static str;

    /// Returns whether a retry of the failed operation can succeed.
    fn is_recoverable(&self) -> bool;
}

/// Validates that an error code follows the hive conventions.
///
/// # Panics
///
/// Panics with a descriptive message if the code is empty, lacks the
/// expected prefix, or is not UPPER_SNAKE_CASE. Intended for tests.
///
/// # Example
///
/// ```
/// use hive_types::{assert_error_code, ErrorCode};
///
/// #[derive(Debug)]
/// struct Full;
///
/// impl ErrorCode for Full {
///     fn code(&self) -> &'static str { "CHANNEL_FULL" }
///     fn is_recoverable(&self) -> bool { true }
/// }
///
/// assert_error_code(&Full, "CHANNEL_");
/// ```
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "error code '{}' must start with prefix '{}'",
        code,
        expected_prefix
    );
    assert!(
        is_upper_snake_case(code),
        "error code '{}' must be UPPER_SNAKE_CASE",
        code
    );
}

/// Validates every variant of an error enum at once.
///
/// # Example
///
/// ```
/// use hive_types::{assert_error_codes, ErrorCode};
///
/// #[derive(Debug)]
/// enum E { A, B }
///
/// impl ErrorCode for E {
///     fn code(&self) -> &'static str {
///         match self { E::A => "X_A", E::B => "X_B" }
///     }
///     fn is_recoverable(&self) -> bool { false }
/// }
///
/// assert_error_codes(&[E::A, E::B], "X_");
/// ```
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

/// Checks if a string is UPPER_SNAKE_CASE.
fn is_upper_snake_case(s: &str) -> bool {
    if s.is_empty() || s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return false;
    }
    s.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
