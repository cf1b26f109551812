//! Service constants.

/// Default Computer API endpoint.
pub const DEFAULT_API_URL: &str = "https://computer.mixin.dev";

/// HTTP status the Computer uses for an unknown user.
pub const NOT_FOUND_CODE: i64 = 404;
