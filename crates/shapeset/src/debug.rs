//! Process-wide debug configuration.
//!
//! The assertion mode is read from the `DEBUG_LEVEL` environment variable
//! once, on first use, and is read-only thereafter. A level of 1 or higher
//! enables the topology invariant assertions; the default of 0 skips them.

use std::sync::OnceLock;

static DEBUG_LEVEL: OnceLock<i64> = OnceLock::new();

/// The current debug level, parsed from `DEBUG_LEVEL` on first call.
/// Unset or unparsable values yield 0.
pub fn debug_level() -> i64 {
    *DEBUG_LEVEL.get_or_init(|| {
        std::env::var("DEBUG_LEVEL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    })
}

/// Panic with `statement` if `check` fails while invariant assertions are
/// enabled. Invariant violations are programming errors, not recoverable
/// conditions.
pub(crate) fn assert_invariant(statement: &str, check: impl FnOnce() -> bool) {
    if debug_level() < 1 {
        return;
    }
    if !check() {
        panic!("Assertion failed: {statement}");
    }
}
