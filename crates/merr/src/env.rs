//! Environment variable helpers
//!
//! All runtime knobs (log level, stderr flushing, smoke buffer size) are read
//! through these. Parse failures fall back to the default.
//!
//! ```ignore
//! use merr::env::{env_get, env_get_bool};
//!
//! let buf_sz: usize = env_get("MERR_SMOKE_BUF", 256);
//! let flush = env_get_bool("MERR_FLUSH_EPRINT", false);
//! ```

use std::str::FromStr;

/// Get environment variable parsed as `T`, or `default`
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Get environment variable as boolean
///
/// "1", "true", "yes", "on" (any case) are true, anything else set is false.
/// Unset returns `default`.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

/// `Some(T)` if the variable is set and parses, `None` otherwise
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Get environment variable as a `String`, or `default` if unset or not UTF-8
#[inline]
pub fn env_get_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// `true` if the variable is present, whatever its value
#[inline]
pub fn env_is_set(key: &str) -> bool {
    std::env::var_os(key).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_get_default() {
        let val: usize = env_get("__MERR_UNSET_VAR_12345__", 42);
        assert_eq!(val, 42);
    }

    #[test]
    fn test_env_get_opt_none() {
        let val: Option<u64> = env_get_opt("__MERR_UNSET_VAR_12345__");
        assert!(val.is_none());
    }

    #[test]
    fn test_env_get_with_set_var() {
        std::env::set_var("__MERR_TEST_NUM__", " 512 ");
        let val: usize = env_get("__MERR_TEST_NUM__", 0);
        assert_eq!(val, 512);
        std::env::remove_var("__MERR_TEST_NUM__");
    }

    #[test]
    fn test_env_get_invalid_parse() {
        std::env::set_var("__MERR_TEST_INVALID__", "lots");
        let val: usize = env_get("__MERR_TEST_INVALID__", 99);
        assert_eq!(val, 99);
        std::env::remove_var("__MERR_TEST_INVALID__");
    }

    #[test]
    fn test_env_get_bool_variants() {
        assert!(env_get_bool("__MERR_UNSET_VAR_12345__", true));

        for on in ["1", "true", "TRUE", "yes", "On"] {
            std::env::set_var("__MERR_TEST_BOOL__", on);
            assert!(env_get_bool("__MERR_TEST_BOOL__", false), "{on}");
        }
        for off in ["0", "false", "garbage"] {
            std::env::set_var("__MERR_TEST_BOOL__", off);
            assert!(!env_get_bool("__MERR_TEST_BOOL__", true), "{off}");
        }
        std::env::remove_var("__MERR_TEST_BOOL__");
    }

    #[test]
    fn test_env_get_str_and_is_set() {
        assert!(!env_is_set("__MERR_UNSET_VAR_12345__"));
        assert_eq!(env_get_str("__MERR_UNSET_VAR_12345__", "warn"), "warn");

        std::env::set_var("__MERR_TEST_STR__", "debug");
        assert!(env_is_set("__MERR_TEST_STR__"));
        assert_eq!(env_get_str("__MERR_TEST_STR__", "warn"), "debug");
        std::env::remove_var("__MERR_TEST_STR__");
    }
}
