//! Environment lookups used by the per-binary config loaders

use std::str::FromStr;

/// Read an optional `.env` file. Missing files are ignored.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

/// Non-empty string value of `key`
pub fn var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Value of `key`, or `default` when unset or empty
pub fn var_or(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|| default.to_string())
}

/// Parsed value of `key`. Unset or unparsable values yield `None`.
pub fn parse<T: FromStr>(key: &str) -> Option<T> {
    var(key).and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_fallbacks() {
        std::env::set_var("METERLINE_TEST_PORT", "5461");
        std::env::set_var("METERLINE_TEST_BAD", "not-a-number");
        std::env::set_var("METERLINE_TEST_EMPTY", "  ");

        assert_eq!(parse::<u16>("METERLINE_TEST_PORT"), Some(5461));
        assert_eq!(parse::<u16>("METERLINE_TEST_BAD"), None);
        assert_eq!(var("METERLINE_TEST_EMPTY"), None);
        assert_eq!(var_or("METERLINE_TEST_UNSET", "fallback"), "fallback");
    }
}
