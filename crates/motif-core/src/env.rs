//! Environment flag parsing shared by every `from_env` constructor.

/// `1`/`true`/`yes`/`on` and `0`/`false`/`no`/`off`, case-insensitive.
/// Anything else is `None`.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Read a boolean variable, falling back to `default` when it is unset or
/// not a recognised flag.
pub fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| parse_flag(&v))
        .unwrap_or(default)
}
