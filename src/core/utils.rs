use std::time::SystemTime;

use chrono::{DateTime, Utc};

/// Separator used by every path exposed from this crate.
pub const SEPARATOR: char = '/';

/// Normalizes a raw path into the canonical `a/b/c` form.
///
/// Every run of `/` or `\` becomes a single `/`, then one leading and one
/// trailing separator are stripped. Total and idempotent.
pub fn sanitize(raw: &str) -> String {
    let mut sanitized = String::with_capacity(raw.len());
    let mut in_separator = false;
    for ch in raw.chars() {
        if ch == '/' || ch == '\\' {
            if !in_separator {
                sanitized.push(SEPARATOR);
            }
            in_separator = true;
        } else {
            sanitized.push(ch);
            in_separator = false;
        }
    }
    if sanitized.starts_with(SEPARATOR) {
        sanitized.remove(0);
    }
    if sanitized.ends_with(SEPARATOR) {
        sanitized.pop();
    }
    sanitized
}

/// Splits a sanitized path into its segments. The empty path has none.
pub fn segments(sanitized: &str) -> impl Iterator<Item = &str> {
    sanitized.split(SEPARATOR).filter(|s| !s.is_empty())
}

/// Appends `name` to `parent`, treating `""` as the root.
pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}{SEPARATOR}{name}")
    }
}

/// Sanitizes `raw` and resolves `.` and `..` segments against `base`.
///
/// `..` never climbs above the root: extra parent steps are dropped.
pub fn normalize(base: &str, raw: &str) -> String {
    let mut parts: Vec<&str> = segments(base).collect();
    let raw = sanitize(raw);
    for part in segments(&raw) {
        match part {
            "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }
    parts.join("/")
}

/// Returns true if `name` can be used as a single path segment.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
}

/// Converts a host timestamp into milliseconds since the Unix epoch.
pub fn to_millis(time: SystemTime) -> i64 {
    DateTime::<Utc>::from(time).timestamp_millis()
}
