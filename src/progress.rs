//! Progress extraction from downloader output lines

use regex::Regex;
use std::sync::LazyLock;

// Digits, a decimal point, exactly one fractional digit, then '%'
static PERCENT: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(\d+\.\d)%").ok());

/// Extract the integer percentage from a line of tool output
///
/// Uses the first match only. The fractional part is truncated and the
/// result clamped to 100. Lines without a match yield `None`.
///
/// ```
/// use media_dl::progress::parse_percent;
///
/// assert_eq!(parse_percent("[download]  37.5% of 10.00MiB"), Some(37));
/// assert_eq!(parse_percent("[youtube] Extracting URL"), None);
/// ```
pub fn parse_percent(line: &str) -> Option<u8> {
    let re = PERCENT.as_ref()?;
    let captured = re.captures(line)?.get(1)?.as_str();
    let value: f64 = captured.parse().ok()?;
    Some(value.floor().min(100.0) as u8)
}
