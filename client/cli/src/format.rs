use chrono::{DateTime, NaiveDateTime, Utc};

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Display format for upload timestamps, e.g. "Mar 1, 2024, 10:05 AM".
const UPLOAD_TIME_FORMAT: &str = "%b %-d, %Y, %I:%M %p";

/// Human-readable byte count using base-1024 units, at most two decimals.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let exponent = (bytes.ilog(1024) as usize).min(SIZE_UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exponent as i32);
    format!("{} {}", trim_decimals(value), SIZE_UNITS[exponent])
}

/// Size in KB with exactly two decimals, used for the selected-file line.
pub fn format_kilobytes(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / 1024.0)
}

/// Format an upload timestamp for display.
///
/// Timestamps with an offset are shown in UTC, naive ones as-is. Anything
/// unparseable comes back unchanged.
pub fn format_upload_time(timestamp: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return dt.with_timezone(&Utc).format(UPLOAD_TIME_FORMAT).to_string();
    }

    if let Ok(naive) = timestamp.parse::<NaiveDateTime>() {
        return naive.format(UPLOAD_TIME_FORMAT).to_string();
    }

    timestamp.to_string()
}

fn trim_decimals(value: f64) -> String {
    let fixed = format!("{:.2}", value);
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}
