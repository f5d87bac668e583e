//! Formatting utilities for sizes and durations.

use std::time::Duration;

/// Human-readable byte count (`"2.38 MB"`).
///
/// ```
/// use wasmbuild_cli::ui::format_size;
///
/// assert_eq!(format_size(512), "512 B");
/// assert_eq!(format_size(2_500_000), "2.38 MB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit])
    }
}

/// Human-readable duration: milliseconds below a second, then seconds
/// with two decimals, then minutes and seconds.
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else if millis < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
