//! Human-readable sizes, rates, and durations for the panel and CLI.

const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * 1024.0;

/// Shown when the remaining time cannot be estimated.
pub const ETA_UNKNOWN: &str = "--";

/// `512 B`, `1.50 KB`, `3.20 GB`, ...
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    const UNITS: [&str; 5] = ["KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64 / KIB;
    let mut unit = 0;
    while size >= KIB && unit < UNITS.len() - 1 {
        size /= KIB;
        unit += 1;
    }
    format!("{:.2} {}", size, UNITS[unit])
}

/// Throughput in KB/s, switching to MB/s above 1 MiB/s.
pub fn format_rate(bytes_per_sec: f64) -> String {
    if bytes_per_sec > MIB {
        format!("{:5.1} MB/s", bytes_per_sec / MIB)
    } else {
        format!("{:5.1} KB/s", bytes_per_sec.max(0.0) / KIB)
    }
}

/// `42s`, `3m 5s`, or `2h 10m` depending on magnitude.
pub fn format_eta(secs: f64) -> String {
    if !secs.is_finite() {
        return ETA_UNKNOWN.to_string();
    }
    if secs < 0.0 {
        return "0s".to_string();
    }
    let total = secs as u64;
    if total < 60 {
        return format!("{total}s");
    }
    if total < 3600 {
        return format!("{}m {}s", total / 60, total % 60);
    }
    format!("{}h {}m", total / 3600, (total % 3600) / 60)
}

/// Remaining time for `remaining` bytes at `bytes_per_sec`, or the sentinel.
pub fn eta_for(remaining: u64, bytes_per_sec: f64) -> String {
    if bytes_per_sec > 0.0 {
        format_eta(remaining as f64 / bytes_per_sec)
    } else {
        ETA_UNKNOWN.to_string()
    }
}
