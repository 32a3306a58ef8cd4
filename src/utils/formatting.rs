use chrono::Local;

/// Wall-clock time used as the prefix of workflow log lines.
pub fn clock() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// A `[time] [System] message` line.
pub fn system_line(message: &str) -> String {
    format!("[{}] [System] {}", clock(), message)
}

pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else if ms < 3_600_000 {
        let mins = ms / 60_000;
        let secs = (ms % 60_000) / 1000;
        format!("{}m {}s", mins, secs)
    } else {
        let hours = ms / 3_600_000;
        let mins = (ms % 3_600_000) / 60_000;
        format!("{}h {}m", hours, mins)
    }
}
