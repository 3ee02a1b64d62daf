// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time formatting for operator-visible output.
//!
//! Persistence always stores timestamps with timezone; these helpers are for
//! log lines and status strings only.

use chrono::{DateTime, Utc};

/// Format a UTC timestamp as `YYYY-MM-DD HH:MM:SS`.
pub fn format_utc(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Format a millisecond duration as a compact human string.
pub fn format_elapsed_ms(ms: u64) -> String {
    if ms < 1_000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        let mins = ms / 60_000;
        let secs = (ms % 60_000) / 1000;
        format!("{}m{}s", mins, secs)
    }
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
