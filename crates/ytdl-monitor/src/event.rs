//! Events delivered to the consumer of a download session.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ExecutionError;

/// One progress report, as printed by the tool.
///
/// The four fields are passed through verbatim; the typed accessors below
/// are a convenience and never alter them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadProgress {
    progress: String,
    file_size: String,
    download_speed: String,
    remaining_time: String,
}

impl DownloadProgress {
    /// Build a progress report. Returns `None` if any field is empty.
    pub fn new(
        progress: impl Into<String>,
        file_size: impl Into<String>,
        download_speed: impl Into<String>,
        remaining_time: impl Into<String>,
    ) -> Option<Self> {
        let progress = Self {
            progress: progress.into(),
            file_size: file_size.into(),
            download_speed: download_speed.into(),
            remaining_time: remaining_time.into(),
        };

        let complete = [
            &progress.progress,
            &progress.file_size,
            &progress.download_speed,
            &progress.remaining_time,
        ]
        .iter()
        .all(|field| !field.is_empty());

        complete.then_some(progress)
    }

    /// Percentage field, e.g. `"45.2%"`.
    pub fn progress(&self) -> &str {
        &self.progress
    }

    /// Total size, e.g. `"10.5MiB"` or `"~10.5MiB"` for estimates.
    pub fn file_size(&self) -> &str {
        &self.file_size
    }

    /// Transfer rate, e.g. `"1.2MiB/s"`.
    pub fn download_speed(&self) -> &str {
        &self.download_speed
    }

    /// ETA, e.g. `"00:12"`.
    pub fn remaining_time(&self) -> &str {
        &self.remaining_time
    }

    /// Percentage as a number in `0.0..=100.0`.
    pub fn percent(&self) -> Option<f64> {
        let value: f64 = self.progress.trim().strip_suffix('%')?.trim().parse().ok()?;
        (0.0..=100.0).contains(&value).then_some(value)
    }

    /// Total size in bytes.
    pub fn total_bytes(&self) -> Option<u64> {
        parse_size(self.file_size.trim().trim_start_matches('~'))
    }

    pub fn speed_bytes_per_sec(&self) -> Option<u64> {
        parse_size(self.download_speed.trim().strip_suffix("/s")?)
    }

    /// ETA as a duration. `None` for `"Unknown"` and other non-clock values.
    pub fn eta(&self) -> Option<Duration> {
        let eta = self.remaining_time.split_whitespace().next()?;
        parse_clock(eta).map(Duration::from_secs)
    }
}

/// Parse a size such as `10.5MiB`, `512KiB`, `1.2MB` or `900B` into bytes.
fn parse_size(s: &str) -> Option<u64> {
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    let value: f64 = number.parse().ok()?;

    let multiplier: f64 = match unit.trim() {
        "" | "B" => 1.0,
        "KiB" => 1024.0,
        "MiB" => 1024.0 * 1024.0,
        "GiB" => 1024.0 * 1024.0 * 1024.0,
        "TiB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        "KB" | "kB" => 1e3,
        "MB" => 1e6,
        "GB" => 1e9,
        "TB" => 1e12,
        _ => return None,
    };

    Some((value * multiplier).round() as u64)
}

/// Parse `SS`, `MM:SS` or `HH:MM:SS` into seconds.
fn parse_clock(s: &str) -> Option<u64> {
    let mut total = 0u64;
    let mut count = 0;

    for part in s.split(':') {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        total = total.checked_mul(60)?.checked_add(part.parse().ok()?)?;
        count += 1;
    }

    (1..=3).contains(&count).then_some(total)
}

/// Unit of communication from a download session to its consumer.
#[derive(Debug, Clone)]
pub enum DownloadEvent {
    /// Output file announced by the tool. Sent at most once, before any progress.
    Destination(String),
    /// A progress line.
    Progress(DownloadProgress),
    /// The process failed. Always sent after the process has exited.
    Failed(ExecutionError),
}

impl DownloadEvent {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn as_progress(&self) -> Option<&DownloadProgress> {
        match self {
            Self::Progress(p) => Some(p),
            _ => None,
        }
    }
}
