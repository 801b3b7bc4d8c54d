//! Adaptive processing-time estimation for remote jobs.
//!
//! The remote service exposes no progress signal while an asset is in its
//! processing state, so the estimate is seeded from two independent
//! heuristics (asset size and observed upload duration) and revised upward
//! while polling so the reported time remaining never goes negative or
//! sticks at zero.

use std::time::Duration;

/// Floor for the size-based seed (seconds).
const MIN_SIZE_ESTIMATE_SECS: f64 = 30.0;
/// Floor for the upload-based seed (seconds).
const MIN_UPLOAD_ESTIMATE_SECS: f64 = 20.0;
/// Ceiling for any seed (30 minutes).
const MAX_ESTIMATE_SECS: f64 = 30.0 * 60.0;

/// Snapshot of elapsed time against the current total estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEstimate {
    pub elapsed: Duration,
    pub estimated_total: Duration,
}

impl ProgressEstimate {
    /// Time remaining; never negative.
    pub fn remaining(&self) -> Duration {
        self.estimated_total.saturating_sub(self.elapsed)
    }
}

/// Adaptive ETA estimator for the remote processing phase.
///
/// The total estimate is monotonically non-decreasing: once elapsed time
/// reaches 90% of the current estimate, the estimate is raised to
/// `elapsed * 1.25`.
#[derive(Debug, Clone)]
pub struct EtaEstimator {
    estimated_total_secs: f64,
}

impl EtaEstimator {
    /// Seed the estimate from asset size and, when available, the observed
    /// upload duration. The two guesses are averaged; each is clamped into
    /// a sane range first.
    pub fn seed(size_bytes: u64, upload_duration: Option<Duration>) -> Self {
        let size_mb = size_bytes as f64 / 1_000_000.0;
        let by_size =
            (30.0 + 0.8 * size_mb).clamp(MIN_SIZE_ESTIMATE_SECS, MAX_ESTIMATE_SECS);

        let estimated_total_secs = match upload_duration {
            Some(upload) => {
                let by_upload = (2.5 * upload.as_secs_f64())
                    .clamp(MIN_UPLOAD_ESTIMATE_SECS, MAX_ESTIMATE_SECS);
                (by_size + by_upload) / 2.0
            }
            None => by_size,
        };

        Self {
            estimated_total_secs,
        }
    }

    /// Current total estimate.
    pub fn estimated_total(&self) -> Duration {
        Duration::from_secs_f64(self.estimated_total_secs)
    }

    /// Revise the estimate against observed elapsed time and return the
    /// updated snapshot.
    pub fn revise(&mut self, elapsed: Duration) -> ProgressEstimate {
        let elapsed_secs = elapsed.as_secs_f64();
        if elapsed_secs >= self.estimated_total_secs * 0.9 {
            self.estimated_total_secs = self.estimated_total_secs.max(elapsed_secs * 1.25);
        }
        ProgressEstimate {
            elapsed,
            estimated_total: self.estimated_total(),
        }
    }
}

/// Format a duration for progress lines: `45s`, `3m 20s`, `1h 05m`.
pub fn human_duration(d: Duration) -> String {
    let secs = d.as_secs_f64().round().max(0.0) as u64;
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        let (m, s) = (secs / 60, secs % 60);
        if s == 0 {
            format!("{}m", m)
        } else {
            format!("{}m {}s", m, s)
        }
    } else {
        let h = secs / 3600;
        let m = (secs % 3600) / 60;
        format!("{}h {:02}m", h, m)
    }
}

/// Format a byte count for progress lines: `512 B`, `3.4 MB`.
pub fn human_bytes(n: u64) -> String {
    let mut value = n as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if value < 1024.0 {
            return if unit == "B" {
                format!("{:.0} {}", value, unit)
            } else {
                format!("{:.1} {}", value, unit)
            };
        }
        value /= 1024.0;
    }
    format!("{:.1} TB", value)
}
