//! Time intervals and the normalization engine.
//!
//! Model-proposed windows (highlight reels, thumbnail instants, edit
//! segments) arrive malformed more often than not: out of range, reversed,
//! overlapping, duplicated, or with implausible durations. `normalize`
//! enforces the domain invariants before any downstream consumer sees them:
//! sorted ascending by start, minimum spacing between windows, durations
//! within configured bounds, and a hard count cap.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::timestamp::{format_seconds, frame_at};

/// A proposed or normalized time window within a video.
///
/// A thumbnail instant is the degenerate case with `start_seconds ==
/// end_seconds`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Interval {
    /// Start offset in seconds from the beginning of the asset
    pub start_seconds: f64,

    /// End offset in seconds (>= start after normalization)
    pub end_seconds: f64,

    /// Open label (e.g. "near_fall", "takedown"); unknown labels are kept
    pub label: String,

    /// Why the model proposed this window
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// One-line hook text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook: Option<String>,

    /// Suggested caption
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl Interval {
    /// Create a bare interval with just a window and label.
    pub fn new(start_seconds: f64, end_seconds: f64, label: impl Into<String>) -> Self {
        Self {
            start_seconds,
            end_seconds,
            label: label.into(),
            reason: None,
            hook: None,
            caption: None,
        }
    }

    /// Window duration in seconds.
    pub fn duration(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }
}

/// Constraints applied by [`normalize`].
///
/// The per-call-site families (highlight reels, thumbnail instants, edit
/// windows) differ only in these constants, not in algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IntervalConstraints {
    /// Minimum acceptable window duration (seconds)
    pub min_duration: f64,
    /// Maximum acceptable window duration (seconds)
    pub max_duration: f64,
    /// Duration a window is widened to when outside the acceptable range
    pub target_duration: f64,
    /// Minimum clearance between accepted windows (seconds)
    pub min_gap: f64,
    /// Hard cap on accepted windows
    pub max_count: usize,
    /// Total asset span; windows are clamped into `[0, total_span]`
    pub total_span: f64,
}

impl IntervalConstraints {
    /// Promo highlight windows: ~5s segments, 2s apart, at most 10.
    pub fn highlight_reel(total_span: f64) -> Self {
        Self {
            min_duration: 4.5,
            max_duration: 5.5,
            target_duration: 5.0,
            min_gap: 2.0,
            max_count: 10,
            total_span,
        }
    }

    /// Thumbnail instants: zero-width windows deduplicated within 1s.
    pub fn thumbnail_instants(total_span: f64) -> Self {
        Self {
            min_duration: 0.0,
            max_duration: 0.0,
            target_duration: 0.0,
            min_gap: 1.0,
            max_count: 10,
            total_span,
        }
    }

    /// Edit-guide segments: short effect windows, up to 24, may touch.
    pub fn edit_windows(total_span: f64) -> Self {
        Self {
            min_duration: 0.5,
            max_duration: 30.0,
            target_duration: 2.0,
            min_gap: 0.0,
            max_count: 24,
            total_span,
        }
    }
}

impl Default for IntervalConstraints {
    fn default() -> Self {
        Self::highlight_reel(f64::MAX)
    }
}

/// Normalize candidate windows into a valid, ordered, capped set.
///
/// Steps, in order:
/// 1. Clamp starts/ends into `[0, total_span]`, swapping reversed pairs and
///    dropping non-finite values.
/// 2. Widen windows whose duration falls outside
///    `[min_duration, max_duration]` to `start + target_duration`, capped at
///    the span end. A proposed instant is still a useful signal of *where*.
/// 3. Sort ascending by start.
/// 4. Greedy earliest-start selection: accept a window only if it clears
///    `min_gap` against every already-accepted window.
/// 5. Truncate to `max_count`, keeping the earliest entries.
///
/// An empty candidate list yields an empty output. The transformation is
/// deterministic and idempotent.
pub fn normalize(candidates: Vec<Interval>, constraints: &IntervalConstraints) -> Vec<Interval> {
    let span = constraints.total_span.max(0.0);

    let mut windows: Vec<Interval> = candidates
        .into_iter()
        .filter(|c| c.start_seconds.is_finite() && c.end_seconds.is_finite())
        .map(|mut c| {
            let mut start = c.start_seconds.clamp(0.0, span);
            let mut end = c.end_seconds.clamp(0.0, span);
            if start > end {
                std::mem::swap(&mut start, &mut end);
            }

            let duration = end - start;
            if duration < constraints.min_duration || duration > constraints.max_duration {
                end = (start + constraints.target_duration).min(span);
            }

            c.start_seconds = start;
            c.end_seconds = end;
            c
        })
        .collect();

    windows.sort_by(|a, b| {
        a.start_seconds
            .partial_cmp(&b.start_seconds)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut accepted: Vec<Interval> = Vec::new();
    for window in windows {
        let conflicts = accepted.iter().any(|prev| {
            window.start_seconds < prev.end_seconds + constraints.min_gap
                && window.end_seconds > prev.start_seconds - constraints.min_gap
        });
        if !conflicts {
            accepted.push(window);
        }
    }

    accepted.truncate(constraints.max_count);
    accepted
}

/// A normalized interval with derived presentation fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NormalizedInterval {
    /// Sequential position in the normalized set (1-indexed)
    pub index: u32,
    pub label: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
    /// Canonical `HH:MM:SS` start timecode
    pub start_hms: String,
    /// Canonical `HH:MM:SS` end timecode
    pub end_hms: String,
    /// Frame number at the start, at the asset frame rate
    pub start_frame: u64,
    /// Frame number at the end, at the asset frame rate
    pub end_frame: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// Derive indices, timecodes, and frame numbers for a normalized set.
///
/// Call after [`normalize`], once starts and ends are final.
pub fn finalize(accepted: Vec<Interval>, fps: f64) -> Vec<NormalizedInterval> {
    accepted
        .into_iter()
        .enumerate()
        .map(|(i, interval)| NormalizedInterval {
            index: (i + 1) as u32,
            start_hms: format_seconds(interval.start_seconds),
            end_hms: format_seconds(interval.end_seconds),
            start_frame: frame_at(interval.start_seconds, fps),
            end_frame: frame_at(interval.end_seconds, fps),
            label: interval.label,
            start_seconds: interval.start_seconds,
            end_seconds: interval.end_seconds,
            reason: interval.reason,
            hook: interval.hook,
            caption: interval.caption,
        })
        .collect()
}

/// Source video metadata carried on the output document.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoMeta {
    /// File stem of the source asset
    pub stem: String,
    /// Duration in seconds
    pub duration_seconds: f64,
    /// Frame rate
    pub fps: f64,
}

/// Final output document handed to downstream consumers.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IntervalReport {
    pub video: VideoMeta,
    pub intervals: Vec<NormalizedInterval>,
    pub generated_at: DateTime<Utc>,
}

impl IntervalReport {
    pub fn new(video: VideoMeta, intervals: Vec<NormalizedInterval>) -> Self {
        Self {
            video,
            intervals,
            generated_at: Utc::now(),
        }
    }
}

/// Maximum caption length kept from model output.
const MAX_CAPTION_CHARS: usize = 50;

/// Deserialization target for the model's highlight response payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateSet {
    #[serde(default)]
    pub highlights: Vec<CandidateWindow>,
}

/// A single raw candidate as the model proposes it.
///
/// Every field is optional; conversion is lenient because structural repair
/// is the normalizer's job, not the parser's.
#[derive(Debug, Clone, Deserialize)]
pub struct CandidateWindow {
    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub start_seconds: Option<f64>,

    #[serde(default)]
    pub end_seconds: Option<f64>,

    #[serde(default, alias = "why_high_converting")]
    pub reason: Option<String>,

    #[serde(default, alias = "emotional_hook")]
    pub hook: Option<String>,

    #[serde(default, alias = "suggested_caption")]
    pub caption: Option<String>,
}

impl CandidateSet {
    /// Convert raw candidates into intervals, skipping unusable items.
    ///
    /// A candidate without a finite start is dropped. A missing end becomes
    /// a degenerate instant at the start; the normalizer widens it later.
    pub fn into_intervals(self) -> Vec<Interval> {
        self.highlights
            .into_iter()
            .filter_map(|c| {
                let start = c.start_seconds.filter(|s| s.is_finite())?;
                let end = c.end_seconds.filter(|e| e.is_finite()).unwrap_or(start);

                Some(Interval {
                    start_seconds: start,
                    end_seconds: end,
                    label: c
                        .label
                        .map(|l| l.trim().to_lowercase())
                        .filter(|l| !l.is_empty())
                        .unwrap_or_else(|| "unlabeled".to_string()),
                    reason: c.reason.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
                    hook: c.hook.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
                    caption: c
                        .caption
                        .map(|s| s.trim().chars().take(MAX_CAPTION_CHARS).collect::<String>())
                        .filter(|s: &String| !s.is_empty()),
                })
            })
            .collect()
    }
}
