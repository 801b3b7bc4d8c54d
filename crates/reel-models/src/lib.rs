//! Shared data models for Reel Core.
//!
//! This crate provides Serde-serializable types and pure algorithms for:
//! - Time intervals and the normalization engine (clamp, widen, space, cap)
//! - Timestamp parsing and HH:MM:SS / frame derivation
//! - Adaptive processing-time estimation for remote jobs

pub mod estimate;
pub mod interval;
pub mod timestamp;

// Re-export common types
pub use estimate::{human_bytes, human_duration, EtaEstimator, ProgressEstimate};
pub use interval::{
    CandidateSet, Interval, IntervalConstraints, IntervalReport, NormalizedInterval, VideoMeta,
};
pub use timestamp::{format_seconds, frame_at, parse_timestamp, TimestampError};
