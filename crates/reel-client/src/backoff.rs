//! Backoff calculation with exponential growth and jitter.
//!
//! The wait for a retry is either the server's own suggested delay (when it
//! provided one) or an exponential function of the attempt number, capped.
//! A jitter factor in `[1.05, 1.25]` is always multiplied in so that many
//! callers backing off in lockstep do not produce a synchronized retry
//! storm. The calculation itself is pure; randomness enters only through an
//! injectable [`JitterSource`].

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

/// Lower bound of the jitter multiplier.
pub const JITTER_MIN: f64 = 1.05;
/// Upper bound of the jitter multiplier.
pub const JITTER_MAX: f64 = 1.25;
/// Cap on server-suggested waits (one hour); the hint text is free-form
/// server output and an absurd value must not stall or overflow the client.
pub const MAX_HINT_SECS: f64 = 3600.0;

/// Backoff policy configuration.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Base delay for the first retry.
    pub base_delay: Duration,
    /// Exponential growth factor per attempt.
    pub multiplier: f64,
    /// Cap on the computed delay (server hints are capped separately at
    /// [`MAX_HINT_SECS`]).
    pub max_delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_retries: 6,
            base_delay: Duration::from_secs(5),
            multiplier: 1.7,
            max_delay: Duration::from_secs(300),
        }
    }
}

impl BackoffConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_retries: std::env::var("REEL_RETRY_MAX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            base_delay: Duration::from_millis(
                std::env::var("REEL_RETRY_BASE_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.base_delay.as_millis() as u64),
            ),
            multiplier: std::env::var("REEL_RETRY_MULTIPLIER")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|m: &f64| *m > 1.0)
                .unwrap_or(defaults.multiplier),
            max_delay: Duration::from_millis(
                std::env::var("REEL_RETRY_MAX_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.max_delay.as_millis() as u64),
            ),
        }
    }
}

/// Source of uniform draws in `[0, 1]` for jitter.
pub trait JitterSource: Send + Sync {
    fn draw(&self) -> f64;
}

/// Default jitter source seeded from sub-second clock nanos.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemJitter;

impl JitterSource for SystemJitter {
    fn draw(&self) -> f64 {
        use std::time::SystemTime;
        let nanos = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        (nanos % 1000) as f64 / 1000.0
    }
}

/// Compute the wait before retry number `attempt` (1-indexed).
///
/// A positive `server_hint` replaces the exponential base for this attempt;
/// the server's own estimate of its rate-limit reset is authoritative up to
/// [`MAX_HINT_SECS`]. `jitter_draw` is a uniform value in `[0, 1]` mapped
/// into the `[JITTER_MIN, JITTER_MAX]` multiplier band.
pub fn next_delay(
    attempt: u32,
    config: &BackoffConfig,
    server_hint: Option<Duration>,
    jitter_draw: f64,
) -> Duration {
    let attempt = attempt.max(1);

    let base_secs = match server_hint {
        Some(hint) if hint > Duration::ZERO => hint.as_secs_f64().min(MAX_HINT_SECS),
        _ => {
            let exp = config.base_delay.as_secs_f64()
                * config.multiplier.powi(attempt as i32 - 1);
            exp.min(config.max_delay.as_secs_f64())
        }
    };

    let factor = JITTER_MIN + (JITTER_MAX - JITTER_MIN) * jitter_draw.clamp(0.0, 1.0);
    Duration::from_secs_f64(base_secs * factor)
}

static RETRY_IN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)retry in\s+([0-9]+\.?[0-9]*)s").unwrap()
});

static RETRY_DELAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)retry_delay\s*\{\s*seconds:\s*([0-9]+)\s*\}").unwrap()
});

/// Extract a server-suggested retry delay from free-text error messages.
///
/// The only signal some services give is prose ("please retry in 7.5s") or
/// a dumped proto field (`retry_delay { seconds: 30 }`); this isolates that
/// parsing so the rest of the client deals in structured hints. Parsed
/// values are capped at [`MAX_HINT_SECS`].
pub fn parse_retry_hint(message: &str) -> Option<Duration> {
    for re in [&*RETRY_IN_RE, &*RETRY_DELAY_RE] {
        if let Some(caps) = re.captures(message) {
            if let Ok(secs) = caps[1].parse::<f64>() {
                if secs > 0.0 {
                    return Some(Duration::from_secs_f64(secs.min(MAX_HINT_SECS)));
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BackoffConfig {
        BackoffConfig {
            max_retries: 6,
            base_delay: Duration::from_secs(5),
            multiplier: 1.7,
            max_delay: Duration::from_secs(300),
        }
    }

    #[test]
    fn test_delay_grows_monotonically_under_fixed_jitter() {
        let cfg = config();
        let mut last = Duration::ZERO;
        for attempt in 1..=10 {
            let delay = next_delay(attempt, &cfg, None, 0.5);
            assert!(delay >= last, "attempt {} shrank the delay", attempt);
            last = delay;
        }
    }

    #[test]
    fn test_delay_is_capped() {
        let cfg = config();
        let delay = next_delay(50, &cfg, None, 0.0);
        assert!(delay <= Duration::from_secs_f64(300.0 * JITTER_MAX));
    }

    #[test]
    fn test_server_hint_is_authoritative() {
        let cfg = config();
        let delay = next_delay(1, &cfg, Some(Duration::from_secs(40)), 0.0);
        assert_eq!(delay, Duration::from_secs_f64(40.0 * JITTER_MIN));

        // Zero hint falls back to the exponential schedule
        let delay = next_delay(1, &cfg, Some(Duration::ZERO), 0.0);
        assert_eq!(delay, Duration::from_secs_f64(5.0 * JITTER_MIN));
    }

    #[test]
    fn test_jitter_stays_in_band() {
        let cfg = config();
        let base = 5.0;
        for draw in [0.0, 0.25, 0.5, 0.75, 1.0] {
            let delay = next_delay(1, &cfg, None, draw).as_secs_f64();
            assert!(delay >= base * JITTER_MIN - 1e-9);
            assert!(delay <= base * JITTER_MAX + 1e-9);
        }
        // Out-of-range draws are clamped, not amplified
        let delay = next_delay(1, &cfg, None, 7.0).as_secs_f64();
        assert!(delay <= base * JITTER_MAX + 1e-9);
    }

    #[test]
    fn test_same_inputs_same_output() {
        let cfg = config();
        assert_eq!(
            next_delay(3, &cfg, None, 0.42),
            next_delay(3, &cfg, None, 0.42)
        );
    }

    #[test]
    fn test_parse_retry_hint_prose() {
        let hint = parse_retry_hint("429 quota exceeded. Please retry in 12.5s.");
        assert_eq!(hint, Some(Duration::from_secs_f64(12.5)));
    }

    #[test]
    fn test_parse_retry_hint_proto_dump() {
        let hint = parse_retry_hint("ResourceExhausted: retry_delay { seconds: 30 }");
        assert_eq!(hint, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_absurd_hint_is_capped() {
        // Hint text is server-controlled free text; an overflowing value
        // must cap, not panic inside Duration construction.
        let hint = parse_retry_hint("quota exceeded, retry in 99999999999999999999999s");
        assert_eq!(hint, Some(Duration::from_secs(3600)));

        let cfg = config();
        let delay = next_delay(1, &cfg, Some(Duration::from_secs(u64::MAX / 2)), 1.0);
        assert!(delay <= Duration::from_secs_f64(MAX_HINT_SECS * JITTER_MAX));
    }

    #[test]
    fn test_parse_retry_hint_absent() {
        assert_eq!(parse_retry_hint("internal server error"), None);
        assert_eq!(parse_retry_hint("retry in -3s"), None);
        assert_eq!(parse_retry_hint(""), None);
    }

    #[test]
    fn test_system_jitter_in_unit_range() {
        let jitter = SystemJitter;
        for _ in 0..100 {
            let draw = jitter.draw();
            assert!((0.0..=1.0).contains(&draw));
        }
    }
}
