//! Retry policy for request/response exchanges.
//!
//! A timed-out exchange is re-sent with the same request ID. The policy
//! decides how many times and how long to wait in between.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Retry policy applied to every exchange with a host.
///
/// `max_attempts` counts re-sends, so `0` means the request goes out once.
///
/// ```rust
/// use snmp_fetch::Retry;
/// use std::time::Duration;
///
/// let once = Retry::none();
/// let steady = Retry::fixed(2, Duration::from_millis(250));
/// let backoff = Retry::exponential(4)
///     .initial_delay(Duration::from_millis(100))
///     .max_delay(Duration::from_secs(2))
///     .build();
/// # let _ = (once, steady, backoff);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Retry {
    /// Number of re-sends after the first attempt
    pub max_attempts: u32,
    pub backoff: Backoff,
}

/// Delay strategy between attempts.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Backoff {
    /// Re-send immediately after a timeout.
    #[default]
    None,

    /// Wait the same delay before every re-send.
    Fixed { delay: Duration },

    /// Double the delay after each attempt, up to `max`.
    ///
    /// `jitter` randomizes each delay by up to that fraction in either
    /// direction so a batch of hosts that timed out together does not retry
    /// in lockstep.
    Exponential {
        initial: Duration,
        max: Duration,
        jitter: f64,
    },
}

impl Default for Retry {
    /// Three re-sends, no delay.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::None,
        }
    }
}

impl Retry {
    /// Send once, never re-send.
    pub fn none() -> Self {
        Self {
            max_attempts: 0,
            backoff: Backoff::None,
        }
    }

    /// Re-send up to `attempts` times, waiting `delay` before each.
    pub fn fixed(attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: attempts,
            backoff: Backoff::Fixed { delay },
        }
    }

    /// Start an exponential backoff policy with `attempts` re-sends.
    ///
    /// Defaults to a 1s initial delay, 5s cap and 25% jitter.
    pub fn exponential(attempts: u32) -> RetryBuilder {
        RetryBuilder {
            max_attempts: attempts,
            ..Default::default()
        }
    }

    /// Delay to wait before re-send number `attempt` (zero-based).
    pub fn compute_delay(&self, attempt: u32) -> Duration {
        match &self.backoff {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed { delay } => *delay,
            Backoff::Exponential {
                initial,
                max,
                jitter,
            } => {
                let shift = attempt.min(31);
                let multiplier = 1u32.checked_shl(shift).unwrap_or(u32::MAX);
                let capped = initial.saturating_mul(multiplier).min(*max);
                Duration::from_secs_f64(capped.as_secs_f64() * jitter_factor(*jitter))
            }
        }
    }
}

/// Builder for [`Backoff::Exponential`] policies.
#[derive(Debug)]
pub struct RetryBuilder {
    max_attempts: u32,
    initial: Duration,
    max: Duration,
    jitter: f64,
}

impl Default for RetryBuilder {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial: Duration::from_secs(1),
            max: Duration::from_secs(5),
            jitter: 0.25,
        }
    }
}

impl RetryBuilder {
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max = delay;
        self
    }

    /// Jitter fraction, clamped to `[0.0, 1.0]`.
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    pub fn build(self) -> Retry {
        Retry {
            max_attempts: self.max_attempts,
            backoff: Backoff::Exponential {
                initial: self.initial,
                max: self.max,
                jitter: self.jitter,
            },
        }
    }
}

impl From<RetryBuilder> for Retry {
    fn from(builder: RetryBuilder) -> Self {
        builder.build()
    }
}

static JITTER_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Factor in `[1 - jitter, 1 + jitter]`.
///
/// A multiplicative hash of a shared counter; enough to spread retries, not
/// meant to be unpredictable.
fn jitter_factor(jitter: f64) -> f64 {
    if jitter <= 0.0 {
        return 1.0;
    }
    let counter = JITTER_COUNTER.fetch_add(1, Ordering::Relaxed);
    let hash = counter.wrapping_mul(0x5851f42d4c957f2d);
    let unit = (hash >> 11) as f64 / ((1u64 << 53) as f64);
    1.0 + (unit - 0.5) * 2.0 * jitter
}
