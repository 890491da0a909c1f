//! Per-dispatch and per-host collection settings.

use std::time::Duration;

use crate::retry::Retry;

/// Default GETBULK `max-repetitions`.
pub const DEFAULT_BULK_REPETITIONS: u32 = 10;
/// Default time to wait for each response.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);
/// Default number of variable bindings packed into one request PDU.
pub const DEFAULT_VAR_BINDS_PER_PDU: usize = 10;

/// Collection settings.
///
/// A config can be given per dispatch call and per host. The most specific
/// one wins as a whole; fields are never merged across layers.
///
/// ```rust
/// use snmp_fetch::{Config, Retry};
/// use std::time::Duration;
///
/// let config = Config::default()
///     .timeout(Duration::from_secs(1))
///     .retries(Retry::none())
///     .var_binds_per_pdu(20);
/// assert_eq!(config.bulk_repetitions, 10);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// `max-repetitions` for GETBULK requests
    pub bulk_repetitions: u32,
    /// Time to wait for each response before re-sending
    pub timeout: Duration,
    pub retries: Retry,
    /// Upper bound on bindings per request PDU
    pub var_binds_per_pdu: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bulk_repetitions: DEFAULT_BULK_REPETITIONS,
            timeout: DEFAULT_TIMEOUT,
            retries: Retry::default(),
            var_binds_per_pdu: DEFAULT_VAR_BINDS_PER_PDU,
        }
    }
}

impl Config {
    pub fn bulk_repetitions(mut self, repetitions: u32) -> Self {
        self.bulk_repetitions = repetitions;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retries(mut self, retries: impl Into<Retry>) -> Self {
        self.retries = retries.into();
        self
    }

    pub fn var_binds_per_pdu(mut self, count: usize) -> Self {
        self.var_binds_per_pdu = count;
        self
    }

    /// Pick the effective config: host, then call, then the default.
    pub fn resolve(host: Option<&Config>, call: Option<&Config>) -> Config {
        host.or(call).cloned().unwrap_or_default()
    }

    /// Bindings per PDU, never less than one.
    pub(crate) fn pdu_width(&self) -> usize {
        self.var_binds_per_pdu.max(1)
    }

    /// Repetitions per GETBULK, never less than one and within the wire range.
    pub(crate) fn bulk_width(&self) -> i32 {
        i32::try_from(self.bulk_repetitions.max(1)).unwrap_or(i32::MAX)
    }
}
