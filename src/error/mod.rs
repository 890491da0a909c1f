//! Error types for snmp-fetch.
//!
//! This module provides two layers:
//!
//! - [`Error`] - call-level failures. Only [`Error::AmbiguousRoot`] and
//!   [`Error::Config`] abort a dispatch; the other variants are produced by
//!   the codec and transport and end up classified into records.
//! - [`SnmpError`] - per-host, per-root records collected during a dispatch,
//!   tagged with an [`ErrorKind`].
//!
//! # Error Handling
//!
//! Errors are boxed for efficiency: `Result<T> = Result<T, Box<Error>>`.
//!
//! ```rust
//! use snmp_fetch::{Error, Result};
//!
//! fn handle_error(result: Result<()>) {
//!     match result {
//!         Ok(()) => println!("Success"),
//!         Err(e) => match &*e {
//!             Error::AmbiguousRoot { first, second } => {
//!                 println!("{} and {} overlap", first, second);
//!             }
//!             _ => println!("Error: {}", e),
//!         },
//!     }
//! }
//! ```

pub(crate) mod internal;
mod record;

pub use record::{ErrorKind, SnmpError};

use std::net::SocketAddr;
use std::time::Duration;

use crate::oid::Oid;

/// Placeholder target address used when no target is known.
///
/// Decoding happens below the layer that knows which host a buffer came from,
/// so codec errors carry this sentinel until the dispatcher attributes them.
pub(crate) const UNKNOWN_TARGET: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0)), 0);

/// Result type alias using the library's boxed Error type.
pub type Result<T> = std::result::Result<T, Box<Error>>;

/// The main error type for snmp-fetch operations.
///
/// Errors are boxed (via [`Result`]) to keep the size small on the stack.
///
/// ```
/// use snmp_fetch::Error;
///
/// fn is_retriable(error: &Error) -> bool {
///     matches!(error, Error::Timeout { .. })
/// }
/// ```
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Two requested roots are prefix-related (or equal), so walk results
    /// could not be attributed to a single root.
    #[error("ambiguous root OIDs: {first} is a prefix of {second}")]
    AmbiguousRoot { first: Oid, second: Oid },

    /// Network failure (send failed, socket closed, etc.)
    #[error("network error communicating with {target}: {source}")]
    Network {
        target: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Host address could not be resolved to a socket address.
    #[error("cannot resolve {target}: {source}")]
    Resolve {
        target: Box<str>,
        #[source]
        source: std::io::Error,
    },

    /// Request timed out after retries.
    #[error("timeout after {elapsed:?} waiting for {target} ({retries} retries)")]
    Timeout {
        target: SocketAddr,
        elapsed: Duration,
        retries: u32,
    },

    /// Malformed or uncorrelated response from agent.
    #[error("malformed response from {target}")]
    MalformedResponse { target: SocketAddr },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(Box<str>),

    /// Invalid OID format.
    #[error("invalid OID: {0}")]
    InvalidOid(Box<str>),
}

impl Error {
    /// Box this error (convenience for constructing boxed errors).
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    /// The target address this error refers to, if it carries one.
    pub fn target(&self) -> Option<SocketAddr> {
        match self {
            Self::Network { target, .. }
            | Self::Timeout { target, .. }
            | Self::MalformedResponse { target } => Some(*target),
            _ => None,
        }
    }
}

macro_rules! error_statuses {
    ($($(#[$doc:meta])* $variant:ident = $code:literal => $name:literal,)*) => {
        /// Error-status codes an agent may return (RFC 3416).
        ///
        /// A collector only issues read requests, so in practice agents answer
        /// with `noSuchName` (v1), `tooBig` or `genErr`. The full table is kept
        /// so unexpected codes are still reported faithfully.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[non_exhaustive]
        pub enum ErrorStatus {
            $($(#[$doc])* $variant,)*
            /// A code outside the RFC 3416 table.
            Unknown(i32),
        }

        impl ErrorStatus {
            pub fn from_i32(value: i32) -> Self {
                match value {
                    $($code => Self::$variant,)*
                    other => {
                        tracing::warn!(target: "snmp_fetch::error", { snmp.error_status = other }, "unknown SNMP error status");
                        Self::Unknown(other)
                    }
                }
            }

            pub fn as_i32(&self) -> i32 {
                match self {
                    $(Self::$variant => $code,)*
                    Self::Unknown(code) => *code,
                }
            }
        }

        impl std::fmt::Display for ErrorStatus {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($name),)*
                    Self::Unknown(code) => write!(f, "unknown({code})"),
                }
            }
        }
    };
}

error_statuses! {
    NoError = 0 => "noError",
    /// The response would not fit in one message.
    TooBig = 1 => "tooBig",
    /// SNMPv1 only; v2c agents answer with exception values instead.
    NoSuchName = 2 => "noSuchName",
    BadValue = 3 => "badValue",
    ReadOnly = 4 => "readOnly",
    GenErr = 5 => "genErr",
    NoAccess = 6 => "noAccess",
    WrongType = 7 => "wrongType",
    WrongLength = 8 => "wrongLength",
    WrongEncoding = 9 => "wrongEncoding",
    WrongValue = 10 => "wrongValue",
    NoCreation = 11 => "noCreation",
    InconsistentValue = 12 => "inconsistentValue",
    ResourceUnavailable = 13 => "resourceUnavailable",
    CommitFailed = 14 => "commitFailed",
    UndoFailed = 15 => "undoFailed",
    /// The agent's view excludes the object.
    AuthorizationError = 16 => "authorizationError",
    NotWritable = 17 => "notWritable",
    InconsistentName = 18 => "inconsistentName",
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_stays_small() {
        // The largest variant is AmbiguousRoot with two inline OIDs.
        assert!(
            std::mem::size_of::<Error>() <= 256,
            "Error is {} bytes",
            std::mem::size_of::<Error>()
        );

        // Result<(), Box<Error>> should be pointer-sized (8 bytes on 64-bit).
        assert_eq!(
            std::mem::size_of::<Result<()>>(),
            std::mem::size_of::<*const ()>(),
            "Result<()> should be pointer-sized"
        );
    }

    #[test]
    fn error_status_roundtrip_known_codes() {
        for code in 0..=18 {
            assert_eq!(ErrorStatus::from_i32(code).as_i32(), code);
        }
        assert_eq!(ErrorStatus::from_i32(42), ErrorStatus::Unknown(42));
        assert_eq!(ErrorStatus::NoSuchName.to_string(), "noSuchName");
    }

    #[test]
    fn ambiguous_root_message_names_both_oids() {
        let err = Error::AmbiguousRoot {
            first: crate::oid!(1, 3, 6),
            second: crate::oid!(1, 3, 6, 1),
        };
        assert_eq!(
            err.to_string(),
            "ambiguous root OIDs: 1.3.6 is a prefix of 1.3.6.1"
        );
        assert!(err.target().is_none());
    }
}
