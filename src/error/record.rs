//! Per-host error records.

use std::fmt;

use super::ErrorStatus;
use crate::oid::Oid;

/// Classification of a recorded condition.
///
/// Only [`ErrorKind::ValueWarning`] is an expected outcome; the other kinds
/// mean a host (or part of it) could not be collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum ErrorKind {
    /// Protocol sentinel: no-such-object, no-such-instance, end-of-mib-view.
    ValueWarning,
    /// Timeout or unreachable host after the retry budget was spent.
    TransportError,
    /// Malformed, mismatched or error-status response.
    ProtocolError,
    /// No credential in the host's list got an answer.
    ConfigError,
}

impl ErrorKind {
    /// The upper-case name used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValueWarning => "VALUE_WARNING",
            Self::TransportError => "TRANSPORT_ERROR",
            Self::ProtocolError => "PROTOCOL_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded condition for a host, optionally scoped to a root.
///
/// `host_index` is the host's position in the slice passed to
/// [`Dispatcher::dispatch`](crate::Dispatcher::dispatch); after
/// [`Dispatcher::fetch`](crate::Dispatcher::fetch) it is the caller's
/// original row index instead.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SnmpError {
    pub host_index: usize,
    /// Caller-assigned [`Host::id`](crate::Host::id).
    pub host_id: u64,
    /// `None` when the condition applies to the host as a whole.
    pub root_index: Option<usize>,
    pub kind: ErrorKind,
    pub message: String,
    /// Error-status from the agent's response, if any.
    pub status: Option<ErrorStatus>,
    /// 1-based error-index from the agent's response, if any.
    pub error_index: Option<u32>,
    /// OID the condition was observed on.
    pub oid: Option<Oid>,
}

impl SnmpError {
    pub fn new(host_index: usize, host_id: u64, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            host_index,
            host_id,
            root_index: None,
            kind,
            message: message.into(),
            status: None,
            error_index: None,
            oid: None,
        }
    }

    /// Scope the record to one requested root.
    pub fn with_root(mut self, root_index: usize) -> Self {
        self.root_index = Some(root_index);
        self
    }

    /// Attach the OID the condition was observed on.
    pub fn with_oid(mut self, oid: Oid) -> Self {
        self.oid = Some(oid);
        self
    }

    /// Attach the agent's error-status and error-index.
    pub fn with_status(mut self, status: ErrorStatus, error_index: u32) -> Self {
        self.status = Some(status);
        self.error_index = Some(error_index);
        self
    }
}

impl fmt::Display for SnmpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] host {}", self.kind, self.host_index)?;
        if let Some(root) = self.root_index {
            write!(f, " root {}", root)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(status) = self.status {
            write!(f, " ({} at index {})", status, self.error_index.unwrap_or(0))?;
        }
        if let Some(oid) = &self.oid {
            write!(f, " [{}]", oid)?;
        }
        Ok(())
    }
}
