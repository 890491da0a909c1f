//! Why a response failed to decode.
//!
//! The reason is only logged. Callers see [`Error::MalformedResponse`],
//! because a collector treats every undecodable answer the same way.

use std::net::SocketAddr;

use super::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub(crate) enum DecodeErrorKind {
    #[error("expected tag 0x{expected:02X}, got 0x{actual:02X}")]
    UnexpectedTag { expected: u8, actual: u8 },
    #[error("unexpected end of data")]
    TruncatedData,
    #[error("need {needed} bytes but only {available} remaining")]
    InsufficientData { needed: usize, available: usize },
    #[error("{remaining} trailing bytes after message")]
    TrailingData { remaining: usize },

    // length octets
    #[error("invalid length encoding")]
    InvalidLength,
    #[error("indefinite length encoding not supported")]
    IndefiniteLength,
    #[error("length encoding too long ({octets} octets)")]
    LengthTooLong { octets: usize },
    #[error("length {length} exceeds maximum {max}")]
    LengthExceedsMax { length: usize, max: usize },

    // primitive contents
    #[error("zero-length integer")]
    ZeroLengthInteger,
    #[error("integer64 too long: {length} bytes")]
    Integer64TooLong { length: usize },
    #[error("subidentifier overflows 32 bits")]
    IntegerOverflow,
    #[error("OID has {count} arcs, maximum is {max}")]
    OidTooLong { count: usize, max: usize },
    #[error("NULL with non-zero length")]
    InvalidNull,
    #[error("IpAddress must be 4 bytes, got {length}")]
    InvalidIpAddressLength { length: usize },
    #[error("constructed OCTET STRING not supported")]
    ConstructedOctetString,

    // message framing
    #[error("unsupported SNMP version {0}")]
    UnknownVersion(i32),
    #[error("unexpected PDU tag 0x{0:02X}")]
    UnknownPduType(u8),
}

/// Log why decoding `target`'s response failed at `offset`, and return the
/// error the caller sees.
pub(crate) fn decode_error(target: SocketAddr, offset: usize, kind: DecodeErrorKind) -> Box<Error> {
    tracing::debug!(target: "snmp_fetch::ber", { snmp.peer = %target, snmp.offset = offset, reason = %kind }, "malformed response");
    Error::MalformedResponse { target }.boxed()
}
