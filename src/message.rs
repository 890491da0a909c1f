//! Community-based SNMP message format (v1/v2c).
//!
//! V1 and V2c messages share the same structure:
//! `SEQUENCE { version INTEGER, community OCTET STRING, pdu PDU }`
//!
//! The only difference is the version number (0 for v1, 1 for v2c).

use std::net::SocketAddr;

use crate::ber::{Decoder, EncodeBuf};
use crate::error::Result;
use crate::error::internal::DecodeErrorKind;
use crate::pdu::Pdu;
use crate::version::Version;
use bytes::Bytes;

/// Community-based SNMP message (v1/v2c).
#[derive(Debug, Clone, PartialEq)]
pub struct CommunityMessage {
    pub version: Version,
    /// Community string for authentication
    pub community: Bytes,
    pub pdu: Pdu,
}

impl CommunityMessage {
    pub fn new(version: Version, community: impl Into<Bytes>, pdu: Pdu) -> Self {
        Self {
            version,
            community: community.into(),
            pdu,
        }
    }

    /// Encode to BER.
    pub fn encode(&self) -> Bytes {
        let mut buf = EncodeBuf::new();

        buf.push_sequence(|buf| {
            self.pdu.encode(buf);
            buf.push_octet_string(&self.community);
            buf.push_integer(self.version.as_i32());
        });

        buf.finish()
    }

    /// Decode from BER.
    pub fn decode(data: Bytes) -> Result<Self> {
        Self::decode_from(Decoder::new(data))
    }

    /// Decode from BER, attributing any failure to `target`.
    pub fn decode_from_target(data: Bytes, target: SocketAddr) -> Result<Self> {
        Self::decode_from(Decoder::with_target(data, target))
    }

    fn decode_from(mut decoder: Decoder) -> Result<Self> {
        let mut seq = decoder.read_sequence()?;

        let version_num = seq.read_integer()?;
        let Some(version) = Version::from_i32(version_num) else {
            return seq.fail(DecodeErrorKind::UnknownVersion(version_num));
        };

        let community = seq.read_octet_string()?;
        let pdu = Pdu::decode(&mut seq)?;
        seq.expect_end()?;
        decoder.expect_end()?;

        Ok(CommunityMessage {
            version,
            community,
            pdu,
        })
    }
}
