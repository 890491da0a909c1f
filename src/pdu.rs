//! SNMP Protocol Data Units (PDUs).
//!
//! Only the read side of the protocol is modelled: GET, GETNEXT and GETBULK
//! requests and the Response PDU that answers all three.

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::internal::DecodeErrorKind;
use crate::error::{ErrorStatus, Result};
use crate::oid::Oid;
use crate::varbind::{VarBind, decode_varbind_list, encode_varbind_list};

/// PDU type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PduType {
    GetRequest = tag::pdu::GET_REQUEST,
    GetNextRequest = tag::pdu::GET_NEXT_REQUEST,
    Response = tag::pdu::RESPONSE,
    GetBulkRequest = tag::pdu::GET_BULK_REQUEST,
}

impl PduType {
    /// Create from tag byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            tag::pdu::GET_REQUEST => Some(Self::GetRequest),
            tag::pdu::GET_NEXT_REQUEST => Some(Self::GetNextRequest),
            tag::pdu::RESPONSE => Some(Self::Response),
            tag::pdu::GET_BULK_REQUEST => Some(Self::GetBulkRequest),
            _ => None,
        }
    }

    /// Get the tag byte.
    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for PduType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GetRequest => write!(f, "GetRequest"),
            Self::GetNextRequest => write!(f, "GetNextRequest"),
            Self::Response => write!(f, "Response"),
            Self::GetBulkRequest => write!(f, "GetBulkRequest"),
        }
    }
}

/// Generic PDU structure for request/response operations.
///
/// For GETBULK, `error_status` holds non-repeaters and `error_index` holds
/// max-repetitions, exactly as they sit on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Pdu {
    pub pdu_type: PduType,
    /// Request ID for correlating requests and responses
    pub request_id: i32,
    /// Error status (0 for requests, error code for responses)
    pub error_status: i32,
    /// Error index (1-based index of problematic varbind)
    pub error_index: i32,
    pub varbinds: Vec<VarBind>,
}

impl Pdu {
    fn request(pdu_type: PduType, request_id: i32, oids: &[Oid]) -> Self {
        Self {
            pdu_type,
            request_id,
            error_status: 0,
            error_index: 0,
            varbinds: oids.iter().map(|oid| VarBind::null(oid.clone())).collect(),
        }
    }

    /// Create a new GET request PDU.
    pub fn get_request(request_id: i32, oids: &[Oid]) -> Self {
        Self::request(PduType::GetRequest, request_id, oids)
    }

    /// Create a new GETNEXT request PDU.
    pub fn get_next_request(request_id: i32, oids: &[Oid]) -> Self {
        Self::request(PduType::GetNextRequest, request_id, oids)
    }

    /// Create a GETBULK request PDU.
    pub fn get_bulk(request_id: i32, non_repeaters: i32, max_repetitions: i32, oids: &[Oid]) -> Self {
        Self {
            error_status: non_repeaters,
            error_index: max_repetitions,
            ..Self::request(PduType::GetBulkRequest, request_id, oids)
        }
    }

    /// Create a Response PDU.
    pub fn response(request_id: i32, error_status: ErrorStatus, error_index: i32, varbinds: Vec<VarBind>) -> Self {
        Self {
            pdu_type: PduType::Response,
            request_id,
            error_status: error_status.as_i32(),
            error_index,
            varbinds,
        }
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_constructed(self.pdu_type.tag(), |buf| {
            encode_varbind_list(buf, &self.varbinds);
            buf.push_integer(self.error_index);
            buf.push_integer(self.error_status);
            buf.push_integer(self.request_id);
        });
    }

    /// Decode from BER.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let Some(pdu_type) = decoder.peek_tag().and_then(PduType::from_tag) else {
            let tag = decoder.peek_tag().unwrap_or(0);
            return decoder.fail(DecodeErrorKind::UnknownPduType(tag));
        };

        let mut pdu_decoder = decoder.read_constructed(pdu_type.tag())?;
        let request_id = pdu_decoder.read_integer()?;
        let error_status = pdu_decoder.read_integer()?;
        let error_index = pdu_decoder.read_integer()?;
        let varbinds = decode_varbind_list(&mut pdu_decoder)?;

        Ok(Pdu {
            pdu_type,
            request_id,
            error_status,
            error_index,
            varbinds,
        })
    }

    /// Check if this is an error response.
    pub fn is_error(&self) -> bool {
        self.error_status != 0
    }

    /// Get the error status as an enum.
    pub fn error_status_enum(&self) -> ErrorStatus {
        ErrorStatus::from_i32(self.error_status)
    }
}
