//! Transport layer abstraction.
//!
//! The dispatcher only ever performs one kind of I/O: send an encoded
//! request to a host and wait for the correlated answer. [`Transport`]
//! captures exactly that, so the engine can run over a real socket
//! ([`UdpTransport`]) or an in-memory agent simulation ([`MockTransport`]).

mod udp;

#[cfg(any(test, feature = "testing"))]
mod mock;

pub use udp::*;

#[cfg(any(test, feature = "testing"))]
pub use mock::*;

use crate::ber::{Decoder, tag};
use crate::error::Result;
use bytes::Bytes;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

/// One request/response exchange with a host.
///
/// Implementations are shared by every host of a dispatch, so they must be
/// cheap to clone (an `Arc` inside) and safe to call concurrently.
pub trait Transport: Send + Sync + Clone {
    /// Send `request` to `target` and wait up to `timeout` for the response
    /// carrying `request_id`.
    ///
    /// Fails with [`Error::Timeout`](crate::Error::Timeout) when nothing
    /// arrives in time and [`Error::Network`](crate::Error::Network) when
    /// the request cannot be sent.
    fn exchange(
        &self,
        target: SocketAddr,
        request_id: i32,
        request: Bytes,
        timeout: Duration,
    ) -> impl Future<Output = Result<Bytes>> + Send;

    /// Allocate a request ID unique among in-flight exchanges.
    fn alloc_request_id(&self) -> i32;
}

/// Extract the request ID from a v1/v2c message without decoding the
/// variable bindings.
pub(crate) fn extract_request_id(data: &Bytes) -> Option<i32> {
    let mut message = Decoder::new(data.clone()).read_sequence().ok()?;
    message.read_integer().ok()?;
    message.read_octet_string().ok()?;

    // any context-specific constructed tag
    let pdu_tag = message.peek_tag()?;
    if pdu_tag & 0xE0 != tag::pdu::GET_REQUEST {
        return None;
    }
    message.read_constructed(pdu_tag).ok()?.read_integer().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::CommunityMessage;
    use crate::pdu::Pdu;
    use crate::version::Version;
    use crate::{ErrorStatus, oid};

    #[test]
    fn test_extract_request_id_v1_and_v2c() {
        for (version, id) in [(Version::V1, 42), (Version::V2c, 12345), (Version::V2c, -1)] {
            let pdu = Pdu::response(id, ErrorStatus::NoError, 0, Vec::new());
            let data = CommunityMessage::new(version, b"public".as_slice(), pdu).encode();
            assert_eq!(extract_request_id(&data), Some(id));
        }
    }

    #[test]
    fn test_extract_request_id_from_known_bytes() {
        let response = Bytes::from_static(&[
            0x30, 0x1c, // SEQUENCE
            0x02, 0x01, 0x01, // v2c
            0x04, 0x06, b'p', b'u', b'b', b'l', b'i', b'c', // community
            0xa2, 0x0f, // Response
            0x02, 0x02, 0x30, 0x39, // request-id 12345
            0x02, 0x01, 0x00, // error-status
            0x02, 0x01, 0x00, // error-index
            0x30, 0x03, 0x30, 0x01, 0x00,
        ]);
        assert_eq!(extract_request_id(&response), Some(12345));

        let bulk = CommunityMessage::new(
            Version::V2c,
            b"public".as_slice(),
            Pdu::get_bulk(77, 0, 10, &[oid!(1, 3)]),
        )
        .encode();
        assert_eq!(extract_request_id(&bulk), Some(77));
    }

    #[test]
    fn test_extract_request_id_malformed() {
        assert_eq!(extract_request_id(&Bytes::new()), None);
        assert_eq!(extract_request_id(&Bytes::from_static(&[0x02, 0x01, 0x00])), None);
        assert_eq!(extract_request_id(&Bytes::from_static(&[0x30, 0x10])), None);
    }
}
