//! BER encoding into a reverse buffer.
//!
//! Values are pushed last-field-first. When a constructed type closes, the
//! number of bytes written since it opened is its content length, so the
//! length and tag can be prepended without a second pass.

use super::length::encode_length;
use super::tag;
use crate::oid::Oid;
use bytes::Bytes;

/// Reverse-order BER encode buffer.
///
/// ```
/// use snmp_fetch::ber::EncodeBuf;
///
/// let mut buf = EncodeBuf::new();
/// buf.push_sequence(|buf| {
///     buf.push_integer(2);
///     buf.push_integer(1);
/// });
/// assert_eq!(&buf.finish()[..], &[0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02]);
/// ```
#[derive(Debug, Default)]
pub struct EncodeBuf {
    // Bytes in reverse wire order.
    buf: Vec<u8>,
}

impl EncodeBuf {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(256),
        }
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Prepend raw bytes (given in wire order).
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buf.extend(data.iter().rev());
    }

    /// Prepend a tag byte.
    pub fn push_tag(&mut self, tag: u8) {
        self.buf.push(tag);
    }

    /// Prepend a length field.
    pub fn push_length(&mut self, len: usize) {
        let (bytes, n) = encode_length(len);
        // encode_length already returns the octets reversed.
        self.buf.extend_from_slice(&bytes[..n]);
    }

    /// Prepend a constructed TLV whose content is written by `f`.
    ///
    /// Inside `f`, fields must be pushed in reverse order.
    pub fn push_constructed(&mut self, tag: u8, f: impl FnOnce(&mut Self)) {
        let start = self.buf.len();
        f(self);
        let content_len = self.buf.len() - start;
        self.push_length(content_len);
        self.push_tag(tag);
    }

    /// Prepend a SEQUENCE whose content is written by `f`.
    pub fn push_sequence(&mut self, f: impl FnOnce(&mut Self)) {
        self.push_constructed(tag::universal::SEQUENCE, f);
    }

    /// Prepend a signed INTEGER using the minimal two's-complement form.
    pub fn push_integer(&mut self, value: i32) {
        let bytes = value.to_be_bytes();
        let mut start = 0;
        // Drop redundant leading 0x00 / 0xFF octets while keeping the sign bit.
        while start < 3 {
            let (cur, next) = (bytes[start], bytes[start + 1]);
            if (cur == 0x00 && next & 0x80 == 0) || (cur == 0xFF && next & 0x80 != 0) {
                start += 1;
            } else {
                break;
            }
        }
        self.push_bytes(&bytes[start..]);
        self.push_length(4 - start);
        self.push_tag(tag::universal::INTEGER);
    }

    /// Prepend an unsigned 32-bit value with an application tag.
    pub fn push_unsigned32(&mut self, tag: u8, value: u32) {
        self.push_unsigned(tag, &value.to_be_bytes());
    }

    /// Prepend a Counter64.
    pub fn push_integer64(&mut self, value: u64) {
        self.push_unsigned(tag::application::COUNTER64, &value.to_be_bytes());
    }

    fn push_unsigned(&mut self, tag: u8, be_bytes: &[u8]) {
        let start = be_bytes
            .iter()
            .position(|&b| b != 0)
            .unwrap_or(be_bytes.len() - 1);
        let content = &be_bytes[start..];
        let pad = content[0] & 0x80 != 0;
        self.push_bytes(content);
        if pad {
            self.buf.push(0x00);
        }
        self.push_length(content.len() + usize::from(pad));
        self.push_tag(tag);
    }

    /// Prepend an OCTET STRING.
    pub fn push_octet_string(&mut self, data: &[u8]) {
        self.push_bytes(data);
        self.push_length(data.len());
        self.push_tag(tag::universal::OCTET_STRING);
    }

    /// Prepend a NULL.
    pub fn push_null(&mut self) {
        self.push_length(0);
        self.push_tag(tag::universal::NULL);
    }

    /// Prepend an OBJECT IDENTIFIER.
    pub fn push_oid(&mut self, oid: &Oid) {
        let content = oid.to_ber_smallvec();
        self.push_bytes(&content);
        self.push_length(content.len());
        self.push_tag(tag::universal::OBJECT_IDENTIFIER);
    }

    /// Prepend an IpAddress.
    pub fn push_ip_address(&mut self, addr: [u8; 4]) {
        self.push_bytes(&addr);
        self.push_length(4);
        self.push_tag(tag::application::IP_ADDRESS);
    }

    /// Finish encoding and return the bytes in wire order.
    pub fn finish(mut self) -> Bytes {
        self.buf.reverse();
        Bytes::from(self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::Decoder;
    use crate::oid;

    fn encoded(f: impl FnOnce(&mut EncodeBuf)) -> Vec<u8> {
        let mut buf = EncodeBuf::new();
        f(&mut buf);
        buf.finish().to_vec()
    }

    #[test]
    fn test_integer_minimal_form() {
        assert_eq!(encoded(|b| b.push_integer(0)), vec![0x02, 0x01, 0x00]);
        assert_eq!(encoded(|b| b.push_integer(127)), vec![0x02, 0x01, 0x7F]);
        assert_eq!(encoded(|b| b.push_integer(128)), vec![0x02, 0x02, 0x00, 0x80]);
        assert_eq!(encoded(|b| b.push_integer(-1)), vec![0x02, 0x01, 0xFF]);
        assert_eq!(encoded(|b| b.push_integer(-129)), vec![0x02, 0x02, 0xFF, 0x7F]);
        assert_eq!(
            encoded(|b| b.push_integer(i32::MIN)),
            vec![0x02, 0x04, 0x80, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_integer_decodes_back() {
        for v in [0, 1, -1, 127, 128, -128, -129, 65535, i32::MAX, i32::MIN] {
            let bytes = encoded(|b| b.push_integer(v));
            let mut dec = Decoder::from_slice(&bytes);
            assert_eq!(dec.read_integer().unwrap(), v);
        }
    }

    #[test]
    fn test_unsigned_padding() {
        assert_eq!(
            encoded(|b| b.push_unsigned32(tag::application::COUNTER32, 0)),
            vec![0x41, 0x01, 0x00]
        );
        assert_eq!(
            encoded(|b| b.push_unsigned32(tag::application::GAUGE32, 0x80)),
            vec![0x42, 0x02, 0x00, 0x80]
        );
        assert_eq!(
            encoded(|b| b.push_unsigned32(tag::application::TIMETICKS, u32::MAX)),
            vec![0x43, 0x05, 0x00, 0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(
            encoded(|b| b.push_integer64(u64::MAX)).len(),
            2 + 9,
            "Counter64 max needs a leading zero"
        );
    }

    #[test]
    fn test_oid_and_null_varbind() {
        let bytes = encoded(|b| {
            b.push_sequence(|b| {
                b.push_null();
                b.push_oid(&oid!(1, 3, 6, 1));
            })
        });
        assert_eq!(
            bytes,
            vec![0x30, 0x07, 0x06, 0x03, 0x2B, 0x06, 0x01, 0x05, 0x00]
        );
    }

    #[test]
    fn test_long_content_uses_long_length_form() {
        let data = vec![0xAB; 200];
        let bytes = encoded(|b| b.push_octet_string(&data));
        assert_eq!(&bytes[..3], &[0x04, 0x81, 200]);
        assert_eq!(bytes.len(), 203);
    }
}
