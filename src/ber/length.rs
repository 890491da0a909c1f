//! BER length encoding and decoding.
//!
//! Length encoding follows X.690 Section 8.1.3:
//! - Short form: Single byte, bit 8=0, value 0-127
//! - Long form: Initial byte (bit 8=1, bits 7-1=count), followed by length bytes
//! - Indefinite form (0x80): Rejected per net-snmp behavior

use std::net::SocketAddr;

use crate::error::internal::{DecodeErrorKind, decode_error};
use crate::error::{Result, UNKNOWN_TARGET};

/// Maximum length we'll accept.
///
/// Far larger than any realistic SNMP message; a sanity bound on hostile input.
pub const MAX_LENGTH: usize = 0x200000; // 2MB

/// Encode a length value, returning the octets in reverse order for prepending.
///
/// Uses short form for lengths <= 127, long form otherwise.
pub fn encode_length(len: usize) -> ([u8; 5], usize) {
    let mut buf = [0u8; 5];

    if len <= 127 {
        buf[0] = len as u8;
        return (buf, 1);
    }

    let mut n = 0;
    let mut rest = len;
    while rest > 0 && n < 4 {
        buf[n] = rest as u8;
        rest >>= 8;
        n += 1;
    }
    buf[n] = 0x80 | n as u8;
    (buf, n + 1)
}

/// Decode a length from bytes, returning (length, bytes_consumed).
///
/// `base_offset` is only used to report error offsets when called from
/// within a decoder.
pub fn decode_length(
    data: &[u8],
    base_offset: usize,
    target: Option<SocketAddr>,
) -> Result<(usize, usize)> {
    let target = target.unwrap_or(UNKNOWN_TARGET);
    let Some(&first) = data.first() else {
        return Err(decode_error(target, base_offset, DecodeErrorKind::TruncatedData));
    };

    if first == 0x80 {
        return Err(decode_error(target, base_offset, DecodeErrorKind::IndefiniteLength));
    }

    if first & 0x80 == 0 {
        return Ok((first as usize, 1));
    }

    let num_octets = (first & 0x7F) as usize;
    if num_octets == 0 {
        return Err(decode_error(target, base_offset, DecodeErrorKind::InvalidLength));
    }
    if num_octets > 4 {
        return Err(decode_error(
            target,
            base_offset,
            DecodeErrorKind::LengthTooLong { octets: num_octets },
        ));
    }
    if data.len() < 1 + num_octets {
        return Err(decode_error(target, base_offset, DecodeErrorKind::TruncatedData));
    }

    let len = data[1..=num_octets]
        .iter()
        .fold(0usize, |acc, &b| (acc << 8) | b as usize);

    if len > MAX_LENGTH {
        return Err(decode_error(
            target,
            base_offset,
            DecodeErrorKind::LengthExceedsMax {
                length: len,
                max: MAX_LENGTH,
            },
        ));
    }

    Ok((len, 1 + num_octets))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_form() {
        assert_eq!(decode_length(&[0], 0, None).unwrap(), (0, 1));
        assert_eq!(decode_length(&[127], 0, None).unwrap(), (127, 1));
    }

    #[test]
    fn test_long_form() {
        assert_eq!(decode_length(&[0x81, 128], 0, None).unwrap(), (128, 2));
        assert_eq!(decode_length(&[0x82, 0x01, 0x00], 0, None).unwrap(), (256, 3));
        // non-minimal encodings are valid per X.690 8.1.3.5 Note 2
        assert_eq!(decode_length(&[0x82, 0x00, 0x05], 0, None).unwrap(), (5, 3));
    }

    #[test]
    fn test_rejects_bad_lengths() {
        assert!(decode_length(&[], 0, None).is_err());
        assert!(decode_length(&[0x80], 0, None).is_err());
        assert!(decode_length(&[0x85, 1, 1, 1, 1, 1], 0, None).is_err());
        assert!(decode_length(&[0x82, 0x01], 0, None).is_err());

        let over = MAX_LENGTH + 1;
        let over_bytes = [
            0x83,
            ((over >> 16) & 0xFF) as u8,
            ((over >> 8) & 0xFF) as u8,
            (over & 0xFF) as u8,
        ];
        assert!(decode_length(&over_bytes, 0, None).is_err());
    }

    #[test]
    fn test_encode() {
        let (buf, len) = encode_length(0);
        assert_eq!(&buf[..len], &[0]);

        let (buf, len) = encode_length(127);
        assert_eq!(&buf[..len], &[127]);

        let (buf, len) = encode_length(128);
        assert_eq!(&buf[..len], &[128, 0x81]);

        let (buf, len) = encode_length(256);
        assert_eq!(&buf[..len], &[0, 1, 0x82]);
    }
}
