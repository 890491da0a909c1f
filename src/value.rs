//! SNMP value types.
//!
//! The `Value` enum represents all SNMP data types including exceptions.
//! [`ValueType`] is the column-level tag a materialization layer uses to
//! pick an output type without inspecting every value.

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::Result;
use crate::error::internal::DecodeErrorKind;
use crate::oid::Oid;
use bytes::Bytes;

/// SNMP value.
///
/// Represents all SNMP data types including SMIv2 types and exception values.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Value {
    /// INTEGER (ASN.1 primitive, signed 32-bit)
    Integer(i32),

    /// OCTET STRING (arbitrary bytes).
    OctetString(Bytes),

    /// NULL
    Null,

    /// OBJECT IDENTIFIER
    ObjectIdentifier(Oid),

    /// IpAddress (4 bytes, big-endian)
    IpAddress([u8; 4]),

    /// Counter32 (unsigned 32-bit, wrapping)
    Counter32(u32),

    /// Gauge32 / Unsigned32 (unsigned 32-bit, non-wrapping)
    Gauge32(u32),

    /// TimeTicks (hundredths of seconds)
    TimeTicks(u32),

    /// Opaque (legacy, arbitrary bytes)
    Opaque(Bytes),

    /// Counter64 (unsigned 64-bit, wrapping). SNMPv2c only.
    Counter64(u64),

    /// noSuchObject exception: the agent does not implement the object.
    NoSuchObject,

    /// noSuchInstance exception: the object exists but the instance does not.
    NoSuchInstance,

    /// endOfMibView exception: nothing follows the requested OID.
    ///
    /// The normal termination condition for walks that run off the end of
    /// the agent's view.
    EndOfMibView,

    /// Unknown/unrecognized value type (for forward compatibility)
    Unknown { tag: u8, data: Bytes },
}

/// The type of a [`Value`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueType {
    Integer,
    OctetString,
    Null,
    ObjectIdentifier,
    IpAddress,
    Counter32,
    Gauge32,
    TimeTicks,
    Opaque,
    Counter64,
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
    /// Unrecognized BER tag.
    Unknown(u8),
}

impl ValueType {
    /// The BER tag this type is encoded with.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Integer => tag::universal::INTEGER,
            Self::OctetString => tag::universal::OCTET_STRING,
            Self::Null => tag::universal::NULL,
            Self::ObjectIdentifier => tag::universal::OBJECT_IDENTIFIER,
            Self::IpAddress => tag::application::IP_ADDRESS,
            Self::Counter32 => tag::application::COUNTER32,
            Self::Gauge32 => tag::application::GAUGE32,
            Self::TimeTicks => tag::application::TIMETICKS,
            Self::Opaque => tag::application::OPAQUE,
            Self::Counter64 => tag::application::COUNTER64,
            Self::NoSuchObject => tag::context::NO_SUCH_OBJECT,
            Self::NoSuchInstance => tag::context::NO_SUCH_INSTANCE,
            Self::EndOfMibView => tag::context::END_OF_MIB_VIEW,
            Self::Unknown(t) => *t,
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer => write!(f, "INTEGER"),
            Self::OctetString => write!(f, "OCTET STRING"),
            Self::Null => write!(f, "NULL"),
            Self::ObjectIdentifier => write!(f, "OBJECT IDENTIFIER"),
            Self::IpAddress => write!(f, "IpAddress"),
            Self::Counter32 => write!(f, "Counter32"),
            Self::Gauge32 => write!(f, "Gauge32"),
            Self::TimeTicks => write!(f, "TimeTicks"),
            Self::Opaque => write!(f, "Opaque"),
            Self::Counter64 => write!(f, "Counter64"),
            Self::NoSuchObject => write!(f, "noSuchObject"),
            Self::NoSuchInstance => write!(f, "noSuchInstance"),
            Self::EndOfMibView => write!(f, "endOfMibView"),
            Self::Unknown(t) => write!(f, "unknown(0x{:02X})", t),
        }
    }
}

impl Value {
    /// The payload-free type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Integer(_) => ValueType::Integer,
            Value::OctetString(_) => ValueType::OctetString,
            Value::Null => ValueType::Null,
            Value::ObjectIdentifier(_) => ValueType::ObjectIdentifier,
            Value::IpAddress(_) => ValueType::IpAddress,
            Value::Counter32(_) => ValueType::Counter32,
            Value::Gauge32(_) => ValueType::Gauge32,
            Value::TimeTicks(_) => ValueType::TimeTicks,
            Value::Opaque(_) => ValueType::Opaque,
            Value::Counter64(_) => ValueType::Counter64,
            Value::NoSuchObject => ValueType::NoSuchObject,
            Value::NoSuchInstance => ValueType::NoSuchInstance,
            Value::EndOfMibView => ValueType::EndOfMibView,
            Value::Unknown { tag, .. } => ValueType::Unknown(*tag),
        }
    }

    /// Try to get as i32.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as u32 (Counter32, Gauge32, TimeTicks, or non-negative Integer).
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => Some(*v),
            Value::Integer(v) => u32::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Try to get as u64. Any unsigned type widens.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Counter64(v) => Some(*v),
            _ => self.as_u32().map(u64::from),
        }
    }

    /// Try to get the raw bytes of an OctetString or Opaque.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::OctetString(data) | Value::Opaque(data) => Some(data),
            _ => None,
        }
    }

    /// Try to get an OctetString as UTF-8 text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::OctetString(data) => std::str::from_utf8(data).ok(),
            _ => None,
        }
    }

    pub fn as_oid(&self) -> Option<&Oid> {
        match self {
            Value::ObjectIdentifier(oid) => Some(oid),
            _ => None,
        }
    }

    pub fn as_ip(&self) -> Option<std::net::Ipv4Addr> {
        match self {
            Value::IpAddress(addr) => Some(std::net::Ipv4Addr::from(*addr)),
            _ => None,
        }
    }

    /// True for noSuchObject, noSuchInstance and endOfMibView.
    ///
    /// ```
    /// use snmp_fetch::Value;
    ///
    /// assert!(Value::EndOfMibView.is_exception());
    /// assert!(!Value::Integer(0).is_exception());
    /// ```
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView
        )
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        match self {
            Value::Integer(v) => buf.push_integer(*v),
            Value::OctetString(data) => buf.push_octet_string(data),
            Value::Null => buf.push_null(),
            Value::ObjectIdentifier(oid) => buf.push_oid(oid),
            Value::IpAddress(addr) => buf.push_ip_address(*addr),
            Value::Counter32(v) => buf.push_unsigned32(tag::application::COUNTER32, *v),
            Value::Gauge32(v) => buf.push_unsigned32(tag::application::GAUGE32, *v),
            Value::TimeTicks(v) => buf.push_unsigned32(tag::application::TIMETICKS, *v),
            Value::Counter64(v) => buf.push_integer64(*v),
            Value::Opaque(data) | Value::Unknown { data, .. } => {
                buf.push_bytes(data);
                buf.push_length(data.len());
                buf.push_tag(self.value_type().tag());
            }
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => {
                buf.push_length(0);
                buf.push_tag(self.value_type().tag());
            }
        }
    }

    /// Decode from BER.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let tag = decoder.read_tag()?;
        let len = decoder.read_length()?;

        match tag {
            tag::universal::INTEGER => Ok(Value::Integer(decoder.read_integer_value(len)?)),
            tag::universal::OCTET_STRING => Ok(Value::OctetString(decoder.read_bytes(len)?)),
            tag::universal::NULL => {
                if len != 0 {
                    return decoder.fail(DecodeErrorKind::InvalidNull);
                }
                Ok(Value::Null)
            }
            tag::universal::OBJECT_IDENTIFIER => {
                Ok(Value::ObjectIdentifier(decoder.read_oid_value(len)?))
            }
            tag::application::IP_ADDRESS => {
                if len != 4 {
                    return decoder.fail(DecodeErrorKind::InvalidIpAddressLength { length: len });
                }
                let data = decoder.read_bytes(4)?;
                Ok(Value::IpAddress([data[0], data[1], data[2], data[3]]))
            }
            tag::application::COUNTER32 => Ok(Value::Counter32(decoder.read_unsigned32_value(len)?)),
            tag::application::GAUGE32 => Ok(Value::Gauge32(decoder.read_unsigned32_value(len)?)),
            tag::application::TIMETICKS => Ok(Value::TimeTicks(decoder.read_unsigned32_value(len)?)),
            tag::application::OPAQUE => Ok(Value::Opaque(decoder.read_bytes(len)?)),
            tag::application::COUNTER64 => Ok(Value::Counter64(decoder.read_integer64_value(len)?)),
            // Exceptions should be empty; tolerate content like net-snmp does.
            tag::context::NO_SUCH_OBJECT => {
                decoder.read_bytes(len)?;
                Ok(Value::NoSuchObject)
            }
            tag::context::NO_SUCH_INSTANCE => {
                decoder.read_bytes(len)?;
                Ok(Value::NoSuchInstance)
            }
            tag::context::END_OF_MIB_VIEW => {
                decoder.read_bytes(len)?;
                Ok(Value::EndOfMibView)
            }
            tag::universal::OCTET_STRING_CONSTRUCTED => {
                decoder.fail(DecodeErrorKind::ConstructedOctetString)
            }
            _ => {
                let data = decoder.read_bytes(len)?;
                Ok(Value::Unknown { tag, data })
            }
        }
    }
}

fn write_hex(f: &mut std::fmt::Formatter<'_>, data: &[u8]) -> std::fmt::Result {
    for byte in data {
        write!(f, "{:02x}", byte)?;
    }
    Ok(())
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::OctetString(data) => match std::str::from_utf8(data) {
                Ok(s) => write!(f, "{}", s),
                Err(_) => {
                    write!(f, "0x")?;
                    write_hex(f, data)
                }
            },
            Value::Null => write!(f, "NULL"),
            Value::ObjectIdentifier(oid) => write!(f, "{}", oid),
            Value::IpAddress(addr) => {
                write!(f, "{}", std::net::Ipv4Addr::from(*addr))
            }
            Value::Counter32(v) | Value::Gauge32(v) => write!(f, "{}", v),
            Value::TimeTicks(v) => {
                let secs = v / 100;
                let days = secs / 86400;
                let hours = (secs % 86400) / 3600;
                let mins = (secs % 3600) / 60;
                let s = secs % 60;
                write!(f, "{}d {}h {}m {}s", days, hours, mins, s)
            }
            Value::Opaque(data) => {
                write!(f, "Opaque(0x")?;
                write_hex(f, data)?;
                write!(f, ")")
            }
            Value::Counter64(v) => write!(f, "{}", v),
            Value::NoSuchObject => write!(f, "noSuchObject"),
            Value::NoSuchInstance => write!(f, "noSuchInstance"),
            Value::EndOfMibView => write!(f, "endOfMibView"),
            Value::Unknown { tag, data } => {
                write!(f, "Unknown(tag=0x{:02X}, data=0x", tag)?;
                write_hex(f, data)?;
                write!(f, ")")
            }
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::OctetString(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::OctetString(Bytes::from(s))
    }
}

impl From<Oid> for Value {
    fn from(oid: Oid) -> Self {
        Value::ObjectIdentifier(oid)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Counter64(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    fn roundtrip(value: Value) -> Value {
        let mut buf = EncodeBuf::new();
        value.encode(&mut buf);
        let mut decoder = Decoder::new(buf.finish());
        let decoded = Value::decode(&mut decoder).unwrap();
        assert!(decoder.is_empty());
        decoded
    }

    #[test]
    fn test_every_type_survives_the_codec() {
        let values = [
            Value::Integer(-42),
            Value::OctetString(Bytes::from_static(b"eth0")),
            Value::Null,
            Value::ObjectIdentifier(oid!(1, 3, 6, 1, 4, 1, 8072)),
            Value::IpAddress([10, 0, 0, 1]),
            Value::Counter32(u32::MAX),
            Value::Gauge32(1_000_000_000),
            Value::TimeTicks(123_456),
            Value::Opaque(Bytes::from_static(&[0x9f, 0x78, 0x04])),
            Value::Counter64(u64::MAX),
            Value::NoSuchObject,
            Value::NoSuchInstance,
            Value::EndOfMibView,
        ];
        for value in values {
            assert_eq!(roundtrip(value.clone()), value);
        }
    }

    #[test]
    fn test_reject_constructed_octet_string() {
        let mut decoder = Decoder::from_slice(&[0x24, 0x03, 0x04, 0x01, 0x41]);
        assert!(Value::decode(&mut decoder).is_err());
    }

    #[test]
    fn test_unknown_tag_preserved() {
        let mut decoder = Decoder::from_slice(&[0x47, 0x02, 0xAB, 0xCD]);
        let value = Value::decode(&mut decoder).unwrap();
        assert_eq!(value.value_type(), ValueType::Unknown(0x47));
        assert_eq!(value.to_string(), "Unknown(tag=0x47, data=0xabcd)");
    }

    #[test]
    fn test_exception_with_content_is_tolerated() {
        let mut decoder = Decoder::from_slice(&[0x82, 0x01, 0x00]);
        assert_eq!(Value::decode(&mut decoder).unwrap(), Value::EndOfMibView);
    }

    #[test]
    fn test_value_type_tags_match_encoding() {
        for value in [
            Value::Integer(1),
            Value::Counter64(1),
            Value::TimeTicks(1),
            Value::NoSuchInstance,
        ] {
            let mut buf = EncodeBuf::new();
            value.encode(&mut buf);
            assert_eq!(buf.finish()[0], value.value_type().tag());
        }
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Integer(-1).as_u32(), None);
        assert_eq!(Value::Gauge32(7).as_u64(), Some(7));
        assert_eq!(Value::from("abc").as_str(), Some("abc"));
        assert_eq!(
            Value::IpAddress([192, 168, 1, 1]).as_ip(),
            Some(std::net::Ipv4Addr::new(192, 168, 1, 1))
        );
        assert_eq!(
            Value::ObjectIdentifier(oid!(1, 3, 6, 1, 4, 1, 9)).as_oid(),
            Some(&oid!(1, 3, 6, 1, 4, 1, 9))
        );
        assert_eq!(Value::Null.as_oid(), None);
        assert!(Value::NoSuchObject.is_exception());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::TimeTicks(8_640_000 + 360_000 + 6_000 + 100).to_string(), "1d 1h 1m 1s");
        assert_eq!(Value::OctetString(Bytes::from_static(&[0xff, 0x00])).to_string(), "0xff00");
        assert_eq!(Value::IpAddress([10, 1, 2, 3]).to_string(), "10.1.2.3");
        assert_eq!(ValueType::OctetString.to_string(), "OCTET STRING");
    }
}
