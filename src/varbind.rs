//! OID/value pairs as carried in a PDU's variable-bindings list.

use std::fmt;

use crate::ber::{Decoder, EncodeBuf};
use crate::error::Result;
use crate::oid::Oid;
use crate::value::Value;

/// One variable binding.
///
/// Requests carry `NULL` values; responses carry the agent's value or one of
/// the exception sentinels.
#[derive(Debug, Clone, PartialEq)]
pub struct VarBind {
    pub oid: Oid,
    pub value: Value,
}

impl VarBind {
    pub fn new(oid: Oid, value: Value) -> Self {
        Self { oid, value }
    }

    /// Request binding for `oid`.
    pub fn null(oid: Oid) -> Self {
        Self::new(oid, Value::Null)
    }

    /// True if the agent answered with a sentinel instead of a value.
    pub fn is_exception(&self) -> bool {
        self.value.is_exception()
    }

    pub fn encode(&self, buf: &mut EncodeBuf) {
        // SEQUENCE { name, value }, pushed back to front
        buf.push_sequence(|buf| {
            self.value.encode(buf);
            buf.push_oid(&self.oid);
        });
    }

    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let mut pair = decoder.read_sequence()?;
        let oid = pair.read_oid()?;
        let value = Value::decode(&mut pair)?;
        pair.expect_end()?;
        Ok(Self::new(oid, value))
    }
}

impl fmt::Display for VarBind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.oid, self.value)
    }
}

/// Write `varbinds` as the PDU's bindings list, preserving their order.
pub fn encode_varbind_list(buf: &mut EncodeBuf, varbinds: &[VarBind]) {
    buf.push_sequence(|buf| varbinds.iter().rev().for_each(|vb| vb.encode(buf)));
}

/// Read a PDU's bindings list.
pub fn decode_varbind_list(decoder: &mut Decoder) -> Result<Vec<VarBind>> {
    let mut list = decoder.read_sequence()?;
    // a NULL-valued binding of a short OID is about a dozen octets
    let mut varbinds = Vec::with_capacity(list.remaining() / 12);
    while !list.is_empty() {
        varbinds.push(VarBind::decode(&mut list)?);
    }
    Ok(varbinds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use bytes::Bytes;

    #[test]
    fn test_list_keeps_request_order() {
        let varbinds = vec![
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), Value::from("router")),
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 3, 0), Value::TimeTicks(100)),
            VarBind::null(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)),
        ];

        let mut buf = EncodeBuf::new();
        encode_varbind_list(&mut buf, &varbinds);
        let mut decoder = Decoder::new(buf.finish());
        assert_eq!(decode_varbind_list(&mut decoder).unwrap(), varbinds);
    }

    #[test]
    fn test_empty_list() {
        let mut decoder = Decoder::new(Bytes::from_static(&[0x30, 0x00]));
        assert!(decode_varbind_list(&mut decoder).unwrap().is_empty());
    }

    #[test]
    fn test_missing_value_fails() {
        // SEQUENCE { SEQUENCE { OID 1.3 } }
        let mut decoder = Decoder::new(Bytes::from_static(&[0x30, 0x05, 0x30, 0x03, 0x06, 0x01, 0x2B]));
        assert!(decode_varbind_list(&mut decoder).is_err());
    }

    #[test]
    fn test_extra_field_in_binding_fails() {
        // SEQUENCE { SEQUENCE { OID 1.3, NULL, NULL } }
        let mut decoder = Decoder::new(Bytes::from_static(&[
            0x30, 0x09, 0x30, 0x07, 0x06, 0x01, 0x2B, 0x05, 0x00, 0x05, 0x00,
        ]));
        assert!(decode_varbind_list(&mut decoder).is_err());
    }

    #[test]
    fn test_exception_detection() {
        assert!(VarBind::new(oid!(1, 3), Value::EndOfMibView).is_exception());
        assert!(!VarBind::null(oid!(1, 3)).is_exception());
    }

    #[test]
    fn test_display() {
        let vb = VarBind::new(oid!(1, 3, 6, 1), Value::Integer(42));
        assert_eq!(vb.to_string(), "1.3.6.1 = 42");
    }
}
