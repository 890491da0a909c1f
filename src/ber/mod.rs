//! BER (Basic Encoding Rules) codec for the SNMPv1/v2c subset.
//!
//! Encoding writes into a reverse buffer so constructed types can be emitted
//! without knowing their content length up front. Decoding is zero-copy over
//! [`Bytes`](bytes::Bytes).

mod decode;
mod encode;
mod length;
pub mod tag;

pub use decode::Decoder;
pub use encode::EncodeBuf;
pub use length::{MAX_LENGTH, decode_length, encode_length};
