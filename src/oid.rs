//! Object Identifier (OID) type.
//!
//! OIDs are stored as `SmallVec<[u32; 16]>` to avoid heap allocation for common OIDs.
//! Ordering is lexicographic over the arcs, which is the order agents walk in.

use crate::error::internal::{DecodeErrorKind, decode_error};
use crate::error::{Error, Result, UNKNOWN_TARGET};
use smallvec::SmallVec;
use std::fmt;

/// Maximum number of arcs (subidentifiers) allowed in an OID.
///
/// Per RFC 2578 Section 3.5: "there are at most 128 sub-identifiers in a value".
pub const MAX_OID_LEN: usize = 128;

/// Object Identifier.
///
/// Stored as a sequence of arc values (u32). Uses SmallVec to avoid
/// heap allocation for OIDs with 16 or fewer arcs.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Oid {
    arcs: SmallVec<[u32; 16]>,
}

impl Oid {
    /// Create an empty OID.
    pub fn empty() -> Self {
        Self {
            arcs: SmallVec::new(),
        }
    }

    /// Create an OID from arc values.
    ///
    /// ```
    /// use snmp_fetch::oid::Oid;
    ///
    /// let oid = Oid::new([1, 3, 6, 1]);
    /// assert_eq!(oid.len(), 4);
    /// ```
    pub fn new(arcs: impl IntoIterator<Item = u32>) -> Self {
        Self {
            arcs: arcs.into_iter().collect(),
        }
    }

    /// Create an OID from a slice of arcs.
    pub fn from_slice(arcs: &[u32]) -> Self {
        Self {
            arcs: SmallVec::from_slice(arcs),
        }
    }

    /// Parse an OID from dotted string notation (e.g., "1.3.6.1.2.1.1.1.0").
    ///
    /// A leading dot is accepted, as printed by net-snmp tools.
    ///
    /// ```
    /// use snmp_fetch::oid::Oid;
    ///
    /// let oid = Oid::parse(".1.3.6.1.2.1.1.1.0").unwrap();
    /// assert_eq!(oid.to_string(), "1.3.6.1.2.1.1.1.0");
    /// assert!(Oid::parse("1.3.x").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.strip_prefix('.').unwrap_or(s);
        if trimmed.is_empty() {
            return Ok(Self::empty());
        }

        let mut arcs = SmallVec::new();
        for part in trimmed.split('.') {
            let arc: u32 = part
                .parse()
                .map_err(|_| Error::InvalidOid(format!("invalid arc {:?} in {:?}", part, s).into()).boxed())?;
            arcs.push(arc);
        }

        Ok(Self { arcs })
    }

    /// Get the arc values.
    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    /// Get the number of arcs.
    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    /// Check if the OID is empty.
    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    /// Check if this OID starts with another OID.
    ///
    /// An OID always starts with itself, and any OID starts with an empty OID.
    ///
    /// ```
    /// use snmp_fetch::oid;
    ///
    /// let sys_descr = oid!(1, 3, 6, 1, 2, 1, 1, 1, 0);
    /// assert!(sys_descr.starts_with(&oid!(1, 3, 6, 1, 2, 1, 1)));
    /// assert!(!sys_descr.starts_with(&oid!(1, 3, 6, 1, 2, 1, 2)));
    /// assert!(sys_descr.starts_with(&sys_descr));
    /// ```
    pub fn starts_with(&self, other: &Oid) -> bool {
        self.arcs.len() >= other.arcs.len() && self.arcs[..other.arcs.len()] == other.arcs[..]
    }

    /// True if either OID is a prefix of the other (equality included).
    ///
    /// Two roots related this way cannot be walked together, because a
    /// returned OID under the longer one belongs to both subtrees.
    pub fn is_prefix_related(&self, other: &Oid) -> bool {
        self.starts_with(other) || other.starts_with(self)
    }

    /// Get the parent OID (all arcs except the last).
    ///
    /// Returns `None` if the OID is empty.
    pub fn parent(&self) -> Option<Oid> {
        if self.arcs.is_empty() {
            None
        } else {
            Some(Oid {
                arcs: SmallVec::from_slice(&self.arcs[..self.arcs.len() - 1]),
            })
        }
    }

    /// Create a child OID by appending an arc.
    pub fn child(&self, arc: u32) -> Oid {
        let mut arcs = self.arcs.clone();
        arcs.push(arc);
        Oid { arcs }
    }

    /// Create an OID by appending all arcs of `suffix`.
    ///
    /// ```
    /// use snmp_fetch::oid;
    ///
    /// let column = oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2);
    /// assert_eq!(column.join(&oid!(5)), oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2, 5));
    /// ```
    pub fn join(&self, suffix: &Oid) -> Oid {
        let mut arcs = self.arcs.clone();
        arcs.extend_from_slice(&suffix.arcs);
        Oid { arcs }
    }

    /// Check that the first two arcs can share one BER subidentifier.
    ///
    /// The first arc must be 0, 1 or 2. Below 2 the second arc must be under
    /// 40; at 2 it must leave room for the `80` offset in 32 bits.
    ///
    /// ```
    /// use snmp_fetch::oid;
    ///
    /// assert!(oid!(1, 3, 6, 1).validate().is_ok());
    /// assert!(oid!(2, 999).validate().is_ok());
    /// assert!(oid!(3, 1).validate().is_err());
    /// assert!(oid!(1, 45).validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| -> Result<()> {
            Err(Error::InvalidOid(format!("{self}: {reason}").into()).boxed())
        };
        match *self.arcs.as_slice() {
            [first, ..] if first > 2 => invalid(format!("first arc {first} is not 0, 1 or 2")),
            [first @ (0 | 1), second, ..] if second >= 40 => {
                invalid(format!("second arc {second} must be below 40 under {first}"))
            }
            [2, second, ..] if second > u32::MAX - 80 => invalid(format!("second arc {second} overflows")),
            _ => self.validate_length(),
        }
    }

    /// Validate that the OID doesn't exceed the maximum arc count.
    pub fn validate_length(&self) -> Result<()> {
        if self.arcs.len() > MAX_OID_LEN {
            return Err(Error::InvalidOid(
                format!("{} arcs exceeds maximum of {}", self.arcs.len(), MAX_OID_LEN).into(),
            )
            .boxed());
        }
        Ok(())
    }

    /// Encode to BER content octets (X.690 Section 8.19).
    ///
    /// The first two arcs are combined as `arc1 * 40 + arc2`; every
    /// subidentifier is base-128 with a continuation bit. A single-arc OID
    /// encodes as `arc1 * 40`.
    pub fn to_ber_smallvec(&self) -> SmallVec<[u8; 64]> {
        let mut bytes = SmallVec::new();

        match self.arcs.len() {
            0 => return bytes,
            1 => encode_subidentifier(&mut bytes, self.arcs[0].wrapping_mul(40)),
            _ => encode_subidentifier(
                &mut bytes,
                self.arcs[0].wrapping_mul(40).wrapping_add(self.arcs[1]),
            ),
        }

        if self.arcs.len() > 2 {
            for &arc in &self.arcs[2..] {
                encode_subidentifier(&mut bytes, arc);
            }
        }

        bytes
    }

    /// Encode to BER content octets.
    pub fn to_ber(&self) -> Vec<u8> {
        self.to_ber_smallvec().to_vec()
    }

    /// Decode from BER content octets.
    ///
    /// Enforces [`MAX_OID_LEN`] limit per RFC 2578 Section 3.5.
    pub fn from_ber(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::empty());
        }

        let mut arcs = SmallVec::new();

        let (first_subid, consumed) = decode_subidentifier(data, 0)?;
        if first_subid < 40 {
            arcs.push(0);
            arcs.push(first_subid);
        } else if first_subid < 80 {
            arcs.push(1);
            arcs.push(first_subid - 40);
        } else {
            arcs.push(2);
            arcs.push(first_subid - 80);
        }

        let mut i = consumed;
        while i < data.len() {
            let (arc, bytes_consumed) = decode_subidentifier(&data[i..], i)?;
            arcs.push(arc);
            i += bytes_consumed;

            if arcs.len() > MAX_OID_LEN {
                return Err(decode_error(
                    UNKNOWN_TARGET,
                    i,
                    DecodeErrorKind::OidTooLong {
                        count: arcs.len(),
                        max: MAX_OID_LEN,
                    },
                ));
            }
        }

        Ok(Self { arcs })
    }
}

#[inline]
fn encode_subidentifier(bytes: &mut SmallVec<[u8; 64]>, value: u32) {
    if value == 0 {
        bytes.push(0);
        return;
    }

    let mut temp = value;
    let mut count = 0;
    while temp > 0 {
        count += 1;
        temp >>= 7;
    }

    for i in (0..count).rev() {
        let mut byte = ((value >> (i * 7)) & 0x7F) as u8;
        if i > 0 {
            byte |= 0x80;
        }
        bytes.push(byte);
    }
}

/// Decode a subidentifier, returning (value, bytes_consumed).
fn decode_subidentifier(data: &[u8], base_offset: usize) -> Result<(u32, usize)> {
    let mut value: u32 = 0;
    let mut i = 0;

    loop {
        let Some(&byte) = data.get(i) else {
            return Err(decode_error(
                UNKNOWN_TARGET,
                base_offset + i,
                DecodeErrorKind::TruncatedData,
            ));
        };
        i += 1;

        if value > (u32::MAX >> 7) {
            return Err(decode_error(
                UNKNOWN_TARGET,
                base_offset + i,
                DecodeErrorKind::IntegerOverflow,
            ));
        }

        value = (value << 7) | ((byte & 0x7F) as u32);

        if byte & 0x80 == 0 {
            break;
        }
    }

    Ok((value, i))
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", self)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arc in &self.arcs {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{}", arc)?;
            first = false;
        }
        Ok(())
    }
}

impl std::str::FromStr for Oid {
    type Err = Box<Error>;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<&[u32]> for Oid {
    fn from(arcs: &[u32]) -> Self {
        Self::from_slice(arcs)
    }
}

impl<const N: usize> From<[u32; N]> for Oid {
    fn from(arcs: [u32; N]) -> Self {
        Self::new(arcs)
    }
}

impl PartialOrd for Oid {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Oid {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.arcs.cmp(&other.arcs)
    }
}

/// Macro to create an OID from literal arcs.
///
/// ```
/// use snmp_fetch::oid;
///
/// let sys_descr = oid!(1, 3, 6, 1, 2, 1, 1, 1, 0);
/// assert_eq!(sys_descr.to_string(), "1.3.6.1.2.1.1.1.0");
/// ```
#[macro_export]
macro_rules! oid {
    ($($arc:expr),* $(,)?) => {
        $crate::oid::Oid::from_slice(&[$($arc),*])
    };
}
