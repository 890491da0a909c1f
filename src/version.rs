//! SNMP protocol versions.

/// Community-based SNMP version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Version {
    /// SNMPv1 (RFC 1157). No GETBULK; missing objects surface as noSuchName.
    V1,
    /// SNMPv2c (RFC 3416).
    #[default]
    V2c,
}

impl Version {
    /// The value carried in the message's version field.
    pub fn as_i32(self) -> i32 {
        match self {
            Version::V1 => 0,
            Version::V2c => 1,
        }
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Version::V1),
            1 => Some(Version::V2c),
            _ => None,
        }
    }

    /// Whether GETBULK exists in this version.
    pub fn supports_bulk(self) -> bool {
        self != Version::V1
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Version::V1 => write!(f, "v1"),
            Version::V2c => write!(f, "v2c"),
        }
    }
}
