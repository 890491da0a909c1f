//! Hosts to collect from and the credentials to try against them.

use std::net::{IpAddr, SocketAddr};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::oid::Oid;
use crate::version::Version;

/// Default SNMP agent port.
pub const DEFAULT_PORT: u16 = 161;

/// One community credential.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Community {
    pub version: Version,
    pub community: String,
}

impl Community {
    pub fn new(version: Version, community: impl Into<String>) -> Self {
        Self {
            version,
            community: community.into(),
        }
    }

    /// SNMPv1 community.
    pub fn v1(community: impl Into<String>) -> Self {
        Self::new(Version::V1, community)
    }

    /// SNMPv2c community.
    pub fn v2c(community: impl Into<String>) -> Self {
        Self::new(Version::V2c, community)
    }
}

/// Arc suffixes bounding a walk, relative to every root.
///
/// With `start`, walks begin after `root + start` and GET fetches
/// `root + start`. With `end`, a walk stops once it reaches `root + end`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WalkRange {
    pub start: Option<Oid>,
    pub end: Option<Oid>,
}

impl WalkRange {
    pub fn new(start: Option<Oid>, end: Option<Oid>) -> Self {
        Self { start, end }
    }

    /// OID the first request for `root` carries.
    pub(crate) fn first_oid(&self, root: &Oid) -> Oid {
        match &self.start {
            Some(start) => root.join(start),
            None => root.clone(),
        }
    }

    /// Exclusive upper bound for walks under `root`.
    pub(crate) fn end_oid(&self, root: &Oid) -> Option<Oid> {
        self.end.as_ref().map(|end| root.join(end))
    }
}

/// A host to collect from.
///
/// Hosts are addressed by their position in the dispatch call (`host_index`);
/// `id` is opaque caller data echoed into error records.
///
/// ```rust
/// use snmp_fetch::{Community, Host};
///
/// let host = Host::new(7, "192.0.2.10")
///     .community(Community::v2c("private"))
///     .community(Community::v1("public"));
/// assert_eq!(host.communities.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Host {
    pub id: u64,
    /// `host` or `host:port`
    pub target: String,
    /// Tried in order until one gets a response
    pub communities: Vec<Community>,
    pub config: Option<Config>,
    pub range: Option<WalkRange>,
}

impl Host {
    pub fn new(id: u64, target: impl Into<String>) -> Self {
        Self {
            id,
            target: target.into(),
            communities: Vec::new(),
            config: None,
            range: None,
        }
    }

    /// Append a credential to try.
    pub fn community(mut self, community: Community) -> Self {
        self.communities.push(community);
        self
    }

    pub fn communities(mut self, communities: impl IntoIterator<Item = Community>) -> Self {
        self.communities.extend(communities);
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn range(mut self, range: WalkRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Resolve `target` to a socket address, defaulting the port to 161.
    pub async fn resolve(&self) -> Result<SocketAddr> {
        let target = self.target.trim();
        if let Ok(addr) = target.parse::<SocketAddr>() {
            return Ok(addr);
        }
        if let Ok(ip) = target.trim_matches(['[', ']']).parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, DEFAULT_PORT));
        }

        let lookup = if target.contains(':') {
            target.to_string()
        } else {
            format!("{target}:{DEFAULT_PORT}")
        };
        let resolve_error = |source| {
            Error::Resolve {
                target: target.into(),
                source,
            }
            .boxed()
        };

        tokio::net::lookup_host(lookup)
            .await
            .map_err(resolve_error)?
            .next()
            .ok_or_else(|| {
                resolve_error(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no addresses returned",
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    #[tokio::test]
    async fn test_resolve_literal_addresses() {
        let host = Host::new(1, "192.0.2.1");
        assert_eq!(host.resolve().await.unwrap(), "192.0.2.1:161".parse().unwrap());

        let host = Host::new(1, "192.0.2.1:1161");
        assert_eq!(host.resolve().await.unwrap(), "192.0.2.1:1161".parse().unwrap());

        let host = Host::new(1, "::1");
        assert_eq!(host.resolve().await.unwrap(), "[::1]:161".parse().unwrap());

        let host = Host::new(1, "[2001:db8::1]:1161");
        assert_eq!(
            host.resolve().await.unwrap(),
            "[2001:db8::1]:1161".parse().unwrap()
        );
    }

    #[tokio::test]
    async fn test_resolve_garbage_fails() {
        let err = Host::new(1, "not a host:abc").resolve().await.unwrap_err();
        assert!(matches!(*err, Error::Resolve { .. }));
    }

    #[test]
    fn test_range_oids() {
        let root = oid!(1, 3, 6, 1, 2, 1, 2, 2);
        let range = WalkRange::new(Some(oid!(1, 5)), Some(oid!(1, 9)));
        assert_eq!(range.first_oid(&root), oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 5));
        assert_eq!(range.end_oid(&root), Some(oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 9)));
        assert_eq!(WalkRange::default().first_oid(&root), root);
        assert_eq!(WalkRange::default().end_oid(&root), None);
    }
}
