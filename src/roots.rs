//! Requested root OIDs and their validation.
//!
//! Every binding returned by a walk is attributed to exactly one root. That
//! only works when no root is a prefix of another, so a [`RootSet`] can only
//! be built from a prefix-free list.

use std::ops::Deref;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::oid::Oid;

/// A requested root OID with opaque caller tags.
///
/// The tags are never interpreted; they ride along so a materialization
/// layer can map result columns back to its own schema.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RootVarBind {
    pub oid: Oid,
    pub oid_tag: u64,
    pub value_tag: u64,
}

impl RootVarBind {
    pub fn new(oid: Oid, oid_tag: u64, value_tag: u64) -> Self {
        Self {
            oid,
            oid_tag,
            value_tag,
        }
    }
}

impl From<Oid> for RootVarBind {
    fn from(oid: Oid) -> Self {
        Self::new(oid, 0, 0)
    }
}

#[derive(Debug)]
struct Inner {
    roots: Vec<RootVarBind>,
    // Indices into `roots`, ordered by OID.
    sorted: Vec<usize>,
}

/// A validated, prefix-free set of roots in request order.
///
/// Cloning is cheap; every batch of a fetch shares the same set.
///
/// ```rust
/// use snmp_fetch::{oid, RootSet, RootVarBind};
///
/// let roots = RootSet::new(vec![
///     RootVarBind::from(oid!(1, 3, 6, 1, 2, 1, 1)),
///     RootVarBind::from(oid!(1, 3, 6, 1, 2, 1, 2)),
/// ])
/// .unwrap();
/// assert_eq!(roots.find(&oid!(1, 3, 6, 1, 2, 1, 2, 1, 0)), Some(1));
///
/// assert!(RootSet::new(vec![
///     RootVarBind::from(oid!(1, 3, 6, 1, 2, 1)),
///     RootVarBind::from(oid!(1, 3, 6, 1, 2, 1, 1)),
/// ])
/// .is_err());
/// ```
#[derive(Debug, Clone)]
pub struct RootSet {
    inner: Arc<Inner>,
}

impl RootSet {
    /// Validate `roots`.
    ///
    /// Fails with [`Error::AmbiguousRoot`] if two roots are prefix-related
    /// (equal roots included), with [`Error::InvalidOid`] if a root cannot be
    /// encoded, and with [`Error::Config`] if the list is empty.
    pub fn new(roots: Vec<RootVarBind>) -> Result<Self> {
        if roots.is_empty() {
            return Err(Error::Config("no root OIDs requested".into()).boxed());
        }
        for root in &roots {
            root.oid.validate()?;
        }

        let mut sorted: Vec<usize> = (0..roots.len()).collect();
        sorted.sort_by(|&a, &b| roots[a].oid.cmp(&roots[b].oid));

        // After sorting, a prefix always sorts directly before some OID it
        // prefixes, so adjacent pairs cover every conflict.
        for pair in sorted.windows(2) {
            let (first, second) = (&roots[pair[0]].oid, &roots[pair[1]].oid);
            if second.starts_with(first) {
                tracing::debug!(target: "snmp_fetch::roots", { snmp.first = %first, snmp.second = %second }, "rejecting ambiguous roots");
                return Err(Error::AmbiguousRoot {
                    first: first.clone(),
                    second: second.clone(),
                }
                .boxed());
            }
        }

        Ok(Self {
            inner: Arc::new(Inner { roots, sorted }),
        })
    }

    /// Index of the root whose subtree contains `oid`.
    pub fn find(&self, oid: &Oid) -> Option<usize> {
        let Inner { roots, sorted } = &*self.inner;
        // Only the greatest root not after `oid` can be its prefix.
        let pos = sorted.partition_point(|&i| roots[i].oid <= *oid);
        let candidate = *sorted.get(pos.checked_sub(1)?)?;
        oid.starts_with(&roots[candidate].oid).then_some(candidate)
    }

    /// Roots in request order.
    pub fn roots(&self) -> &[RootVarBind] {
        &self.inner.roots
    }
}

impl Deref for RootSet {
    type Target = [RootVarBind];

    fn deref(&self) -> &[RootVarBind] {
        self.roots()
    }
}

impl TryFrom<Vec<RootVarBind>> for RootSet {
    type Error = Box<Error>;

    fn try_from(roots: Vec<RootVarBind>) -> Result<Self> {
        Self::new(roots)
    }
}
