//! Partitioning of large host tables into batches.
//!
//! A fetch over tens of thousands of hosts is split into batches that are
//! dispatched independently. Each batch remembers which caller rows its
//! hosts came from, so results can be attributed back to those rows.

use crate::dispatch::{Dispatched, ResultSet};
use crate::error::SnmpError;
use crate::host::Host;
use crate::roots::RootSet;

/// Default hosts per batch.
pub const DEFAULT_BATCH_SIZE: usize = 256;
/// Default batches in flight.
pub const DEFAULT_CONCURRENT_BATCHES: usize = 4;

/// How a host table is split and how many batches run at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatchPolicy {
    pub batch_size: usize,
    pub concurrent_batches: usize,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            concurrent_batches: DEFAULT_CONCURRENT_BATCHES,
        }
    }
}

impl BatchPolicy {
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn concurrent_batches(mut self, count: usize) -> Self {
        self.concurrent_batches = count;
        self
    }
}

/// A slice of the host table.
#[derive(Debug, Clone)]
pub struct Batch<P> {
    pub hosts: Vec<Host>,
    /// Original row index of each host
    pub rows: Vec<usize>,
    /// Caller data of each row, untouched
    pub payload: Vec<P>,
    pub roots: RootSet,
}

impl<P> Batch<P> {
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

/// Lazy iterator of [`Batch`]es over `(Host, payload)` rows.
///
/// ```rust
/// use snmp_fetch::{BatchPolicy, Distributor, Host, RootSet, RootVarBind, oid};
///
/// let roots = RootSet::new(vec![RootVarBind::from(oid!(1, 3, 6, 1, 2, 1, 1))]).unwrap();
/// let rows = (0..5).map(|i| (Host::new(i, format!("192.0.2.{i}")), i * 10));
///
/// let batches: Vec<_> = Distributor::new(rows, BatchPolicy::default().batch_size(2), roots).collect();
/// assert_eq!(batches.len(), 3);
/// assert_eq!(batches[2].rows, vec![4]);
/// assert_eq!(batches[2].payload, vec![40]);
/// ```
#[derive(Debug)]
pub struct Distributor<I> {
    rows: std::iter::Enumerate<I>,
    batch_size: usize,
    roots: RootSet,
}

impl<I: Iterator> Distributor<I> {
    /// A zero `batch_size` is treated as one.
    pub fn new(rows: impl IntoIterator<IntoIter = I>, policy: BatchPolicy, roots: RootSet) -> Self {
        Self {
            rows: rows.into_iter().enumerate(),
            batch_size: policy.batch_size.max(1),
            roots,
        }
    }
}

impl<I, P> Iterator for Distributor<I>
where
    I: Iterator<Item = (Host, P)>,
{
    type Item = Batch<P>;

    fn next(&mut self) -> Option<Batch<P>> {
        let mut batch = Batch {
            hosts: Vec::with_capacity(self.batch_size),
            rows: Vec::with_capacity(self.batch_size),
            payload: Vec::with_capacity(self.batch_size),
            roots: self.roots.clone(),
        };
        for (row, (host, payload)) in self.rows.by_ref().take(self.batch_size) {
            batch.hosts.push(host);
            batch.rows.push(row);
            batch.payload.push(payload);
        }
        (!batch.is_empty()).then_some(batch)
    }
}

/// Outcome of a fetch, keyed by original row index.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<P> {
    /// One result set per root, rows ordered by original row index
    pub results: Vec<ResultSet>,
    pub errors: Vec<SnmpError>,
    /// `(row index, payload)` for every input row
    pub payload: Vec<(usize, P)>,
}

impl<P> Fetched<P> {
    pub(crate) fn new(roots: &RootSet) -> Self {
        Self {
            results: ResultSet::for_roots(roots),
            errors: Vec::new(),
            payload: Vec::new(),
        }
    }

    pub(crate) fn merge(&mut self, other: Fetched<P>) {
        for (into, from) in self.results.iter_mut().zip(other.results) {
            into.rows.extend(from.rows);
        }
        self.errors.extend(other.errors);
        self.payload.extend(other.payload);
    }

    /// Drop the payload, keeping rows and errors.
    pub fn into_dispatched(self) -> Dispatched {
        Dispatched {
            results: self.results,
            errors: self.errors,
        }
    }
}
