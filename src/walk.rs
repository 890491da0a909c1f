//! Per-host walk state.
//!
//! A [`HostWalk`] keeps one [`Cursor`] per requested root. Each exchange
//! takes a chunk of pending cursors, sends one PDU for them and feeds the
//! answer back through [`HostWalk::absorb`], which advances or finishes
//! every cursor in the chunk.

use crate::config::Config;
use crate::error::{ErrorKind, SnmpError};
use crate::host::WalkRange;
use crate::matcher::{self, ResultRow, Verdict, classify};
use crate::oid::Oid;
use crate::pdu::Pdu;
use crate::roots::RootSet;
use crate::varbind::VarBind;
use crate::version::Version;

/// Request type selected by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PduKind {
    /// Fetch exactly the requested OIDs.
    Get,
    /// Walk each root subtree with GETNEXT.
    Next,
    /// Walk each root subtree with GETBULK.
    BulkGet,
}

impl std::fmt::Display for PduKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Next => write!(f, "NEXT"),
            Self::BulkGet => write!(f, "BULKGET"),
        }
    }
}

/// How a host is walked, fixed once its credential is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkPlan {
    Get,
    Next,
    Bulk { repetitions: i32 },
}

impl WalkPlan {
    /// Plan for `kind` over a credential of `version`.
    ///
    /// SNMPv1 has no GETBULK, so bulk walks fall back to GETNEXT.
    pub fn select(kind: PduKind, version: Version, config: &Config) -> Self {
        match kind {
            PduKind::Get => WalkPlan::Get,
            PduKind::Next => WalkPlan::Next,
            PduKind::BulkGet if version.supports_bulk() => WalkPlan::Bulk {
                repetitions: config.bulk_width(),
            },
            PduKind::BulkGet => WalkPlan::Next,
        }
    }

    pub fn is_walk(self) -> bool {
        self != WalkPlan::Get
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Pending,
    Done,
}

/// Progress of one (host, root) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    pub root_index: usize,
    /// OID the next request carries
    pub oid: Oid,
    /// Exclusive walk bound
    pub end: Option<Oid>,
    /// Rows collected so far
    pub rows: usize,
    pub state: CursorState,
}

impl Cursor {
    pub fn is_pending(&self) -> bool {
        self.state == CursorState::Pending
    }
}

/// Rows and error records collected for one host.
#[derive(Debug)]
pub(crate) struct HostOutput {
    pub host_index: usize,
    pub host_id: u64,
    pub rows: Vec<ResultRow>,
    pub errors: Vec<SnmpError>,
}

impl HostOutput {
    pub fn new(host_index: usize, host_id: u64) -> Self {
        Self {
            host_index,
            host_id,
            rows: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Start an error record for this host.
    pub fn error(&self, kind: ErrorKind, message: impl Into<String>) -> SnmpError {
        SnmpError::new(self.host_index, self.host_id, kind, message)
    }

    pub fn record(&mut self, error: SnmpError) {
        tracing::debug!(target: "snmp_fetch::walk", { snmp.host_index = error.host_index, snmp.root_index = ?error.root_index, snmp.kind = %error.kind }, "{}", error.message);
        self.errors.push(error);
    }
}

/// Cursor table for one host.
#[derive(Debug)]
pub struct HostWalk {
    plan: WalkPlan,
    roots: RootSet,
    cursors: Vec<Cursor>,
}

impl HostWalk {
    pub fn new(plan: WalkPlan, roots: &RootSet, range: Option<&WalkRange>) -> Self {
        let range = range.cloned().unwrap_or_default();
        let cursors = roots
            .iter()
            .enumerate()
            .map(|(root_index, root)| Cursor {
                root_index,
                oid: range.first_oid(&root.oid),
                end: range.end_oid(&root.oid),
                rows: 0,
                state: CursorState::Pending,
            })
            .collect();

        Self {
            plan,
            roots: roots.clone(),
            cursors,
        }
    }

    pub fn plan(&self) -> WalkPlan {
        self.plan
    }

    pub fn cursors(&self) -> &[Cursor] {
        &self.cursors
    }

    pub fn is_finished(&self) -> bool {
        !self.cursors.iter().any(Cursor::is_pending)
    }

    /// Up to `width` pending cursors for the next PDU, or `None` when done.
    pub fn next_chunk(&self, width: usize) -> Option<Vec<usize>> {
        let chunk: Vec<usize> = self
            .cursors
            .iter()
            .filter(|c| c.is_pending())
            .map(|c| c.root_index)
            .take(width.max(1))
            .collect();
        (!chunk.is_empty()).then_some(chunk)
    }

    /// Build the request PDU for `chunk`.
    pub fn request(&self, request_id: i32, chunk: &[usize]) -> Pdu {
        let oids: Vec<Oid> = chunk.iter().map(|&i| self.cursors[i].oid.clone()).collect();
        match self.plan {
            WalkPlan::Get => Pdu::get_request(request_id, &oids),
            WalkPlan::Next => Pdu::get_next_request(request_id, &oids),
            WalkPlan::Bulk { repetitions } => Pdu::get_bulk(request_id, 0, repetitions, &oids),
        }
    }

    /// Feed the bindings answering `chunk` back into the cursors.
    ///
    /// GET and GETNEXT answers pair up positionally. GETBULK answers are
    /// row-major: binding `j` belongs to `chunk[j % chunk.len()]`, and once a
    /// cursor has finished its later bindings are ignored.
    pub(crate) fn absorb(&mut self, chunk: &[usize], varbinds: Vec<VarBind>, out: &mut HostOutput) {
        let mut answered = vec![false; chunk.len()];

        match self.plan {
            WalkPlan::Get | WalkPlan::Next => {
                for ((&i, binding), seen) in chunk.iter().zip(varbinds).zip(answered.iter_mut()) {
                    *seen = true;
                    self.apply(i, binding, out);
                }
            }
            WalkPlan::Bulk { .. } => {
                for (j, binding) in varbinds.into_iter().enumerate() {
                    let pos = j % chunk.len();
                    answered[pos] = true;
                    if self.cursors[chunk[pos]].is_pending() {
                        self.apply(chunk[pos], binding, out);
                    }
                }
            }
        }

        for (&i, seen) in chunk.iter().zip(answered) {
            if !seen && self.cursors[i].is_pending() {
                let error = out
                    .error(ErrorKind::ProtocolError, matcher::MISSING_VAR_BIND)
                    .with_root(i)
                    .with_oid(self.cursors[i].oid.clone());
                out.record(error);
                self.finish(i);
            }
        }

        if self.plan == WalkPlan::Get {
            for &i in chunk {
                self.finish(i);
            }
        }
    }

    fn apply(&mut self, i: usize, binding: VarBind, out: &mut HostOutput) {
        let verdict = classify(self.plan, &self.roots, &self.cursors[i], &binding);
        match verdict {
            Verdict::Row => {
                let cursor = &mut self.cursors[i];
                if self.plan.is_walk() {
                    cursor.oid = binding.oid.clone();
                }
                cursor.rows += 1;
                out.rows.push(ResultRow::new(out.host_index, i, binding));
            }
            Verdict::Warning(message) => {
                let error = out
                    .error(ErrorKind::ValueWarning, message)
                    .with_root(i)
                    .with_oid(binding.oid);
                out.record(error);
                self.finish(i);
            }
            Verdict::NonIncreasing => {
                let error = out
                    .error(ErrorKind::ProtocolError, matcher::NON_INCREASING_OID)
                    .with_root(i)
                    .with_oid(binding.oid);
                out.record(error);
                self.finish(i);
            }
            Verdict::EndOfSubtree => {
                tracing::trace!(target: "snmp_fetch::walk", { snmp.host_index = out.host_index, snmp.root_index = i, snmp.rows = self.cursors[i].rows }, "walk left subtree");
                self.finish(i);
            }
        }
    }

    /// Mark one cursor done.
    pub fn finish(&mut self, i: usize) {
        if let Some(cursor) = self.cursors.get_mut(i) {
            cursor.state = CursorState::Done;
        }
    }

    /// Mark every pending cursor done.
    pub fn abandon(&mut self) {
        for cursor in &mut self.cursors {
            cursor.state = CursorState::Done;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use crate::roots::RootVarBind;
    use crate::value::Value;

    fn roots(oids: &[Oid]) -> RootSet {
        RootSet::new(oids.iter().cloned().map(RootVarBind::from).collect()).unwrap()
    }

    #[test]
    fn test_plan_selection() {
        let config = Config::default().bulk_repetitions(25);
        assert_eq!(
            WalkPlan::select(PduKind::BulkGet, Version::V2c, &config),
            WalkPlan::Bulk { repetitions: 25 }
        );
        assert_eq!(
            WalkPlan::select(PduKind::BulkGet, Version::V1, &config),
            WalkPlan::Next
        );
        assert_eq!(WalkPlan::select(PduKind::Get, Version::V1, &config), WalkPlan::Get);
    }

    #[test]
    fn test_chunks_respect_width() {
        let roots = roots(&[oid!(1, 1), oid!(1, 2), oid!(1, 3)]);
        let mut walk = HostWalk::new(WalkPlan::Get, &roots, None);
        assert_eq!(walk.next_chunk(2), Some(vec![0, 1]));

        let mut out = HostOutput::new(0, 0);
        let answer = vec![
            VarBind::new(oid!(1, 1), Value::Integer(1)),
            VarBind::new(oid!(1, 2), Value::Integer(2)),
        ];
        walk.absorb(&[0, 1], answer, &mut out);
        assert_eq!(walk.next_chunk(2), Some(vec![2]));
        assert_eq!(out.rows.len(), 2);
        assert!(!walk.is_finished());
    }

    #[test]
    fn test_range_start_applies_to_get() {
        let roots = roots(&[oid!(1, 3, 6, 1, 2, 1, 1)]);
        let range = WalkRange::new(Some(oid!(5, 0)), None);
        let walk = HostWalk::new(WalkPlan::Get, &roots, Some(&range));
        let pdu = walk.request(1, &[0]);
        assert_eq!(pdu.varbinds[0].oid, oid!(1, 3, 6, 1, 2, 1, 1, 5, 0));
    }

    #[test]
    fn test_next_advances_cursor() {
        let roots = roots(&[oid!(1, 3, 6, 1, 2, 1, 1)]);
        let mut walk = HostWalk::new(WalkPlan::Next, &roots, None);
        let mut out = HostOutput::new(4, 40);
        walk.absorb(
            &[0],
            vec![VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), Value::from("linux"))],
            &mut out,
        );
        assert_eq!(walk.cursors()[0].oid, oid!(1, 3, 6, 1, 2, 1, 1, 1, 0));
        assert!(walk.cursors()[0].is_pending());
        assert_eq!(out.rows[0].host_index, 4);

        let pdu = walk.request(2, &[0]);
        assert_eq!(pdu.varbinds[0].oid, oid!(1, 3, 6, 1, 2, 1, 1, 1, 0));
    }

    #[test]
    fn test_bulk_is_row_major_and_skips_after_terminal() {
        let roots = roots(&[oid!(1, 1), oid!(1, 2)]);
        let mut walk = HostWalk::new(WalkPlan::Bulk { repetitions: 3 }, &roots, None);
        let mut out = HostOutput::new(0, 0);
        let answer = vec![
            VarBind::new(oid!(1, 1, 1), Value::Integer(1)),
            VarBind::new(oid!(1, 2, 1), Value::Integer(10)),
            // root 0 leaves its subtree here
            VarBind::new(oid!(1, 2, 1), Value::Integer(10)),
            VarBind::new(oid!(1, 2, 2), Value::Integer(20)),
            // ignored: root 0 already done
            VarBind::new(oid!(1, 2, 2), Value::Integer(20)),
            VarBind::new(oid!(1, 2, 3), Value::Integer(30)),
        ];
        walk.absorb(&[0, 1], answer, &mut out);

        let rows: Vec<(usize, u32)> = out
            .rows
            .iter()
            .map(|r| (r.root_index, *r.oid.arcs().last().unwrap()))
            .collect();
        assert_eq!(rows, vec![(0, 1), (1, 1), (1, 2), (1, 3)]);
        assert!(!walk.cursors()[0].is_pending());
        assert!(walk.cursors()[1].is_pending());
        assert!(out.errors.is_empty());
    }

    #[test]
    fn test_missing_binding_is_protocol_error() {
        let roots = roots(&[oid!(1, 1), oid!(1, 2)]);
        let mut walk = HostWalk::new(WalkPlan::Next, &roots, None);
        let mut out = HostOutput::new(0, 0);
        walk.absorb(&[0, 1], vec![VarBind::new(oid!(1, 1, 1), Value::Null)], &mut out);

        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].kind, ErrorKind::ProtocolError);
        assert_eq!(out.errors[0].message, matcher::MISSING_VAR_BIND);
        assert_eq!(out.errors[0].root_index, Some(1));
        assert!(walk.cursors()[0].is_pending());
    }

    #[test]
    fn test_abandon() {
        let roots = roots(&[oid!(1, 1), oid!(1, 2)]);
        let mut walk = HostWalk::new(WalkPlan::Next, &roots, None);
        walk.abandon();
        assert!(walk.is_finished());
        assert_eq!(walk.next_chunk(10), None);
    }
}
