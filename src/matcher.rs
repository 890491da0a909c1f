//! Classification of returned variable bindings.
//!
//! The matcher decides what a single binding means for the (host, root)
//! pair that requested it. It never fails and never touches the network.

use crate::oid::Oid;
use crate::roots::RootSet;
use crate::value::{Value, ValueType};
use crate::varbind::VarBind;
use crate::walk::{Cursor, WalkPlan};

/// The agent does not implement the requested object.
pub const NO_SUCH_OBJECT: &str = "NO_SUCH_OBJECT";
/// The object exists but the requested instance does not.
pub const NO_SUCH_INSTANCE: &str = "NO_SUCH_INSTANCE";
/// Nothing follows the requested OID in the agent's view.
pub const END_OF_MIB_VIEW: &str = "END_OF_MIB_VIEW";
/// SNMPv1 agent answered with the `noSuchName` error status.
pub const NO_SUCH_NAME: &str = "NO_SUCH_NAME";
/// A GET answer named a different OID than was requested.
pub const OUT_OF_SUBTREE: &str = "OUT_OF_SUBTREE";
/// A walk answer did not move past the requested OID.
pub const NON_INCREASING_OID: &str = "NON_INCREASING_OID";
/// A response carried no binding for a requested OID.
pub const MISSING_VAR_BIND: &str = "MISSING_VAR_BIND";

/// One collected value, attributed to a host and a root.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    /// Position of the host in the dispatch call
    pub host_index: usize,
    /// Position of the root in the dispatch call
    pub root_index: usize,
    pub oid: Oid,
    pub value: Value,
    pub value_type: ValueType,
}

impl ResultRow {
    pub(crate) fn new(host_index: usize, root_index: usize, binding: VarBind) -> Self {
        Self {
            host_index,
            root_index,
            value_type: binding.value.value_type(),
            oid: binding.oid,
            value: binding.value,
        }
    }
}

/// What a returned binding means for its cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Keep the binding as a result row.
    Row,
    /// Record a value warning with this message and stop the pair.
    Warning(&'static str),
    /// The walk left the root's subtree or passed its range end.
    EndOfSubtree,
    /// The walk did not advance; stop the pair with a protocol error.
    NonIncreasing,
}

impl Verdict {
    /// True if the pair is done after this verdict.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Verdict::Row)
    }
}

fn sentinel_message(value: &Value) -> Option<&'static str> {
    match value {
        Value::NoSuchObject => Some(NO_SUCH_OBJECT),
        Value::NoSuchInstance => Some(NO_SUCH_INSTANCE),
        Value::EndOfMibView => Some(END_OF_MIB_VIEW),
        _ => None,
    }
}

/// Classify `binding`, returned for `cursor`'s request.
pub fn classify(plan: WalkPlan, roots: &RootSet, cursor: &Cursor, binding: &VarBind) -> Verdict {
    if let Some(message) = sentinel_message(&binding.value) {
        return Verdict::Warning(message);
    }

    if plan == WalkPlan::Get {
        return if binding.oid == cursor.oid {
            Verdict::Row
        } else {
            Verdict::Warning(OUT_OF_SUBTREE)
        };
    }

    if binding.oid <= cursor.oid {
        return Verdict::NonIncreasing;
    }
    if roots.find(&binding.oid) != Some(cursor.root_index) {
        return Verdict::EndOfSubtree;
    }
    if let Some(end) = &cursor.end
        && binding.oid >= *end
    {
        return Verdict::EndOfSubtree;
    }
    Verdict::Row
}
