//! The collection engine.
//!
//! [`Dispatcher::dispatch`] validates the requested roots, then drives every
//! host concurrently: resolve the target, find a credential that answers,
//! and walk the roots to completion. Each host owns its cursor table and
//! output buffers, so hosts never block or affect one another; outputs are
//! merged once all hosts are done.

use std::net::SocketAddr;
use std::time::Instant;

use bytes::Bytes;
use futures::StreamExt;
use tracing::{Span, instrument};

use crate::config::Config;
use crate::distribute::{Batch, BatchPolicy, Distributor, Fetched};
use crate::error::{Error, ErrorKind, ErrorStatus, Result, SnmpError};
use crate::host::{Community, Host};
use crate::matcher::{self, ResultRow};
use crate::message::CommunityMessage;
use crate::pdu::{Pdu, PduType};
use crate::roots::{RootSet, RootVarBind};
use crate::transport::Transport;
use crate::walk::{HostOutput, HostWalk, PduKind, WalkPlan};

/// Default bound on hosts in flight per dispatch.
pub const DEFAULT_MAX_CONCURRENT_HOSTS: usize = 256;

/// A host has no credentials to try.
pub const NO_CREDENTIALS: &str = "NO_CREDENTIALS";
/// No credential got an answer.
pub const CREDENTIALS_EXHAUSTED: &str = "CREDENTIALS_EXHAUSTED";

/// Rows collected for one requested root, across all hosts.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    pub root_index: usize,
    pub root: RootVarBind,
    /// Ordered by host, then by OID within each host
    pub rows: Vec<ResultRow>,
}

impl ResultSet {
    pub(crate) fn empty(root_index: usize, root: RootVarBind) -> Self {
        Self {
            root_index,
            root,
            rows: Vec::new(),
        }
    }

    pub(crate) fn for_roots(roots: &RootSet) -> Vec<Self> {
        roots
            .iter()
            .enumerate()
            .map(|(i, root)| Self::empty(i, root.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResultRow> {
        self.rows.iter()
    }
}

/// Outcome of one dispatch: one result set per root, in request order,
/// plus every error record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dispatched {
    pub results: Vec<ResultSet>,
    pub errors: Vec<SnmpError>,
}

impl Dispatched {
    pub fn into_parts(self) -> (Vec<ResultSet>, Vec<SnmpError>) {
        (self.results, self.errors)
    }

    /// Total rows over all roots.
    pub fn row_count(&self) -> usize {
        self.results.iter().map(ResultSet::len).sum()
    }

    fn assemble(roots: &RootSet, mut outputs: Vec<HostOutput>) -> Self {
        outputs.sort_by_key(|o| o.host_index);

        let mut results = ResultSet::for_roots(roots);
        let mut errors = Vec::new();
        for output in outputs {
            for row in output.rows {
                results[row.root_index].rows.push(row);
            }
            errors.extend(output.errors);
        }
        Self { results, errors }
    }
}

/// Bulk collection engine over a [`Transport`].
///
/// ```rust,no_run
/// use snmp_fetch::transport::UdpTransport;
/// use snmp_fetch::{Community, Dispatcher, Host, PduKind, RootVarBind, oid};
///
/// # async fn example() -> snmp_fetch::Result<()> {
/// let transport = UdpTransport::builder().build().await?;
/// let dispatcher = Dispatcher::new(transport);
///
/// let hosts = vec![
///     Host::new(1, "192.0.2.1").community(Community::v2c("public")),
///     Host::new(2, "192.0.2.2:1161").community(Community::v2c("public")),
/// ];
/// let roots = vec![RootVarBind::from(oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2))];
///
/// let (results, errors) = dispatcher
///     .dispatch(PduKind::BulkGet, &hosts, roots, None)
///     .await?
///     .into_parts();
/// for row in results[0].iter() {
///     println!("host {} {} = {}", row.host_index, row.oid, row.value);
/// }
/// for error in errors {
///     eprintln!("{error}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Dispatcher<T: Transport> {
    transport: T,
    max_concurrent_hosts: usize,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            max_concurrent_hosts: DEFAULT_MAX_CONCURRENT_HOSTS,
        }
    }

    /// Bound on hosts in flight (default 256, at least 1).
    pub fn max_concurrent_hosts(mut self, limit: usize) -> Self {
        self.max_concurrent_hosts = limit.max(1);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Collect `roots` from every host.
    ///
    /// Fails before any I/O if the roots are ambiguous or either list is
    /// empty. Everything that goes wrong afterwards is reported per host in
    /// [`Dispatched::errors`].
    pub async fn dispatch(
        &self,
        kind: PduKind,
        hosts: &[Host],
        roots: Vec<RootVarBind>,
        config: Option<&Config>,
    ) -> Result<Dispatched> {
        let roots = RootSet::new(roots)?;
        if hosts.is_empty() {
            return Err(Error::Config("no hosts requested".into()).boxed());
        }
        Ok(self.dispatch_roots(kind, hosts, &roots, config).await)
    }

    /// Collect an already validated root set from every host.
    pub async fn dispatch_roots(
        &self,
        kind: PduKind,
        hosts: &[Host],
        roots: &RootSet,
        config: Option<&Config>,
    ) -> Dispatched {
        let start = Instant::now();
        let outputs: Vec<HostOutput> = futures::stream::iter(hosts.iter().enumerate())
            .map(|(host_index, host)| self.collect_host(kind, host_index, host, roots, config))
            .buffer_unordered(self.max_concurrent_hosts)
            .collect()
            .await;

        let dispatched = Dispatched::assemble(roots, outputs);
        tracing::debug!(target: "snmp_fetch::dispatch", { snmp.pdu_kind = %kind, snmp.hosts = hosts.len(), snmp.roots = roots.len(), snmp.rows = dispatched.row_count(), snmp.errors = dispatched.errors.len(), snmp.elapsed_ms = start.elapsed().as_millis() as u64 }, "dispatch complete");
        dispatched
    }

    /// Partition `rows` into batches and collect `roots` from all of them.
    ///
    /// Every `host_index` in the outcome is the position of the host in
    /// `rows`, and each payload comes back paired with that index.
    pub async fn fetch<P>(
        &self,
        kind: PduKind,
        rows: impl IntoIterator<Item = (Host, P)>,
        roots: Vec<RootVarBind>,
        policy: BatchPolicy,
        config: Option<&Config>,
    ) -> Result<Fetched<P>> {
        let roots = RootSet::new(roots)?;
        let mut batches: Vec<Fetched<P>> = futures::stream::iter(Distributor::new(rows, policy, roots.clone()))
            .map(|batch| self.dispatch_batch(kind, batch, config))
            .buffer_unordered(policy.concurrent_batches.max(1))
            .collect()
            .await;

        batches.sort_by_key(|b| b.payload.first().map(|(row, _)| *row));
        let mut fetched = Fetched::new(&roots);
        for batch in batches {
            fetched.merge(batch);
        }
        Ok(fetched)
    }

    /// Collect one batch, reporting original row indices.
    pub async fn dispatch_batch<P>(&self, kind: PduKind, batch: Batch<P>, config: Option<&Config>) -> Fetched<P> {
        let Batch {
            hosts,
            rows,
            payload,
            roots,
        } = batch;

        let Dispatched {
            mut results,
            mut errors,
        } = self.dispatch_roots(kind, &hosts, &roots, config).await;

        for row in results.iter_mut().flat_map(|set| set.rows.iter_mut()) {
            row.host_index = rows[row.host_index];
        }
        for error in &mut errors {
            error.host_index = rows[error.host_index];
        }

        Fetched {
            results,
            errors,
            payload: rows.into_iter().zip(payload).collect(),
        }
    }

    #[instrument(
        level = "debug",
        skip_all,
        fields(snmp.host_index = host_index, snmp.host_id = host.id, snmp.target = %host.target)
    )]
    async fn collect_host(
        &self,
        kind: PduKind,
        host_index: usize,
        host: &Host,
        roots: &RootSet,
        call_config: Option<&Config>,
    ) -> HostOutput {
        let mut out = HostOutput::new(host_index, host.id);
        let config = Config::resolve(host.config.as_ref(), call_config);

        let target = match host.resolve().await {
            Ok(target) => target,
            Err(e) => {
                let error = out.error(ErrorKind::TransportError, e.to_string());
                out.record(error);
                return out;
            }
        };

        if host.communities.is_empty() {
            let error = out.error(ErrorKind::ConfigError, NO_CREDENTIALS);
            out.record(error);
            return out;
        }

        for (i, community) in host.communities.iter().enumerate() {
            let plan = WalkPlan::select(kind, community.version, &config);
            let walk = HostWalk::new(plan, roots, host.range.as_ref());
            let Some(chunk) = walk.next_chunk(config.pdu_width()) else {
                return out;
            };

            let request = walk.request(self.transport.alloc_request_id(), &chunk);
            match self.exchange(target, community, request, &config).await {
                Ok(response) => {
                    tracing::debug!(target: "snmp_fetch::dispatch", { snmp.credential = i, snmp.version = %community.version, snmp.plan = ?plan }, "credential accepted");
                    self.walk_host(target, community, &config, walk, chunk, response, &mut out)
                        .await;
                    return out;
                }
                Err(e) if matches!(*e, Error::Timeout { .. }) => {
                    tracing::debug!(target: "snmp_fetch::dispatch", { snmp.credential = i, snmp.version = %community.version }, "no answer, trying next credential");
                }
                Err(e) => {
                    let error = out.error(error_kind(&e), e.to_string());
                    out.record(error);
                    return out;
                }
            }
        }

        let error = out.error(ErrorKind::ConfigError, CREDENTIALS_EXHAUSTED);
        out.record(error);
        out
    }

    /// Drive `walk` to completion with a credential that has answered.
    #[allow(clippy::too_many_arguments)]
    async fn walk_host(
        &self,
        target: SocketAddr,
        community: &Community,
        config: &Config,
        mut walk: HostWalk,
        mut chunk: Vec<usize>,
        mut response: Pdu,
        out: &mut HostOutput,
    ) {
        loop {
            if response.is_error() {
                apply_error_status(&mut walk, &chunk, &response, out);
            } else {
                walk.absorb(&chunk, response.varbinds, out);
            }

            let Some(next) = walk.next_chunk(config.pdu_width()) else {
                return;
            };
            chunk = next;

            let request = walk.request(self.transport.alloc_request_id(), &chunk);
            response = match self.exchange(target, community, request, config).await {
                Ok(response) => response,
                Err(e) => {
                    let error = out.error(error_kind(&e), e.to_string());
                    out.record(error);
                    walk.abandon();
                    return;
                }
            };
        }
    }

    /// Send one request, re-sending on timeout, and return the correlated
    /// response PDU.
    #[instrument(
        level = "debug",
        skip_all,
        fields(
            snmp.target = %target,
            snmp.request_id = request.request_id,
            snmp.attempt = tracing::field::Empty,
            snmp.elapsed_ms = tracing::field::Empty,
        )
    )]
    async fn exchange(&self, target: SocketAddr, community: &Community, request: Pdu, config: &Config) -> Result<Pdu> {
        let start = Instant::now();
        let request_id = request.request_id;
        tracing::trace!(target: "snmp_fetch::dispatch", { snmp.pdu_type = %request.pdu_type, snmp.varbind_count = request.varbinds.len() }, "sending {} request", request.pdu_type);

        let data = CommunityMessage::new(
            community.version,
            Bytes::copy_from_slice(community.community.as_bytes()),
            request,
        )
        .encode();

        let max_attempts = config.retries.max_attempts;
        for attempt in 0..=max_attempts {
            Span::current().record("snmp.attempt", attempt);
            if attempt > 0 {
                tracing::debug!(target: "snmp_fetch::dispatch", "retrying request");
            }

            match self
                .transport
                .exchange(target, request_id, data.clone(), config.timeout)
                .await
            {
                Ok(response) => {
                    Span::current().record("snmp.elapsed_ms", start.elapsed().as_millis() as u64);
                    return decode_response(target, community, request_id, response);
                }
                Err(e) if matches!(*e, Error::Timeout { .. }) => {
                    if attempt < max_attempts {
                        let delay = config.retries.compute_delay(attempt);
                        if !delay.is_zero() {
                            tracing::debug!(target: "snmp_fetch::dispatch", { delay_ms = delay.as_millis() as u64 }, "backing off");
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }

        let elapsed = start.elapsed();
        Span::current().record("snmp.elapsed_ms", elapsed.as_millis() as u64);
        tracing::debug!(target: "snmp_fetch::dispatch", { request_id, ?elapsed, retries = max_attempts }, "request timed out");
        Err(Error::Timeout {
            target,
            elapsed,
            retries: max_attempts,
        }
        .boxed())
    }
}

/// Decode a response and check it answers `request_id` with the version
/// that was asked.
fn decode_response(target: SocketAddr, community: &Community, request_id: i32, data: Bytes) -> Result<Pdu> {
    let message = CommunityMessage::decode_from_target(data, target)?;

    if message.version != community.version {
        tracing::warn!(target: "snmp_fetch::dispatch", { expected_version = %community.version, response_version = %message.version, peer = %target }, "version mismatch in response");
        return Err(Error::MalformedResponse { target }.boxed());
    }
    if message.pdu.request_id != request_id {
        tracing::warn!(target: "snmp_fetch::dispatch", { expected_request_id = request_id, actual_request_id = message.pdu.request_id, peer = %target }, "request ID mismatch in response");
        return Err(Error::MalformedResponse { target }.boxed());
    }
    if message.pdu.pdu_type != PduType::Response {
        tracing::warn!(target: "snmp_fetch::dispatch", { pdu_type = %message.pdu.pdu_type, peer = %target }, "unexpected PDU type in response");
        return Err(Error::MalformedResponse { target }.boxed());
    }

    Ok(message.pdu)
}

/// Record a non-zero error-status against the pairs it names.
///
/// A valid error-index finishes only that pair, so the rest of the chunk is
/// asked again. Without one, every pair of the chunk is finished.
fn apply_error_status(walk: &mut HostWalk, chunk: &[usize], response: &Pdu, out: &mut HostOutput) {
    let status = response.error_status_enum();
    let index = response.error_index.max(0) as u32;
    let pair = (index as usize)
        .checked_sub(1)
        .and_then(|pos| chunk.get(pos).copied());

    let (kind, message, named): (ErrorKind, String, Vec<usize>) = match pair {
        Some(root) if status == ErrorStatus::NoSuchName => {
            (ErrorKind::ValueWarning, matcher::NO_SUCH_NAME.to_string(), vec![root])
        }
        Some(root) => (ErrorKind::ProtocolError, status.to_string(), vec![root]),
        None => (ErrorKind::ProtocolError, status.to_string(), chunk.to_vec()),
    };

    for root in named {
        let oid = walk.cursors()[root].oid.clone();
        let error = out
            .error(kind, message.clone())
            .with_root(root)
            .with_status(status, index)
            .with_oid(oid);
        out.record(error);
        walk.finish(root);
    }
}

fn error_kind(error: &Error) -> ErrorKind {
    match error {
        Error::MalformedResponse { .. } => ErrorKind::ProtocolError,
        Error::Config(_) | Error::InvalidOid(_) | Error::AmbiguousRoot { .. } => ErrorKind::ConfigError,
        _ => ErrorKind::TransportError,
    }
}
