//! In-memory agent simulation for tests.
//!
//! A [`MockTransport`] routes each exchange to a [`MockAgent`] registered at
//! the target address. Agents answer GET, GETNEXT and GETBULK from a sorted
//! MIB the way a real v1/v2c agent would, and can be scripted to time out,
//! send garbage or report an error status.

use super::Transport;
use crate::error::{Error, ErrorStatus, Result};
use crate::message::CommunityMessage;
use crate::oid::Oid;
use crate::pdu::{Pdu, PduType};
use crate::value::Value;
use crate::varbind::VarBind;
use crate::version::Version;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::future::Future;
use std::net::SocketAddr;
use std::ops::Bound;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A scripted answer, consumed before the agent's MIB is consulted.
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Answer from the MIB, as if nothing were scripted.
    Answer,
    /// Drop the request.
    Timeout,
    /// Answer with these bytes verbatim.
    Raw(Bytes),
    /// Answer with an error status pointing at the 1-based `index`.
    Status { status: ErrorStatus, index: i32 },
    /// Answer normally but with a different request ID.
    WrongRequestId,
    /// Fail the send.
    NetworkError(String),
}

/// A simulated SNMP agent.
///
/// ```rust
/// use snmp_fetch::transport::MockAgent;
/// use snmp_fetch::{oid, Value, Version};
///
/// let agent = MockAgent::new()
///     .community(Version::V2c, "public")
///     .entry(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), Value::from("router"));
/// # let _ = agent;
/// ```
#[derive(Clone, Debug, Default)]
pub struct MockAgent {
    mib: BTreeMap<Oid, Value>,
    communities: Vec<(Version, Bytes)>,
    script: VecDeque<MockResponse>,
}

impl MockAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept requests using this credential. Requests with any other
    /// credential are silently dropped.
    pub fn community(mut self, version: Version, community: &str) -> Self {
        self.communities
            .push((version, Bytes::copy_from_slice(community.as_bytes())));
        self
    }

    pub fn entry(mut self, oid: Oid, value: impl Into<Value>) -> Self {
        self.mib.insert(oid, value.into());
        self
    }

    pub fn entries(mut self, entries: impl IntoIterator<Item = (Oid, Value)>) -> Self {
        self.mib.extend(entries);
        self
    }

    /// Queue a scripted answer for the next accepted request.
    pub fn then(mut self, response: MockResponse) -> Self {
        self.script.push_back(response);
        self
    }

    fn accepts(&self, message: &CommunityMessage) -> bool {
        self.communities
            .iter()
            .any(|(version, community)| *version == message.version && *community == message.community)
    }

    fn next_after(&self, oid: &Oid) -> Option<(&Oid, &Value)> {
        self.mib
            .range((Bound::Excluded(oid), Bound::Unbounded))
            .next()
    }

    fn missing(&self, oid: &Oid) -> Value {
        let object_known = oid
            .parent()
            .is_some_and(|parent| self.mib.keys().any(|k| k.starts_with(&parent)));
        if object_known {
            Value::NoSuchInstance
        } else {
            Value::NoSuchObject
        }
    }

    /// Answer `request` from the MIB.
    fn answer(&self, request: &Pdu, version: Version) -> Pdu {
        let id = request.request_id;
        let v1 = version == Version::V1;
        let no_such_name = |index: usize| {
            Pdu::response(
                id,
                ErrorStatus::NoSuchName,
                index as i32 + 1,
                request.varbinds.clone(),
            )
        };

        let mut varbinds = Vec::with_capacity(request.varbinds.len());
        match request.pdu_type {
            PduType::GetRequest => {
                for (i, vb) in request.varbinds.iter().enumerate() {
                    match self.mib.get(&vb.oid) {
                        Some(value) => varbinds.push(VarBind::new(vb.oid.clone(), value.clone())),
                        None if v1 => return no_such_name(i),
                        None => varbinds.push(VarBind::new(vb.oid.clone(), self.missing(&vb.oid))),
                    }
                }
            }
            PduType::GetNextRequest => {
                for (i, vb) in request.varbinds.iter().enumerate() {
                    match self.next_after(&vb.oid) {
                        Some((oid, value)) => varbinds.push(VarBind::new(oid.clone(), value.clone())),
                        None if v1 => return no_such_name(i),
                        None => varbinds.push(VarBind::new(vb.oid.clone(), Value::EndOfMibView)),
                    }
                }
            }
            PduType::GetBulkRequest => {
                let non_repeaters = (request.error_status.max(0) as usize).min(request.varbinds.len());
                let repetitions = request.error_index.max(0) as usize;

                for vb in &request.varbinds[..non_repeaters] {
                    varbinds.push(self.bulk_step(&vb.oid));
                }

                let mut columns: Vec<(Oid, bool)> = request.varbinds[non_repeaters..]
                    .iter()
                    .map(|vb| (vb.oid.clone(), false))
                    .collect();
                for _ in 0..repetitions {
                    if columns.iter().all(|(_, ended)| *ended) {
                        break;
                    }
                    for (oid, ended) in &mut columns {
                        if *ended {
                            varbinds.push(VarBind::new(oid.clone(), Value::EndOfMibView));
                            continue;
                        }
                        let step = self.bulk_step(oid);
                        if step.value == Value::EndOfMibView {
                            *ended = true;
                        } else {
                            *oid = step.oid.clone();
                        }
                        varbinds.push(step);
                    }
                }
            }
            PduType::Response => {}
        }

        Pdu::response(id, ErrorStatus::NoError, 0, varbinds)
    }

    fn bulk_step(&self, oid: &Oid) -> VarBind {
        match self.next_after(oid) {
            Some((next, value)) => VarBind::new(next.clone(), value.clone()),
            None => VarBind::new(oid.clone(), Value::EndOfMibView),
        }
    }
}

/// A request seen by the mock.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub target: SocketAddr,
    pub request_id: i32,
    pub data: Bytes,
    /// The decoded request, if it decoded
    pub message: Option<CommunityMessage>,
}

#[derive(Default)]
struct MockState {
    agents: HashMap<SocketAddr, MockAgent>,
    requests: Vec<RecordedRequest>,
    next_request_id: i32,
}

/// Transport that routes exchanges to simulated agents.
///
/// Exchanges with an address that has no agent time out immediately.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `agent` at `addr`, replacing any previous one.
    pub fn with_agent(self, addr: SocketAddr, agent: MockAgent) -> Self {
        self.add_agent(addr, agent);
        self
    }

    pub fn add_agent(&self, addr: SocketAddr, agent: MockAgent) {
        self.state().agents.insert(addr, agent);
    }

    /// Queue a scripted answer on the agent at `addr`.
    pub fn script(&self, addr: SocketAddr, response: MockResponse) {
        if let Some(agent) = self.state().agents.get_mut(&addr) {
            agent.script.push_back(response);
        }
    }

    /// All requests seen so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state().requests.len()
    }

    /// Requests sent to `addr`.
    pub fn requests_to(&self, addr: SocketAddr) -> Vec<RecordedRequest> {
        self.state()
            .requests
            .iter()
            .filter(|r| r.target == addr)
            .cloned()
            .collect()
    }

    pub fn clear_requests(&self) {
        self.state().requests.clear();
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn respond(&self, target: SocketAddr, request_id: i32, request: Bytes, timeout: Duration) -> Result<Bytes> {
        let timed_out = || {
            Err(Error::Timeout {
                target,
                elapsed: timeout,
                retries: 0,
            }
            .boxed())
        };

        let message = CommunityMessage::decode(request.clone()).ok();
        let mut state = self.state();
        state.requests.push(RecordedRequest {
            target,
            request_id,
            data: request,
            message: message.clone(),
        });

        let Some(agent) = state.agents.get_mut(&target) else {
            return timed_out();
        };
        let Some(message) = message.filter(|m| agent.accepts(m)) else {
            return timed_out();
        };

        let reply = |pdu: Pdu| CommunityMessage::new(message.version, message.community.clone(), pdu).encode();

        match agent.script.pop_front() {
            Some(MockResponse::Answer) | None => Ok(reply(agent.answer(&message.pdu, message.version))),
            Some(MockResponse::Timeout) => timed_out(),
            Some(MockResponse::Raw(data)) => Ok(data),
            Some(MockResponse::NetworkError(msg)) => Err(Error::Network {
                target,
                source: std::io::Error::other(msg),
            }
            .boxed()),
            Some(MockResponse::Status { status, index }) => Ok(reply(Pdu::response(
                message.pdu.request_id,
                status,
                index,
                message.pdu.varbinds.clone(),
            ))),
            Some(MockResponse::WrongRequestId) => {
                let mut pdu = agent.answer(&message.pdu, message.version);
                pdu.request_id = pdu.request_id.wrapping_add(1);
                Ok(reply(pdu))
            }
        }
    }
}

impl Transport for MockTransport {
    fn exchange(
        &self,
        target: SocketAddr,
        request_id: i32,
        request: Bytes,
        timeout: Duration,
    ) -> impl Future<Output = Result<Bytes>> + Send {
        let result = self.respond(target, request_id, request, timeout);
        async move { result }
    }

    fn alloc_request_id(&self) -> i32 {
        let mut state = self.state();
        state.next_request_id = state.next_request_id.wrapping_add(1).max(1);
        state.next_request_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    fn addr() -> SocketAddr {
        "192.0.2.1:161".parse().unwrap()
    }

    fn agent() -> MockAgent {
        MockAgent::new()
            .community(Version::V2c, "public")
            .community(Version::V1, "public")
            .entry(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), "router")
            .entry(oid!(1, 3, 6, 1, 2, 1, 1, 3, 0), Value::TimeTicks(100))
            .entry(oid!(1, 3, 6, 1, 2, 1, 2, 1, 0), Value::Integer(2))
    }

    async fn ask(mock: &MockTransport, version: Version, pdu: Pdu) -> Result<Pdu> {
        let id = pdu.request_id;
        let request = CommunityMessage::new(version, b"public".as_slice(), pdu).encode();
        let data = mock.exchange(addr(), id, request, Duration::from_secs(1)).await?;
        Ok(CommunityMessage::decode(data)?.pdu)
    }

    #[tokio::test]
    async fn test_get_and_exceptions() {
        let mock = MockTransport::new().with_agent(addr(), agent());
        let pdu = ask(
            &mock,
            Version::V2c,
            Pdu::get_request(
                1,
                &[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), oid!(1, 3, 6, 1, 2, 1, 1, 1, 5), oid!(2, 9)],
            ),
        )
        .await
        .unwrap();
        assert_eq!(pdu.varbinds[0].value, Value::from("router"));
        assert_eq!(pdu.varbinds[1].value, Value::NoSuchInstance);
        assert_eq!(pdu.varbinds[2].value, Value::NoSuchObject);
    }

    #[tokio::test]
    async fn test_v1_missing_is_no_such_name() {
        let mock = MockTransport::new().with_agent(addr(), agent());
        let pdu = ask(
            &mock,
            Version::V1,
            Pdu::get_next_request(1, &[oid!(1, 3, 6, 1, 2, 1, 1), oid!(1, 3, 6, 1, 2, 1, 2, 1, 0)]),
        )
        .await
        .unwrap();
        assert_eq!(pdu.error_status_enum(), ErrorStatus::NoSuchName);
        assert_eq!(pdu.error_index, 2);
    }

    #[tokio::test]
    async fn test_bulk_stops_after_all_columns_end() {
        let mock = MockTransport::new().with_agent(addr(), agent());
        let pdu = ask(&mock, Version::V2c, Pdu::get_bulk(5, 0, 10, &[oid!(1, 3, 6, 1, 2, 1, 1)]))
            .await
            .unwrap();
        let oids: Vec<&Oid> = pdu.varbinds.iter().map(|vb| &vb.oid).collect();
        assert_eq!(
            oids,
            vec![
                &oid!(1, 3, 6, 1, 2, 1, 1, 1, 0),
                &oid!(1, 3, 6, 1, 2, 1, 1, 3, 0),
                &oid!(1, 3, 6, 1, 2, 1, 2, 1, 0),
                &oid!(1, 3, 6, 1, 2, 1, 2, 1, 0),
            ]
        );
        assert_eq!(pdu.varbinds[3].value, Value::EndOfMibView);
    }

    #[tokio::test]
    async fn test_wrong_community_and_unknown_host_time_out() {
        let mock = MockTransport::new().with_agent(addr(), MockAgent::new().community(Version::V2c, "secret"));
        let err = ask(&mock, Version::V2c, Pdu::get_request(1, &[oid!(1, 3)])).await.unwrap_err();
        assert!(matches!(*err, Error::Timeout { .. }));

        let other: SocketAddr = "192.0.2.99:161".parse().unwrap();
        let err = mock
            .exchange(other, 1, Bytes::from_static(b"\x30\x00"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(*err, Error::Timeout { .. }));
        assert_eq!(mock.request_count(), 2);
        assert_eq!(mock.requests_to(other).len(), 1);
    }

    #[tokio::test]
    async fn test_script_runs_before_mib() {
        let mock = MockTransport::new().with_agent(
            addr(),
            agent()
                .then(MockResponse::Timeout)
                .then(MockResponse::Status {
                    status: ErrorStatus::TooBig,
                    index: 0,
                }),
        );
        let get = || Pdu::get_request(9, &[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)]);

        assert!(ask(&mock, Version::V2c, get()).await.is_err());
        let pdu = ask(&mock, Version::V2c, get()).await.unwrap();
        assert_eq!(pdu.error_status_enum(), ErrorStatus::TooBig);
        let pdu = ask(&mock, Version::V2c, get()).await.unwrap();
        assert!(!pdu.is_error());
    }
}
