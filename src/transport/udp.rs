//! Shared-socket UDP transport.
//!
//! A collector talks to thousands of hosts at once, so every exchange goes
//! through a single unconnected socket. A background task reads every
//! datagram, pulls out the request ID and hands the payload to whichever
//! exchange registered that ID.

use super::{Transport, extract_request_id};
use crate::error::{Error, Result};
use crate::util::bind_udp_socket;
use bytes::Bytes;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::oneshot;

/// Largest datagram the receive loop accepts.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 65535;

/// UDP transport shared by every host of a dispatch.
///
/// Cloning is cheap. The receive task stops once the last clone is dropped.
///
/// ```rust,no_run
/// use snmp_fetch::transport::UdpTransport;
///
/// # async fn example() -> snmp_fetch::Result<()> {
/// let transport = UdpTransport::builder().bind("0.0.0.0:0").build().await?;
/// println!("collecting from {}", transport.local_addr());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct UdpTransport {
    inner: Arc<Inner>,
}

struct Inner {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    pending: Arc<PendingMap>,
    next_request_id: AtomicI32,
    // Dropping this ends the receive task.
    _shutdown: oneshot::Sender<()>,
}

struct PendingRequest {
    target: SocketAddr,
    sender: oneshot::Sender<Bytes>,
    deadline: Instant,
}

#[derive(Default)]
struct PendingMap(Mutex<HashMap<i32, PendingRequest>>);

impl PendingMap {
    fn lock(&self) -> MutexGuard<'_, HashMap<i32, PendingRequest>> {
        // The map stays consistent even if a holder panicked.
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone, Debug)]
struct UdpConfig {
    warn_on_source_mismatch: bool,
    max_message_size: usize,
}

impl UdpTransport {
    pub fn builder() -> UdpTransportBuilder {
        UdpTransportBuilder::new()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    /// Number of exchanges currently waiting for a response.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().len()
    }

    fn start_recv_loop(
        socket: Arc<UdpSocket>,
        pending: Arc<PendingMap>,
        config: UdpConfig,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        tokio::spawn(async move {
            let mut buf = vec![0u8; config.max_message_size];

            loop {
                let received = tokio::select! {
                    _ = &mut shutdown => break,
                    received = socket.recv_from(&mut buf) => received,
                };

                match received {
                    Ok((len, source)) => {
                        let data = Bytes::copy_from_slice(&buf[..len]);
                        deliver(&pending, &config, data, source);
                    }
                    Err(e) => {
                        // ICMP unreachable and friends surface here; keep serving other hosts.
                        tracing::debug!(target: "snmp_fetch::transport::udp", error = %e, "recv error");
                    }
                }

                let now = Instant::now();
                pending.lock().retain(|_, p| p.deadline > now);
            }

            tracing::debug!(target: "snmp_fetch::transport::udp", "receive loop stopped");
        });
    }
}

fn deliver(pending: &PendingMap, config: &UdpConfig, data: Bytes, source: SocketAddr) {
    let Some(request_id) = extract_request_id(&data) else {
        tracing::debug!(target: "snmp_fetch::transport::udp", { snmp.source = %source, snmp.bytes = data.len() }, "dropping datagram without request ID");
        return;
    };

    let Some(waiter) = pending.lock().remove(&request_id) else {
        tracing::debug!(target: "snmp_fetch::transport::udp", { snmp.source = %source, snmp.request_id = request_id }, "response for unknown request ID");
        return;
    };

    if config.warn_on_source_mismatch && source != waiter.target {
        tracing::warn!(target: "snmp_fetch::transport::udp", { snmp.request_id = request_id, snmp.target = %waiter.target, snmp.source = %source }, "response source address mismatch");
    }
    tracing::trace!(target: "snmp_fetch::transport::udp", { snmp.source = %source, snmp.request_id = request_id, snmp.bytes = data.len() }, "response received");

    // The exchange may have timed out already.
    let _ = waiter.sender.send(data);
}

impl Transport for UdpTransport {
    async fn exchange(
        &self,
        target: SocketAddr,
        request_id: i32,
        request: Bytes,
        timeout: Duration,
    ) -> Result<Bytes> {
        let (tx, rx) = oneshot::channel();

        // Register before sending so a fast agent cannot beat us.
        self.inner.pending.lock().insert(
            request_id,
            PendingRequest {
                target,
                sender: tx,
                deadline: Instant::now() + timeout,
            },
        );

        tracing::trace!(target: "snmp_fetch::transport::udp", { snmp.target = %target, snmp.request_id = request_id, snmp.bytes = request.len() }, "sending request");
        if let Err(source) = self.inner.socket.send_to(&request, target).await {
            self.inner.pending.lock().remove(&request_id);
            return Err(Error::Network { target, source }.boxed());
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(data)) => Ok(data),
            Ok(Err(_)) | Err(_) => {
                self.inner.pending.lock().remove(&request_id);
                tracing::trace!(target: "snmp_fetch::transport::udp", { snmp.target = %target, snmp.request_id = request_id }, "timed out");
                Err(Error::Timeout {
                    target,
                    elapsed: timeout,
                    retries: 0,
                }
                .boxed())
            }
        }
    }

    fn alloc_request_id(&self) -> i32 {
        let id = self.inner.next_request_id.fetch_add(1, Ordering::Relaxed);
        // Keep IDs positive; some agents mishandle negative request IDs.
        if id <= 0 {
            self.inner.next_request_id.store(2, Ordering::Relaxed);
            return 1;
        }
        id
    }
}

/// Builder for [`UdpTransport`].
#[derive(Debug)]
pub struct UdpTransportBuilder {
    bind_addr: String,
    config: UdpConfig,
}

impl UdpTransportBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "0.0.0.0:0".into(),
            config: UdpConfig {
                warn_on_source_mismatch: true,
                max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            },
        }
    }

    /// Local bind address (default `0.0.0.0:0`).
    ///
    /// The socket only reaches hosts of the same address family.
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    /// Log a warning when a response arrives from an address other than the
    /// one the request went to (default: true).
    pub fn warn_on_source_mismatch(mut self, warn: bool) -> Self {
        self.config.warn_on_source_mismatch = warn;
        self
    }

    pub fn max_message_size(mut self, size: usize) -> Self {
        self.config.max_message_size = size;
        self
    }

    /// Bind the socket and start the receive task.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn build(self) -> Result<UdpTransport> {
        let bind_addr: SocketAddr = self.bind_addr.parse().map_err(|_| {
            Error::Config(format!("invalid bind address: {}", self.bind_addr).into()).boxed()
        })?;

        let socket = bind_udp_socket(bind_addr).await.map_err(|source| {
            Error::Network {
                target: bind_addr,
                source,
            }
            .boxed()
        })?;
        let local_addr = socket.local_addr().map_err(|source| {
            Error::Network {
                target: bind_addr,
                source,
            }
            .boxed()
        })?;

        // Differ from a previous incarnation bound to the same port.
        let initial_request_id = {
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as i32)
                .unwrap_or(1)
                .wrapping_abs()
                .max(1)
        };

        tracing::debug!(target: "snmp_fetch::transport::udp", { snmp.local_addr = %local_addr, snmp.initial_request_id = initial_request_id }, "UDP transport bound");

        let socket = Arc::new(socket);
        let pending = Arc::new(PendingMap::default());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        UdpTransport::start_recv_loop(socket.clone(), pending.clone(), self.config, shutdown_rx);

        Ok(UdpTransport {
            inner: Arc::new(Inner {
                socket,
                local_addr,
                pending,
                next_request_id: AtomicI32::new(initial_request_id),
                _shutdown: shutdown_tx,
            }),
        })
    }
}

impl Default for UdpTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::CommunityMessage;
    use crate::pdu::Pdu;
    use crate::version::Version;
    use crate::{ErrorStatus, oid};

    async fn local_transport() -> UdpTransport {
        UdpTransport::builder()
            .bind("127.0.0.1:0")
            .build()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_request_ids_are_positive_and_distinct() {
        let transport = local_transport().await;
        let a = transport.alloc_request_id();
        let b = transport.alloc_request_id();
        assert!(a > 0 && b > 0);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_exchange_correlates_by_request_id() {
        let transport = local_transport().await;
        let agent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let agent_addr = agent.local_addr().unwrap();

        let responder = tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            let (len, from) = agent.recv_from(&mut buf).await.unwrap();
            let request = CommunityMessage::decode(Bytes::copy_from_slice(&buf[..len])).unwrap();
            let id = request.pdu.request_id;

            // a stray answer for another request is ignored
            let stray = CommunityMessage::new(
                Version::V2c,
                b"public".as_slice(),
                Pdu::response(id.wrapping_add(1000), ErrorStatus::NoError, 0, Vec::new()),
            );
            agent.send_to(&stray.encode(), from).await.unwrap();

            let answer = CommunityMessage::new(
                Version::V2c,
                b"public".as_slice(),
                Pdu::response(id, ErrorStatus::NoError, 0, Vec::new()),
            );
            agent.send_to(&answer.encode(), from).await.unwrap();
        });

        let id = transport.alloc_request_id();
        let request = CommunityMessage::new(
            Version::V2c,
            b"public".as_slice(),
            Pdu::get_request(id, &[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)]),
        )
        .encode();

        let data = transport
            .exchange(agent_addr, id, request, Duration::from_secs(2))
            .await
            .unwrap();
        let response = CommunityMessage::decode(data).unwrap();
        assert_eq!(response.pdu.request_id, id);
        assert_eq!(transport.pending_count(), 0);
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_exchange_times_out() {
        let transport = local_transport().await;
        // bound but silent
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = silent.local_addr().unwrap();

        let id = transport.alloc_request_id();
        let err = transport
            .exchange(target, id, Bytes::from_static(b"\x30\x00"), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(*err, Error::Timeout { target: t, .. } if t == target));
        assert_eq!(transport.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_bind_address() {
        let err = UdpTransport::builder().bind("nope").build().await.err().unwrap();
        assert!(matches!(*err, Error::Config(_)));
    }
}
