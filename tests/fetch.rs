//! Batched fetches over large host tables.
//!
//! Run with: `cargo test --test fetch`

mod common;

use common::{agent_addr, mock_with_agents, system_agent, system_subtree, v2c_host};
use snmp_fetch::transport::MockTransport;
use snmp_fetch::{BatchPolicy, Config, Dispatcher, Error, ErrorKind, PduKind, Retry, RootVarBind, oid};
use std::time::Duration;

/// Rows `0..n`, where even rows have a listening agent.
fn half_dead(n: u8) -> MockTransport {
    let mock = MockTransport::new();
    for row in (0..n).step_by(2) {
        mock.add_agent(agent_addr(row + 1), system_agent());
    }
    mock
}

#[tokio::test]
async fn test_fetch_reports_original_row_indices() {
    common::init_tracing();
    let dispatcher = Dispatcher::new(half_dead(10));
    let rows = (0..10u8).map(|row| (v2c_host(row + 1), format!("device-{row}")));
    let policy = BatchPolicy::default().batch_size(3).concurrent_batches(2);
    let config = Config::default()
        .retries(Retry::none())
        .timeout(Duration::from_millis(10));

    let fetched = dispatcher
        .fetch(PduKind::Next, rows, vec![RootVarBind::from(system_subtree())], policy, Some(&config))
        .await
        .unwrap();

    let payload: Vec<(usize, String)> = (0..10).map(|row| (row, format!("device-{row}"))).collect();
    assert_eq!(fetched.payload, payload);

    let rows = &fetched.results[0].rows;
    assert_eq!(rows.len(), 5 * 7);
    assert!(rows.windows(2).all(|w| w[0].host_index <= w[1].host_index));
    assert!(rows.iter().all(|r| r.host_index % 2 == 0));

    let failed: Vec<usize> = fetched.errors.iter().map(|e| e.host_index).collect();
    assert_eq!(failed, vec![1, 3, 5, 7, 9]);
    for error in &fetched.errors {
        assert_eq!(error.kind, ErrorKind::ConfigError);
        // host ids are carried through untouched
        assert_eq!(error.host_id, error.host_index as u64 + 1);
    }
}

#[tokio::test]
async fn test_fetch_matches_single_dispatch() {
    let mock = mock_with_agents(7);
    let dispatcher = Dispatcher::new(mock);
    let hosts: Vec<_> = (1..=7).map(v2c_host).collect();
    let roots = vec![RootVarBind::from(system_subtree()), RootVarBind::from(oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 1))];

    let dispatched = dispatcher
        .dispatch(PduKind::BulkGet, &hosts, roots.clone(), None)
        .await
        .unwrap();
    let fetched = dispatcher
        .fetch(
            PduKind::BulkGet,
            hosts.into_iter().map(|h| (h, ())),
            roots,
            BatchPolicy::default().batch_size(2),
            None,
        )
        .await
        .unwrap();

    assert_eq!(fetched.into_dispatched(), dispatched);
}

#[tokio::test]
async fn test_fetch_rejects_ambiguous_roots() {
    let mock = mock_with_agents(1);
    let dispatcher = Dispatcher::new(mock.clone());
    let roots = vec![RootVarBind::from(system_subtree()), RootVarBind::from(oid!(1, 3, 6, 1, 2, 1, 1, 3))];

    let err = dispatcher
        .fetch(
            PduKind::Get,
            std::iter::once((v2c_host(1), ())),
            roots,
            BatchPolicy::default(),
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(*err, Error::AmbiguousRoot { .. }));
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn test_fetch_empty_table() {
    let dispatcher = Dispatcher::new(MockTransport::new());

    let fetched = dispatcher
        .fetch(
            PduKind::Get,
            std::iter::empty::<(snmp_fetch::Host, u32)>(),
            vec![RootVarBind::from(system_subtree())],
            BatchPolicy::default(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(fetched.results.len(), 1);
    assert!(fetched.results[0].is_empty());
    assert!(fetched.errors.is_empty());
    assert!(fetched.payload.is_empty());
}
