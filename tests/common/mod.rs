//! Shared test infrastructure for snmp-fetch.
//!
//! Provides MIB fixtures, host builders and mock-agent helpers.

// Not every test file uses every helper
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fixtures;

pub use fixtures::{
    COMMUNITY, agent_addr, interface_table, mock_with_agents, system_agent, system_mib,
    system_subtree, v2c_host,
};

/// Install a test subscriber once; `RUST_LOG` filters it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
