//! Standard test fixtures with realistic MIB data.

use snmp_fetch::transport::{MockAgent, MockTransport};
use snmp_fetch::{Community, Host, Oid, Value, Version, oid};
use std::collections::BTreeMap;
use std::net::SocketAddr;

pub const COMMUNITY: &str = "public";

/// Address of the `n`th simulated agent.
pub fn agent_addr(n: u8) -> SocketAddr {
    SocketAddr::from(([192, 0, 2, n], 161))
}

/// A v2c host pointed at `agent_addr(n)`, with `id` equal to `n`.
pub fn v2c_host(n: u8) -> Host {
    Host::new(u64::from(n), agent_addr(n).to_string()).community(Community::v2c(COMMUNITY))
}

/// 1.3.6.1.2.1.1
pub fn system_subtree() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1)
}

/// Standard system MIB entries (1.3.6.1.2.1.1.1.0 through .7.0).
pub fn system_mib() -> BTreeMap<Oid, Value> {
    let mut data = BTreeMap::new();

    data.insert(
        oid!(1, 3, 6, 1, 2, 1, 1, 1, 0),
        Value::OctetString("Test SNMP Agent".into()),
    );
    data.insert(
        oid!(1, 3, 6, 1, 2, 1, 1, 2, 0),
        Value::ObjectIdentifier(oid!(1, 3, 6, 1, 4, 1, 99999)),
    );
    data.insert(oid!(1, 3, 6, 1, 2, 1, 1, 3, 0), Value::TimeTicks(123456));
    data.insert(
        oid!(1, 3, 6, 1, 2, 1, 1, 4, 0),
        Value::OctetString("admin@test.local".into()),
    );
    data.insert(
        oid!(1, 3, 6, 1, 2, 1, 1, 5, 0),
        Value::OctetString("test-agent".into()),
    );
    data.insert(
        oid!(1, 3, 6, 1, 2, 1, 1, 6, 0),
        Value::OctetString("Test Lab".into()),
    );
    data.insert(oid!(1, 3, 6, 1, 2, 1, 1, 7, 0), Value::Integer(72));

    data
}

/// ifNumber plus the ifIndex and ifDescr columns for `count` interfaces.
pub fn interface_table(count: u32) -> BTreeMap<Oid, Value> {
    let mut data = BTreeMap::new();
    data.insert(oid!(1, 3, 6, 1, 2, 1, 2, 1, 0), Value::Integer(count as i32));
    for i in 1..=count {
        data.insert(oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 1, i), Value::Integer(i as i32));
        data.insert(
            oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2, i),
            Value::OctetString(format!("eth{}", i - 1).into()),
        );
    }
    data
}

/// A v2c agent serving the system MIB, followed by two interfaces so a
/// walk of the system subtree leaves it instead of hitting end-of-MIB.
pub fn system_agent() -> MockAgent {
    MockAgent::new()
        .community(Version::V2c, COMMUNITY)
        .entries(system_mib())
        .entries(interface_table(2))
}

/// A transport with a [`system_agent`] at each of `agent_addr(1..=n)`.
pub fn mock_with_agents(n: u8) -> MockTransport {
    let mock = MockTransport::new();
    for i in 1..=n {
        mock.add_agent(agent_addr(i), system_agent());
    }
    mock
}
