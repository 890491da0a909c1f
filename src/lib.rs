//! # snmp-fetch
//!
//! Bulk SNMP collection across many hosts at once.
//!
//! Give it a host table and a list of root OIDs; it fetches (GET) or walks
//! (GETNEXT / GETBULK) every root on every host concurrently and hands back
//! one result set per root plus a structured stream of per-host errors.
//!
//! - Root OIDs are validated up front: no root may be a prefix of another,
//!   so every returned binding belongs to exactly one root.
//! - Each host tries its community credentials in order until one answers.
//! - Timeouts, malformed responses and agent error statuses are recorded
//!   per host and never stop other hosts.
//! - Large host tables are split into batches that keep the caller's row
//!   indices, see [`Dispatcher::fetch`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use snmp_fetch::transport::UdpTransport;
//! use snmp_fetch::{Community, Config, Dispatcher, Host, PduKind, RootVarBind, oid};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> snmp_fetch::Result<()> {
//!     let dispatcher = Dispatcher::new(UdpTransport::builder().build().await?);
//!
//!     let hosts: Vec<Host> = (1..=254)
//!         .map(|i| Host::new(i, format!("10.0.0.{i}")).community(Community::v2c("public")))
//!         .collect();
//!     let roots = vec![
//!         RootVarBind::from(oid!(1, 3, 6, 1, 2, 1, 1)),
//!         RootVarBind::from(oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2)),
//!     ];
//!     let config = Config::default().timeout(Duration::from_secs(1));
//!
//!     let dispatched = dispatcher
//!         .dispatch(PduKind::BulkGet, &hosts, roots, Some(&config))
//!         .await?;
//!     println!("{} rows, {} errors", dispatched.row_count(), dispatched.errors.len());
//!     Ok(())
//! }
//! ```

pub mod ber;
pub mod config;
pub mod dispatch;
pub mod distribute;
pub mod error;
pub mod host;
pub mod matcher;
pub mod message;
pub mod oid;
pub mod pdu;
pub mod retry;
pub mod roots;
pub mod transport;
pub mod value;
pub mod varbind;
pub mod version;
pub mod walk;

pub(crate) mod util;

pub use config::Config;
pub use dispatch::{Dispatched, Dispatcher, ResultSet};
pub use distribute::{Batch, BatchPolicy, Distributor, Fetched};
pub use error::{Error, ErrorKind, ErrorStatus, Result, SnmpError};
pub use host::{Community, Host, WalkRange};
pub use matcher::{ResultRow, Verdict};
pub use oid::Oid;
pub use retry::{Backoff, Retry, RetryBuilder};
pub use roots::{RootSet, RootVarBind};
pub use transport::{Transport, UdpTransport};
pub use value::{Value, ValueType};
pub use varbind::VarBind;
pub use version::Version;
pub use walk::PduKind;
