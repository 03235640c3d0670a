//! rqlink Common Types and Transport
//!
//! Shared building blocks for the rqlink cluster-aware rqlite driver.
//!
//! # Overview
//!
//! Every other rqlink crate depends on this one for:
//!
//! - **Configuration**: connection string parsing into an immutable [`Config`]
//! - **Call contexts**: caller deadlines and cancellation via [`CallContext`]
//! - **Protocol**: rqlite status documents, statements, results and the
//!   driver-wide [`RqlinkError`]
//! - **Transport**: a small HTTP client over hyper with Basic auth and
//!   per-request timeouts
//!
//! # Example
//!
//! ```
//! use rqlink_common::{Config, ConsistencyLevel};
//!
//! let config = Config::parse("localhost:4001,localhost:4002?consistency=strong").unwrap();
//! assert_eq!(config.consistency, ConsistencyLevel::Strong);
//! ```

pub mod config;
pub mod context;
pub mod protocol;
pub mod transport;

pub use config::{Config, ConsistencyLevel, Credentials};
pub use context::CallContext;
pub use protocol::*;
