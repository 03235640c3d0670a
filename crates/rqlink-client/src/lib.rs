//! Resilient, leader-aware SQL connection for rqlink.
//!
//! [`Connection`] is the entry point. Underneath it, the [`Executor`] binds to
//! one node at a time through the [`Connector`] seam and retries node-level
//! failures by refreshing the cluster topology and rebinding.

pub mod connection;
pub mod executor;
pub mod rows;
pub mod service;
pub mod statement;
pub mod transaction;

#[cfg(test)]
mod test_support;

pub use connection::Connection;
pub use executor::{Executor, ExecutorState, ExecutorStats, OperationKind, Outcome, RetryPolicy};
pub use rows::{ExecResult, Rows};
pub use service::{Connector, RqliteConnector, RqliteHandle, SqlHandle};
pub use statement::PreparedStatement;
pub use transaction::Transaction;
