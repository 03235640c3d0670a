//! # rqlink
//!
//! Leader-aware client for rqlite-style replicated SQL clusters.
//!
//! A [`Connection`] presents the whole cluster as one logical connection: it
//! discovers the leader through `/status` probes, routes statements by the
//! requested [`ConsistencyLevel`], and rebinds to the new leader when the
//! bound node fails or loses leadership.
//!
//! ```no_run
//! use rqlink::{CallContext, Connection};
//!
//! # async fn demo() -> rqlink::Result<()> {
//! let ctx = CallContext::background();
//! let conn = Connection::open_dsn("user:pass@host1:4001,host2:4001?consistency=strong", &ctx).await?;
//! let result = conn.execute("INSERT INTO t(v) VALUES(?)", &[7.into()], &ctx).await?;
//! println!("inserted row {}", result.last_insert_id());
//! # Ok(())
//! # }
//! ```

pub use rqlink_client::{
    Connection, Connector, ExecResult, Executor, ExecutorState, ExecutorStats, PreparedStatement, RetryPolicy,
    Rows, RqliteConnector, SqlHandle, Transaction,
};
pub use rqlink_cluster::{ClusterTracker, HttpStatusProber, StatusProber, TopologySnapshot, TrackerConfig};
pub use rqlink_common::{
    CallContext, Config, ConsistencyLevel, Credentials, Result, RqlinkError, SqlValue, Statement,
};
