use std::fmt;
use std::sync::Arc;

use rqlink_cluster::{ClusterTracker, TopologySnapshot, TrackerConfig};
use rqlink_common::protocol::error::{Result, RqlinkError};
use rqlink_common::{CallContext, Config, SqlValue, Statement};
use tokio::sync::RwLock;
use tracing::info;

use crate::executor::{Executor, ExecutorStats, OperationKind, Outcome};
use crate::rows::{ExecResult, Rows};
use crate::statement::PreparedStatement;
use crate::transaction::Transaction;

/// A single logical connection to a replicated cluster.
///
/// Writes and reads are routed to the node the cluster currently reports as
/// leader (or, for relaxed reads, the best node known) and transparently
/// rebound after leader changes and node failures.
///
/// The connection can be shared between tasks. Statements run concurrently;
/// [`Connection::reconnect`] and [`Connection::close`] wait for in-flight
/// statements and block new ones while they run.
///
/// # Example
///
/// ```no_run
/// use rqlink_client::Connection;
/// use rqlink_common::{CallContext, SqlValue};
///
/// # async fn demo() -> rqlink_common::Result<()> {
/// let ctx = CallContext::background();
/// let conn = Connection::open_dsn("localhost:4001,localhost:4002?consistency=strong", &ctx).await?;
///
/// conn.execute("CREATE TABLE IF NOT EXISTS kv (k TEXT PRIMARY KEY, v TEXT)", &[], &ctx).await?;
/// conn.execute("INSERT INTO kv(k, v) VALUES(?, ?)", &[SqlValue::from("a"), SqlValue::from("1")], &ctx).await?;
///
/// for row in conn.query("SELECT k, v FROM kv", &[], &ctx).await? {
///     println!("{:?}", row);
/// }
/// conn.close().await;
/// # Ok(())
/// # }
/// ```
pub struct Connection {
    executor: Executor,
    gate: RwLock<()>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("nodes", &self.executor.config().nodes)
            .field("consistency", &self.executor.config().consistency)
            .field("closed", &self.executor.is_closed())
            .finish()
    }
}

impl Connection {
    /// Opens a connection with its own topology tracker.
    pub async fn open(config: Config, ctx: &CallContext) -> Result<Self> {
        let config = Arc::new(config);
        let tracker = Arc::new(ClusterTracker::with_http(&config, TrackerConfig::default()));
        Self::with_tracker(config, tracker, ctx).await
    }

    /// Parses `dsn` and opens a connection.
    pub async fn open_dsn(dsn: &str, ctx: &CallContext) -> Result<Self> {
        Self::open(Config::parse(dsn)?, ctx).await
    }

    /// Opens a connection that shares `tracker` with other connections.
    pub async fn with_tracker(config: Arc<Config>, tracker: Arc<ClusterTracker>, ctx: &CallContext) -> Result<Self> {
        let conn = Self::with_executor(Executor::from_config(config, tracker));
        conn.executor.connect(ctx).await?;
        info!(nodes = ?conn.executor.config().nodes, "Connection opened");
        Ok(conn)
    }

    /// Wraps an executor without connecting; the first statement binds a node.
    pub fn with_executor(executor: Executor) -> Self {
        Self {
            executor,
            gate: RwLock::new(()),
        }
    }

    pub fn config(&self) -> &Config {
        self.executor.config()
    }

    pub fn prepare(&self, sql: impl Into<String>) -> PreparedStatement<'_> {
        PreparedStatement::new(self, sql.into())
    }

    async fn run(&self, kind: OperationKind, statement: Statement, ctx: &CallContext) -> Result<Outcome> {
        let _shared = ctx.run(async { Ok(self.gate.read().await) }).await?;
        self.executor.ensure_connected(ctx).await?;
        self.executor.execute(kind, &statement, ctx).await
    }

    /// Runs a write statement.
    pub async fn execute(&self, sql: &str, args: &[SqlValue], ctx: &CallContext) -> Result<ExecResult> {
        match self.run(OperationKind::Write, Statement::with_args(sql, args.to_vec()), ctx).await? {
            Outcome::Write(result) => Ok(result.into()),
            Outcome::Read(_) => Err(RqlinkError::InvalidResponse("read result for a write".into())),
        }
    }

    /// Runs a read statement.
    pub async fn query(&self, sql: &str, args: &[SqlValue], ctx: &CallContext) -> Result<Rows> {
        match self.run(OperationKind::Read, Statement::with_args(sql, args.to_vec()), ctx).await? {
            Outcome::Read(result) => Ok(result.into()),
            Outcome::Write(_) => Err(RqlinkError::InvalidResponse("write result for a read".into())),
        }
    }

    /// Starts a transaction marker. Statements are still applied one by one.
    pub async fn begin(&self, _ctx: &CallContext) -> Result<Transaction> {
        if self.executor.is_closed() {
            return Err(RqlinkError::Closed);
        }
        Ok(Transaction::new())
    }

    /// Checks that the bound node answers, rebinding once if it does not.
    pub async fn ping(&self, ctx: &CallContext) -> Result<()> {
        let _shared = ctx.run(async { Ok(self.gate.read().await) }).await?;
        self.executor.ping(ctx).await
    }

    /// Drops the current binding and connects again from a fresh view.
    pub async fn reconnect(&self, ctx: &CallContext) -> Result<()> {
        let _exclusive = ctx.run(async { Ok(self.gate.write().await) }).await?;
        if let Err(e) = self.executor.tracker().refresh(true, ctx).await {
            if e.is_caller_abort() {
                return Err(e);
            }
            tracing::warn!(error = %e, "Forced topology refresh failed");
        }
        self.executor.connect(ctx).await
    }

    /// Closes the connection. Closing twice is a no-op.
    pub async fn close(&self) {
        let _exclusive = self.gate.write().await;
        self.executor.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.executor.is_closed()
    }

    pub async fn bound_node(&self) -> Option<String> {
        self.executor.bound_node().await
    }

    pub fn topology(&self) -> TopologySnapshot {
        self.executor.tracker().snapshot()
    }

    pub fn stats(&self) -> ExecutorStats {
        self.executor.stats()
    }

    /// Whether the believed leader answers a liveness query.
    pub async fn is_leader_healthy(&self, ctx: &CallContext) -> bool {
        self.executor.is_leader_healthy(ctx).await
    }
}
