//! The remote execution seam.
//!
//! The executor only talks to nodes through [`Connector`] and [`SqlHandle`],
//! so the retry and rebind logic can be driven by scripted handles in tests.
//! [`RqliteConnector`] is the HTTP implementation used in production.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rqlink_common::protocol::error::{Result, RqlinkError};
use rqlink_common::protocol::results::ResponseEnvelope;
use rqlink_common::transport::{HttpResponse, HttpTransport};
use rqlink_common::{CallContext, ConsistencyLevel, QueryResult, Statement, WriteResult};
use tracing::debug;

/// Liveness query run against a node before it is bound.
pub const LIVENESS_QUERY: &str = "SELECT 1";

/// A connection bound to exactly one node.
#[async_trait]
pub trait SqlHandle: Send + Sync {
    fn node(&self) -> &str;

    async fn execute(&self, statement: &Statement, ctx: &CallContext) -> Result<WriteResult>;

    async fn query(&self, statement: &Statement, ctx: &CallContext) -> Result<QueryResult>;

    /// Runs the liveness query.
    async fn ping(&self, ctx: &CallContext) -> Result<()> {
        self.query(&Statement::new(LIVENESS_QUERY), ctx).await.map(|_| ())
    }

    async fn close(&self);
}

/// Opens handles to nodes.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a handle to `node` and checks that it answers the liveness query.
    async fn open(&self, node: &str, ctx: &CallContext) -> Result<Arc<dyn SqlHandle>>;
}

/// Connects to rqlite nodes over HTTP.
#[derive(Debug, Clone)]
pub struct RqliteConnector {
    transport: HttpTransport,
    level: ConsistencyLevel,
}

impl RqliteConnector {
    pub fn new(transport: HttpTransport, level: ConsistencyLevel) -> Self {
        Self { transport, level }
    }
}

#[async_trait]
impl Connector for RqliteConnector {
    async fn open(&self, node: &str, ctx: &CallContext) -> Result<Arc<dyn SqlHandle>> {
        let handle = RqliteHandle {
            node: node.to_string(),
            transport: self.transport.clone(),
            level: self.level,
            closed: AtomicBool::new(false),
        };
        handle.ping(ctx).await?;
        debug!(node, "Node answered liveness query");
        Ok(Arc::new(handle))
    }
}

/// HTTP handle for one rqlite node.
#[derive(Debug)]
pub struct RqliteHandle {
    node: String,
    transport: HttpTransport,
    level: ConsistencyLevel,
    closed: AtomicBool,
}

impl RqliteHandle {
    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(RqlinkError::Closed);
        }
        Ok(())
    }

    fn decode(&self, response: HttpResponse) -> Result<ResponseEnvelope> {
        if !response.is_success() {
            return Err(RqlinkError::HttpStatus {
                node: self.node.clone(),
                status: response.status,
                body: response.body_text(),
            });
        }
        ResponseEnvelope::from_slice(&response.body)
    }
}

#[async_trait]
impl SqlHandle for RqliteHandle {
    fn node(&self) -> &str {
        &self.node
    }

    async fn execute(&self, statement: &Statement, ctx: &CallContext) -> Result<WriteResult> {
        self.check_open()?;
        let url = format!("{}/db/execute", self.node);
        let response = self.transport.post_json(&url, &statement.to_request_body(), ctx).await?;
        self.decode(response)?.into_write_result()
    }

    async fn query(&self, statement: &Statement, ctx: &CallContext) -> Result<QueryResult> {
        self.check_open()?;
        let url = format!("{}/db/query?level={}", self.node, self.level);
        let response = self.transport.post_json(&url, &statement.to_request_body(), ctx).await?;
        self.decode(response)?.into_query_result()
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
