use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use rqlink_cluster::ClusterTracker;
use rqlink_common::protocol::error::{Result, RqlinkError};
use rqlink_common::transport::HttpTransport;
use rqlink_common::{CallContext, Config, QueryResult, Statement, WriteResult};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::service::{Connector, RqliteConnector, SqlHandle};

/// Lifecycle of the executor's node binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Write,
    Read,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Write(WriteResult),
    Read(QueryResult),
}

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per operation, the first one included.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

/// Counters observable through [`Executor::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutorStats {
    /// Operation attempts, retries included.
    pub attempts: u64,
    /// Rebinds performed after a failed attempt or ping.
    pub reconnects: u64,
    /// Successful bindings to a node.
    pub connects: u64,
}

struct Slot {
    handle: Option<Arc<dyn SqlHandle>>,
    state: ExecutorState,
}

fn same_handle(a: &Arc<dyn SqlHandle>, b: &Arc<dyn SqlHandle>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// Runs operations against the bound node, rebinding after node failures.
///
/// At most one handle is live at a time. Rebinds take the slot exclusively;
/// operations only hold it long enough to clone the current handle.
pub struct Executor {
    config: Arc<Config>,
    tracker: Arc<ClusterTracker>,
    connector: Arc<dyn Connector>,
    policy: RetryPolicy,
    slot: RwLock<Slot>,
    closed: AtomicBool,
    attempts: AtomicU64,
    reconnects: AtomicU64,
    connects: AtomicU64,
}

impl Executor {
    pub fn new(config: Arc<Config>, tracker: Arc<ClusterTracker>, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            tracker,
            connector,
            policy: RetryPolicy::default(),
            slot: RwLock::new(Slot {
                handle: None,
                state: ExecutorState::Disconnected,
            }),
            closed: AtomicBool::new(false),
            attempts: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
            connects: AtomicU64::new(0),
        }
    }

    /// Executor that talks HTTP to the configured cluster.
    pub fn from_config(config: Arc<Config>, tracker: Arc<ClusterTracker>) -> Self {
        let connector = RqliteConnector::new(HttpTransport::from_config(&config), config.consistency);
        Self::new(config, tracker, Arc::new(connector))
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn tracker(&self) -> &Arc<ClusterTracker> {
        &self.tracker
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(RqlinkError::Closed);
        }
        Ok(())
    }

    pub async fn state(&self) -> ExecutorState {
        self.slot.read().await.state
    }

    pub async fn bound_node(&self) -> Option<String> {
        self.slot.read().await.handle.as_ref().map(|h| h.node().to_string())
    }

    pub async fn has_handle(&self) -> bool {
        self.slot.read().await.handle.is_some()
    }

    pub fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            attempts: self.attempts.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            connects: self.connects.load(Ordering::Relaxed),
        }
    }

    /// Binds to the best available node, replacing any current handle.
    pub async fn connect(&self, ctx: &CallContext) -> Result<()> {
        self.ensure_open()?;
        let mut slot = self.slot.write().await;
        self.ensure_open()?;
        self.connect_locked(&mut slot, ctx, ExecutorState::Connecting, true).await
    }

    /// Binds only when no handle is live.
    pub async fn ensure_connected(&self, ctx: &CallContext) -> Result<()> {
        self.ensure_open()?;
        if self.has_handle().await {
            return Ok(());
        }
        let mut slot = self.slot.write().await;
        self.ensure_open()?;
        if slot.handle.is_some() {
            return Ok(());
        }
        self.connect_locked(&mut slot, ctx, ExecutorState::Connecting, true).await
    }

    fn connect_candidates(&self) -> Vec<String> {
        let mut candidates: Vec<String> = Vec::new();
        let preferred = self.tracker.select_node(self.config.consistency);
        let known = self.tracker.all_known_nodes();
        for node in preferred.into_iter().chain(known).chain(self.config.nodes.iter().cloned()) {
            if !candidates.contains(&node) {
                candidates.push(node);
            }
        }
        candidates
    }

    /// Closes the current handle, then dials a replacement.
    ///
    /// The old handle is closed before any node is dialed, so at most one
    /// handle is ever live. A failed dial leaves the slot empty and the next
    /// statement binds lazily. Operations still holding the old handle see
    /// `Closed` and move to the new binding.
    async fn connect_locked(
        &self,
        slot: &mut Slot,
        ctx: &CallContext,
        transition: ExecutorState,
        refresh: bool,
    ) -> Result<()> {
        slot.state = transition;
        if let Some(old) = slot.handle.take() {
            old.close().await;
        }

        match self.dial(ctx, refresh).await {
            Ok(handle) => {
                self.connects.fetch_add(1, Ordering::Relaxed);
                info!(node = handle.node(), "Bound to node");
                slot.handle = Some(handle);
                slot.state = ExecutorState::Connected;
                Ok(())
            }
            Err(e) => {
                slot.state = ExecutorState::Disconnected;
                Err(e)
            }
        }
    }

    /// Finds the first candidate that accepts a connection.
    ///
    /// `refresh` runs a throttled topology refresh first. Rebinds pass
    /// `false` since they have just forced one.
    async fn dial(&self, ctx: &CallContext, refresh: bool) -> Result<Arc<dyn SqlHandle>> {
        if refresh {
            if let Err(e) = self.tracker.refresh(false, ctx).await {
                if e.is_caller_abort() {
                    return Err(e);
                }
                warn!(error = %e, "Topology refresh failed, using last known view");
            }
        }

        let mut last_node = None;
        let mut last_reason = String::from("no nodes available");

        for node in self.connect_candidates() {
            ctx.check()?;
            let attempt_ctx = ctx.child_with_timeout(self.config.timeout);
            match self.connector.open(&node, &attempt_ctx).await {
                Ok(handle) => return Ok(handle),
                Err(e) => {
                    ctx.check()?;
                    debug!(node = %node, error = %e, "Node rejected connection");
                    last_reason = e.to_string();
                    last_node = Some(node);
                }
            }
        }

        Err(RqlinkError::ConnectFailure {
            last_node,
            reason: last_reason,
        })
    }

    /// Replaces `failed` with a fresh binding, unless another caller already did.
    async fn rebind(&self, failed: &Arc<dyn SqlHandle>, ctx: &CallContext) -> Result<Arc<dyn SqlHandle>> {
        let mut slot = self.slot.write().await;
        self.ensure_open()?;

        if let Some(current) = &slot.handle {
            if !same_handle(current, failed) {
                debug!(node = current.node(), "Reusing binding from concurrent rebind");
                return Ok(current.clone());
            }
        }

        if let Err(e) = self.tracker.refresh(true, ctx).await {
            if e.is_caller_abort() {
                return Err(e);
            }
            warn!(error = %e, "Forced topology refresh failed");
        }

        self.reconnects.fetch_add(1, Ordering::Relaxed);
        self.connect_locked(&mut slot, ctx, ExecutorState::Reconnecting, false).await?;
        slot.handle.clone().ok_or(RqlinkError::NotConnected)
    }

    /// The handle that replaced `stale`, once any rebind in progress is done.
    async fn replacement(&self, stale: &Arc<dyn SqlHandle>) -> Result<Arc<dyn SqlHandle>> {
        let slot = self.slot.read().await;
        self.ensure_open()?;
        match &slot.handle {
            Some(current) if !same_handle(current, stale) => Ok(current.clone()),
            _ => Err(RqlinkError::NotConnected),
        }
    }

    /// Runs one operation against the bound node.
    ///
    /// Node-level failures trigger a forced topology refresh and a rebind
    /// before the next attempt. A failed rebind ends the operation at once.
    pub async fn execute(&self, kind: OperationKind, statement: &Statement, ctx: &CallContext) -> Result<Outcome> {
        self.ensure_open()?;
        let mut handle = self
            .slot
            .read()
            .await
            .handle
            .clone()
            .ok_or(RqlinkError::NotConnected)?;

        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let result = match kind {
                OperationKind::Write => handle.execute(statement, ctx).await.map(Outcome::Write),
                OperationKind::Read => handle.query(statement, ctx).await.map(Outcome::Read),
            };

            // A concurrent rebind closed our handle before the request left.
            if matches!(result, Err(RqlinkError::Closed)) && !self.is_closed() {
                debug!(node = handle.node(), "Handle superseded by a concurrent rebind");
                handle = self.replacement(&handle).await?;
                continue;
            }

            attempt += 1;
            self.attempts.fetch_add(1, Ordering::Relaxed);

            let error = match result {
                Ok(outcome) => return Ok(outcome),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };

            if attempt >= max_attempts {
                warn!(node = handle.node(), attempts = attempt, error = %error, "Giving up");
                return Err(RqlinkError::RetriesExhausted {
                    attempts: attempt,
                    last_node: handle.node().to_string(),
                    source: Box::new(error),
                });
            }

            warn!(node = handle.node(), attempt, error = %error, "Attempt failed, rebinding");
            handle = self.rebind(&handle, ctx).await?;
        }
    }

    /// Checks the bound node; on failure rebinds once and reports that result.
    pub async fn ping(&self, ctx: &CallContext) -> Result<()> {
        self.ensure_open()?;
        let current = self.slot.read().await.handle.clone();
        let Some(handle) = current else {
            return self.ensure_connected(ctx).await;
        };

        match handle.ping(ctx).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_caller_abort() => Err(e),
            Err(e) => {
                warn!(node = handle.node(), error = %e, "Ping failed, rebinding");
                self.rebind(&handle, ctx).await.map(|_| ())
            }
        }
    }

    /// Whether the node currently believed to be leader answers a liveness
    /// query. Uses a temporary handle and leaves the binding alone.
    pub async fn is_leader_healthy(&self, ctx: &CallContext) -> bool {
        if self.ensure_open().is_err() {
            return false;
        }
        if let Err(e) = self.tracker.refresh(false, ctx).await {
            debug!(error = %e, "Refresh before leader health check failed");
        }
        let Some(leader) = self.tracker.current_leader() else {
            return false;
        };

        let check_ctx = ctx.child_with_timeout(self.config.timeout);
        match self.connector.open(&leader, &check_ctx).await {
            Ok(handle) => {
                handle.close().await;
                true
            }
            Err(e) => {
                debug!(leader = %leader, error = %e, "Leader health check failed");
                false
            }
        }
    }

    /// Releases the handle. Every later call fails with `Closed`.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut slot = self.slot.write().await;
        if let Some(handle) = slot.handle.take() {
            handle.close().await;
        }
        slot.state = ExecutorState::Closed;
        debug!("Executor closed");
    }
}
