//! Scripted collaborators shared by the unit tests of this crate.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rqlink_cluster::{ClusterTracker, StatusProber, TrackerConfig};
use rqlink_common::protocol::status::ClusterStatus;
use rqlink_common::{
    CallContext, Config, QueryResult, Result, RqlinkError, SqlValue, Statement, WriteResult,
};

use crate::service::{Connector, SqlHandle};

/// Reports leaders from a queue, repeating the last one once it runs dry.
pub struct SequenceProber {
    queue: Mutex<VecDeque<String>>,
    last: Mutex<Option<String>>,
    pub probes: AtomicUsize,
}

impl SequenceProber {
    pub fn new(leaders: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(leaders.iter().map(|l| l.to_string()).collect()),
            last: Mutex::new(None),
            probes: AtomicUsize::new(0),
        })
    }

    pub fn push(&self, leader: &str) {
        self.queue.lock().unwrap().push_back(leader.to_string());
    }
}

#[async_trait]
impl StatusProber for SequenceProber {
    async fn probe(&self, node: &str, _ctx: &CallContext) -> Result<ClusterStatus> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let next = self.queue.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(leader) = next {
            *last = Some(leader);
        }
        match last.clone() {
            Some(leader) => Ok(ClusterStatus { leader, peers: Vec::new() }),
            None => Err(RqlinkError::ProbeUnreachable {
                node: node.to_string(),
                reason: "scripted outage".into(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NodeScript {
    pub unreachable: bool,
    /// Number of upcoming operations that fail with a lost-leadership error.
    pub leadership_failures: usize,
    /// Every operation fails with this SQL error.
    pub sql_error: Option<String>,
    /// Operations never complete.
    pub hang: bool,
    /// Operations wait this long before touching the handle.
    pub delay: Option<Duration>,
}

/// In-memory cluster of scripted nodes.
#[derive(Default)]
pub struct FakeCluster {
    nodes: Mutex<HashMap<String, NodeScript>>,
    pub opens: AtomicUsize,
    operations: Mutex<Vec<String>>,
    handles: Mutex<Vec<Arc<FakeHandle>>>,
    max_live_at_open: AtomicUsize,
}

impl FakeCluster {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, node: &str, script: NodeScript) {
        self.nodes.lock().unwrap().insert(node.to_string(), script);
    }

    /// Nodes that served an operation, in order.
    pub fn operations(&self) -> Vec<String> {
        self.operations.lock().unwrap().clone()
    }

    /// Every handle successfully opened, in order.
    pub fn handles(&self) -> Vec<Arc<FakeHandle>> {
        self.handles.lock().unwrap().clone()
    }

    /// Most handles that were still open when another one was dialed.
    pub fn max_live_at_open(&self) -> usize {
        self.max_live_at_open.load(Ordering::SeqCst)
    }

    fn get(&self, node: &str) -> NodeScript {
        self.nodes.lock().unwrap().get(node).cloned().unwrap_or_default()
    }

    async fn run_op(&self, node: &str, ctx: &CallContext) -> Result<()> {
        self.operations.lock().unwrap().push(node.to_string());
        let script = self.get(node);
        if script.hang {
            return ctx.run(std::future::pending::<Result<()>>()).await;
        }
        if script.unreachable {
            return Err(RqlinkError::Transport(format!("connection to {} refused", node)));
        }
        if let Some(message) = script.sql_error {
            return Err(RqlinkError::Statement(message));
        }
        let mut nodes = self.nodes.lock().unwrap();
        if let Some(entry) = nodes.get_mut(node) {
            if entry.leadership_failures > 0 {
                entry.leadership_failures -= 1;
                return Err(RqlinkError::Statement("not leader".into()));
            }
        }
        Ok(())
    }
}

pub struct FakeHandle {
    node: String,
    cluster: Arc<FakeCluster>,
    closed: AtomicBool,
    closes: AtomicUsize,
}

impl FakeHandle {
    pub fn node_addr(&self) -> &str {
        &self.node
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    async fn begin_op(&self) -> Result<()> {
        if let Some(delay) = self.cluster.get(&self.node).delay {
            tokio::time::sleep(delay).await;
        }
        if self.is_closed() {
            return Err(RqlinkError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl SqlHandle for FakeHandle {
    fn node(&self) -> &str {
        &self.node
    }

    async fn execute(&self, _statement: &Statement, ctx: &CallContext) -> Result<WriteResult> {
        self.begin_op().await?;
        self.cluster.run_op(&self.node, ctx).await?;
        Ok(WriteResult { last_insert_id: 1, rows_affected: 1 })
    }

    async fn query(&self, _statement: &Statement, ctx: &CallContext) -> Result<QueryResult> {
        self.begin_op().await?;
        self.cluster.run_op(&self.node, ctx).await?;
        Ok(QueryResult {
            columns: vec!["node".into()],
            types: vec!["text".into()],
            rows: vec![vec![SqlValue::Text(self.node.clone())]],
        })
    }

    async fn ping(&self, _ctx: &CallContext) -> Result<()> {
        if self.is_closed() {
            return Err(RqlinkError::Closed);
        }
        if self.cluster.get(&self.node).unreachable {
            return Err(RqlinkError::Transport(format!("connection to {} refused", self.node)));
        }
        Ok(())
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
    }
}

pub struct FakeConnector {
    pub cluster: Arc<FakeCluster>,
}

#[async_trait]
impl Connector for FakeConnector {
    async fn open(&self, node: &str, ctx: &CallContext) -> Result<Arc<dyn SqlHandle>> {
        self.cluster.opens.fetch_add(1, Ordering::SeqCst);
        let live = self.cluster.handles().iter().filter(|h| !h.is_closed()).count();
        self.cluster.max_live_at_open.fetch_max(live, Ordering::SeqCst);

        let handle = Arc::new(FakeHandle {
            node: node.to_string(),
            cluster: self.cluster.clone(),
            closed: AtomicBool::new(false),
            closes: AtomicUsize::new(0),
        });
        handle.ping(ctx).await?;
        self.cluster.handles.lock().unwrap().push(handle.clone());
        Ok(handle as Arc<dyn SqlHandle>)
    }
}

pub fn config(nodes: &[&str]) -> Arc<Config> {
    Arc::new(Config::new(nodes.iter().copied()).with_timeout(Duration::from_secs(2)))
}

pub fn tracker(config: &Config, prober: Arc<SequenceProber>) -> Arc<ClusterTracker> {
    Arc::new(ClusterTracker::new(
        config.nodes.clone(),
        prober,
        TrackerConfig {
            refresh_interval: Duration::from_secs(30),
            probe_timeout: Duration::from_millis(200),
        },
    ))
}
