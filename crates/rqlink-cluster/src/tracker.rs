use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use rqlink_common::protocol::error::{Result, RqlinkError};
use rqlink_common::transport::HttpTransport;
use rqlink_common::{CallContext, Config, ConsistencyLevel};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::prober::{HttpStatusProber, StatusProber};
use crate::view::{ClusterView, TopologySnapshot};

/// Topology tracking configuration.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Minimum age of the view before a non-forced refresh probes again.
    pub refresh_interval: Duration,
    /// Upper bound for a single status probe.
    pub probe_timeout: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(10),
        }
    }
}

/// Keeps a live view of the cluster's leader and peers.
///
/// Reads never wait on network I/O. Refreshes are serialized by an async gate
/// so at most one probe loop runs at a time; the view itself is only locked
/// for in-memory reads and the final swap.
pub struct ClusterTracker {
    view: RwLock<ClusterView>,
    refresh_gate: Mutex<()>,
    prober: Arc<dyn StatusProber>,
    config: TrackerConfig,
    /// Bumped after every successful refresh.
    generation: AtomicU64,
}

impl ClusterTracker {
    pub fn new(seeds: Vec<String>, prober: Arc<dyn StatusProber>, config: TrackerConfig) -> Self {
        Self {
            view: RwLock::new(ClusterView::new(seeds)),
            refresh_gate: Mutex::new(()),
            prober,
            config,
            generation: AtomicU64::new(0),
        }
    }

    /// Tracker over the configured nodes, probing them over HTTP.
    pub fn with_http(config: &Config, tracker_config: TrackerConfig) -> Self {
        let prober = HttpStatusProber::new(HttpTransport::from_config(config));
        Self::new(config.nodes.clone(), Arc::new(prober), tracker_config)
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    fn read_view(&self) -> RwLockReadGuard<'_, ClusterView> {
        self.view.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_view(&self) -> RwLockWriteGuard<'_, ClusterView> {
        self.view.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_fresh(&self) -> bool {
        self.read_view().is_fresh(self.config.refresh_interval, Instant::now())
    }

    /// Refreshes the view from the cluster.
    ///
    /// Without `force` this is a no-op while the view is younger than the
    /// refresh interval. Candidates are probed in order (leader, peers, seeds)
    /// until one answers. When all of them fail the previous view is kept
    /// and [`RqlinkError::RefreshFailed`] is returned.
    pub async fn refresh(&self, force: bool, ctx: &CallContext) -> Result<()> {
        if !force && self.is_fresh() {
            return Ok(());
        }

        let seen = self.generation.load(Ordering::Acquire);
        let _gate = ctx.run(async { Ok(self.refresh_gate.lock().await) }).await?;

        // Someone else refreshed while we were waiting on the gate.
        if self.generation.load(Ordering::Acquire) != seen {
            debug!("Reusing topology from concurrent refresh");
            return Ok(());
        }
        if !force && self.is_fresh() {
            return Ok(());
        }

        let candidates = self.read_view().refresh_candidates();
        let mut attempted = 0;
        let mut last_error = None;

        for node in candidates {
            attempted += 1;
            let probe_ctx = ctx.child_with_timeout(self.config.probe_timeout);

            match self.prober.probe(&node, &probe_ctx).await {
                Ok(status) => {
                    let leader = status.leader.clone();
                    let changed = self.write_view().apply(status, Instant::now());
                    self.generation.fetch_add(1, Ordering::AcqRel);
                    if changed {
                        info!(leader = %leader, via = %node, "Cluster leader changed");
                    } else {
                        debug!(leader = %leader, via = %node, "Topology refreshed");
                    }
                    return Ok(());
                }
                Err(e) => {
                    // The caller gave up; stop probing.
                    ctx.check()?;
                    let e = match e {
                        RqlinkError::DeadlineExceeded => RqlinkError::ProbeUnreachable {
                            node: node.clone(),
                            reason: format!("no answer within {:?}", self.config.probe_timeout),
                        },
                        other => other,
                    };
                    warn!(node = %node, error = %e, "Status probe failed");
                    last_error = Some(e);
                }
            }
        }

        Err(RqlinkError::RefreshFailed {
            attempted,
            last: Box::new(last_error.unwrap_or_else(|| RqlinkError::ProbeUnreachable {
                node: "none".into(),
                reason: "no candidate nodes".into(),
            })),
        })
    }

    pub fn current_leader(&self) -> Option<String> {
        self.read_view().leader().map(str::to_string)
    }

    pub fn peers(&self) -> Vec<String> {
        self.read_view().peers().to_vec()
    }

    pub fn seeds(&self) -> Vec<String> {
        self.read_view().seeds().to_vec()
    }

    pub fn all_known_nodes(&self) -> Vec<String> {
        self.read_view().all_known_nodes()
    }

    pub fn select_node(&self, level: ConsistencyLevel) -> Option<String> {
        self.read_view().select_node(level)
    }

    pub fn snapshot(&self) -> TopologySnapshot {
        self.read_view().snapshot(Instant::now())
    }

    /// Number of successful refreshes so far.
    pub fn refresh_count(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}
