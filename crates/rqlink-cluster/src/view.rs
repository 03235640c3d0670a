use std::time::{Duration, Instant};

use rqlink_common::protocol::status::ClusterStatus;
use rqlink_common::ConsistencyLevel;

/// What the tracker currently believes about the cluster.
///
/// `leader` and `peers` always come from the same probe response; they are
/// only ever replaced together by [`ClusterView::apply`].
#[derive(Debug, Clone)]
pub struct ClusterView {
    seeds: Vec<String>,
    leader: Option<String>,
    peers: Vec<String>,
    last_refreshed: Option<Instant>,
}

/// A copy of the view taken under a single lock acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologySnapshot {
    pub leader: Option<String>,
    pub peers: Vec<String>,
    pub seeds: Vec<String>,
    pub age: Option<Duration>,
}

impl ClusterView {
    pub fn new(seeds: Vec<String>) -> Self {
        Self {
            seeds,
            leader: None,
            peers: Vec::new(),
            last_refreshed: None,
        }
    }

    pub fn leader(&self) -> Option<&str> {
        self.leader.as_deref()
    }

    pub fn peers(&self) -> &[String] {
        &self.peers
    }

    pub fn seeds(&self) -> &[String] {
        &self.seeds
    }

    pub fn last_refreshed(&self) -> Option<Instant> {
        self.last_refreshed
    }

    /// Whether a successful refresh happened less than `interval` ago.
    pub fn is_fresh(&self, interval: Duration, now: Instant) -> bool {
        self.last_refreshed
            .map(|at| now.saturating_duration_since(at) < interval)
            .unwrap_or(false)
    }

    /// Replaces leader, peers and timestamp with one probe's result.
    ///
    /// Returns `true` when the leader changed.
    pub fn apply(&mut self, status: ClusterStatus, now: Instant) -> bool {
        let ClusterStatus { leader, peers } = status;
        let changed = self.leader.as_deref() != Some(leader.as_str());
        self.leader = Some(leader);
        self.peers = peers;
        self.last_refreshed = Some(now);
        changed
    }

    /// Picks the node an operation at `level` should go to. Never does I/O.
    ///
    /// `Strong` only ever returns the leader. `Weak` and `None` fall back to
    /// the first peer and then the first seed.
    pub fn select_node(&self, level: ConsistencyLevel) -> Option<String> {
        match level {
            ConsistencyLevel::Strong => self.leader.clone(),
            ConsistencyLevel::Weak | ConsistencyLevel::None => self
                .leader
                .clone()
                .or_else(|| self.peers.first().cloned())
                .or_else(|| self.seeds.first().cloned()),
        }
    }

    /// Leader followed by peers, de-duplicated. Seeds when nothing is known.
    pub fn all_known_nodes(&self) -> Vec<String> {
        let mut nodes = Vec::with_capacity(self.peers.len() + 1);
        if let Some(leader) = &self.leader {
            nodes.push(leader.clone());
        }
        for peer in &self.peers {
            if !nodes.contains(peer) {
                nodes.push(peer.clone());
            }
        }
        if nodes.is_empty() {
            nodes = self.seeds.clone();
        }
        nodes
    }

    /// Probe order for a refresh: leader, then peers, then seeds.
    pub fn refresh_candidates(&self) -> Vec<String> {
        let mut nodes = Vec::new();
        let known = self.leader.iter().chain(self.peers.iter());
        for node in known.chain(self.seeds.iter()) {
            if !nodes.contains(node) {
                nodes.push(node.clone());
            }
        }
        nodes
    }

    pub fn snapshot(&self, now: Instant) -> TopologySnapshot {
        TopologySnapshot {
            leader: self.leader.clone(),
            peers: self.peers.clone(),
            seeds: self.seeds.clone(),
            age: self.last_refreshed.map(|at| now.saturating_duration_since(at)),
        }
    }
}
