//! Cluster topology tracking for rqlink.
//!
//! - [`prober`] asks one node for the current leader and peers
//! - [`view`] holds what is believed about the cluster and the node selection policy
//! - [`tracker`] refreshes the view with throttling and fallback across nodes

pub mod prober;
pub mod tracker;
pub mod view;

pub use prober::{HttpStatusProber, StatusProber};
pub use tracker::{ClusterTracker, TrackerConfig};
pub use view::{ClusterView, TopologySnapshot};
