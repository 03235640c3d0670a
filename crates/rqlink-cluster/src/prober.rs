use async_trait::async_trait;
use rqlink_common::protocol::error::{Result, RqlinkError};
use rqlink_common::protocol::status::{ClusterStatus, StatusDocument};
use rqlink_common::transport::HttpTransport;
use rqlink_common::CallContext;
use tracing::debug;

/// Asks a single node who the leader is.
///
/// Implementations never retry; the tracker decides what to try next.
#[async_trait]
pub trait StatusProber: Send + Sync {
    async fn probe(&self, node: &str, ctx: &CallContext) -> Result<ClusterStatus>;
}

/// Probes `GET {node}/status` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpStatusProber {
    transport: HttpTransport,
}

impl HttpStatusProber {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl StatusProber for HttpStatusProber {
    async fn probe(&self, node: &str, ctx: &CallContext) -> Result<ClusterStatus> {
        let url = format!("{}/status", node);
        let response = match self.transport.get(&url, ctx).await {
            Ok(response) => response,
            Err(e) if e.is_caller_abort() => return Err(e),
            Err(e) => {
                return Err(RqlinkError::ProbeUnreachable {
                    node: node.to_string(),
                    reason: e.to_string(),
                })
            }
        };

        if !response.is_success() {
            return Err(RqlinkError::ProbeUnreachable {
                node: node.to_string(),
                reason: format!("status endpoint returned HTTP {}", response.status),
            });
        }

        let status = StatusDocument::from_slice(node, &response.body)?.into_cluster_status(node)?;
        debug!(node, leader = %status.leader, peers = status.peers.len(), "Probe succeeded");
        Ok(status)
    }
}
