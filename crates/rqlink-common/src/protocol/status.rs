//! rqlite `/status` document decoding.
//!
//! The status endpoint returns a large document with no fixed schema. Only
//! the nested `cluster` object matters here, so it is decoded into an
//! explicit optional-field structure and validated afterwards. Anything that
//! does not fit fails closed.

use serde::Deserialize;
use serde_json::Value;

use crate::config::normalize_node_addr;
use crate::protocol::error::{Result, RqlinkError};

/// Top-level status document. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct StatusDocument {
    #[serde(default)]
    pub cluster: Option<Value>,
}

/// The `cluster` section, decoded leniently.
#[derive(Debug, Default, Deserialize)]
pub struct ClusterSection {
    #[serde(default)]
    pub leader: Option<Value>,
    #[serde(default)]
    pub peers: Option<Value>,
}

/// Leader and peers reported by one node in one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterStatus {
    pub leader: String,
    pub peers: Vec<String>,
}

impl StatusDocument {
    /// Decodes a raw `/status` body.
    pub fn from_slice(node: &str, body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| RqlinkError::ProbeMalformed {
            node: node.to_string(),
            reason: format!("undecodable status body: {}", e),
        })
    }

    /// Extracts the cluster status.
    ///
    /// A missing or non-object `cluster` is `ProbeMalformed`. A missing, empty
    /// or non-string `leader` is `NoLeaderReported`. Peers are best-effort:
    /// a missing or non-array list is empty and non-string entries are skipped.
    pub fn into_cluster_status(self, node: &str) -> Result<ClusterStatus> {
        let cluster = match self.cluster {
            Some(value @ Value::Object(_)) => value,
            Some(_) => {
                return Err(RqlinkError::ProbeMalformed {
                    node: node.to_string(),
                    reason: "cluster section is not an object".into(),
                })
            }
            None => {
                return Err(RqlinkError::ProbeMalformed {
                    node: node.to_string(),
                    reason: "missing cluster section".into(),
                })
            }
        };

        let section: ClusterSection =
            serde_json::from_value(cluster).map_err(|e| RqlinkError::ProbeMalformed {
                node: node.to_string(),
                reason: e.to_string(),
            })?;

        let leader = match section.leader {
            Some(Value::String(leader)) if !leader.trim().is_empty() => normalize_node_addr(&leader),
            _ => return Err(RqlinkError::NoLeaderReported(node.to_string())),
        };

        let mut peers: Vec<String> = Vec::new();
        if let Some(Value::Array(entries)) = section.peers {
            for entry in entries {
                if let Value::String(addr) = entry {
                    let addr = normalize_node_addr(&addr);
                    if !addr.is_empty() && !peers.contains(&addr) {
                        peers.push(addr);
                    }
                }
            }
        }

        Ok(ClusterStatus { leader, peers })
    }
}
