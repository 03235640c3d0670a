use thiserror::Error;

/// Every failure the driver can report.
///
/// Variants fall into three groups:
///
/// - **Topology**: `ProbeUnreachable`, `ProbeMalformed`, `NoLeaderReported` and
///   `RefreshFailed`. The first three describe a single probe; the tracker only
///   surfaces `RefreshFailed` once every candidate node has failed.
/// - **Connection lifecycle**: `ConnectFailure`, `NotConnected`,
///   `RetriesExhausted` and `Closed`.
/// - **Caller-driven**: `Cancelled` and `DeadlineExceeded`. These are never
///   retried by the driver.
///
/// The remaining variants are node-level plumbing failures that feed the
/// executor's retry loop.
#[derive(Error, Debug)]
pub enum RqlinkError {
    #[error("Invalid connection string: {0}")]
    Parse(String),

    #[error("Node {node} unreachable: {reason}")]
    ProbeUnreachable { node: String, reason: String },

    #[error("Malformed status from {node}: {reason}")]
    ProbeMalformed { node: String, reason: String },

    #[error("Node {0} reported no leader")]
    NoLeaderReported(String),

    #[error("Topology refresh failed after probing {attempted} node(s): {last}")]
    RefreshFailed {
        attempted: usize,
        last: Box<RqlinkError>,
    },

    #[error("Failed to connect to any node (last tried {}): {reason}", .last_node.as_deref().unwrap_or("none"))]
    ConnectFailure {
        last_node: Option<String>,
        reason: String,
    },

    #[error("Not connected")]
    NotConnected,

    #[error("Operation failed after {attempts} attempts (last node {last_node}): {source}")]
    RetriesExhausted {
        attempts: u32,
        last_node: String,
        #[source]
        source: Box<RqlinkError>,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Connection is closed")]
    Closed,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("HTTP {status} from {node}: {body}")]
    HttpStatus {
        node: String,
        status: u16,
        body: String,
    },

    #[error("Statement error: {0}")]
    Statement(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),
}

/// Statement errors carrying one of these fragments mean the bound node lost
/// leadership mid-flight, which a rebind can fix.
const LEADERSHIP_ERRORS: &[&str] = &["not leader", "leadership lost", "no leader"];

impl RqlinkError {
    /// Whether a fresh topology view plus a rebind could make the operation
    /// succeed.
    ///
    /// Node-level failures (transport, timeouts, unexpected HTTP status,
    /// undecodable responses) are retryable. SQL errors are not, unless the
    /// node says it is no longer the leader. Caller-driven aborts and
    /// lifecycle errors are never retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            RqlinkError::Transport(_)
            | RqlinkError::Timeout(_)
            | RqlinkError::HttpStatus { .. }
            | RqlinkError::InvalidResponse(_)
            | RqlinkError::JsonSerialization(_)
            | RqlinkError::ProbeUnreachable { .. } => true,
            RqlinkError::Statement(message) => {
                let message = message.to_ascii_lowercase();
                LEADERSHIP_ERRORS.iter().any(|needle| message.contains(needle))
            }
            _ => false,
        }
    }

    /// Whether the error came from the caller's own deadline or cancellation.
    pub fn is_caller_abort(&self) -> bool {
        matches!(self, RqlinkError::Cancelled | RqlinkError::DeadlineExceeded)
    }
}

pub type Result<T> = std::result::Result<T, RqlinkError>;
