//! Connection configuration.
//!
//! A [`Config`] is produced once from a connection string and shared read-only
//! (behind an `Arc`) by every component of a logical connection.
//!
//! # Connection String Format
//!
//! ```text
//! [rqlite://|sqlite://][user[:pass]@]host1:port1[,host2:port2,...][?consistency=strong|weak|none&timeout=<duration>]
//! ```
//!
//! - Nodes without an `http://` or `https://` scheme get `http://` prepended.
//! - `consistency` defaults to `weak`, `timeout` to 30 seconds.
//! - Durations use Go-style units: `ns`, `us`, `µs`, `ms`, `s`, `m`, `h`,
//!   optionally fractional and compound (`1m30s`, `1.5s`).
//!
//! # Example
//!
//! ```
//! use rqlink_common::config::{Config, ConsistencyLevel};
//! use std::time::Duration;
//!
//! let cfg = Config::parse("user:pass@host1:4001,host2:4002?consistency=strong&timeout=45s").unwrap();
//! assert_eq!(cfg.nodes, vec!["http://host1:4001", "http://host2:4002"]);
//! assert_eq!(cfg.consistency, ConsistencyLevel::Strong);
//! assert_eq!(cfg.timeout, Duration::from_secs(45));
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::protocol::error::{Result, RqlinkError};

/// Request timeout used when the connection string does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const SCHEME_PREFIXES: &[&str] = &["rqlite://", "sqlite://"];

/// Read consistency requested from the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConsistencyLevel {
    /// Reads go through the leader and consensus. Only the leader may serve them.
    Strong,
    /// Reads are served by the node believed to be leader, without consensus.
    #[default]
    Weak,
    /// Any node may serve reads from its local state.
    None,
}

impl ConsistencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsistencyLevel::Strong => "strong",
            ConsistencyLevel::Weak => "weak",
            ConsistencyLevel::None => "none",
        }
    }
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsistencyLevel {
    type Err = RqlinkError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "strong" => Ok(ConsistencyLevel::Strong),
            "weak" => Ok(ConsistencyLevel::Weak),
            "none" => Ok(ConsistencyLevel::None),
            other => Err(RqlinkError::Parse(format!(
                "unknown consistency level '{}' (expected strong, weak or none)",
                other
            ))),
        }
    }
}

/// Username and password sent as HTTP Basic credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Keep the password out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Immutable connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Seed node base URLs, in the order they were given.
    pub nodes: Vec<String>,
    /// Optional Basic credentials.
    pub credentials: Option<Credentials>,
    /// Per-request timeout for every remote call.
    pub timeout: Duration,
    /// Consistency level used for node selection and reads.
    pub consistency: ConsistencyLevel,
}

impl Config {
    /// Creates a configuration for the given nodes with default settings.
    ///
    /// Node addresses are normalized the same way the connection string
    /// parser normalizes them.
    pub fn new<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            nodes: nodes
                .into_iter()
                .map(|n| normalize_node_addr(n.as_ref()))
                .filter(|n| !n.is_empty())
                .collect(),
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
            consistency: ConsistencyLevel::default(),
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_consistency(mut self, consistency: ConsistencyLevel) -> Self {
        self.consistency = consistency;
        self
    }

    /// Parses a connection string.
    ///
    /// # Errors
    ///
    /// Returns [`RqlinkError::Parse`] when:
    /// - the input is empty
    /// - it contains more than one `@` or more than one `?`
    /// - a parameter pair does not split into exactly `key=value`
    /// - `consistency` is not `strong`, `weak` or `none`
    /// - `timeout` is not a valid positive duration
    /// - no node remains after splitting on `,`
    pub fn parse(dsn: &str) -> Result<Self> {
        let dsn = dsn.trim();
        if dsn.is_empty() {
            return Err(RqlinkError::Parse("connection string cannot be empty".into()));
        }

        let mut rest = SCHEME_PREFIXES
            .iter()
            .find_map(|prefix| dsn.strip_prefix(prefix))
            .unwrap_or(dsn);

        let mut credentials = None;
        if rest.contains('@') {
            let parts: Vec<&str> = rest.split('@').collect();
            if parts.len() != 2 {
                return Err(RqlinkError::Parse("more than one '@' in connection string".into()));
            }
            credentials = Some(match parts[0].split_once(':') {
                Some((user, pass)) => Credentials::new(user, pass),
                None => Credentials::new(parts[0], ""),
            });
            rest = parts[1];
        }

        let mut timeout = DEFAULT_TIMEOUT;
        let mut consistency = ConsistencyLevel::default();
        if rest.contains('?') {
            let parts: Vec<&str> = rest.split('?').collect();
            if parts.len() != 2 {
                return Err(RqlinkError::Parse("more than one '?' in connection string".into()));
            }
            rest = parts[0];

            for param in parts[1].split('&') {
                let kv: Vec<&str> = param.split('=').collect();
                if kv.len() != 2 {
                    return Err(RqlinkError::Parse(format!(
                        "invalid parameter '{}' (expected key=value)",
                        param
                    )));
                }
                match kv[0] {
                    "consistency" => consistency = kv[1].parse()?,
                    "timeout" => {
                        timeout = parse_duration(kv[1])?;
                        if timeout.is_zero() {
                            return Err(RqlinkError::Parse("timeout must be positive".into()));
                        }
                    }
                    other => {
                        tracing::debug!(key = other, "Ignoring unknown connection string parameter");
                    }
                }
            }
        }

        let nodes: Vec<String> = rest
            .split(',')
            .map(normalize_node_addr)
            .filter(|n| !n.is_empty())
            .collect();
        if nodes.is_empty() {
            return Err(RqlinkError::Parse("no nodes specified".into()));
        }

        Ok(Self {
            nodes,
            credentials,
            timeout,
            consistency,
        })
    }
}

impl FromStr for Config {
    type Err = RqlinkError;

    fn from_str(s: &str) -> Result<Self> {
        Config::parse(s)
    }
}

/// Normalizes a node address into a base URL.
///
/// Trims whitespace and trailing slashes and prepends `http://` when no
/// scheme is present. Returns an empty string for blank input.
pub fn normalize_node_addr(addr: &str) -> String {
    let addr = addr.trim().trim_end_matches('/');
    if addr.is_empty() {
        return String::new();
    }
    if addr.starts_with("http://") || addr.starts_with("https://") {
        addr.to_string()
    } else {
        format!("http://{}", addr)
    }
}

/// Parses a Go-style duration such as `45s`, `1m30s`, `1.5s` or `250ms`.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(RqlinkError::Parse("duration cannot be empty".into()));
    }
    if input == "0" {
        return Ok(Duration::ZERO);
    }

    let invalid = || RqlinkError::Parse(format!("invalid duration '{}'", input));

    let mut total_nanos: f64 = 0.0;
    let mut rest = input;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| RqlinkError::Parse(format!("missing unit in duration '{}'", input)))?;
        if number_len == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1_000.0,
            "ms" => 1_000_000.0,
            "s" => 1_000_000_000.0,
            "m" => 60.0 * 1_000_000_000.0,
            "h" => 3_600.0 * 1_000_000_000.0,
            unit => {
                return Err(RqlinkError::Parse(format!(
                    "unknown unit '{}' in duration '{}'",
                    unit, input
                )))
            }
        };
        total_nanos += value * nanos_per_unit;
        rest = &rest[unit_len..];
    }

    Ok(Duration::from_nanos(total_nanos.round() as u64))
}
