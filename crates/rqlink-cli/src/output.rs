//! JSON rendering of results and parsing of statement arguments.

use anyhow::{anyhow, Result};
use rqlink_client::{ExecResult, Rows};
use rqlink_cluster::TopologySnapshot;
use rqlink_common::{Config, SqlValue};
use serde_json::{json, Value};

/// Parses `-a/--args` into positional statement arguments.
///
/// Accepts a JSON array of scalars. Whole numbers become integers, other
/// numbers reals.
pub fn args_from_json(raw: &str) -> Result<Vec<SqlValue>> {
    let value: Value = serde_json::from_str(raw).map_err(|e| anyhow!("Invalid JSON in args: {}", e))?;
    let Value::Array(items) = value else {
        return Err(anyhow!("args must be a JSON array"));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Null => Ok(SqlValue::Null),
            Value::Bool(b) => Ok(SqlValue::Bool(b)),
            Value::Number(n) => Ok(match n.as_i64() {
                Some(int) => SqlValue::Integer(int),
                None => SqlValue::Real(n.as_f64().unwrap_or_default()),
            }),
            Value::String(s) => Ok(SqlValue::Text(s)),
            other => Err(anyhow!("argument {} is not a scalar: {}", i, other)),
        })
        .collect()
}

pub fn exec_result_to_json(result: &ExecResult) -> Value {
    json!({
        "last_insert_id": result.last_insert_id(),
        "rows_affected": result.rows_affected(),
    })
}

/// Drains the cursor into `{"columns", "types", "rows"}`.
pub fn rows_to_json(mut rows: Rows) -> Value {
    let columns = rows.columns().to_vec();
    let types = rows.types().to_vec();
    let mut values = Vec::new();
    while let Some(row) = rows.next_row() {
        values.push(Value::Array(row.iter().map(SqlValue::to_json).collect()));
    }
    rows.close();
    json!({ "columns": columns, "types": types, "rows": values })
}

pub fn topology_to_json(snapshot: &TopologySnapshot, leader_healthy: bool) -> Value {
    json!({
        "leader": snapshot.leader,
        "leader_healthy": leader_healthy,
        "peers": snapshot.peers,
        "seeds": snapshot.seeds,
        "age_ms": snapshot.age.map(|age| age.as_millis() as u64),
    })
}

/// Connection settings with the password left out.
pub fn config_to_json(config: &Config) -> Value {
    json!({
        "nodes": config.nodes,
        "username": config.credentials.as_ref().map(|c| c.username.clone()),
        "password_set": config.credentials.as_ref().map(|c| !c.password.is_empty()).unwrap_or(false),
        "consistency": config.consistency.as_str(),
        "timeout_ms": config.timeout.as_millis() as u64,
    })
}
