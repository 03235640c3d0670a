//! rqlite `/db/execute` and `/db/query` response decoding.

use serde::Deserialize;
use serde_json::Value;

use crate::protocol::error::{Result, RqlinkError};
use crate::protocol::statement::SqlValue;

/// Raw response envelope shared by both endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub results: Vec<WireResult>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One entry of `results`.
#[derive(Debug, Default, Deserialize)]
pub struct WireResult {
    #[serde(default)]
    pub last_insert_id: Option<i64>,
    #[serde(default)]
    pub rows_affected: Option<i64>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Outcome of a write statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteResult {
    pub last_insert_id: i64,
    pub rows_affected: i64,
}

/// Materialized rows of a read statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub types: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl ResponseEnvelope {
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body)
            .map_err(|e| RqlinkError::InvalidResponse(format!("undecodable response body: {}", e)))
    }

    /// Returns the single statement result, surfacing top-level and
    /// per-result statement errors.
    fn into_single(self) -> Result<WireResult> {
        if let Some(error) = self.error {
            return Err(RqlinkError::Statement(error));
        }
        let result = self
            .results
            .into_iter()
            .next()
            .ok_or_else(|| RqlinkError::InvalidResponse("response carries no results".into()))?;
        if let Some(error) = result.error {
            return Err(RqlinkError::Statement(error));
        }
        Ok(result)
    }

    pub fn into_write_result(self) -> Result<WriteResult> {
        let result = self.into_single()?;
        Ok(WriteResult {
            last_insert_id: result.last_insert_id.unwrap_or_default(),
            rows_affected: result.rows_affected.unwrap_or_default(),
        })
    }

    pub fn into_query_result(self) -> Result<QueryResult> {
        let result = self.into_single()?;
        let rows = result
            .values
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(i, cell)| SqlValue::from_json(cell, result.types.get(i).map(String::as_str)))
                    .collect()
            })
            .collect();
        Ok(QueryResult {
            columns: result.columns,
            types: result.types,
            rows,
        })
    }
}
