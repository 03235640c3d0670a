use rqlink_common::{QueryResult, SqlValue, WriteResult};

/// Effect of a write statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecResult {
    last_insert_id: i64,
    rows_affected: i64,
}

impl ExecResult {
    pub fn last_insert_id(&self) -> i64 {
        self.last_insert_id
    }

    pub fn rows_affected(&self) -> i64 {
        self.rows_affected
    }
}

impl From<WriteResult> for ExecResult {
    fn from(result: WriteResult) -> Self {
        Self {
            last_insert_id: result.last_insert_id,
            rows_affected: result.rows_affected,
        }
    }
}

/// Forward-only cursor over the rows of a query.
///
/// Rows are fully read when the query returns, so iterating never touches the
/// network. After [`Rows::close`] the cursor yields nothing.
#[derive(Debug)]
pub struct Rows {
    columns: Vec<String>,
    types: Vec<String>,
    rows: std::vec::IntoIter<Vec<SqlValue>>,
    closed: bool,
}

impl Rows {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Declared column types as reported by the node, e.g. `integer` or `text`.
    pub fn types(&self) -> &[String] {
        &self.types
    }

    pub fn next_row(&mut self) -> Option<Vec<SqlValue>> {
        if self.closed {
            return None;
        }
        self.rows.next()
    }

    /// Rows not yet consumed.
    pub fn remaining(&self) -> usize {
        if self.closed {
            0
        } else {
            self.rows.len()
        }
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl From<QueryResult> for Rows {
    fn from(result: QueryResult) -> Self {
        Self {
            columns: result.columns,
            types: result.types,
            rows: result.rows.into_iter(),
            closed: false,
        }
    }
}

impl Iterator for Rows {
    type Item = Vec<SqlValue>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row()
    }
}
