use rqlink_common::{CallContext, Result, SqlValue};

use crate::connection::Connection;
use crate::rows::{ExecResult, Rows};

/// A statement prepared on a [`Connection`].
///
/// Nothing is sent to the cluster when preparing; the SQL text is submitted
/// with its arguments on every call.
#[derive(Debug)]
pub struct PreparedStatement<'a> {
    conn: &'a Connection,
    sql: String,
}

impl<'a> PreparedStatement<'a> {
    pub(crate) fn new(conn: &'a Connection, sql: String) -> Self {
        Self { conn, sql }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Number of placeholders, which is not known without parsing the SQL.
    pub fn num_input(&self) -> Option<usize> {
        None
    }

    pub async fn exec(&self, args: &[SqlValue], ctx: &CallContext) -> Result<ExecResult> {
        self.conn.execute(&self.sql, args, ctx).await
    }

    pub async fn query(&self, args: &[SqlValue], ctx: &CallContext) -> Result<Rows> {
        self.conn.query(&self.sql, args, ctx).await
    }

    pub fn close(self) -> Result<()> {
        Ok(())
    }
}
