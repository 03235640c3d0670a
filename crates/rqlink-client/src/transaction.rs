use rqlink_common::Result;

/// Transaction marker.
///
/// Statements are not grouped: each one is applied on its own as soon as it
/// runs. Commit and rollback always succeed and have no effect.
#[derive(Debug)]
#[must_use]
pub struct Transaction {
    _private: (),
}

impl Transaction {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }

    pub fn commit(self) -> Result<()> {
        Ok(())
    }

    pub fn rollback(self) -> Result<()> {
        Ok(())
    }
}
