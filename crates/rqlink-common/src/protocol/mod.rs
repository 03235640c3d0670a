pub mod error;
pub mod results;
pub mod statement;
pub mod status;

pub use error::{Result, RqlinkError};
pub use results::{QueryResult, WriteResult};
pub use statement::{SqlValue, Statement};
pub use status::ClusterStatus;
