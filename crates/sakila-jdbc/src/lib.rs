// SPDX-License-Identifier: Apache-2.0

//! JDBC-style MySQL data source for Apache DataFusion.
//!
//! This crate reads a MySQL table, or a parenthesised subquery, into
//! DataFusion the way `spark.read.jdbc(url, table, properties)` does:
//! options arrive as a JDBC URL plus a property map, the schema is inferred
//! from the server, and rows are read into Arrow record batches.
//!
//! # Architecture
//!
//! ```text
//! JdbcOptions (url, dbtable, user, password, driver, ...)
//!   ↓
//! JdbcTableProvider (TableProvider)   ← schema via SELECT * ... WHERE 1=0
//!   ↓
//! JdbcExec (ExecutionPlan)            ← one partition per planned predicate
//!   ↓
//! Streamed partition reads over JdbcConnection (projection and LIMIT pushed down)
//!   ↓
//! Arrow RecordBatches
//! ```

pub mod connection;
pub mod error;
pub mod exec;
pub mod options;
pub mod partition;
pub mod provider;
pub mod reader;
pub mod types;

// Re-exports
pub use connection::JdbcConnection;
pub use error::{JdbcError, Result};
pub use options::JdbcOptions;
pub use provider::JdbcTableProvider;
