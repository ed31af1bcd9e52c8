// SPDX-License-Identifier: Apache-2.0

//! Interactive analytical queries over the Sakila sample database.
//!
//! Tables are read through the `sakila-jdbc` DataFusion source, or from
//! in-memory Arrow tables, and answered with the DataFrame API.

pub mod config;
pub mod error;
pub mod menu;
pub mod queries;
pub mod render;
pub mod session;
pub mod source;

// Re-exports
pub use config::{ConnectionConfig, MenuConfig};
pub use error::{MenuError, MenuResult, QueryError, QueryErrorKind};
pub use menu::{MenuSelection, QueryMenu};
pub use session::{SakilaSession, SakilaTable};
pub use source::{JdbcSource, MemorySource, TableSource};
