// SPDX-License-Identifier: Apache-2.0

use datafusion::common::DataFusionError;
use thiserror::Error;

/// JDBC-specific errors
#[derive(Debug, Error)]
pub enum JdbcError {
    /// Could not reach or talk to the database
    #[error("JDBC connection error: {0}")]
    Connection(String),

    /// The server rejected a statement
    #[error("JDBC server error {code} ({state}): {message}")]
    Server {
        code: u16,
        state: String,
        message: String,
    },

    /// Query execution error on the client side
    #[error("JDBC query error: {0}")]
    Query(String),

    /// Schema inference error
    #[error("JDBC schema error: {0}")]
    Schema(String),

    /// A column type or value with no Arrow counterpart
    #[error("unsupported JDBC type: {0}")]
    UnsupportedType(String),

    /// Invalid options
    #[error("invalid JDBC options: {0}")]
    InvalidOptions(String),

    /// Error raised by the query engine
    #[error(transparent)]
    DataFusion(#[from] DataFusionError),
}

impl From<mysql_async::Error> for JdbcError {
    fn from(err: mysql_async::Error) -> Self {
        match err {
            mysql_async::Error::Server(server) => JdbcError::Server {
                code: server.code,
                state: server.state,
                message: server.message,
            },
            mysql_async::Error::Url(url) => JdbcError::InvalidOptions(url.to_string()),
            mysql_async::Error::Io(io) => JdbcError::Connection(io.to_string()),
            mysql_async::Error::Driver(driver) => JdbcError::Connection(driver.to_string()),
            other => JdbcError::Query(other.to_string()),
        }
    }
}

impl From<JdbcError> for DataFusionError {
    fn from(err: JdbcError) -> Self {
        match err {
            JdbcError::DataFusion(inner) => inner,
            other => DataFusionError::External(Box::new(other)),
        }
    }
}

/// Result type for JDBC operations
pub type Result<T> = std::result::Result<T, JdbcError>;
