// SPDX-License-Identifier: Apache-2.0

//! Error types for the query menu

use std::fmt;

use datafusion::common::DataFusionError;
use sakila_jdbc::JdbcError;
use thiserror::Error;

/// Result type for menu operations
pub type MenuResult<T> = Result<T, MenuError>;

/// Errors that end or interrupt the menu
#[derive(Debug, Error)]
pub enum MenuError {
    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Data source failure
    #[error(transparent)]
    Jdbc(#[from] JdbcError),

    /// Query engine failure
    #[error(transparent)]
    DataFusion(#[from] DataFusionError),

    /// Console I/O error
    #[error("console I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What went wrong with a free-form query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Bad argument or option value
    Value,
    /// Failure while the query was running
    Runtime,
    /// Data that could not be represented
    Type,
    /// A name that could not be resolved
    Name,
    /// The statement was rejected while being analyzed
    Analysis,
    /// Anything outside the kinds above
    Unrecognized,
}

impl fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryErrorKind::Value => "value",
            QueryErrorKind::Runtime => "runtime",
            QueryErrorKind::Type => "type",
            QueryErrorKind::Name => "name",
            QueryErrorKind::Analysis => "analysis",
            QueryErrorKind::Unrecognized => "unrecognized",
        };
        f.write_str(name)
    }
}

/// A failed free-form query together with its classification
#[derive(Debug, Error)]
#[error("{kind} error: {message}")]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub message: String,
}

impl QueryError {
    pub fn new(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<JdbcError> for QueryError {
    fn from(err: JdbcError) -> Self {
        Self::new(classify_jdbc(&err), err.to_string())
    }
}

impl From<DataFusionError> for QueryError {
    fn from(err: DataFusionError) -> Self {
        Self::new(classify_datafusion(&err), err.to_string())
    }
}

impl From<MenuError> for QueryError {
    fn from(err: MenuError) -> Self {
        match err {
            MenuError::Jdbc(e) => e.into(),
            MenuError::DataFusion(e) => e.into(),
            MenuError::Config(msg) => Self::new(QueryErrorKind::Value, msg),
            MenuError::Io(e) => Self::new(QueryErrorKind::Unrecognized, e.to_string()),
        }
    }
}

/// MySQL server errors raised while a statement is parsed or resolved:
/// no such table (1146), unknown column (1054), syntax (1064), unknown
/// database (1049), unknown table (1051), ambiguous column (1052),
/// unknown table in multi-table statement (1109), and generic parse
/// error (1149).
const ANALYSIS_SERVER_CODES: &[u16] = &[1146, 1054, 1064, 1049, 1051, 1052, 1109, 1149];

pub fn classify_jdbc(err: &JdbcError) -> QueryErrorKind {
    match err {
        JdbcError::InvalidOptions(_) => QueryErrorKind::Value,
        JdbcError::UnsupportedType(_) => QueryErrorKind::Type,
        JdbcError::Schema(_) => QueryErrorKind::Analysis,
        JdbcError::Server { code, .. } if ANALYSIS_SERVER_CODES.contains(code) => {
            QueryErrorKind::Analysis
        }
        JdbcError::Server { .. } | JdbcError::Query(_) => QueryErrorKind::Runtime,
        JdbcError::DataFusion(inner) => classify_datafusion(inner),
        JdbcError::Connection(_) => QueryErrorKind::Unrecognized,
    }
}

pub fn classify_datafusion(err: &DataFusionError) -> QueryErrorKind {
    match err.find_root() {
        DataFusionError::External(inner) => match inner.downcast_ref::<JdbcError>() {
            Some(jdbc) => classify_jdbc(jdbc),
            None => QueryErrorKind::Unrecognized,
        },
        DataFusionError::Plan(_)
        | DataFusionError::SQL(..)
        | DataFusionError::NotImplemented(_) => QueryErrorKind::Analysis,
        DataFusionError::SchemaError(..) => QueryErrorKind::Name,
        DataFusionError::Execution(_)
        | DataFusionError::ArrowError(..)
        | DataFusionError::ResourcesExhausted(_) => QueryErrorKind::Runtime,
        _ => QueryErrorKind::Unrecognized,
    }
}

#[cfg(test)]
mod tests {
    use datafusion::common::{Column, SchemaError};

    use super::*;

    fn server(code: u16) -> JdbcError {
        JdbcError::Server {
            code,
            state: "42S02".to_string(),
            message: "Table 'sakila.nonexistent' doesn't exist".to_string(),
        }
    }

    #[test]
    fn test_server_errors() {
        assert_eq!(classify_jdbc(&server(1146)), QueryErrorKind::Analysis);
        assert_eq!(classify_jdbc(&server(1064)), QueryErrorKind::Analysis);
        assert_eq!(classify_jdbc(&server(1205)), QueryErrorKind::Runtime);
    }

    #[test]
    fn test_client_errors() {
        assert_eq!(
            classify_jdbc(&JdbcError::InvalidOptions("empty URL".to_string())),
            QueryErrorKind::Value
        );
        assert_eq!(
            classify_jdbc(&JdbcError::UnsupportedType("MYSQL_TYPE_VECTOR".to_string())),
            QueryErrorKind::Type
        );
        assert_eq!(
            classify_jdbc(&JdbcError::Connection("connection refused".to_string())),
            QueryErrorKind::Unrecognized
        );
    }

    #[test]
    fn test_wrapped_jdbc_error() {
        let err: DataFusionError = server(1146).into();
        let err = err.context("scanning relation");
        assert_eq!(classify_datafusion(&err), QueryErrorKind::Analysis);
    }

    #[test]
    fn test_datafusion_errors() {
        assert_eq!(
            classify_datafusion(&DataFusionError::Plan(
                "table 'nonexistent' not found".to_string()
            )),
            QueryErrorKind::Analysis
        );
        assert_eq!(
            classify_datafusion(&DataFusionError::SchemaError(
                SchemaError::FieldNotFound {
                    field: Box::new(Column::from_name("nope")),
                    valid_fields: vec![],
                },
                Box::new(None),
            )),
            QueryErrorKind::Name
        );
        assert_eq!(
            classify_datafusion(&DataFusionError::Execution("boom".to_string())),
            QueryErrorKind::Runtime
        );
    }

    #[test]
    fn test_query_error_display() {
        let err = QueryError::from(server(1146));
        assert_eq!(err.kind, QueryErrorKind::Analysis);
        assert!(err.to_string().starts_with("analysis error: "));
    }
}
