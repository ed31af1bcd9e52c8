// SPDX-License-Identifier: Apache-2.0

//! JDBC TableProvider implementation for DataFusion.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use datafusion::arrow::datatypes::SchemaRef;
use datafusion::catalog::Session;
use datafusion::common::Result as DFResult;
use datafusion::datasource::TableProvider;
use datafusion::logical_expr::{Expr, TableType};
use datafusion::physical_plan::ExecutionPlan;
use tracing::debug;

use crate::connection::JdbcConnection;
use crate::error::Result;
use crate::exec::JdbcExec;
use crate::options::JdbcOptions;
use crate::partition::plan_partitions;
use crate::reader;

/// JDBC TableProvider - represents a JDBC table/query
#[derive(Debug)]
pub struct JdbcTableProvider {
    /// Arrow schema
    schema: SchemaRef,
    /// JDBC options
    options: JdbcOptions,
    /// Shared database handle
    connection: JdbcConnection,
}

impl JdbcTableProvider {
    /// Validate `options` and infer the relation's schema from the database
    pub async fn try_new(connection: JdbcConnection, options: JdbcOptions) -> Result<Self> {
        options.validate()?;

        let schema = reader::infer_schema(&connection, &options).await?;
        debug!(
            "Inferred {} columns for {}",
            schema.fields().len(),
            options.relation()?
        );

        Ok(Self {
            schema,
            options,
            connection,
        })
    }

    pub fn options(&self) -> &JdbcOptions {
        &self.options
    }
}

#[async_trait]
impl TableProvider for JdbcTableProvider {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn table_type(&self) -> TableType {
        TableType::Base
    }

    async fn scan(
        &self,
        _state: &dyn Session,
        projection: Option<&Vec<usize>>,
        _filters: &[Expr],
        limit: Option<usize>,
    ) -> DFResult<Arc<dyn ExecutionPlan>> {
        // The projection and limit are pushed into the generated SELECT
        let schema = match projection {
            Some(projection) => Arc::new(self.schema.project(projection)?),
            None => self.schema.clone(),
        };

        let partitions = plan_partitions(&self.options);

        Ok(Arc::new(JdbcExec::new(
            schema,
            self.options.clone(),
            self.connection.clone(),
            partitions,
            limit,
        )))
    }
}
