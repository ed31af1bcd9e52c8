// SPDX-License-Identifier: Apache-2.0

//! JDBC ExecutionPlan implementation for DataFusion.
//!
//! DataFusion calls execute() for each partition, possibly in parallel.
//! Each call spawns a task that reads its slice of the relation from the
//! database and forwards batches through a bounded channel.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use datafusion::arrow::datatypes::SchemaRef;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::common::{DataFusionError, Result as DFResult};
use datafusion::execution::TaskContext;
use datafusion::physical_expr::EquivalenceProperties;
use datafusion::physical_plan::stream::RecordBatchReceiverStream;
use datafusion::physical_plan::{
    DisplayAs, DisplayFormatType, ExecutionMode, ExecutionPlan, Partitioning, PlanProperties,
    SendableRecordBatchStream,
};

use crate::connection::JdbcConnection;
use crate::options::JdbcOptions;
use crate::partition::JdbcPartition;
use crate::reader;

/// JDBC ExecutionPlan - one output partition per planned JDBC partition
#[derive(Debug)]
pub struct JdbcExec {
    /// Arrow schema of the produced batches
    schema: SchemaRef,
    /// JDBC options
    options: JdbcOptions,
    /// Shared database handle
    connection: JdbcConnection,
    /// Partition specifications
    partitions: Vec<JdbcPartition>,
    /// Rows each partition needs to return at most
    limit: Option<usize>,
    /// Execution properties
    properties: PlanProperties,
}

impl JdbcExec {
    pub fn new(
        schema: SchemaRef,
        options: JdbcOptions,
        connection: JdbcConnection,
        partitions: Vec<JdbcPartition>,
        limit: Option<usize>,
    ) -> Self {
        let properties = PlanProperties::new(
            EquivalenceProperties::new(schema.clone()),
            Partitioning::UnknownPartitioning(partitions.len()),
            ExecutionMode::Bounded,
        );

        Self {
            schema,
            options,
            connection,
            partitions,
            limit,
            properties,
        }
    }

    pub fn partitions(&self) -> &[JdbcPartition] {
        &self.partitions
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}

impl DisplayAs for JdbcExec {
    fn fmt_as(&self, _t: DisplayFormatType, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "JdbcExec: url={}, relation={}, partitions={}",
            self.options.url,
            self.options.relation().unwrap_or_default(),
            self.partitions.len()
        )?;
        if let Some(limit) = self.limit {
            write!(f, ", limit={}", limit)?;
        }
        Ok(())
    }
}

impl ExecutionPlan for JdbcExec {
    fn name(&self) -> &str {
        "JdbcExec"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn properties(&self) -> &PlanProperties {
        &self.properties
    }

    fn children(&self) -> Vec<&Arc<dyn ExecutionPlan>> {
        vec![]
    }

    fn with_new_children(
        self: Arc<Self>,
        children: Vec<Arc<dyn ExecutionPlan>>,
    ) -> DFResult<Arc<dyn ExecutionPlan>> {
        if !children.is_empty() {
            return Err(DataFusionError::Internal(
                "JdbcExec should have no children".to_string(),
            ));
        }
        Ok(self)
    }

    fn execute(
        &self,
        partition: usize,
        _context: Arc<TaskContext>,
    ) -> DFResult<SendableRecordBatchStream> {
        let partition_spec = self.partitions.get(partition).cloned().ok_or_else(|| {
            DataFusionError::Execution(format!("Invalid partition index: {}", partition))
        })?;

        let mut builder = RecordBatchReceiverStream::builder(self.schema.clone(), 2);
        let tx = builder.tx();
        let connection = self.connection.clone();
        let options = self.options.clone();
        let schema = self.schema.clone();
        let limit = self.limit;

        builder.spawn(async move {
            let sink = |batch: RecordBatch| {
                let tx = tx.clone();
                async move { tx.send(Ok(batch)).await.is_ok() }
            };
            reader::read_partition(connection, options, schema, partition_spec, limit, sink)
                .await
                .map_err(DataFusionError::from)?;
            Ok(())
        });

        Ok(builder.build())
    }
}
