// SPDX-License-Identifier: Apache-2.0

//! Where tables come from: the database through the JDBC bridge, or
//! in-memory Arrow tables.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::datasource::{MemTable, TableProvider};
use datafusion::prelude::SessionContext;
use sakila_jdbc::{JdbcConnection, JdbcError, JdbcOptions, JdbcTableProvider};
use tracing::{debug, info};

use crate::config::ConnectionConfig;

/// A source of relations, addressed the way a JDBC `dbtable` is: either a
/// table name or a parenthesised subquery with an alias.
#[async_trait]
pub trait TableSource: Send + Sync + fmt::Debug {
    /// Load a relation. Every call reads fresh data.
    async fn load(&self, dbtable: &str) -> sakila_jdbc::Result<Arc<dyn TableProvider>>;

    /// Release whatever the source holds open
    async fn close(&self) -> sakila_jdbc::Result<()> {
        Ok(())
    }
}

/// Tables read from MySQL through the JDBC bridge
#[derive(Debug)]
pub struct JdbcSource {
    connection: JdbcConnection,
    config: ConnectionConfig,
}

impl JdbcSource {
    /// Open a handle to the configured database. `check_table` is only used
    /// to validate the options a read of it would get.
    pub fn open(config: &ConnectionConfig, check_table: &str) -> sakila_jdbc::Result<Self> {
        let options = options_for(config, check_table)?;
        options.validate()?;
        let connection = JdbcConnection::open(&options)?;
        Ok(Self {
            connection,
            config: config.clone(),
        })
    }

    /// Options for reading `dbtable`: the connection properties, then the
    /// properties scoped to that table
    pub fn options(&self, dbtable: &str) -> sakila_jdbc::Result<JdbcOptions> {
        options_for(&self.config, dbtable)
    }

    pub fn connection(&self) -> &JdbcConnection {
        &self.connection
    }

    /// Check that the database answers
    pub async fn ping(&self) -> sakila_jdbc::Result<()> {
        self.connection.ping().await
    }
}

#[async_trait]
impl TableSource for JdbcSource {
    async fn load(&self, dbtable: &str) -> sakila_jdbc::Result<Arc<dyn TableProvider>> {
        debug!("Loading {} over JDBC", dbtable);
        let options = self.options(dbtable)?;
        let provider = JdbcTableProvider::try_new(self.connection.clone(), options).await?;
        Ok(Arc::new(provider))
    }

    async fn close(&self) -> sakila_jdbc::Result<()> {
        self.connection.clone().disconnect().await
    }
}

fn options_for(config: &ConnectionConfig, dbtable: &str) -> sakila_jdbc::Result<JdbcOptions> {
    JdbcOptions::from_properties(
        &config.jdbc_url(),
        dbtable,
        vec![config.properties(), config.table_properties(dbtable)],
    )
}

/// In-memory tables keyed by name.
///
/// A `dbtable` of the form `(<sql>) [as] alias` is evaluated with DataFusion
/// SQL over the registered tables, mirroring how the database would treat it.
pub struct MemorySource {
    ctx: SessionContext,
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            ctx: SessionContext::new(),
        }
    }

    /// Register a table from record batches sharing one schema
    pub fn with_table(self, name: &str, batches: Vec<RecordBatch>) -> sakila_jdbc::Result<Self> {
        let schema = batches
            .first()
            .map(|batch| batch.schema())
            .ok_or_else(|| JdbcError::Schema(format!("table {} has no batches", name)))?;
        let table = MemTable::try_new(schema, vec![batches])?;
        self.ctx.register_table(name, Arc::new(table))?;
        info!("Registered in-memory table {}", name);
        Ok(self)
    }

    /// Register an existing provider, e.g. an empty `MemTable`
    pub fn with_provider(
        self,
        name: &str,
        provider: Arc<dyn TableProvider>,
    ) -> sakila_jdbc::Result<Self> {
        self.ctx.register_table(name, provider)?;
        Ok(self)
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySource")
            .field("session_id", &self.ctx.session_id())
            .finish()
    }
}

#[async_trait]
impl TableSource for MemorySource {
    async fn load(&self, dbtable: &str) -> sakila_jdbc::Result<Arc<dyn TableProvider>> {
        match subquery_sql(dbtable) {
            Some(sql) => {
                debug!("Evaluating in-memory subquery: {}", sql);
                let df = self.ctx.sql(sql).await?;
                let schema = Arc::new(df.schema().as_arrow().clone());
                let batches = df.collect().await?;
                Ok(Arc::new(MemTable::try_new(schema, vec![batches])?))
            }
            None => Ok(self.ctx.table_provider(dbtable.trim()).await?),
        }
    }
}

/// The SQL inside `(<sql>) [as] alias`, or `None` for a plain table name
fn subquery_sql(dbtable: &str) -> Option<&str> {
    let dbtable = dbtable.trim();
    if !dbtable.starts_with('(') {
        return None;
    }
    let close = dbtable.rfind(')')?;
    Some(dbtable[1..close].trim())
}

#[cfg(test)]
mod tests {
    use datafusion::arrow::array::StringArray;
    use datafusion::arrow::datatypes::{DataType, Field, Schema};
    use datafusion::physical_plan::ExecutionPlan;
    use sakila_jdbc::exec::JdbcExec;
    use sakila_jdbc::partition::plan_partitions;

    use crate::config::MenuConfig;

    use super::*;

    fn actors() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![Field::new("last_name", DataType::Utf8, true)]));
        RecordBatch::try_new(
            schema,
            vec![Arc::new(StringArray::from(vec!["SMITH", "SMITH", "LEE"]))],
        )
        .unwrap()
    }

    #[test]
    fn test_subquery_sql() {
        assert_eq!(subquery_sql("actor"), None);
        assert_eq!(
            subquery_sql(" (SELECT * FROM actor) as temp"),
            Some("SELECT * FROM actor")
        );
        assert_eq!(
            subquery_sql("(SELECT (1 + 2) AS three) t"),
            Some("SELECT (1 + 2) AS three")
        );
    }

    #[tokio::test]
    async fn test_memory_source_loads_tables_and_subqueries() {
        let source = MemorySource::new().with_table("actor", vec![actors()]).unwrap();

        let table = source.load("actor").await.unwrap();
        assert_eq!(table.schema().fields().len(), 1);

        let subquery = source
            .load("(SELECT DISTINCT last_name FROM actor) as t")
            .await
            .unwrap();
        assert_eq!(subquery.schema().field(0).name(), "last_name");
    }

    #[tokio::test]
    async fn test_memory_source_unknown_table() {
        let source = MemorySource::new();
        let result = source.load("(SELECT * FROM nonexistent) as t").await;
        assert!(matches!(result, Err(JdbcError::DataFusion(_))));
    }

    #[test]
    fn test_jdbc_source_rejects_bad_driver() {
        let config = ConnectionConfig {
            driver: "org.postgresql.Driver".to_string(),
            ..Default::default()
        };
        let err = JdbcSource::open(&config, "actor").unwrap_err();
        assert!(matches!(err, JdbcError::InvalidOptions(_)));
    }

    fn partitioned_config() -> ConnectionConfig {
        MenuConfig::from_vars(|key| match key {
            "USERNAME" => Some("root".to_string()),
            "PASSWORD" => Some("hunter2".to_string()),
            "SAKILA_JDBC_PROPERTIES" => Some(
                "actor.partitionColumn=actor_id;actor.lowerBound=1;actor.upperBound=201;\
                 actor.numPartitions=4"
                    .to_string(),
            ),
            _ => None,
        })
        .unwrap()
        .connection
    }

    #[tokio::test]
    async fn test_table_properties_partition_reads() {
        let source = JdbcSource::open(&partitioned_config(), "actor").unwrap();

        let options = source.options("actor").unwrap();
        assert_eq!(options.dbtable.as_deref(), Some("actor"));
        assert_eq!(options.user.as_deref(), Some("root"));
        let schema = Arc::new(Schema::new(vec![Field::new("actor_id", DataType::Int64, true)]));
        let plan = JdbcExec::new(
            schema,
            options.clone(),
            source.connection().clone(),
            plan_partitions(&options),
            None,
        );
        assert_eq!(plan.properties().output_partitioning().partition_count(), 4);
        assert_eq!(
            plan.partitions()[0].predicate.as_deref(),
            Some("`actor_id` < 51 OR `actor_id` IS NULL")
        );

        let options = source.options("film").unwrap();
        assert!(options.partition_column.is_none());
        assert_eq!(plan_partitions(&options).len(), 1);

        let options = source.options("(SELECT * FROM actor) as t").unwrap();
        assert_eq!(plan_partitions(&options).len(), 1);
    }

    #[tokio::test]
    async fn test_jdbc_source_debug_hides_password() {
        let source = JdbcSource::open(&partitioned_config(), "actor").unwrap();
        let session = crate::session::SakilaSession::new(Arc::new(source));
        let rendered = format!("{:?}", session);
        assert!(rendered.contains("JdbcSource"));
        assert!(!rendered.contains("hunter2"));
    }
}
