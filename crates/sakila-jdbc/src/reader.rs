// SPDX-License-Identifier: Apache-2.0

//! JDBC → Arrow reader over the MySQL text protocol.
//!
//! Schema inference and partition reads issue plain SQL against the
//! configured relation, the same statements a JDBC source would send:
//! `SELECT * FROM <relation> WHERE 1=0` for metadata and one
//! `SELECT <columns> FROM <relation> [WHERE <predicate>] [LIMIT <n>]` per
//! partition. Partition rows are streamed off the wire and handed out in
//! batches as soon as `fetch_size` rows have arrived.

use std::future::Future;
use std::sync::Arc;

use datafusion::arrow::datatypes::{Schema, SchemaRef};
use datafusion::arrow::record_batch::RecordBatch;
use mysql_async::prelude::Queryable;
use mysql_async::Value;
use tracing::debug;

use crate::connection::JdbcConnection;
use crate::error::{JdbcError, Result};
use crate::options::JdbcOptions;
use crate::partition::JdbcPartition;
use crate::types::{arrow_field, BatchBuilder};

static NULL: Value = Value::NULL;

/// Quote an identifier for MySQL
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Statement used to discover the columns of a relation without reading rows
pub fn schema_query(relation: &str) -> String {
    format!("SELECT * FROM {} WHERE 1=0", relation)
}

/// Statement reading the columns of `schema` from one partition.
///
/// A schema without fields selects a constant so that only row counts
/// come back.
pub fn select_query(
    relation: &str,
    schema: &Schema,
    predicate: Option<&str>,
    limit: Option<usize>,
) -> String {
    let columns = if schema.fields().is_empty() {
        "1".to_string()
    } else {
        schema
            .fields()
            .iter()
            .map(|field| quote_identifier(field.name()))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut sql = format!("SELECT {} FROM {}", columns, relation);
    if let Some(predicate) = predicate {
        sql.push_str(&format!(" WHERE {}", predicate));
    }
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    sql
}

/// Read Arrow schema from JDBC source
pub async fn infer_schema(connection: &JdbcConnection, options: &JdbcOptions) -> Result<SchemaRef> {
    let sql = schema_query(&options.relation()?);
    debug!("Inferring schema: {}", sql);

    let mut conn = connection.get().await?;
    let result = conn.query_iter(sql).await?;
    let columns = result.columns_ref().to_vec();
    result.drop_result().await?;

    if columns.is_empty() {
        return Err(JdbcError::Schema(format!(
            "relation {} has no columns",
            options.relation()?
        )));
    }

    let fields = columns.iter().map(arrow_field).collect::<Result<Vec<_>>>()?;
    Ok(Arc::new(Schema::new(fields)))
}

/// Read a single partition, passing each batch of at most `fetch_size`
/// rows to `sink` as soon as it is full.
///
/// `sink` returns `false` once nobody wants more batches, which stops the
/// read early. Returns the number of rows read.
pub async fn read_partition<F, Fut>(
    connection: JdbcConnection,
    options: JdbcOptions,
    schema: SchemaRef,
    partition: JdbcPartition,
    limit: Option<usize>,
    mut sink: F,
) -> Result<usize>
where
    F: FnMut(RecordBatch) -> Fut + Send,
    Fut: Future<Output = bool> + Send,
{
    let sql = select_query(
        &options.relation()?,
        &schema,
        partition.predicate.as_deref(),
        limit,
    );
    debug!("Reading partition {}: {}", partition.index, sql);

    let fetch_size = options.fetch_size.max(1);
    let capacity = limit.map_or(fetch_size, |limit| limit.min(fetch_size));
    let mut builder = BatchBuilder::try_new(schema, capacity)?;
    let mut rows = 0;

    let mut conn = connection.get().await?;
    let mut result = conn.query_iter(sql).await?;
    while let Some(row) = result.next().await? {
        builder.append_row((0..row.len()).map(|i| row.as_ref(i).unwrap_or(&NULL)))?;
        rows += 1;
        if builder.len() >= fetch_size && !sink(builder.finish()?).await {
            debug!("Partition {} stopped after {} rows", partition.index, rows);
            return Ok(rows);
        }
    }
    result.drop_result().await?;

    if !builder.is_empty() {
        sink(builder.finish()?).await;
    }

    debug!("Partition {} produced {} rows", partition.index, rows);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use datafusion::arrow::datatypes::{DataType, Field};

    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("last_name"), "`last_name`");
        assert_eq!(quote_identifier("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_schema_query_on_subquery() {
        assert_eq!(
            schema_query("(SELECT * FROM actor) as temp"),
            "SELECT * FROM (SELECT * FROM actor) as temp WHERE 1=0"
        );
    }

    #[test]
    fn test_select_query() {
        let schema = Schema::new(vec![
            Field::new("film_id", DataType::Int64, true),
            Field::new("length", DataType::Int64, true),
        ]);
        assert_eq!(
            select_query("film", &schema, None, None),
            "SELECT `film_id`, `length` FROM film"
        );
        assert_eq!(
            select_query("film", &schema, Some("`film_id` >= 500"), None),
            "SELECT `film_id`, `length` FROM film WHERE `film_id` >= 500"
        );
        assert_eq!(
            select_query("film", &schema, Some("`film_id` >= 500"), Some(21)),
            "SELECT `film_id`, `length` FROM film WHERE `film_id` >= 500 LIMIT 21"
        );
    }

    #[test]
    fn test_select_query_without_columns() {
        assert_eq!(
            select_query("actor", &Schema::empty(), None, None),
            "SELECT 1 FROM actor"
        );
    }
}
