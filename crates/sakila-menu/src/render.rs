// SPDX-License-Identifier: Apache-2.0

//! Table output in the style of Spark's `DataFrame.show()`

use std::io::Write;
use std::sync::Arc;

use datafusion::arrow::record_batch::RecordBatch;
use datafusion::arrow::util::pretty::pretty_format_batches;
use datafusion::common::DataFusionError;
use datafusion::prelude::DataFrame;

use crate::error::MenuResult;

/// Execute `df` and write at most `n` rows as an ASCII table.
///
/// One extra row is fetched to tell whether the result was cut short, in
/// which case a `only showing top {n} rows` footer follows the table.
pub async fn show(df: DataFrame, n: usize, out: &mut impl Write) -> MenuResult<()> {
    let schema = Arc::new(df.schema().as_arrow().clone());
    let batches = df.limit(0, Some(n.saturating_add(1)))?.collect().await?;
    let total: usize = batches.iter().map(|batch| batch.num_rows()).sum();

    let mut remaining = n;
    let mut shown = vec![];
    for batch in &batches {
        let take = batch.num_rows().min(remaining);
        if take > 0 {
            shown.push(batch.slice(0, take));
            remaining -= take;
        }
    }
    if shown.is_empty() {
        let schema = batches.first().map(|batch| batch.schema()).unwrap_or(schema);
        shown.push(RecordBatch::new_empty(schema));
    }

    let table = pretty_format_batches(&shown).map_err(DataFusionError::from)?;
    writeln!(out, "{}", table)?;
    if total > n {
        writeln!(out, "only showing top {} rows", n)?;
    }
    Ok(())
}
