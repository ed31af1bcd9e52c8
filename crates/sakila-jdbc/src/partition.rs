// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::options::JdbcOptions;
use crate::reader::quote_identifier;

/// Specification for a JDBC partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JdbcPartition {
    /// Partition index
    pub index: usize,

    /// SQL WHERE predicate for this partition
    pub predicate: Option<String>,
}

impl JdbcPartition {
    fn whole_table() -> Self {
        Self {
            index: 0,
            predicate: None,
        }
    }
}

/// Plan partitions for parallel JDBC reads
pub fn plan_partitions(options: &JdbcOptions) -> Vec<JdbcPartition> {
    // If explicit predicates provided, use them
    if let Some(predicates_str) = &options.predicates {
        let partitions: Vec<JdbcPartition> = predicates_str
            .split(',')
            .map(str::trim)
            .filter(|predicate| !predicate.is_empty())
            .enumerate()
            .map(|(index, predicate)| JdbcPartition {
                index,
                predicate: Some(predicate.to_string()),
            })
            .collect();

        if !partitions.is_empty() {
            return partitions;
        }
    }

    if let (Some(column), Some(lower_bound), Some(upper_bound)) = (
        &options.partition_column,
        options.lower_bound,
        options.upper_bound,
    ) {
        return range_partitions(column, lower_bound, upper_bound, options.num_partitions);
    }

    vec![JdbcPartition::whole_table()]
}

/// Create stride partitions over `[lower_bound, upper_bound)`.
///
/// The bounds only decide the stride: the first partition also takes every
/// value below its upper edge plus NULLs, and the last one takes everything
/// above its lower edge, so no row is filtered out.
fn range_partitions(
    column: &str,
    lower_bound: i64,
    upper_bound: i64,
    num_partitions: usize,
) -> Vec<JdbcPartition> {
    if num_partitions <= 1 || lower_bound >= upper_bound {
        return vec![JdbcPartition::whole_table()];
    }

    let width = upper_bound.saturating_sub(lower_bound);
    let num_partitions = if width >= num_partitions as i64 {
        num_partitions as i64
    } else {
        debug!(
            "Reducing partitions from {} to {} for range width",
            num_partitions, width
        );
        width
    };

    let stride = upper_bound / num_partitions - lower_bound / num_partitions;
    let column = quote_identifier(column);
    let mut current = lower_bound;

    (0..num_partitions)
        .map(|i| {
            let lower = (i != 0).then(|| format!("{} >= {}", column, current));
            current += stride;
            let upper = (i != num_partitions - 1).then(|| format!("{} < {}", column, current));

            let predicate = match (lower, upper) {
                (None, Some(upper)) => format!("{} OR {} IS NULL", upper, column),
                (Some(lower), Some(upper)) => format!("{} AND {}", lower, upper),
                (Some(lower), None) => lower,
                (None, None) => unreachable!("at least two partitions"),
            };

            JdbcPartition {
                index: i as usize,
                predicate: Some(predicate),
            }
        })
        .collect()
}
