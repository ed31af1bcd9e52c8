// SPDX-License-Identifier: Apache-2.0

//! The canned Sakila queries, expressed with the DataFrame API.
//!
//! Every function takes the frames it needs by value and returns a lazy
//! frame; nothing is executed until the caller collects or shows it.
//! Grouped results are ordered by their grouping key.

use datafusion::error::Result;
use datafusion::functions_aggregate::expr_fn::{avg, count};
use datafusion::prelude::{col, lit, DataFrame, JoinType};

/// Number of distinct `last_name` values
pub async fn distinct_last_name_count(actor: DataFrame) -> Result<usize> {
    actor.select_columns(&["last_name"])?.distinct()?.count().await
}

/// Last names carried by exactly one actor, with their `count`
pub fn non_repeated_last_names(actor: DataFrame) -> Result<DataFrame> {
    last_name_counts(actor)?
        .filter(col("count").eq(lit(1_i64)))?
        .sort(vec![col("last_name").sort(true, false)])
}

/// Last names carried by more than one actor, with their `count`
pub fn repeated_last_names(actor: DataFrame) -> Result<DataFrame> {
    last_name_counts(actor)?
        .filter(col("count").gt(lit(1_i64)))?
        .sort(vec![col("last_name").sort(true, false)])
}

fn last_name_counts(actor: DataFrame) -> Result<DataFrame> {
    actor.aggregate(
        vec![col("last_name")],
        vec![count(lit(1)).alias("count")],
    )
}

/// One row holding the mean `length` of all films as `average_length`.
/// The mean of no films is NULL.
pub fn average_film_length(film: DataFrame) -> Result<DataFrame> {
    film.aggregate(vec![], vec![avg(col("length")).alias("average_length")])
}

/// Mean film `length` per category `name`.
///
/// Inner joins mean categories without films and films without a category
/// do not contribute.
pub fn average_length_by_category(
    film: DataFrame,
    film_category: DataFrame,
    category: DataFrame,
) -> Result<DataFrame> {
    film.join(
        film_category,
        JoinType::Inner,
        &["film_id"],
        &["film_id"],
        None,
    )?
    .join(
        category,
        JoinType::Inner,
        &["category_id"],
        &["category_id"],
        None,
    )?
    .aggregate(
        vec![col("name")],
        vec![avg(col("length")).alias("average_length")],
    )?
    .sort(vec![col("name").sort(true, false)])
}
