// SPDX-License-Identifier: Apache-2.0

//! MySQL column metadata and values mapped onto Arrow.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use datafusion::arrow::array::{
    ArrayRef, BinaryBuilder, Date32Builder, Decimal128Builder, Float64Builder, Int64Builder,
    StringBuilder, TimestampMicrosecondBuilder, UInt64Builder,
};
use datafusion::arrow::datatypes::{DataType, Field, SchemaRef, TimeUnit, DECIMAL128_MAX_PRECISION};
use datafusion::arrow::record_batch::{RecordBatch, RecordBatchOptions};
use mysql_async::consts::{ColumnFlags, ColumnType};
use mysql_async::{Column, Value};

use crate::error::{JdbcError, Result};

/// Character set id MySQL reports for binary data
const BINARY_CHARSET: u16 = 63;

/// Days between 0001-01-01 and 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Arrow field for a result-set column. Every field is nullable because
/// subqueries and outer joins can produce NULL in any column.
pub fn arrow_field(column: &Column) -> Result<Field> {
    let data_type = arrow_type(
        column.column_type(),
        column.flags(),
        column.decimals(),
        column.character_set(),
    )?;
    Ok(Field::new(column.name_str().as_ref(), data_type, true))
}

pub fn arrow_type(
    column_type: ColumnType,
    flags: ColumnFlags,
    decimals: u8,
    character_set: u16,
) -> Result<DataType> {
    use ColumnType::*;

    let binary = character_set == BINARY_CHARSET;
    let data_type = match column_type {
        MYSQL_TYPE_TINY | MYSQL_TYPE_SHORT | MYSQL_TYPE_INT24 | MYSQL_TYPE_LONG
        | MYSQL_TYPE_YEAR => DataType::Int64,
        MYSQL_TYPE_LONGLONG if flags.contains(ColumnFlags::UNSIGNED_FLAG) => DataType::UInt64,
        MYSQL_TYPE_LONGLONG => DataType::Int64,
        MYSQL_TYPE_FLOAT | MYSQL_TYPE_DOUBLE => DataType::Float64,
        MYSQL_TYPE_DECIMAL | MYSQL_TYPE_NEWDECIMAL => {
            DataType::Decimal128(DECIMAL128_MAX_PRECISION, decimals.min(30) as i8)
        }
        MYSQL_TYPE_DATE | MYSQL_TYPE_NEWDATE => DataType::Date32,
        MYSQL_TYPE_DATETIME | MYSQL_TYPE_DATETIME2 | MYSQL_TYPE_TIMESTAMP
        | MYSQL_TYPE_TIMESTAMP2 => DataType::Timestamp(TimeUnit::Microsecond, None),
        MYSQL_TYPE_JSON => DataType::Utf8,
        MYSQL_TYPE_BIT | MYSQL_TYPE_GEOMETRY => DataType::Binary,
        MYSQL_TYPE_TINY_BLOB | MYSQL_TYPE_MEDIUM_BLOB | MYSQL_TYPE_LONG_BLOB | MYSQL_TYPE_BLOB
        | MYSQL_TYPE_VARCHAR | MYSQL_TYPE_VAR_STRING | MYSQL_TYPE_STRING
            if binary =>
        {
            DataType::Binary
        }
        MYSQL_TYPE_TINY_BLOB | MYSQL_TYPE_MEDIUM_BLOB | MYSQL_TYPE_LONG_BLOB | MYSQL_TYPE_BLOB
        | MYSQL_TYPE_VARCHAR | MYSQL_TYPE_VAR_STRING | MYSQL_TYPE_STRING | MYSQL_TYPE_ENUM
        | MYSQL_TYPE_SET | MYSQL_TYPE_TIME | MYSQL_TYPE_TIME2 | MYSQL_TYPE_NULL => DataType::Utf8,
        other => return Err(JdbcError::UnsupportedType(format!("{:?}", other))),
    };
    Ok(data_type)
}

/// Accumulates one Arrow array from a stream of MySQL values
pub enum ColumnBuilder {
    Int64(Int64Builder),
    UInt64(UInt64Builder),
    Float64(Float64Builder),
    Decimal128(Decimal128Builder, i8),
    Date32(Date32Builder),
    Timestamp(TimestampMicrosecondBuilder),
    Utf8(StringBuilder),
    Binary(BinaryBuilder),
}

impl ColumnBuilder {
    pub fn try_new(data_type: &DataType, capacity: usize) -> Result<Self> {
        let builder = match data_type {
            DataType::Int64 => Self::Int64(Int64Builder::with_capacity(capacity)),
            DataType::UInt64 => Self::UInt64(UInt64Builder::with_capacity(capacity)),
            DataType::Float64 => Self::Float64(Float64Builder::with_capacity(capacity)),
            DataType::Decimal128(precision, scale) => Self::Decimal128(
                Decimal128Builder::with_capacity(capacity)
                    .with_precision_and_scale(*precision, *scale)
                    .map_err(|e| JdbcError::Schema(e.to_string()))?,
                *scale,
            ),
            DataType::Date32 => Self::Date32(Date32Builder::with_capacity(capacity)),
            DataType::Timestamp(TimeUnit::Microsecond, None) => {
                Self::Timestamp(TimestampMicrosecondBuilder::with_capacity(capacity))
            }
            DataType::Utf8 => Self::Utf8(StringBuilder::with_capacity(capacity, capacity * 16)),
            DataType::Binary => Self::Binary(BinaryBuilder::with_capacity(capacity, capacity * 16)),
            other => return Err(JdbcError::UnsupportedType(other.to_string())),
        };
        Ok(builder)
    }

    pub fn append(&mut self, value: &Value) -> Result<()> {
        match self {
            Self::Int64(b) => b.append_option(to_i64(value)?),
            Self::UInt64(b) => b.append_option(to_u64(value)?),
            Self::Float64(b) => b.append_option(to_f64(value)?),
            Self::Decimal128(b, scale) => b.append_option(to_decimal(value, *scale)?),
            Self::Date32(b) => b.append_option(to_date32(value)?),
            Self::Timestamp(b) => b.append_option(to_timestamp_micros(value)?),
            Self::Utf8(b) => b.append_option(to_string(value)?),
            Self::Binary(b) => b.append_option(to_bytes(value)),
        }
        Ok(())
    }

    pub fn finish(&mut self) -> ArrayRef {
        match self {
            Self::Int64(b) => Arc::new(b.finish()),
            Self::UInt64(b) => Arc::new(b.finish()),
            Self::Float64(b) => Arc::new(b.finish()),
            Self::Decimal128(b, _) => Arc::new(b.finish()),
            Self::Date32(b) => Arc::new(b.finish()),
            Self::Timestamp(b) => Arc::new(b.finish()),
            Self::Utf8(b) => Arc::new(b.finish()),
            Self::Binary(b) => Arc::new(b.finish()),
        }
    }
}

/// Builds record batches row by row for a fixed schema.
///
/// A schema without fields is allowed; its batches carry only a row count.
pub struct BatchBuilder {
    schema: SchemaRef,
    columns: Vec<ColumnBuilder>,
    rows: usize,
}

impl BatchBuilder {
    pub fn try_new(schema: SchemaRef, capacity: usize) -> Result<Self> {
        let columns = schema
            .fields()
            .iter()
            .map(|field| ColumnBuilder::try_new(field.data_type(), capacity))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            schema,
            columns,
            rows: 0,
        })
    }

    /// Append one row; extra trailing values are ignored
    pub fn append_row<'a>(&mut self, values: impl IntoIterator<Item = &'a Value>) -> Result<()> {
        let mut values = values.into_iter();
        for (index, column) in self.columns.iter_mut().enumerate() {
            let value = values.next().ok_or_else(|| {
                JdbcError::Query(format!(
                    "row has no value for column '{}'",
                    self.schema.field(index).name()
                ))
            })?;
            column.append(value).map_err(|e| match e {
                JdbcError::UnsupportedType(msg) => JdbcError::UnsupportedType(format!(
                    "column '{}': {}",
                    self.schema.field(index).name(),
                    msg
                )),
                other => other,
            })?;
        }
        self.rows += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Emit the rows appended so far and start a new batch
    pub fn finish(&mut self) -> Result<RecordBatch> {
        let arrays = self.columns.iter_mut().map(ColumnBuilder::finish).collect();
        let options = RecordBatchOptions::new().with_row_count(Some(self.rows));
        self.rows = 0;
        RecordBatch::try_new_with_options(self.schema.clone(), arrays, &options)
            .map_err(|e| JdbcError::Query(e.to_string()))
    }
}

fn text(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| JdbcError::UnsupportedType(e.to_string()))
}

fn parse_text<T: std::str::FromStr>(bytes: &[u8], target: &str) -> Result<T> {
    let s = text(bytes)?;
    s.trim()
        .parse()
        .map_err(|_| JdbcError::UnsupportedType(format!("cannot read '{}' as {}", s, target)))
}

fn mismatch(value: &Value, target: &str) -> JdbcError {
    JdbcError::UnsupportedType(format!("cannot read {:?} as {}", value, target))
}

fn to_i64(value: &Value) -> Result<Option<i64>> {
    match value {
        Value::NULL => Ok(None),
        Value::Int(i) => Ok(Some(*i)),
        Value::UInt(u) => i64::try_from(*u)
            .map(Some)
            .map_err(|_| mismatch(value, "Int64")),
        Value::Bytes(bytes) => parse_text(bytes, "Int64").map(Some),
        _ => Err(mismatch(value, "Int64")),
    }
}

fn to_u64(value: &Value) -> Result<Option<u64>> {
    match value {
        Value::NULL => Ok(None),
        Value::UInt(u) => Ok(Some(*u)),
        Value::Int(i) => u64::try_from(*i)
            .map(Some)
            .map_err(|_| mismatch(value, "UInt64")),
        Value::Bytes(bytes) => parse_text(bytes, "UInt64").map(Some),
        _ => Err(mismatch(value, "UInt64")),
    }
}

fn to_f64(value: &Value) -> Result<Option<f64>> {
    match value {
        Value::NULL => Ok(None),
        Value::Double(d) => Ok(Some(*d)),
        Value::Float(f) => Ok(Some(*f as f64)),
        Value::Int(i) => Ok(Some(*i as f64)),
        Value::UInt(u) => Ok(Some(*u as f64)),
        Value::Bytes(bytes) => parse_text(bytes, "Float64").map(Some),
        _ => Err(mismatch(value, "Float64")),
    }
}

fn to_decimal(value: &Value, scale: i8) -> Result<Option<i128>> {
    let factor = 10_i128.pow(scale.max(0) as u32);
    match value {
        Value::NULL => Ok(None),
        Value::Int(i) => Ok(Some(*i as i128 * factor)),
        Value::UInt(u) => Ok(Some(*u as i128 * factor)),
        Value::Double(d) => Ok(Some((d * factor as f64).round() as i128)),
        Value::Bytes(bytes) => parse_decimal(text(bytes)?, scale)
            .map(Some)
            .ok_or_else(|| mismatch(value, "Decimal128")),
        _ => Err(mismatch(value, "Decimal128")),
    }
}

/// Parse a plain decimal literal into its unscaled value; digits past
/// `scale` are truncated.
pub fn parse_decimal(literal: &str, scale: i8) -> Option<i128> {
    let literal = literal.trim();
    let (negative, digits) = match literal.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, literal.strip_prefix('+').unwrap_or(literal)),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut unscaled: i128 = 0;
    let fraction_digits = fraction.bytes().chain(std::iter::repeat(b'0'));
    for digit in whole
        .bytes()
        .chain(fraction_digits.take(scale.max(0) as usize))
    {
        unscaled = unscaled
            .checked_mul(10)?
            .checked_add((digit - b'0') as i128)?;
    }
    Some(if negative { -unscaled } else { unscaled })
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

fn to_date32(value: &Value) -> Result<Option<i32>> {
    match value {
        Value::NULL => Ok(None),
        Value::Date(0, 0, 0, ..) => Ok(None),
        Value::Date(year, month, day, ..) => {
            NaiveDate::from_ymd_opt(*year as i32, *month as u32, *day as u32)
                .map(|date| Some(days_since_epoch(date)))
                .ok_or_else(|| mismatch(value, "Date32"))
        }
        Value::Bytes(bytes) => {
            let s = text(bytes)?.trim();
            if s.starts_with("0000-00-00") {
                return Ok(None);
            }
            let date_part = s.get(..10).unwrap_or(s);
            NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
                .map(|date| Some(days_since_epoch(date)))
                .map_err(|_| mismatch(value, "Date32"))
        }
        _ => Err(mismatch(value, "Date32")),
    }
}

fn to_timestamp_micros(value: &Value) -> Result<Option<i64>> {
    match value {
        Value::NULL => Ok(None),
        Value::Date(0, 0, 0, ..) => Ok(None),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            NaiveDate::from_ymd_opt(*year as i32, *month as u32, *day as u32)
                .and_then(|date| {
                    date.and_hms_micro_opt(*hour as u32, *minute as u32, *second as u32, *micros)
                })
                .map(|datetime| Some(datetime.and_utc().timestamp_micros()))
                .ok_or_else(|| mismatch(value, "Timestamp"))
        }
        Value::Bytes(bytes) => {
            let s = text(bytes)?.trim();
            if s.starts_with("0000-00-00") {
                return Ok(None);
            }
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                .or_else(|_| {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .map(|date| date.and_hms_opt(0, 0, 0).unwrap_or_default())
                })
                .map(|datetime| Some(datetime.and_utc().timestamp_micros()))
                .map_err(|_| mismatch(value, "Timestamp"))
        }
        _ => Err(mismatch(value, "Timestamp")),
    }
}

fn to_string(value: &Value) -> Result<Option<String>> {
    let s = match value {
        Value::NULL => return Ok(None),
        Value::Bytes(bytes) => text(bytes)?.to_string(),
        Value::Int(i) => i.to_string(),
        Value::UInt(u) => u.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Double(d) => d.to_string(),
        Value::Date(year, month, day, hour, minute, second, micros) => format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:06}",
            year, month, day, hour, minute, second, micros
        ),
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if *negative { "-" } else { "" };
            let hours = *days * 24 + *hours as u32;
            if *micros == 0 {
                format!("{}{:02}:{:02}:{:02}", sign, hours, minutes, seconds)
            } else {
                format!(
                    "{}{:02}:{:02}:{:02}.{:06}",
                    sign, hours, minutes, seconds, micros
                )
            }
        }
    };
    Ok(Some(s))
}

fn to_bytes(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::NULL => None,
        Value::Bytes(bytes) => Some(bytes.clone()),
        other => to_string(other).ok().flatten().map(String::into_bytes),
    }
}
