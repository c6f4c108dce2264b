use arrow::array::ArrayRef;
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::json::writer::{JsonArray, WriterBuilder};
use arrow::record_batch::RecordBatch;
use r2d2::Pool;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::db::db_pool::DuckDBConnectionManager;
use crate::db::DbError;

/// One result row, keyed by column name in select-list order
pub type Row = Map<String, Value>;

/// Runs `sql` on a pooled connection and returns its rows as JSON objects.
///
/// The connection goes back to the pool when the blocking task finishes,
/// whether the query succeeded or not.
pub async fn execute_query(
    pool: &Pool<DuckDBConnectionManager>,
    sql: String,
) -> Result<Vec<Row>, DbError> {
    let pool = pool.clone();

    tokio::task::spawn_blocking(move || -> Result<Vec<Row>, DbError> {
        let start_time = Instant::now();
        let conn = pool.get()?;

        let mut stmt = conn.prepare(&sql)?;
        let record_batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();

        let rows = batches_to_rows(&record_batches)?;
        info!(
            "Query returned {} rows in {}ms",
            rows.len(),
            start_time.elapsed().as_millis()
        );
        Ok(rows)
    })
    .await?
}

/// Converts Arrow record batches into JSON rows with explicit nulls and
/// ISO-8601 strings for temporal columns.
pub fn batches_to_rows(batches: &[RecordBatch]) -> Result<Vec<Row>, DbError> {
    let batches = batches
        .iter()
        .filter(|batch| batch.num_rows() > 0)
        .map(stringify_temporal_columns)
        .collect::<Result<Vec<_>, _>>()?;

    if batches.is_empty() {
        return Ok(Vec::new());
    }

    let mut writer = WriterBuilder::new()
        .with_explicit_nulls(true)
        .build::<_, JsonArray>(Vec::new());
    writer.write_batches(&batches.iter().collect::<Vec<_>>())?;
    writer.finish()?;

    let buffer = writer.into_inner();
    debug!("Encoded {} bytes of JSON rows", buffer.len());

    Ok(serde_json::from_slice(&buffer)?)
}

fn is_temporal(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Date32
            | DataType::Date64
            | DataType::Time32(_)
            | DataType::Time64(_)
            | DataType::Timestamp(_, _)
    )
}

/// Casts date, time and timestamp columns to their ISO-8601 text form and
/// leaves every other column untouched.
///
/// Zoned timestamps carry a named zone (DuckDB exports `UTC`), which arrow
/// only resolves with its `chrono-tz` feature; they render as RFC 3339.
pub fn stringify_temporal_columns(batch: &RecordBatch) -> Result<RecordBatch, ArrowError> {
    let schema = batch.schema();
    if !schema.fields().iter().any(|f| is_temporal(f.data_type())) {
        return Ok(batch.clone());
    }

    let mut fields = Vec::with_capacity(schema.fields().len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(batch.num_columns());

    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        if is_temporal(field.data_type()) {
            columns.push(cast(column, &DataType::Utf8)?);
            fields.push(Field::new(field.name(), DataType::Utf8, field.is_nullable()));
        } else {
            columns.push(Arc::clone(column));
            fields.push((**field).clone());
        }
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
}
