//! The query-execution collaborator.
//!
//! Search never talks to a connection directly. It compiles its AST with the store's dialect and
//! asks the store either for a lazy row stream (the ranking cursor) or for a small fully fetched
//! batch (ancillary lookups). Dropping a stream before it is exhausted releases the underlying
//! connection back to the pool.

use std::{collections::HashMap, future::Future, pin::Pin};

use futures::{StreamExt, TryStreamExt, stream::BoxStream};
use serde_json::Value;
use sqlx::{
	Column as _, PgPool, Postgres, Row as _, TypeInfo as _, ValueRef as _,
	postgres::{PgArguments, PgRow},
	query::Query,
	types::Json,
};
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::{
	Error, Result,
	db::Db,
	sql::{CompiledQuery, Dialect, SqlValue},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type RowStream<'a> = BoxStream<'a, Result<Row>>;

static NULL: SqlValue = SqlValue::Null;

pub trait SearchStore
where
	Self: Send + Sync,
{
	fn dialect(&self) -> Dialect;

	/// Lazily yields rows. The cursor stays open until the stream is exhausted or dropped.
	fn stream<'a>(&'a self, query: &'a CompiledQuery) -> RowStream<'a>;

	fn fetch_all<'a>(&'a self, query: &'a CompiledQuery) -> BoxFuture<'a, Result<Vec<Row>>>;
}

/// One result row keyed by output column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
	values: HashMap<String, SqlValue>,
}
impl Row {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, column: &str, value: impl Into<SqlValue>) -> Self {
		self.values.insert(column.to_string(), value.into());

		self
	}

	pub fn insert(&mut self, column: &str, value: SqlValue) {
		self.values.insert(column.to_string(), value);
	}

	/// Missing columns read as `NULL`.
	pub fn get(&self, column: &str) -> &SqlValue {
		self.values.get(column).unwrap_or(&NULL)
	}

	pub fn take(&mut self, column: &str) -> SqlValue {
		self.values.remove(column).unwrap_or(SqlValue::Null)
	}

	pub fn i64(&self, column: &str) -> Option<i64> {
		self.get(column).as_i64()
	}

	pub fn require_i64(&self, column: &str) -> Result<i64> {
		self.i64(column)
			.ok_or_else(|| Error::Decode(format!("Column {column:?} is missing or not an integer.")))
	}

	pub fn text(&self, column: &str) -> Option<&str> {
		self.get(column).as_str()
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}
}

pub struct PgSearchStore {
	pool: PgPool,
}
impl PgSearchStore {
	pub fn new(db: &Db) -> Self {
		Self { pool: db.pool.clone() }
	}
}
impl SearchStore for PgSearchStore {
	fn dialect(&self) -> Dialect {
		Dialect::Postgres
	}

	fn stream<'a>(&'a self, query: &'a CompiledQuery) -> RowStream<'a> {
		bind_params(sqlx::query(&query.sql), &query.params)
			.fetch(&self.pool)
			.map_err(Error::from)
			.and_then(|row| async move { decode_row(&row) })
			.boxed()
	}

	fn fetch_all<'a>(&'a self, query: &'a CompiledQuery) -> BoxFuture<'a, Result<Vec<Row>>> {
		Box::pin(async move {
			let rows =
				bind_params(sqlx::query(&query.sql), &query.params).fetch_all(&self.pool).await?;

			rows.iter().map(decode_row).collect()
		})
	}
}

pub fn bind_params<'q>(
	mut query: Query<'q, Postgres, PgArguments>,
	params: &[SqlValue],
) -> Query<'q, Postgres, PgArguments> {
	for param in params {
		query = match param {
			SqlValue::Null => query.bind(None::<String>),
			SqlValue::Bool(value) => query.bind(*value),
			SqlValue::Int(value) => query.bind(*value),
			SqlValue::Float(value) => query.bind(*value),
			SqlValue::Text(value) => query.bind(value.clone()),
			SqlValue::Timestamp(value) => query.bind(*value),
			SqlValue::Json(value) => query.bind(Json(value.clone())),
		};
	}

	query
}

/// Decode every column by its runtime type. Unsupported types decode as `NULL` with a warning.
pub fn decode_row(row: &PgRow) -> Result<Row> {
	let mut out = Row::new();

	for (idx, column) in row.columns().iter().enumerate() {
		let raw = row.try_get_raw(idx)?;

		if raw.is_null() {
			out.insert(column.name(), SqlValue::Null);

			continue;
		}

		let type_name = column.type_info().name().to_string();
		let value = match type_name.as_str() {
			"BOOL" => SqlValue::Bool(row.try_get(idx)?),
			"INT2" => SqlValue::Int(i64::from(row.try_get::<i16, _>(idx)?)),
			"INT4" => SqlValue::Int(i64::from(row.try_get::<i32, _>(idx)?)),
			"INT8" => SqlValue::Int(row.try_get(idx)?),
			"FLOAT4" => SqlValue::Float(f64::from(row.try_get::<f32, _>(idx)?)),
			"FLOAT8" => SqlValue::Float(row.try_get(idx)?),
			"TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => SqlValue::Text(row.try_get(idx)?),
			"TIMESTAMPTZ" => SqlValue::Timestamp(row.try_get::<OffsetDateTime, _>(idx)?),
			"TIMESTAMP" =>
				SqlValue::Timestamp(row.try_get::<PrimitiveDateTime, _>(idx)?.assume_utc()),
			"JSON" | "JSONB" => SqlValue::Json(row.try_get::<Value, _>(idx)?),
			other => {
				tracing::warn!(
					column = column.name(),
					type_name = other,
					"Unsupported column type. Decoding as NULL."
				);

				SqlValue::Null
			},
		};

		out.insert(column.name(), value);
	}

	Ok(out)
}
