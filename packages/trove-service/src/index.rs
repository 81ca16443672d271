//! Maintenance of the denormalized `search_index` table.
//!
//! Index rows are the static projections of every model: the same columns the source engine
//! produces, minus anything that depends on the requesting user.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use tracing::info;

use crate::{Error, Result, search::builder::build_static_projection};
use trove_domain::{CANONICAL_COLUMNS, Column, SearchableModel};
use trove_storage::{
	db::Db,
	schema::{self, SEARCH_INDEX_NEXT_TABLE, SEARCH_INDEX_TABLE},
	sql::{self, Dialect, Expr},
	store::bind_params,
};

const INDEX_LOCK_ID: i64 = 7_120_116;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
	Insert,
	Update,
	Delete,
}
impl ChangeKind {
	pub fn parse(raw: &str) -> Result<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"insert" => Ok(Self::Insert),
			"update" => Ok(Self::Update),
			"delete" => Ok(Self::Delete),
			other => Err(Error::InvalidRequest {
				message: format!("Change kind must be insert, update or delete, got {other:?}."),
			}),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReindexReport {
	pub rows_by_model: BTreeMap<SearchableModel, u64>,
	pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeReport {
	pub deleted: u64,
	pub inserted: u64,
	/// Rows of other entities re-derived because they denormalize the changed one.
	pub refreshed: u64,
}

pub struct Indexer {
	pool: PgPool,
}
impl Indexer {
	pub fn new(db: &Db) -> Self {
		Self { pool: db.pool.clone() }
	}

	/// Rebuild the whole index into a fresh table and swap it in.
	pub async fn reindex_all(&self) -> Result<ReindexReport> {
		let mut tx = self.pool.begin().await?;

		sqlx::query("SELECT pg_advisory_xact_lock($1)")
			.bind(INDEX_LOCK_ID)
			.execute(&mut *tx)
			.await?;
		sqlx::query(&format!("DROP TABLE IF EXISTS {SEARCH_INDEX_NEXT_TABLE}"))
			.execute(&mut *tx)
			.await?;

		for statement in schema::render_search_index_table(SEARCH_INDEX_NEXT_TABLE) {
			sqlx::query(&statement).execute(&mut *tx).await?;
		}

		let mut report = ReindexReport::default();

		for model in SearchableModel::ALL {
			let inserted = insert_static(&mut tx, SEARCH_INDEX_NEXT_TABLE, model, None).await?;

			report.rows_by_model.insert(model, inserted);

			report.total += inserted;
		}

		sqlx::query(&format!("DROP TABLE IF EXISTS {SEARCH_INDEX_TABLE}"))
			.execute(&mut *tx)
			.await?;
		sqlx::query(&format!(
			"ALTER TABLE {SEARCH_INDEX_NEXT_TABLE} RENAME TO {SEARCH_INDEX_TABLE}"
		))
		.execute(&mut *tx)
		.await?;
		sqlx::query(&format!(
			"ALTER INDEX {} RENAME TO {}",
			schema::identity_index_name(SEARCH_INDEX_NEXT_TABLE),
			schema::identity_index_name(SEARCH_INDEX_TABLE),
		))
		.execute(&mut *tx)
		.await?;

		tx.commit().await?;

		info!(total = report.total, "Rebuilt search index.");

		Ok(report)
	}

	/// Re-derive the index rows of one entity after it changed in the source relations.
	pub async fn apply_change(
		&self,
		entity_id: i64,
		model: SearchableModel,
		kind: ChangeKind,
	) -> Result<ChangeReport> {
		let mut tx = self.pool.begin().await?;
		let mut report = ChangeReport::default();

		sqlx::query("SELECT pg_advisory_xact_lock($1)")
			.bind(INDEX_LOCK_ID)
			.execute(&mut *tx)
			.await?;

		// A card may have moved between card-family tags, so every sibling tag is cleared.
		for tag in model.family() {
			let deleted = sqlx::query(&format!(
				"DELETE FROM {SEARCH_INDEX_TABLE} WHERE model = $1 AND id = $2"
			))
			.bind(tag.as_str())
			.bind(entity_id)
			.execute(&mut *tx)
			.await?;

			report.deleted += deleted.rows_affected();
		}

		if kind != ChangeKind::Delete {
			for tag in model.family() {
				report.inserted +=
					insert_static(&mut tx, SEARCH_INDEX_TABLE, *tag, Some((Column::Id, entity_id)))
						.await?;
			}
		}

		for (dependent, column) in dependents(model) {
			report.refreshed += refresh_dependents(&mut tx, *dependent, *column, entity_id).await?;
		}

		if model == SearchableModel::Collection && kind == ChangeKind::Update {
			let refreshed = sqlx::query(&format!(
				"\
UPDATE {SEARCH_INDEX_TABLE} SET
	collection_name = c.name,
	collection_type = c.type,
	collection_location = c.location,
	collection_authority_level = c.authority_level
FROM collection c
WHERE {SEARCH_INDEX_TABLE}.collection_id = c.id
	AND c.id = $1
	AND {SEARCH_INDEX_TABLE}.model <> 'collection'"
			))
			.bind(entity_id)
			.execute(&mut *tx)
			.await?;

			report.refreshed += refreshed.rows_affected();
		}

		tx.commit().await?;

		info!(
			model = %model,
			entity_id,
			?kind,
			deleted = report.deleted,
			inserted = report.inserted,
			refreshed = report.refreshed,
			"Applied search index change."
		);

		Ok(report)
	}
}

/// Models whose index rows copy columns of `model`, with the column holding its id.
fn dependents(model: SearchableModel) -> &'static [(SearchableModel, Column)] {
	match model {
		SearchableModel::Card | SearchableModel::Dataset | SearchableModel::Metric => &[
			(SearchableModel::Action, Column::ModelId),
			(SearchableModel::IndexedEntity, Column::ModelId),
		],
		SearchableModel::Table => &[(SearchableModel::Segment, Column::TableId)],
		SearchableModel::Database => &[(SearchableModel::Table, Column::DatabaseId)],
		_ => &[],
	}
}

/// Re-derive every `dependent` row keyed on `id` through `column`.
async fn refresh_dependents(
	conn: &mut PgConnection,
	dependent: SearchableModel,
	column: Column,
	id: i64,
) -> Result<u64> {
	let deleted = sqlx::query(&format!(
		"DELETE FROM {SEARCH_INDEX_TABLE} WHERE model = $1 AND {} = $2",
		column.name()
	))
	.bind(dependent.as_str())
	.bind(id)
	.execute(&mut *conn)
	.await?
	.rows_affected();
	let inserted = insert_static(conn, SEARCH_INDEX_TABLE, dependent, Some((column, id))).await?;

	Ok(deleted.max(inserted))
}

async fn insert_static(
	conn: &mut PgConnection,
	table: &str,
	model: SearchableModel,
	key: Option<(Column, i64)>,
) -> Result<u64> {
	let statement = insert_statement(table, model, key);
	let done = bind_params(sqlx::query(&statement.sql), &statement.params).execute(conn).await?;

	Ok(done.rows_affected())
}

/// `INSERT INTO table (...) SELECT ...` over the model's static projection, optionally limited to
/// rows whose projected `key` column equals the given id.
fn insert_statement(
	table: &str,
	model: SearchableModel,
	key: Option<(Column, i64)>,
) -> sql::CompiledQuery {
	let (select, projection) = build_static_projection(model);
	let select = match key {
		Some((column, id)) =>
			select.and_where(projection.expr(column).clone().eq(Expr::lit(id))),
		None => select,
	};
	let query = sql::compile(&select, Dialect::Postgres);
	let columns = CANONICAL_COLUMNS.iter().map(|column| column.name()).collect::<Vec<_>>();

	sql::CompiledQuery {
		sql: format!("INSERT INTO {table} ({}) {}", columns.join(", "), query.sql),
		params: query.params,
	}
}

#[cfg(test)]
mod tests {
	use trove_domain::SearchableModel;
	use trove_storage::SqlValue;

	use trove_domain::Column;

	use crate::index::{ChangeKind, dependents, insert_statement};

	#[test]
	fn change_kinds_parse_case_insensitively() {
		assert_eq!(ChangeKind::parse(" Update ").expect("parse"), ChangeKind::Update);
		assert!(ChangeKind::parse("upsert").is_err());
	}

	#[test]
	fn insert_lists_every_canonical_column() {
		let statement = insert_statement("search_index_next", SearchableModel::Table, None);

		assert!(statement.sql.starts_with("INSERT INTO search_index_next (model, id, name, "));
		assert!(statement.sql.contains(", location) SELECT $1 AS model"));
		assert!(!statement.sql.contains("bookmark."));
	}

	#[test]
	fn single_entity_inserts_filter_on_the_projected_id() {
		let statement = insert_statement(
			"search_index",
			SearchableModel::IndexedEntity,
			Some((Column::Id, 42)),
		);

		assert!(statement.sql.contains("model_index_value.model_pk = $"));
		assert_eq!(statement.params.last(), Some(&SqlValue::Int(42)));
	}

	#[test]
	fn renamed_parents_refresh_their_dependents() {
		assert_eq!(dependents(SearchableModel::Dataset), &[
			(SearchableModel::Action, Column::ModelId),
			(SearchableModel::IndexedEntity, Column::ModelId),
		]);
		assert_eq!(dependents(SearchableModel::Table), &[(SearchableModel::Segment, Column::TableId)]);
		assert_eq!(dependents(SearchableModel::Database), &[(
			SearchableModel::Table,
			Column::DatabaseId
		)]);
		assert!(dependents(SearchableModel::Dashboard).is_empty());
	}

	#[test]
	fn dependent_inserts_filter_on_the_parent_key() {
		let segments = insert_statement(
			"search_index",
			SearchableModel::Segment,
			Some((Column::TableId, 12)),
		);
		let actions =
			insert_statement("search_index", SearchableModel::Action, Some((Column::ModelId, 1)));

		assert!(segments.sql.contains("segment.table_id = $"));
		assert_eq!(segments.params.last(), Some(&SqlValue::Int(12)));
		assert!(actions.sql.contains("action.model_id = $"));
		assert_eq!(actions.params.last(), Some(&SqlValue::Int(1)));
	}
}
