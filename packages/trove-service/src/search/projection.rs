//! Per-model projection onto the canonical column set.

use trove_domain::{CANONICAL_COLUMNS, Column, SearchableModel};
use trove_storage::sql::{Expr, Select};

pub(crate) const BOOKMARK: &str = "bookmark";
pub(crate) const DISPLAY_COLLECTION: &str = "coll";
pub(crate) const PERMISSION_COLLECTION: &str = "perm_coll";
pub(crate) const REVISION: &str = "r";
pub(crate) const MODERATION: &str = "mr";
pub(crate) const TABLE: &str = "tbl";
pub(crate) const DATABASE: &str = "db";
pub(crate) const MODEL_CARD: &str = "model";
pub(crate) const QUERY_ACTION: &str = "qa";
pub(crate) const MODEL_INDEX: &str = "mi";
pub(crate) const DASHBOARD_CARD: &str = "dc";
pub(crate) const INDEX: &str = "si";

/// Where a projection reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
	/// The model's backing relations.
	Source,
	/// The denormalized `search_index` table.
	Index,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedColumn {
	pub column: Column,
	pub expr: Expr,
}

/// One entry per canonical column, in canonical order.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
	model: SearchableModel,
	columns: Vec<ProjectedColumn>,
}
impl Projection {
	pub fn new(model: SearchableModel, target: Target) -> Self {
		let columns = CANONICAL_COLUMNS
			.iter()
			.map(|column| {
				let expr = match column {
					Column::Model => Some(Expr::lit(model.as_str())),
					_ => match target {
						Target::Source => source_expr(model, *column),
						Target::Index => index_expr(model, *column),
					},
				};

				ProjectedColumn {
					column: *column,
					expr: expr.unwrap_or(Expr::TypedNull(column.ty())),
				}
			})
			.collect();

		Self { model, columns }
	}

	pub fn model(&self) -> SearchableModel {
		self.model
	}

	/// Expression projected for `column`; a typed null when the model lacks it.
	pub fn expr(&self, column: Column) -> &Expr {
		&self.columns[column.ordinal()].expr
	}

	/// Whether the model carries a real value for `column`.
	pub fn provides(&self, column: Column) -> bool {
		!matches!(self.expr(column), Expr::TypedNull(_))
	}

	pub fn replace(&mut self, column: Column, expr: Expr) {
		self.columns[column.ordinal()].expr = expr;
	}

	/// Append the projection to a select list, each entry aliased to its canonical name.
	pub fn apply(&self, select: Select) -> Select {
		self.columns.iter().fold(select, |select, entry| {
			select.item(entry.expr.clone(), entry.column.name())
		})
	}
}

fn index_expr(model: SearchableModel, column: Column) -> Option<Expr> {
	match column {
		Column::Bookmark => match model {
			SearchableModel::Card
			| SearchableModel::Dataset
			| SearchableModel::Metric
			| SearchableModel::Dashboard
			| SearchableModel::Collection => Some(Expr::col(BOOKMARK, "id").is_not_null()),
			_ => None,
		},
		other => Some(Expr::col(INDEX, other.name())),
	}
}

fn source_expr(model: SearchableModel, column: Column) -> Option<Expr> {
	let own = |name: &str| Some(Expr::col(model.alias(), name));

	match model {
		SearchableModel::Card | SearchableModel::Dataset | SearchableModel::Metric =>
			card_expr(column, own),
		SearchableModel::Dashboard => match column {
			Column::Id
			| Column::Name
			| Column::Description
			| Column::Archived
			| Column::ArchivedDirectly
			| Column::CollectionId
			| Column::TrashedFromCollectionId
			| Column::CollectionPosition
			| Column::CreatorId
			| Column::CreatedAt
			| Column::UpdatedAt => own(column.name()),
			_ => shared_expr(column),
		},
		SearchableModel::Collection => match column {
			Column::Id
			| Column::Name
			| Column::Description
			| Column::Archived
			| Column::ArchivedDirectly
			| Column::CreatedAt
			| Column::Location => own(column.name()),
			Column::CollectionId => own("id"),
			Column::CollectionName => own("name"),
			Column::CollectionType => own("type"),
			Column::CollectionAuthorityLevel => own("authority_level"),
			Column::Bookmark => shared_expr(column),
			_ => None,
		},
		SearchableModel::Table => match column {
			Column::Id | Column::TableId => own("id"),
			Column::Name | Column::TableName => own("name"),
			Column::DisplayName => own("display_name"),
			Column::Description | Column::TableDescription => own("description"),
			Column::CreatedAt | Column::UpdatedAt | Column::InitialSyncStatus =>
				own(column.name()),
			Column::TableSchema => own("schema"),
			Column::DatabaseId => own("db_id"),
			Column::DatabaseName => Some(Expr::col(DATABASE, "name")),
			_ => None,
		},
		SearchableModel::Database => match column {
			Column::Id | Column::DatabaseId => own("id"),
			Column::Name | Column::DatabaseName => own("name"),
			Column::Description
			| Column::CreatedAt
			| Column::UpdatedAt
			| Column::InitialSyncStatus => own(column.name()),
			_ => None,
		},
		SearchableModel::Segment => match column {
			Column::Id
			| Column::Name
			| Column::Description
			| Column::Archived
			| Column::CreatorId
			| Column::CreatedAt
			| Column::UpdatedAt
			| Column::TableId => own(column.name()),
			Column::TableSchema => Some(Expr::col(TABLE, "schema")),
			Column::TableName => Some(Expr::col(TABLE, "name")),
			Column::TableDescription => Some(Expr::col(TABLE, "description")),
			Column::DatabaseId => Some(Expr::col(TABLE, "db_id")),
			_ => None,
		},
		SearchableModel::Action => match column {
			Column::Id
			| Column::Name
			| Column::Description
			| Column::Archived
			| Column::CreatorId
			| Column::CreatedAt
			| Column::UpdatedAt
			| Column::ModelId => own(column.name()),
			// Actions carry no revision history.
			Column::LastEditedAt => own("updated_at"),
			Column::CollectionId => Some(Expr::col(MODEL_CARD, "collection_id")),
			Column::ModelName => Some(Expr::col(MODEL_CARD, "name")),
			Column::DatasetQuery => Some(Expr::col(QUERY_ACTION, "dataset_query")),
			Column::QueryType => Some(Expr::lit("native")),
			Column::DatabaseId => Some(Expr::col(QUERY_ACTION, "database_id")),
			Column::CollectionName
			| Column::CollectionType
			| Column::CollectionLocation
			| Column::CollectionAuthorityLevel => shared_expr(column),
			_ => None,
		},
		SearchableModel::IndexedEntity => match column {
			Column::Id => own("model_pk"),
			Column::Name => own("name"),
			Column::ModelIndexId => own("model_index_id"),
			Column::CollectionId => Some(Expr::col(MODEL_CARD, "collection_id")),
			Column::ModelId => Some(Expr::col(MODEL_INDEX, "model_id")),
			Column::ModelName => Some(Expr::col(MODEL_CARD, "name")),
			Column::PkRef => Some(Expr::col(MODEL_INDEX, "pk_ref")),
			Column::DatabaseId => Some(Expr::col(MODEL_CARD, "database_id")),
			Column::CollectionName
			| Column::CollectionType
			| Column::CollectionLocation
			| Column::CollectionAuthorityLevel => shared_expr(column),
			_ => None,
		},
	}
}

fn card_expr(column: Column, own: impl Fn(&str) -> Option<Expr>) -> Option<Expr> {
	match column {
		Column::Id
		| Column::Name
		| Column::Description
		| Column::Archived
		| Column::ArchivedDirectly
		| Column::CollectionId
		| Column::TrashedFromCollectionId
		| Column::CollectionPosition
		| Column::CreatorId
		| Column::CreatedAt
		| Column::UpdatedAt
		| Column::Display
		| Column::DatasetQuery
		| Column::QueryType
		| Column::TableId
		| Column::DatabaseId => own(column.name()),
		Column::DashboardcardCount => {
			let count = Select::from(trove_storage::sql::Source::table(
				"report_dashboardcard",
				DASHBOARD_CARD,
			))
			.item(Expr::CountAll, "n")
			.and_where(
				Expr::col(DASHBOARD_CARD, "card_id")
					.eq(Expr::col(SearchableModel::Card.alias(), "id")),
			);

			Some(Expr::Subquery(Box::new(count)))
		},
		Column::ModeratedStatus => Some(Expr::col(MODERATION, "status")),
		_ => shared_expr(column),
	}
}

/// Columns read from joins shared by several models.
fn shared_expr(column: Column) -> Option<Expr> {
	match column {
		Column::CollectionName => Some(Expr::col(DISPLAY_COLLECTION, "name")),
		Column::CollectionType => Some(Expr::col(DISPLAY_COLLECTION, "type")),
		Column::CollectionLocation => Some(Expr::col(DISPLAY_COLLECTION, "location")),
		Column::CollectionAuthorityLevel => Some(Expr::col(DISPLAY_COLLECTION, "authority_level")),
		Column::Bookmark => Some(Expr::col(BOOKMARK, "id").is_not_null()),
		Column::LastEditedAt => Some(Expr::col(REVISION, "timestamp")),
		Column::LastEditorId => Some(Expr::col(REVISION, "user_id")),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use trove_domain::{CANONICAL_COLUMNS, Column, ColumnType, SearchableModel};
	use trove_storage::sql::{Expr, SelectItem};

	use crate::search::projection::{Projection, Target};

	#[test]
	fn every_projection_is_canonical_in_length_and_order() {
		for target in [Target::Source, Target::Index] {
			for model in SearchableModel::ALL {
				let projection = Projection::new(model, target);
				let select = projection.apply(Default::default());

				assert_eq!(select.items.len(), CANONICAL_COLUMNS.len());

				for (item, column) in select.items.iter().zip(CANONICAL_COLUMNS) {
					let SelectItem::Expr { alias, .. } = item else {
						panic!("Projection must not emit wildcards.");
					};

					assert_eq!(alias.as_deref(), Some(column.name()), "{model} out of order");
				}
			}
		}
	}

	#[test]
	fn model_is_always_a_literal_tag() {
		for model in SearchableModel::ALL {
			let projection = Projection::new(model, Target::Index);

			assert_eq!(projection.expr(Column::Model), &Expr::lit(model.as_str()));
		}
	}

	#[test]
	fn missing_columns_are_typed_nulls() {
		let projection = Projection::new(SearchableModel::Database, Target::Source);

		assert_eq!(projection.expr(Column::Bookmark), &Expr::TypedNull(ColumnType::Boolean));
		assert_eq!(
			projection.expr(Column::LastEditedAt),
			&Expr::TypedNull(ColumnType::Timestamp)
		);
		assert!(projection.provides(Column::InitialSyncStatus));
		assert!(!projection.provides(Column::CollectionId));
	}

	#[test]
	fn collection_rows_describe_themselves() {
		let projection = Projection::new(SearchableModel::Collection, Target::Source);

		assert_eq!(projection.expr(Column::CollectionId), &Expr::col("collection", "id"));
		assert_eq!(projection.expr(Column::Location), &Expr::col("collection", "location"));
	}
}
