use serde_json::Value;
use time::OffsetDateTime;

use crate::{Error, Result};
use trove_domain::{Column, SearchableModel};
use trove_storage::{Row, SqlValue};

/// One decoded row of the combined query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
	pub model: SearchableModel,
	pub id: i64,
	pub name: String,
	pub display_name: Option<String>,
	pub description: Option<String>,
	pub archived: bool,
	pub archived_directly: Option<bool>,
	pub collection_id: Option<i64>,
	pub collection_name: Option<String>,
	pub collection_type: Option<String>,
	pub collection_location: Option<String>,
	pub collection_authority_level: Option<String>,
	pub trashed_from_collection_id: Option<i64>,
	pub collection_position: Option<i64>,
	pub creator_id: Option<i64>,
	pub created_at: Option<OffsetDateTime>,
	pub updated_at: Option<OffsetDateTime>,
	pub bookmark: bool,
	pub dashboardcard_count: Option<i64>,
	pub last_edited_at: Option<OffsetDateTime>,
	pub last_editor_id: Option<i64>,
	pub moderated_status: Option<String>,
	pub display: Option<String>,
	/// Raw query definition as stored; matched against query text.
	pub dataset_query_text: Option<String>,
	/// Parsed query definition; `None` when absent or unparsable.
	pub dataset_query: Option<Value>,
	pub query_type: Option<String>,
	pub table_id: Option<i64>,
	pub table_schema: Option<String>,
	pub table_name: Option<String>,
	pub table_description: Option<String>,
	pub database_id: Option<i64>,
	pub database_name: Option<String>,
	pub initial_sync_status: Option<String>,
	pub model_id: Option<i64>,
	pub model_name: Option<String>,
	pub model_index_id: Option<i64>,
	pub pk_ref_text: Option<String>,
	pub pk_ref: Option<Value>,
	pub location: Option<String>,
}
impl SearchResult {
	pub fn from_row(mut row: Row) -> Result<Self> {
		let tag = row.text(Column::Model.name()).unwrap_or_default().to_string();
		let Some(model) = SearchableModel::parse(&tag) else {
			return Err(Error::Storage { message: format!("Row carries unknown model {tag:?}.") });
		};
		let Some(id) = row.i64(Column::Id.name()) else {
			return Err(Error::Storage { message: format!("A {model} row has no id.") });
		};
		let mut text = |column: Column| match row.take(column.name()) {
			SqlValue::Text(value) => Some(value),
			_ => None,
		};
		let name = text(Column::Name).unwrap_or_default();
		let display_name = text(Column::DisplayName);
		let description = text(Column::Description);
		let collection_name = text(Column::CollectionName);
		let collection_type = text(Column::CollectionType);
		let collection_location = text(Column::CollectionLocation);
		let collection_authority_level = text(Column::CollectionAuthorityLevel);
		let moderated_status = text(Column::ModeratedStatus);
		let display = text(Column::Display);
		let dataset_query_text = text(Column::DatasetQuery);
		let query_type = text(Column::QueryType);
		let table_schema = text(Column::TableSchema);
		let table_name = text(Column::TableName);
		let table_description = text(Column::TableDescription);
		let database_name = text(Column::DatabaseName);
		let initial_sync_status = text(Column::InitialSyncStatus);
		let model_name = text(Column::ModelName);
		let pk_ref_text = text(Column::PkRef);
		let location = text(Column::Location);
		let int = |column: Column| row.i64(column.name());
		let flag = |column: Column| row.get(column.name()).as_bool();
		let at = |column: Column| row.get(column.name()).as_timestamp();

		Ok(Self {
			model,
			id,
			name,
			display_name,
			description,
			archived: flag(Column::Archived).unwrap_or(false),
			archived_directly: flag(Column::ArchivedDirectly),
			collection_id: int(Column::CollectionId),
			collection_name,
			collection_type,
			collection_location,
			collection_authority_level,
			trashed_from_collection_id: int(Column::TrashedFromCollectionId),
			collection_position: int(Column::CollectionPosition),
			creator_id: int(Column::CreatorId),
			created_at: at(Column::CreatedAt),
			updated_at: at(Column::UpdatedAt),
			bookmark: flag(Column::Bookmark).unwrap_or(false),
			dashboardcard_count: int(Column::DashboardcardCount),
			last_edited_at: at(Column::LastEditedAt),
			last_editor_id: int(Column::LastEditorId),
			moderated_status,
			display,
			dataset_query_text,
			dataset_query: None,
			query_type,
			table_id: int(Column::TableId),
			table_schema,
			table_name,
			table_description,
			database_id: int(Column::DatabaseId),
			database_name,
			initial_sync_status,
			model_id: int(Column::ModelId),
			model_name,
			model_index_id: int(Column::ModelIndexId),
			pk_ref_text,
			pk_ref: None,
			location,
		})
	}

	/// A row with only its identity set.
	pub fn new(model: SearchableModel, id: i64, name: impl Into<String>) -> Self {
		Self {
			model,
			id,
			name: name.into(),
			display_name: None,
			description: None,
			archived: false,
			archived_directly: None,
			collection_id: None,
			collection_name: None,
			collection_type: None,
			collection_location: None,
			collection_authority_level: None,
			trashed_from_collection_id: None,
			collection_position: None,
			creator_id: None,
			created_at: None,
			updated_at: None,
			bookmark: false,
			dashboardcard_count: None,
			last_edited_at: None,
			last_editor_id: None,
			moderated_status: None,
			display: None,
			dataset_query_text: None,
			dataset_query: None,
			query_type: None,
			table_id: None,
			table_schema: None,
			table_name: None,
			table_description: None,
			database_id: None,
			database_name: None,
			initial_sync_status: None,
			model_id: None,
			model_name: None,
			model_index_id: None,
			pk_ref_text: None,
			pk_ref: None,
			location: None,
		}
	}

	/// Original text of a searchable column.
	pub fn text(&self, column: Column) -> Option<&str> {
		match column {
			Column::Name => Some(self.name.as_str()),
			Column::DisplayName => self.display_name.as_deref(),
			Column::Description => self.description.as_deref(),
			Column::DatasetQuery => self.dataset_query_text.as_deref(),
			_ => None,
		}
	}

	/// Collection that governs access to the row; `None` is the root collection.
	pub fn permission_collection_id(&self) -> Option<i64> {
		match self.model {
			SearchableModel::Collection => Some(self.id),
			_ => self.trashed_from_collection_id.or(self.collection_id),
		}
	}
}

/// Collection ids along a `/1/2/` location path.
pub fn location_ids(location: &str) -> Vec<i64> {
	location.split('/').filter_map(|segment| segment.parse().ok()).collect()
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use trove_domain::SearchableModel;
	use trove_storage::{Row, SqlValue};

	use crate::search::result::{SearchResult, location_ids};

	#[test]
	fn rows_decode_with_integer_booleans() {
		let row = Row::new()
			.with("model", "card")
			.with("id", 4_i64)
			.with("name", "Orders")
			.with("archived", 0_i64)
			.with("bookmark", 1_i64)
			.with("collection_id", 9_i64)
			.with("trashed_from_collection_id", SqlValue::Null)
			.with("updated_at", datetime!(2026-03-01 0:00 UTC));
		let result = SearchResult::from_row(row).expect("decode");

		assert_eq!(result.model, SearchableModel::Card);
		assert!(!result.archived);
		assert!(result.bookmark);
		assert_eq!(result.permission_collection_id(), Some(9));
		assert_eq!(result.updated_at, Some(datetime!(2026-03-01 0:00 UTC)));
	}

	#[test]
	fn unknown_models_are_rejected() {
		let row = Row::new().with("model", "pulse").with("id", 1_i64);

		assert!(SearchResult::from_row(row).is_err());
	}

	#[test]
	fn location_ids_skip_empty_segments() {
		assert_eq!(location_ids("/1/22/"), vec![1, 22]);
		assert!(location_ids("/").is_empty());
	}
}
