//! The canonical column set every searchable projection conforms to.
//!
//! Per-model projections are combined with `UNION ALL`, so each of them emits exactly these
//! columns in exactly this order. Models that lack a column emit a typed null instead.

/// Semantic type of a canonical column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
	Text,
	Integer,
	Boolean,
	Timestamp,
	Json,
	Decimal,
	Float,
	Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
	Model,
	Id,
	Name,
	DisplayName,
	Description,
	Archived,
	ArchivedDirectly,
	CollectionId,
	CollectionName,
	CollectionType,
	CollectionLocation,
	CollectionAuthorityLevel,
	TrashedFromCollectionId,
	CollectionPosition,
	CreatorId,
	CreatedAt,
	UpdatedAt,
	Bookmark,
	DashboardcardCount,
	LastEditedAt,
	LastEditorId,
	ModeratedStatus,
	Display,
	DatasetQuery,
	QueryType,
	TableId,
	TableSchema,
	TableName,
	TableDescription,
	DatabaseId,
	DatabaseName,
	InitialSyncStatus,
	ModelId,
	ModelName,
	ModelIndexId,
	PkRef,
	Location,
}
impl Column {
	pub fn name(self) -> &'static str {
		match self {
			Self::Model => "model",
			Self::Id => "id",
			Self::Name => "name",
			Self::DisplayName => "display_name",
			Self::Description => "description",
			Self::Archived => "archived",
			Self::ArchivedDirectly => "archived_directly",
			Self::CollectionId => "collection_id",
			Self::CollectionName => "collection_name",
			Self::CollectionType => "collection_type",
			Self::CollectionLocation => "collection_location",
			Self::CollectionAuthorityLevel => "collection_authority_level",
			Self::TrashedFromCollectionId => "trashed_from_collection_id",
			Self::CollectionPosition => "collection_position",
			Self::CreatorId => "creator_id",
			Self::CreatedAt => "created_at",
			Self::UpdatedAt => "updated_at",
			Self::Bookmark => "bookmark",
			Self::DashboardcardCount => "dashboardcard_count",
			Self::LastEditedAt => "last_edited_at",
			Self::LastEditorId => "last_editor_id",
			Self::ModeratedStatus => "moderated_status",
			Self::Display => "display",
			Self::DatasetQuery => "dataset_query",
			Self::QueryType => "query_type",
			Self::TableId => "table_id",
			Self::TableSchema => "table_schema",
			Self::TableName => "table_name",
			Self::TableDescription => "table_description",
			Self::DatabaseId => "database_id",
			Self::DatabaseName => "database_name",
			Self::InitialSyncStatus => "initial_sync_status",
			Self::ModelId => "model_id",
			Self::ModelName => "model_name",
			Self::ModelIndexId => "model_index_id",
			Self::PkRef => "pk_ref",
			Self::Location => "location",
		}
	}

	pub fn ty(self) -> ColumnType {
		match self {
			Self::Model
			| Self::Name
			| Self::DisplayName
			| Self::Description
			| Self::CollectionName
			| Self::CollectionType
			| Self::CollectionLocation
			| Self::CollectionAuthorityLevel
			| Self::ModeratedStatus
			| Self::Display
			| Self::DatasetQuery
			| Self::QueryType
			| Self::TableSchema
			| Self::TableName
			| Self::TableDescription
			| Self::DatabaseName
			| Self::InitialSyncStatus
			| Self::ModelName
			| Self::PkRef
			| Self::Location => ColumnType::Text,
			Self::Id
			| Self::CollectionId
			| Self::TrashedFromCollectionId
			| Self::CollectionPosition
			| Self::CreatorId
			| Self::DashboardcardCount
			| Self::LastEditorId
			| Self::TableId
			| Self::DatabaseId
			| Self::ModelId
			| Self::ModelIndexId => ColumnType::Integer,
			Self::Archived | Self::ArchivedDirectly | Self::Bookmark => ColumnType::Boolean,
			Self::CreatedAt | Self::UpdatedAt | Self::LastEditedAt => ColumnType::Timestamp,
		}
	}

	pub fn parse(name: &str) -> Option<Self> {
		CANONICAL_COLUMNS.iter().copied().find(|column| column.name() == name)
	}

	/// Position in the canonical order.
	pub fn ordinal(self) -> usize {
		self as usize
	}
}

/// Canonical order. `Column as usize` indexes into this array.
pub const CANONICAL_COLUMNS: [Column; 37] = [
	Column::Model,
	Column::Id,
	Column::Name,
	Column::DisplayName,
	Column::Description,
	Column::Archived,
	Column::ArchivedDirectly,
	Column::CollectionId,
	Column::CollectionName,
	Column::CollectionType,
	Column::CollectionLocation,
	Column::CollectionAuthorityLevel,
	Column::TrashedFromCollectionId,
	Column::CollectionPosition,
	Column::CreatorId,
	Column::CreatedAt,
	Column::UpdatedAt,
	Column::Bookmark,
	Column::DashboardcardCount,
	Column::LastEditedAt,
	Column::LastEditorId,
	Column::ModeratedStatus,
	Column::Display,
	Column::DatasetQuery,
	Column::QueryType,
	Column::TableId,
	Column::TableSchema,
	Column::TableName,
	Column::TableDescription,
	Column::DatabaseId,
	Column::DatabaseName,
	Column::InitialSyncStatus,
	Column::ModelId,
	Column::ModelName,
	Column::ModelIndexId,
	Column::PkRef,
	Column::Location,
];
