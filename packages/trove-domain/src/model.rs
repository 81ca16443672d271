use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::column::Column;

/// Entity types that can appear in search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchableModel {
	Dashboard,
	Metric,
	Segment,
	IndexedEntity,
	Card,
	Dataset,
	Collection,
	Table,
	Action,
	Database,
}
impl SearchableModel {
	/// Every model, in prior order: earlier models rank higher when other signals tie.
	pub const ALL: [Self; 10] = [
		Self::Dashboard,
		Self::Metric,
		Self::Segment,
		Self::IndexedEntity,
		Self::Card,
		Self::Dataset,
		Self::Collection,
		Self::Table,
		Self::Action,
		Self::Database,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Dashboard => "dashboard",
			Self::Metric => "metric",
			Self::Segment => "segment",
			Self::IndexedEntity => "indexed-entity",
			Self::Card => "card",
			Self::Dataset => "dataset",
			Self::Collection => "collection",
			Self::Table => "table",
			Self::Action => "action",
			Self::Database => "database",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		let raw = raw.trim();

		Self::ALL.into_iter().find(|model| model.as_str() == raw)
	}

	pub fn prior_position(self) -> usize {
		Self::ALL.iter().position(|model| *model == self).unwrap_or(Self::ALL.len())
	}

	/// Backing relation.
	pub fn relation(self) -> &'static str {
		match self {
			Self::Dashboard => "report_dashboard",
			Self::Metric | Self::Card | Self::Dataset => "report_card",
			Self::Segment => "segment",
			Self::IndexedEntity => "model_index_value",
			Self::Collection => "collection",
			Self::Table => "metabase_table",
			Self::Action => "action",
			Self::Database => "metabase_database",
		}
	}

	/// Alias of the backing relation inside generated queries.
	pub fn alias(self) -> &'static str {
		match self {
			Self::Dashboard => "dashboard",
			Self::Metric | Self::Card | Self::Dataset => "card",
			Self::Segment => "segment",
			Self::IndexedEntity => "model_index_value",
			Self::Collection => "collection",
			Self::Table => "tbl",
			Self::Action => "action",
			Self::Database => "db",
		}
	}

	/// Value of `report_card.type` for the card family.
	pub fn card_type(self) -> Option<&'static str> {
		match self {
			Self::Card => Some("question"),
			Self::Dataset => Some("model"),
			Self::Metric => Some("metric"),
			_ => None,
		}
	}

	/// Models stored in the same relation. Re-deriving one of them may move the entity to a
	/// sibling tag, e.g. a question converted into a model.
	pub fn family(self) -> &'static [Self] {
		match self {
			Self::Card | Self::Dataset | Self::Metric => &[Self::Card, Self::Dataset, Self::Metric],
			Self::Dashboard => &[Self::Dashboard],
			Self::Segment => &[Self::Segment],
			Self::IndexedEntity => &[Self::IndexedEntity],
			Self::Collection => &[Self::Collection],
			Self::Table => &[Self::Table],
			Self::Action => &[Self::Action],
			Self::Database => &[Self::Database],
		}
	}

	/// Label the revision log uses for this model.
	pub fn revision_label(self) -> Option<&'static str> {
		match self {
			Self::Card | Self::Dataset | Self::Metric => Some("Card"),
			Self::Dashboard => Some("Dashboard"),
			_ => None,
		}
	}

	/// Whether visibility is governed by collection permissions.
	pub fn is_collection_scoped(self) -> bool {
		matches!(
			self,
			Self::Dashboard
				| Self::Metric
				| Self::IndexedEntity
				| Self::Card
				| Self::Dataset
				| Self::Collection
				| Self::Action
		)
	}

	pub fn supports(self, filter: FilterKind) -> bool {
		match filter {
			FilterKind::Archived => matches!(
				self,
				Self::Dashboard
					| Self::Metric
					| Self::Segment
					| Self::Card
					| Self::Dataset
					| Self::Collection
					| Self::Action
			),
			FilterKind::CreatedAt => matches!(
				self,
				Self::Dashboard
					| Self::Metric
					| Self::Card
					| Self::Dataset
					| Self::Collection
					| Self::Table
					| Self::Action
					| Self::Database
			),
			FilterKind::CreatedBy => matches!(
				self,
				Self::Dashboard
					| Self::Metric
					| Self::Segment
					| Self::Card
					| Self::Dataset
					| Self::Action
			),
			FilterKind::LastEditedAt => matches!(
				self,
				Self::Dashboard | Self::Metric | Self::Card | Self::Dataset | Self::Action
			),
			FilterKind::LastEditedBy =>
				matches!(self, Self::Dashboard | Self::Metric | Self::Card | Self::Dataset),
			FilterKind::Verified => matches!(self, Self::Metric | Self::Card | Self::Dataset),
			FilterKind::DatabaseId =>
				matches!(self, Self::Metric | Self::Card | Self::Dataset | Self::Table),
			FilterKind::OnlyPersonalCollections => self.is_collection_scoped(),
		}
	}

	/// Text columns matched against query tokens.
	pub fn searchable_columns(self, include_native_query: bool) -> Vec<Column> {
		let mut columns = match self {
			Self::Table => vec![Column::Name, Column::DisplayName, Column::Description],
			Self::IndexedEntity => vec![Column::Name],
			_ => vec![Column::Name, Column::Description],
		};

		if include_native_query
			&& matches!(self, Self::Card | Self::Dataset | Self::Metric | Self::Action)
		{
			columns.push(Column::DatasetQuery);
		}

		columns
	}
}
impl Display for SearchableModel {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Optional request filters that only some models can honor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
	Archived,
	CreatedAt,
	CreatedBy,
	LastEditedAt,
	LastEditedBy,
	Verified,
	DatabaseId,
	OnlyPersonalCollections,
}
