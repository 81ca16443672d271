//! Turning rows into permission-checked, scored results and ranked results into a response.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::{
	Result,
	search::{
		context::SearchContext,
		rank::ScoredResult,
		result::{SearchResult, location_ids},
		scoring::{MatchContext, Scorer},
	},
};
use trove_domain::{Column, CreateQueries, PermissionSet, SearchableModel, ViewData};
use trove_storage::{
	Row, SearchStore,
	lookups::{self, CollectionRecord},
};

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
	pub available_models: Vec<SearchableModel>,
	pub data: Vec<SerializedResult>,
	pub limit: Option<u32>,
	pub offset: Option<u32>,
	/// Echo of the requested models.
	pub models: Option<Vec<SearchableModel>>,
	pub table_db_id: Option<i64>,
	pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionSummary {
	pub id: Option<i64>,
	pub name: Option<String>,
	pub authority_level: Option<String>,
	#[serde(rename = "type")]
	pub collection_type: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub effective_ancestors: Option<Vec<CollectionRecord>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreEntry {
	pub name: &'static str,
	pub weight: f32,
	pub score: f32,
	pub column: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SerializedResult {
	pub model: SearchableModel,
	pub id: i64,
	pub name: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub display_name: Option<String>,
	pub description: Option<String>,
	pub archived: bool,
	pub collection: CollectionSummary,
	pub context: Option<MatchContext>,
	pub score: f32,
	pub scores: Vec<ScoreEntry>,
	pub bookmark: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub archived_directly: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub collection_position: Option<i64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub creator_id: Option<i64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub creator_common_name: Option<String>,
	#[serde(with = "crate::time_serde::option", skip_serializing_if = "Option::is_none")]
	pub created_at: Option<OffsetDateTime>,
	#[serde(with = "crate::time_serde::option", skip_serializing_if = "Option::is_none")]
	pub updated_at: Option<OffsetDateTime>,
	#[serde(with = "crate::time_serde::option", skip_serializing_if = "Option::is_none")]
	pub last_edited_at: Option<OffsetDateTime>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub last_editor_id: Option<i64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub last_editor_common_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub dashboardcard_count: Option<i64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub moderated_status: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub display: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub dataset_query: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub query_type: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub table_id: Option<i64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub table_schema: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub table_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub table_description: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub database_id: Option<i64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub database_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub initial_sync_status: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub model_id: Option<i64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub model_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub model_index_id: Option<i64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub pk_ref: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub effective_location: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub can_write: Option<bool>,
}

/// Decode, authorize and score one row. `None` drops the row.
pub fn prepare_row(
	row: Row,
	permissions: &PermissionSet,
	scorer: &Scorer,
) -> Result<Option<ScoredResult>> {
	let mut result = SearchResult::from_row(row)?;

	if !is_readable(&result, permissions) {
		return Ok(None);
	}

	result.dataset_query =
		parse_json(&result, Column::DatasetQuery, result.dataset_query_text.as_deref());
	result.pk_ref = parse_json(&result, Column::PkRef, result.pk_ref_text.as_deref());

	let score = scorer.score(&result);

	Ok(Some(ScoredResult { result, score }))
}

/// Checks the store cannot express in SQL.
pub fn is_readable(result: &SearchResult, permissions: &PermissionSet) -> bool {
	if permissions.is_admin() {
		return true;
	}

	let model = result.model;

	if model.is_collection_scoped() && result.archived {
		return permissions.can_write_collection(result.permission_collection_id());
	}

	let Some(db_id) = result.database_id else {
		return !matches!(
			model,
			SearchableModel::Table
				| SearchableModel::Segment
				| SearchableModel::Database
				| SearchableModel::IndexedEntity
		);
	};

	match model {
		SearchableModel::Table | SearchableModel::Segment => {
			let table_id = match model {
				SearchableModel::Table => Some(result.id),
				_ => result.table_id,
			};

			permissions.view_data(db_id) == ViewData::Unrestricted
				&& permissions.create_queries(db_id, result.table_schema.as_deref(), table_id)
					>= CreateQueries::QueryBuilder
		},
		SearchableModel::Database =>
			permissions.create_queries(db_id, None, None) >= CreateQueries::QueryBuilder,
		SearchableModel::IndexedEntity =>
			permissions.view_data(db_id) == ViewData::Unrestricted
				&& permissions.create_queries(db_id, None, None)
					== CreateQueries::QueryBuilderAndNative,
		_ => true,
	}
}

fn parse_json(result: &SearchResult, column: Column, raw: Option<&str>) -> Option<Value> {
	let raw = raw?;

	match serde_json::from_str(raw) {
		Ok(value) => Some(value),
		Err(err) => {
			tracing::warn!(
				model = %result.model,
				id = result.id,
				column = column.name(),
				error = %err,
				"Dropping unparsable JSON column."
			);

			None
		},
	}
}

/// Hydrate the requested page of ranked results and assemble the response.
pub async fn materialize(
	ranked: Vec<ScoredResult>,
	ctx: &SearchContext,
	store: &dyn SearchStore,
) -> Result<SearchResponse> {
	let available_models = ranked
		.iter()
		.map(|scored| scored.result.model)
		.collect::<BTreeSet<_>>()
		.into_iter()
		.collect::<Vec<_>>();
	let total = ranked.len();
	let offset = ctx.offset.unwrap_or(0) as usize;
	let page = ranked
		.into_iter()
		.skip(offset)
		.take(ctx.limit.map(|limit| limit as usize).unwrap_or(usize::MAX))
		.collect::<Vec<_>>();
	let user_ids = page
		.iter()
		.flat_map(|scored| [scored.result.creator_id, scored.result.last_editor_id])
		.flatten()
		.collect::<BTreeSet<_>>();
	let users = lookups::users_by_id(store, &user_ids).await?;
	let referenced = referenced_collections(&page, ctx);
	let collections = lookups::collections_by_id(store, &referenced).await?;
	let data = page
		.into_iter()
		.map(|scored| to_serialized(scored, ctx, &users, &collections))
		.collect();

	Ok(SearchResponse {
		available_models,
		data,
		limit: ctx.limit,
		offset: ctx.offset,
		models: ctx.requested_models.clone(),
		table_db_id: ctx.table_db_id,
		total,
	})
}

/// Ancestor and parent collections the page needs, restricted to readable ones.
fn referenced_collections(page: &[ScoredResult], ctx: &SearchContext) -> BTreeSet<i64> {
	let mut ids = BTreeSet::new();

	for scored in page {
		let result = &scored.result;
		let location = match result.model {
			SearchableModel::Collection => result.location.as_deref(),
			SearchableModel::Dataset if ctx.model_ancestors => result.collection_location.as_deref(),
			_ => None,
		};

		if let Some(location) = location {
			ids.extend(
				location_ids(location)
					.into_iter()
					.filter(|id| ctx.permissions.can_read_collection(Some(*id))),
			);
		}
	}

	ids
}

fn to_serialized(
	scored: ScoredResult,
	ctx: &SearchContext,
	users: &HashMap<i64, lookups::UserRecord>,
	collections: &HashMap<i64, CollectionRecord>,
) -> SerializedResult {
	let ScoredResult { result, score } = scored;
	let name = match score.matched_column() {
		Some(Column::DisplayName) => result.display_name.clone().unwrap_or_else(|| result.name.clone()),
		_ => result.name.clone(),
	};
	let common_name =
		|id: Option<i64>| id.and_then(|id| users.get(&id)).map(|user| user.common_name());
	let visible = |location: &str| {
		location_ids(location)
			.into_iter()
			.filter(|id| collections.contains_key(id))
			.collect::<Vec<_>>()
	};
	let mut effective_location = None;
	let mut can_write = None;
	let collection = match result.model {
		SearchableModel::Collection => {
			let path = visible(result.location.as_deref().unwrap_or("/"));
			let parent = path.last().and_then(|id| collections.get(id));

			effective_location = Some(render_location(&path));
			can_write = Some(ctx.permissions.can_write_collection(Some(result.id)));

			CollectionSummary {
				id: parent.map(|parent| parent.id),
				name: parent.map(|parent| parent.name.clone()),
				authority_level: parent.and_then(|parent| parent.authority_level.clone()),
				collection_type: parent.and_then(|parent| parent.collection_type.clone()),
				effective_ancestors: None,
			}
		},
		model => CollectionSummary {
			id: result.collection_id,
			name: result.collection_name.clone(),
			authority_level: result.collection_authority_level.clone(),
			collection_type: result.collection_type.clone(),
			effective_ancestors: (model == SearchableModel::Dataset && ctx.model_ancestors).then(
				|| {
					visible(result.collection_location.as_deref().unwrap_or("/"))
						.iter()
						.filter_map(|id| collections.get(id).cloned())
						.collect()
				},
			),
		},
	};
	let context = score.text().and_then(|text| text.context.clone());
	let scores = score
		.scores
		.iter()
		.map(|sub| ScoreEntry {
			name: sub.name,
			weight: sub.weight,
			score: sub.score,
			column: sub.column.map(Column::name),
		})
		.collect();

	SerializedResult {
		model: result.model,
		id: result.id,
		name,
		display_name: result.display_name,
		description: result.description,
		archived: result.archived,
		collection,
		context,
		score: score.total,
		scores,
		bookmark: result.bookmark,
		archived_directly: result.archived_directly,
		collection_position: result.collection_position,
		creator_id: result.creator_id,
		creator_common_name: common_name(result.creator_id),
		created_at: result.created_at,
		updated_at: result.updated_at,
		last_edited_at: result.last_edited_at,
		last_editor_id: result.last_editor_id,
		last_editor_common_name: common_name(result.last_editor_id),
		dashboardcard_count: result.dashboardcard_count,
		moderated_status: result.moderated_status,
		display: result.display,
		dataset_query: result.dataset_query,
		query_type: result.query_type,
		table_id: result.table_id,
		table_schema: result.table_schema,
		table_name: result.table_name,
		table_description: result.table_description,
		database_id: result.database_id,
		database_name: result.database_name,
		initial_sync_status: result.initial_sync_status,
		model_id: result.model_id,
		model_name: result.model_name,
		model_index_id: result.model_index_id,
		pk_ref: result.pk_ref,
		effective_location,
		can_write,
	}
}

fn render_location(ids: &[i64]) -> String {
	let mut out = String::from("/");

	for id in ids {
		out.push_str(&id.to_string());
		out.push('/');
	}

	out
}
