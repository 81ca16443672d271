use trove_domain::{CollectionVisibility, Column, FilterKind, SearchableModel, text};
use trove_storage::sql::Expr;

use crate::search::{
	context::{DateRange, PersonalScope, SearchContext},
	projection::{PERMISSION_COLLECTION, Projection},
};

/// Conjunction of every filter fragment that applies to `model`, `None` when nothing applies.
pub fn build_filters(
	model: SearchableModel,
	ctx: &SearchContext,
	projection: &Projection,
) -> Option<Expr> {
	let mut parts = Vec::new();

	if let Some(matched) = text_match(model, ctx, projection) {
		parts.push(matched);
	}
	if model.supports(FilterKind::Archived) {
		parts.push(projection.expr(Column::Archived).clone().eq(Expr::lit(ctx.archived)));
	}
	if let Some(range) = &ctx.created_at
		&& model.supports(FilterKind::CreatedAt)
	{
		parts.extend(date_range(projection.expr(Column::CreatedAt), range));
	}
	if let Some(range) = &ctx.last_edited_at
		&& model.supports(FilterKind::LastEditedAt)
	{
		parts.extend(date_range(projection.expr(Column::LastEditedAt), range));
	}
	if let Some(ids) = &ctx.created_by
		&& model.supports(FilterKind::CreatedBy)
	{
		parts.push(projection.expr(Column::CreatorId).clone().in_list(ids.iter().copied()));
	}
	if let Some(ids) = &ctx.last_edited_by
		&& model.supports(FilterKind::LastEditedBy)
	{
		parts.push(projection.expr(Column::LastEditorId).clone().in_list(ids.iter().copied()));
	}
	if ctx.verified && model.supports(FilterKind::Verified) {
		parts.push(projection.expr(Column::ModeratedStatus).clone().eq(Expr::lit("verified")));
	}
	if let Some(db_id) = ctx.table_db_id
		&& model.supports(FilterKind::DatabaseId)
	{
		parts.push(projection.expr(Column::DatabaseId).clone().eq(Expr::lit(db_id)));
	}
	if model.is_collection_scoped() {
		parts.extend(collection_scope(ctx, projection));
	}

	if parts.is_empty() { None } else { Some(Expr::all(parts)) }
}

/// Expression naming the collection that governs visibility of a row.
pub fn collection_key(projection: &Projection) -> Expr {
	let collection_id = projection.expr(Column::CollectionId).clone();

	if projection.model() == SearchableModel::Collection
		|| !projection.provides(Column::TrashedFromCollectionId)
	{
		return collection_id;
	}

	Expr::coalesce(vec![projection.expr(Column::TrashedFromCollectionId).clone(), collection_id])
}

fn text_match(model: SearchableModel, ctx: &SearchContext, projection: &Projection) -> Option<Expr> {
	if ctx.tokens.is_empty() {
		return None;
	}

	let columns = model.searchable_columns(ctx.search_native_query);
	let per_token = ctx
		.tokens
		.iter()
		.map(|token| {
			let pattern = text::wildcard_match(token);

			Expr::any(
				columns
					.iter()
					.map(|column| {
						let matched = projection.expr(*column).clone().lower().like(pattern.clone());

						match column {
							Column::DatasetQuery => Expr::all(vec![
								projection.expr(Column::QueryType).clone().eq(Expr::lit("native")),
								matched,
							]),
							_ => matched,
						}
					})
					.collect(),
			)
		})
		.collect();

	Some(Expr::all(per_token))
}

fn date_range(expr: &Expr, range: &DateRange) -> Vec<Expr> {
	let mut parts = Vec::with_capacity(2);

	if let Some(start) = range.start {
		parts.push(expr.clone().gte(Expr::lit(start)));
	}
	if let Some(end) = range.end {
		parts.push(expr.clone().lt(Expr::lit(end)));
	}

	parts
}

fn collection_scope(ctx: &SearchContext, projection: &Projection) -> Vec<Expr> {
	let key = collection_key(projection);
	let perm = |name: &str| Expr::col(PERMISSION_COLLECTION, name);
	let mut parts = Vec::new();

	if let CollectionVisibility::Ids { ids, root } = ctx.permissions.visible_collections() {
		let mut allowed = vec![key.clone().in_list(ids.iter().copied())];

		if root {
			allowed.push(key.is_null());
		}

		parts.push(Expr::any(allowed));
	}

	parts.push(perm("namespace").is_null());

	match ctx.personal_scope {
		None => {},
		Some(PersonalScope::Only) => {
			if ctx.personal_collection_ids.is_empty() {
				parts.push(Expr::falsity());
			} else {
				let mut personal = vec![perm("personal_owner_id").is_not_null()];

				personal.extend(
					ctx.personal_collection_ids
						.iter()
						.map(|id| perm("location").like(format!("/{id}/%"))),
				);
				parts.push(Expr::any(personal));
			}
		},
		Some(PersonalScope::Exclude) => {
			let mut outside = vec![perm("personal_owner_id").is_null()];

			outside.extend(
				ctx.personal_collection_ids
					.iter()
					.map(|id| perm("location").not_like(format!("/{id}/%"))),
			);
			parts.push(Expr::any(vec![Expr::all(outside), perm("id").is_null()]));
		},
	}

	parts
}


#[cfg(test)]
mod tests {
	use std::collections::BTreeSet;

	use time::macros::datetime;

	use trove_domain::{Column, Feature, FeatureSet, FilterKind, SearchableModel};
	use trove_storage::sql::{Expr, SqlValue};

	use crate::search::{
		context::{PersonalScope, SearchRequest, validate},
		filter::{build_filters, collection_key, eval},
		projection::{Projection, Target},
	};

	fn request(q: &str, permissions: &[&str]) -> SearchRequest {
		SearchRequest {
			q: Some(q.to_string()),
			current_user_id: Some(1),
			permissions: Some(permissions.iter().map(|p| p.to_string()).collect()),
			..SearchRequest::default()
		}
	}

	fn cells(entries: &[(&str, &str, SqlValue)]) -> eval::Cells {
		entries
			.iter()
			.map(|(table, name, value)| ((table.to_string(), name.to_string()), value.clone()))
			.collect()
	}

	/// Cell key of a projected column, for models whose projection reads it straight from a
	/// relation.
	fn cell_key(projection: &Projection, column: Column) -> (String, String) {
		let Expr::Column { table, name } = projection.expr(column) else {
			panic!("{} {column:?} is not a plain column.", projection.model());
		};

		(table.clone().unwrap_or_default(), name.clone())
	}

	/// Evaluate the filters of every model supporting `kind`, on both engines, against rows that
	/// differ only in `column`.
	fn assert_fragment(
		req: SearchRequest,
		features: &FeatureSet,
		kind: FilterKind,
		column: Column,
		cases: &[(SqlValue, bool)],
	) {
		let ctx = validate(req, features, datetime!(2026-03-11 12:00 UTC)).expect("valid");
		let models = SearchableModel::ALL
			.into_iter()
			.filter(|model| model.supports(kind))
			.collect::<Vec<_>>();

		assert!(!models.is_empty());

		for model in models {
			assert!(ctx.models.contains(&model), "{model} must stay applicable");

			for target in [Target::Source, Target::Index] {
				let projection = Projection::new(model, target);
				let filter = build_filters(model, &ctx, &projection).expect("filter");

				for (value, expected) in cases {
					let mut row = eval::Cells::new();

					if model.supports(FilterKind::Archived) {
						row.insert(cell_key(&projection, Column::Archived), SqlValue::Bool(false));
					}

					row.insert(cell_key(&projection, column), value.clone());

					assert_eq!(
						eval::truth(&filter, &row) == Some(true),
						*expected,
						"{model} on {target:?} with {value:?}"
					);
				}
			}
		}
	}

	#[test]
	fn created_at_keeps_the_day_and_excludes_its_end() {
		let req = SearchRequest { created_at: Some("2026-03-05".to_string()), ..request("", &["/"]) };

		assert_fragment(req, &FeatureSet::default(), FilterKind::CreatedAt, Column::CreatedAt, &[
			(SqlValue::Timestamp(datetime!(2026-03-05 0:00 UTC)), true),
			(SqlValue::Timestamp(datetime!(2026-03-05 23:59 UTC)), true),
			(SqlValue::Timestamp(datetime!(2026-03-06 0:00 UTC)), false),
			(SqlValue::Timestamp(datetime!(2026-03-04 23:59 UTC)), false),
			(SqlValue::Null, false),
		]);
	}

	#[test]
	fn last_edited_at_keeps_the_day_and_excludes_its_end() {
		let req =
			SearchRequest { last_edited_at: Some("2026-03-05".to_string()), ..request("", &["/"]) };

		assert_fragment(req, &FeatureSet::default(), FilterKind::LastEditedAt, Column::LastEditedAt, &[
			(SqlValue::Timestamp(datetime!(2026-03-05 8:30 UTC)), true),
			(SqlValue::Timestamp(datetime!(2026-03-06 0:00 UTC)), false),
			(SqlValue::Timestamp(datetime!(2026-03-04 23:59 UTC)), false),
			(SqlValue::Null, false),
		]);
	}

	#[test]
	fn created_by_matches_listed_creators() {
		let req = SearchRequest { created_by: Some(vec![7, 9]), ..request("", &["/"]) };

		assert_fragment(req, &FeatureSet::default(), FilterKind::CreatedBy, Column::CreatorId, &[
			(SqlValue::Int(7), true),
			(SqlValue::Int(9), true),
			(SqlValue::Int(8), false),
			(SqlValue::Null, false),
		]);
	}

	#[test]
	fn last_edited_by_matches_listed_editors() {
		let req = SearchRequest { last_edited_by: Some(vec![7]), ..request("", &["/"]) };

		assert_fragment(req, &FeatureSet::default(), FilterKind::LastEditedBy, Column::LastEditorId, &[
			(SqlValue::Int(7), true),
			(SqlValue::Int(8), false),
			(SqlValue::Null, false),
		]);
	}

	#[test]
	fn verified_keeps_only_verified_moderation() {
		let req = SearchRequest { verified: true, ..request("", &["/"]) };
		let features = FeatureSet::default().with(Feature::ContentVerification);

		assert_fragment(req, &features, FilterKind::Verified, Column::ModeratedStatus, &[
			(SqlValue::from("verified"), true),
			(SqlValue::from("flagged"), false),
			(SqlValue::Null, false),
		]);
	}

	#[test]
	fn table_db_id_matches_the_database() {
		let req = SearchRequest { table_db_id: Some(3), ..request("", &["/"]) };

		assert_fragment(req, &FeatureSet::default(), FilterKind::DatabaseId, Column::DatabaseId, &[
			(SqlValue::Int(3), true),
			(SqlValue::Int(4), false),
			(SqlValue::Null, false),
		]);
	}

	#[test]
	fn actions_filter_last_edited_at_on_their_update_time() {
		let req =
			SearchRequest { last_edited_at: Some("past3days~".to_string()), ..request("", &["/"]) };
		let ctx =
			validate(req, &FeatureSet::default(), datetime!(2026-03-11 12:00 UTC)).expect("valid");
		let projection = Projection::new(SearchableModel::Action, Target::Source);
		let filter = build_filters(SearchableModel::Action, &ctx, &projection).expect("filter");
		let row = |updated_at: SqlValue| {
			cells(&[("action", "archived", SqlValue::Bool(false)), ("action", "updated_at", updated_at)])
		};

		assert!(ctx.models.contains(&SearchableModel::Action));
		assert_eq!(projection.expr(Column::LastEditedAt), &Expr::col("action", "updated_at"));
		assert_eq!(
			eval::truth(&filter, &row(SqlValue::Timestamp(datetime!(2026-03-11 9:00 UTC)))),
			Some(true)
		);
		assert_ne!(
			eval::truth(&filter, &row(SqlValue::Timestamp(datetime!(2026-03-01 9:00 UTC)))),
			Some(true)
		);
	}

	#[test]
	fn blank_query_adds_no_text_predicate() {
		let ctx = validate(request("   ", &["/"]), &FeatureSet::default(), datetime!(2026-03-11 12:00 UTC))
			.expect("valid");
		let projection = Projection::new(SearchableModel::Database, Target::Source);

		assert_eq!(build_filters(SearchableModel::Database, &ctx, &projection), None);
	}

	#[test]
	fn every_token_must_match_some_column() {
		let ctx = validate(
			request("Orders Q", &["/"]),
			&FeatureSet::default(),
			datetime!(2026-03-11 12:00 UTC),
		)
		.expect("valid");
		let projection = Projection::new(SearchableModel::Database, Target::Source);
		let filter = build_filters(SearchableModel::Database, &ctx, &projection).expect("text filter");
		let row = |name: &str, description: &str| {
			cells(&[
				("db", "name", SqlValue::from(name)),
				("db", "description", SqlValue::from(description)),
			])
		};

		assert_eq!(eval::truth(&filter, &row("Orders Quarterly", "")), Some(true));
		assert_eq!(eval::truth(&filter, &row("Orders", "Q3 numbers")), Some(true));
		assert_eq!(eval::truth(&filter, &row("Orders", "monthly")), Some(false));
	}

	#[test]
	fn native_query_matches_only_native_definitions() {
		let mut req = request("select", &["/"]);

		req.search_native_query = true;

		let ctx =
			validate(req, &FeatureSet::default(), datetime!(2026-03-11 12:00 UTC)).expect("valid");
		let projection = Projection::new(SearchableModel::Card, Target::Source);
		let filter = build_filters(SearchableModel::Card, &ctx, &projection).expect("filter");
		let row = |query_type: &str| {
			cells(&[
				("card", "name", SqlValue::from("Revenue")),
				("card", "archived", SqlValue::Bool(false)),
				("card", "dataset_query", SqlValue::from("SELECT * FROM orders")),
				("card", "query_type", SqlValue::from(query_type)),
			])
		};

		assert_eq!(eval::truth(&filter, &row("native")), Some(true));
		assert_ne!(eval::truth(&filter, &row("query")), Some(true));
	}

	#[test]
	fn collection_key_prefers_trashed_from() {
		let card = Projection::new(SearchableModel::Card, Target::Source);
		let collection = Projection::new(SearchableModel::Collection, Target::Source);

		assert_eq!(
			collection_key(&card),
			Expr::coalesce(vec![
				Expr::col("card", "trashed_from_collection_id"),
				Expr::col("card", "collection_id"),
			])
		);
		assert_eq!(collection_key(&collection), Expr::col("collection", "id"));
	}

	#[test]
	fn visibility_respects_root_access() {
		let ctx = validate(
			request("", &["/collection/5/read/"]),
			&FeatureSet::default(),
			datetime!(2026-03-11 12:00 UTC),
		)
		.expect("valid");
		let projection = Projection::new(SearchableModel::Dashboard, Target::Source);
		let filter = build_filters(SearchableModel::Dashboard, &ctx, &projection).expect("filter");
		let row = |collection_id: SqlValue| {
			cells(&[
				("dashboard", "archived", SqlValue::Bool(false)),
				("dashboard", "collection_id", collection_id),
			])
		};

		assert_eq!(eval::truth(&filter, &row(SqlValue::Int(5))), Some(true));
		assert_ne!(eval::truth(&filter, &row(SqlValue::Int(6))), Some(true));
		assert_ne!(eval::truth(&filter, &row(SqlValue::Null)), Some(true));
	}

	#[test]
	fn only_and_exclude_partition_non_root_collections() {
		let personal = BTreeSet::from([10, 20]);
		let scoped = |scope: PersonalScope| {
			let mut ctx = validate(request("", &["/"]), &FeatureSet::default(), datetime!(2026-03-11 12:00 UTC))
				.expect("valid")
				.with_personal_collection_ids(personal.clone());

			ctx.personal_scope = Some(scope);

			let projection = Projection::new(SearchableModel::Card, Target::Source);

			build_filters(SearchableModel::Card, &ctx, &projection).expect("filter")
		};
		let only = scoped(PersonalScope::Only);
		let exclude = scoped(PersonalScope::Exclude);
		let collections = [
			(10, Some(1), "/"),
			(11, None, "/10/"),
			(12, None, "/10/11/"),
			(20, Some(2), "/"),
			(30, None, "/"),
			(31, None, "/30/"),
			(32, None, "/30/31/"),
		];

		for (id, owner, location) in collections {
			let row = cells(&[
				("card", "archived", SqlValue::Bool(false)),
				("card", "collection_id", SqlValue::Int(id)),
				("perm_coll", "id", SqlValue::Int(id)),
				("perm_coll", "personal_owner_id", owner.map(SqlValue::Int).unwrap_or(SqlValue::Null)),
				("perm_coll", "location", SqlValue::from(location)),
			]);
			let in_only = eval::truth(&only, &row) == Some(true);
			let in_exclude = eval::truth(&exclude, &row) == Some(true);

			assert!(in_only != in_exclude, "collection {id} must land in exactly one scope");
		}

		let root = cells(&[("card", "archived", SqlValue::Bool(false))]);

		assert_ne!(eval::truth(&only, &root), Some(true));
		assert_eq!(eval::truth(&exclude, &root), Some(true));
	}

	#[test]
	fn only_without_personal_collections_matches_nothing() {
		let mut ctx = validate(request("", &["/"]), &FeatureSet::default(), datetime!(2026-03-11 12:00 UTC))
			.expect("valid");

		ctx.personal_scope = Some(PersonalScope::Only);

		let projection = Projection::new(SearchableModel::Collection, Target::Source);
		let filter = build_filters(SearchableModel::Collection, &ctx, &projection).expect("filter");
		let Expr::And(parts) = filter else {
			panic!("Expected a conjunction.");
		};

		assert!(parts.iter().any(Expr::is_falsity));
	}
}
