//! Per-model query construction.
//!
//! Every builder is pure: the same model, context and target always produce the same AST. The
//! select list is the model's projection, so branches can be combined with `UNION ALL`.

use trove_domain::{Column, ColumnType, SearchableModel};
use trove_storage::{
	schema::SEARCH_INDEX_TABLE,
	sql::{Expr, JoinKind, Select, Source},
};

use crate::search::{
	context::SearchContext,
	filter::{self, build_filters},
	projection::{
		BOOKMARK, DATABASE, DISPLAY_COLLECTION, INDEX, MODEL_CARD, MODEL_INDEX, MODERATION,
		PERMISSION_COLLECTION, Projection, QUERY_ACTION, REVISION, TABLE, Target,
	},
};

/// The full per-request query for one model.
pub fn build_model_query(model: SearchableModel, ctx: &SearchContext, target: Target) -> Select {
	let projection = Projection::new(model, target);
	let mut select = match target {
		Target::Source => static_relations(model),
		Target::Index => Select::from(Source::table(SEARCH_INDEX_TABLE, INDEX))
			.and_where(Expr::col(INDEX, "model").eq(Expr::lit(model.as_str()))),
	};

	if let Some(bookmark) = bookmark_join(model, target, ctx.current_user_id) {
		select = select.join(JoinKind::Left, bookmark.0, bookmark.1);
	}
	if model.is_collection_scoped() {
		select = select.join(
			JoinKind::Left,
			Source::table("collection", PERMISSION_COLLECTION),
			Expr::col(PERMISSION_COLLECTION, "id").eq(filter::collection_key(&projection)),
		);
	}
	if let Some(predicate) = build_filters(model, ctx, &projection) {
		select = select.and_where(predicate);
	}
	if model == SearchableModel::IndexedEntity && ctx.is_sandboxed {
		select = select.and_where(Expr::falsity());
	}

	projection.apply(select)
}

/// User-independent query over the backing relations, used to populate the index.
pub fn build_static_projection(model: SearchableModel) -> (Select, Projection) {
	let mut projection = Projection::new(model, Target::Source);

	projection.replace(Column::Bookmark, Expr::TypedNull(ColumnType::Boolean));

	(projection.apply(static_relations(model)), projection)
}

/// Relation, joins and predicates that do not depend on the requesting user.
fn static_relations(model: SearchableModel) -> Select {
	let own = |name: &str| Expr::col(model.alias(), name);
	let base = Select::from(Source::table(model.relation(), model.alias()));

	match model {
		SearchableModel::Card | SearchableModel::Dataset | SearchableModel::Metric => {
			let select = match model.card_type() {
				Some(card_type) => base.and_where(own("type").eq(Expr::lit(card_type))),
				None => base,
			};

			with_revision(with_display_collection(select, own("collection_id")), model)
				.join(
					JoinKind::Left,
					Source::table("moderation_review", MODERATION),
					Expr::all(vec![
						Expr::col(MODERATION, "moderated_item_id").eq(own("id")),
						Expr::col(MODERATION, "moderated_item_type").eq(Expr::lit("card")),
						Expr::col(MODERATION, "most_recent").eq(Expr::truth()),
					]),
				)
		},
		SearchableModel::Dashboard =>
			with_revision(with_display_collection(base, own("collection_id")), model),
		SearchableModel::Collection => base.and_where(Expr::any(vec![
			own("type").is_null(),
			own("type").not_eq(Expr::lit("trash")),
		])),
		SearchableModel::Table => base
			.join(
				JoinKind::Inner,
				Source::table("metabase_database", DATABASE),
				Expr::col(DATABASE, "id").eq(own("db_id")),
			)
			.and_where(own("active").eq(Expr::truth()))
			.and_where(own("visibility_type").is_null()),
		SearchableModel::Database => base,
		SearchableModel::Segment => base.join(
			JoinKind::Inner,
			Source::table("metabase_table", TABLE),
			Expr::col(TABLE, "id").eq(own("table_id")),
		),
		SearchableModel::Action => {
			let select = with_model_card(base, own("model_id")).join(
				JoinKind::Left,
				Source::table("query_action", QUERY_ACTION),
				Expr::col(QUERY_ACTION, "action_id").eq(own("id")),
			);

			with_display_collection(select, Expr::col(MODEL_CARD, "collection_id"))
		},
		SearchableModel::IndexedEntity => {
			let select = base.join(
				JoinKind::Inner,
				Source::table("model_index", MODEL_INDEX),
				Expr::col(MODEL_INDEX, "id").eq(own("model_index_id")),
			);
			let select = with_model_card(select, Expr::col(MODEL_INDEX, "model_id"));

			with_display_collection(select, Expr::col(MODEL_CARD, "collection_id"))
		},
	}
}

fn with_display_collection(select: Select, collection_id: Expr) -> Select {
	select.join(
		JoinKind::Left,
		Source::table("collection", DISPLAY_COLLECTION),
		Expr::col(DISPLAY_COLLECTION, "id").eq(collection_id),
	)
}

fn with_model_card(select: Select, model_id: Expr) -> Select {
	select.join(
		JoinKind::Inner,
		Source::table("report_card", MODEL_CARD),
		Expr::all(vec![
			Expr::col(MODEL_CARD, "id").eq(model_id),
			Expr::col(MODEL_CARD, "archived").eq(Expr::falsity()),
		]),
	)
}

fn with_revision(select: Select, model: SearchableModel) -> Select {
	let Some(label) = model.revision_label() else {
		return select;
	};

	select.join(
		JoinKind::Left,
		Source::table("revision", REVISION),
		Expr::all(vec![
			Expr::col(REVISION, "model_id").eq(Expr::col(model.alias(), "id")),
			Expr::col(REVISION, "model").eq(Expr::lit(label)),
			Expr::col(REVISION, "most_recent").eq(Expr::truth()),
		]),
	)
}

/// Bookmark join for models users can bookmark.
fn bookmark_join(model: SearchableModel, target: Target, user_id: i64) -> Option<(Source, Expr)> {
	let (relation, key) = match model {
		SearchableModel::Card | SearchableModel::Dataset | SearchableModel::Metric =>
			("card_bookmark", "card_id"),
		SearchableModel::Dashboard => ("dashboard_bookmark", "dashboard_id"),
		SearchableModel::Collection => ("collection_bookmark", "collection_id"),
		_ => return None,
	};
	let entity_id = match target {
		Target::Source => Expr::col(model.alias(), "id"),
		Target::Index => Expr::col(INDEX, "id"),
	};

	Some((
		Source::table(relation, BOOKMARK),
		Expr::all(vec![
			Expr::col(BOOKMARK, key).eq(entity_id),
			Expr::col(BOOKMARK, "user_id").eq(Expr::lit(user_id)),
		]),
	))
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use trove_domain::{Column, ColumnType, FeatureSet, SearchableModel};
	use trove_storage::sql::{Dialect, Expr, SelectItem, compile};

	use crate::search::{
		builder::{build_model_query, build_static_projection},
		context::{SearchContext, SearchRequest, validate},
		projection::{BOOKMARK, PERMISSION_COLLECTION, Target},
	};

	fn context(q: &str, sandboxed: bool) -> SearchContext {
		let features = FeatureSet::from_names(["sandboxes"]);
		let request = SearchRequest {
			q: Some(q.to_string()),
			current_user_id: Some(7),
			permissions: Some(vec!["/collection/root/".to_string()]),
			is_sandboxed: sandboxed,
			..SearchRequest::default()
		};

		validate(request, &features, datetime!(2026-03-11 12:00 UTC)).expect("valid")
	}

	#[test]
	fn card_family_is_discriminated_by_type() {
		let query = compile(
			&build_model_query(SearchableModel::Dataset, &context("orders", false), Target::Source),
			Dialect::Postgres,
		);

		assert!(query.sql.contains("FROM report_card card"));
		assert!(query.params.contains(&"model".into()));
		assert!(query.sql.contains("LEFT JOIN card_bookmark bookmark"));
		assert!(query.sql.contains("LEFT JOIN moderation_review mr"));
		assert!(query.params.contains(&7_i64.into()));
	}

	#[test]
	fn collection_scoped_models_join_the_permission_collection() {
		for model in SearchableModel::ALL {
			for target in [Target::Source, Target::Index] {
				let select = build_model_query(model, &context("", false), target);

				assert_eq!(
					select.has_join(PERMISSION_COLLECTION),
					model.is_collection_scoped(),
					"{model}"
				);
			}
		}
	}

	#[test]
	fn sandboxed_users_never_see_indexed_entities() {
		let open =
			build_model_query(SearchableModel::IndexedEntity, &context("", false), Target::Source);
		let sandboxed =
			build_model_query(SearchableModel::IndexedEntity, &context("", true), Target::Source);
		let has_false = |filter: &Option<Expr>| match filter {
			Some(Expr::And(parts)) => parts.iter().any(Expr::is_falsity),
			Some(other) => other.is_falsity(),
			None => false,
		};

		assert!(!has_false(&open.filter));
		assert!(has_false(&sandboxed.filter));
	}

	#[test]
	fn index_target_reads_search_index() {
		let query = compile(
			&build_model_query(SearchableModel::Collection, &context("", false), Target::Index),
			Dialect::Postgres,
		);

		assert!(query.sql.contains("FROM search_index si"));
		assert!(query.sql.contains("si.model = $"));
		assert!(query.sql.contains("ON (bookmark.collection_id = si.id AND"));
	}

	#[test]
	fn static_projection_has_no_user_joins() {
		for model in SearchableModel::ALL {
			let (select, projection) = build_static_projection(model);

			assert!(!select.has_join(BOOKMARK));
			assert!(!select.has_join(PERMISSION_COLLECTION));
			assert_eq!(projection.expr(Column::Bookmark), &Expr::TypedNull(ColumnType::Boolean));

			let SelectItem::Expr { alias, .. } = &select.items[0] else {
				panic!("Expected a projected column.");
			};

			assert_eq!(alias.as_deref(), Some("model"));
		}
	}
}
