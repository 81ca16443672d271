use std::collections::BTreeSet;

use trove_domain::{CANONICAL_COLUMNS, Column, ColumnType, SearchableModel, text};
use trove_storage::sql::{Expr, Select, Source};

use crate::search::{builder::build_model_query, context::SearchContext, projection::Target};

pub const UNION_ALIAS: &str = "search_union";

/// One query over every requested model, capped at `row_cap` rows.
pub fn combine(
	models: &BTreeSet<SearchableModel>,
	ctx: &SearchContext,
	target: Target,
	row_cap: u64,
) -> Select {
	let mut branches =
		models.iter().map(|model| build_model_query(*model, ctx, target)).collect::<Vec<_>>();

	match branches.len() {
		0 => empty(),
		1 => branches.remove(0).limit(row_cap),
		_ => {
			let mut select =
				Select::from(Source::Union { branches, alias: UNION_ALIAS.to_string() }).wildcard();

			if let Some(search_string) = &ctx.search_string {
				select = select.order_by(prefilter_rank(search_string), false);
			}

			select.limit(row_cap)
		},
	}
}

/// Typed-null projection that yields no rows.
fn empty() -> Select {
	CANONICAL_COLUMNS
		.iter()
		.fold(Select::default(), |select, column| {
			select.item(Expr::TypedNull(column.ty()), column.name())
		})
		.and_where(Expr::falsity())
}

/// Rows whose text contains the whole query sort first, so the row cap keeps them.
fn prefilter_rank(search_string: &str) -> Expr {
	let pattern = text::wildcard_match(search_string);
	let branches = CANONICAL_COLUMNS
		.iter()
		.filter(|column| column.ty() == ColumnType::Text && !excluded_from_prefilter(**column))
		.map(|column| (Expr::bare(column.name()).lower().like(pattern.clone()), Expr::lit(0)))
		.collect();

	Expr::Case { branches, otherwise: Box::new(Expr::lit(1)) }
}

fn excluded_from_prefilter(column: Column) -> bool {
	matches!(
		column,
		Column::Model
			| Column::CollectionAuthorityLevel
			| Column::ModeratedStatus
			| Column::InitialSyncStatus
			| Column::PkRef
			| Column::Location
			| Column::CollectionLocation
	)
}
