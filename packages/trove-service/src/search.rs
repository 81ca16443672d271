pub mod builder;
pub mod combine;
pub mod context;
pub mod filter;
pub mod materialize;
pub mod projection;
pub mod rank;
pub mod result;
pub mod scoring;

use time::OffsetDateTime;
use tracing::debug;

use crate::{Result, SearchService};
use trove_storage::{lookups, sql};

pub use context::{SearchContext, SearchRequest};
pub use materialize::{SearchResponse, SerializedResult};
pub use projection::Target;

impl SearchService {
	pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse> {
		let now = OffsetDateTime::now_utc();
		let ctx = context::validate(request, &self.features, now)?;
		let ctx = if ctx.needs_personal_collection_ids() {
			let ids = lookups::personal_collection_ids(self.store.as_ref()).await?;

			ctx.with_personal_collection_ids(ids)
		} else {
			ctx
		};
		let search_cfg = &self.cfg.search;
		let select = combine::combine(
			&ctx.models,
			&ctx,
			self.target(),
			u64::from(search_cfg.db_max_results),
		);
		let query = sql::compile(&select, self.store.dialect());

		debug!(
			models = ctx.models.len(),
			params = query.params.len(),
			sql = %query.sql,
			"Compiled search query."
		);

		let scorer = scoring::Scorer::new(
			&self.cfg.ranking,
			&self.features,
			ctx.search_string.as_deref(),
			ctx.search_native_query,
			search_cfg.surrounding_match_context as usize,
			now,
		);
		let ranked = rank::rank(
			self.store.stream(&query),
			search_cfg.max_filtered_results as usize,
			|row| materialize::prepare_row(row, &ctx.permissions, &scorer),
		)
		.await?;

		materialize::materialize(ranked, &ctx, self.store.as_ref()).await
	}

	fn target(&self) -> Target {
		match self.cfg.search.engine.as_str() {
			"index" => Target::Index,
			_ => Target::Source,
		}
	}
}
