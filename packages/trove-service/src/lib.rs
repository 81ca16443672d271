pub mod index;
pub mod search;
pub mod time_serde;

mod error;

pub use error::{Error, Result};
pub use index::{ChangeKind, ChangeReport, Indexer, ReindexReport};
pub use search::{SearchContext, SearchRequest, SearchResponse, SerializedResult, Target};

use std::sync::Arc;

use trove_config::Config;
use trove_domain::FeatureSet;
use trove_storage::SearchStore;

pub struct SearchService {
	pub cfg: Config,
	pub store: Arc<dyn SearchStore>,
	features: FeatureSet,
}
impl SearchService {
	pub fn new(cfg: Config, store: Arc<dyn SearchStore>) -> Self {
		let features = FeatureSet::from_names(&cfg.search.features);

		Self { cfg, store, features }
	}
}
