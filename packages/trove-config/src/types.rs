use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub search: Search,
	#[serde(default)]
	pub ranking: Ranking,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Search {
	/// Either "source" (query backing relations directly) or "index" (query `search_index`).
	#[serde(default = "default_engine")]
	pub engine: String,
	/// Server-side row cap applied to the combined query.
	pub db_max_results: u32,
	/// Number of positive-score results the ranker retains before it stops reading rows.
	pub max_filtered_results: u32,
	#[serde(default = "default_surrounding_match_context")]
	pub surrounding_match_context: u32,
	/// Enabled license features, e.g. "content-verification".
	#[serde(default)]
	pub features: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Ranking {
	pub stale_time_days: f32,
	pub dashboard_count_ceiling: f32,
	pub weights: RankingWeights,
	pub text: RankingText,
}
impl Default for Ranking {
	fn default() -> Self {
		Self {
			stale_time_days: 180.0,
			dashboard_count_ceiling: 50.0,
			weights: RankingWeights::default(),
			text: RankingText::default(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RankingWeights {
	pub text: f32,
	pub pinned: f32,
	pub bookmarked: f32,
	pub recency: f32,
	pub dashboard: f32,
	pub model: f32,
	pub official_collection: f32,
	pub verified: f32,
}
impl Default for RankingWeights {
	fn default() -> Self {
		Self {
			text: 1.0,
			pinned: 2.0,
			bookmarked: 2.0,
			recency: 1.5,
			dashboard: 1.0,
			model: 0.5,
			official_collection: 2.0,
			verified: 2.0,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RankingText {
	pub exact_match: f32,
	pub consecutivity: f32,
	pub total_occurrences: f32,
	pub fullness: f32,
	pub prefix: f32,
}
impl Default for RankingText {
	fn default() -> Self {
		Self {
			exact_match: 4.0,
			consecutivity: 2.0,
			total_occurrences: 2.0,
			fullness: 1.0,
			prefix: 1.0,
		}
	}
}

fn default_engine() -> String {
	"source".to_string()
}

fn default_surrounding_match_context() -> u32 {
	2
}
