mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, Postgres, Ranking, RankingText, RankingWeights, Search, Service, Storage};

use std::{fs, path::Path};

use trove_domain::Feature;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if !matches!(cfg.search.engine.as_str(), "source" | "index") {
		return Err(Error::Validation {
			message: "search.engine must be one of source or index.".to_string(),
		});
	}
	if cfg.search.db_max_results == 0 {
		return Err(Error::Validation {
			message: "search.db_max_results must be greater than zero.".to_string(),
		});
	}
	if cfg.search.max_filtered_results == 0 {
		return Err(Error::Validation {
			message: "search.max_filtered_results must be greater than zero.".to_string(),
		});
	}
	if cfg.search.max_filtered_results > cfg.search.db_max_results {
		return Err(Error::Validation {
			message: "search.max_filtered_results must not exceed search.db_max_results."
				.to_string(),
		});
	}

	for feature in &cfg.search.features {
		if Feature::parse(feature).is_none() {
			return Err(Error::Validation {
				message: format!("search.features contains unknown feature '{feature}'."),
			});
		}
	}

	if !cfg.ranking.stale_time_days.is_finite() || cfg.ranking.stale_time_days <= 0.0 {
		return Err(Error::Validation {
			message: "ranking.stale_time_days must be a finite number greater than zero."
				.to_string(),
		});
	}
	if !cfg.ranking.dashboard_count_ceiling.is_finite()
		|| cfg.ranking.dashboard_count_ceiling <= 0.0
	{
		return Err(Error::Validation {
			message: "ranking.dashboard_count_ceiling must be a finite number greater than zero."
				.to_string(),
		});
	}

	let weights = &cfg.ranking.weights;
	let text = &cfg.ranking.text;

	for (label, value) in [
		("ranking.weights.text", weights.text),
		("ranking.weights.pinned", weights.pinned),
		("ranking.weights.bookmarked", weights.bookmarked),
		("ranking.weights.recency", weights.recency),
		("ranking.weights.dashboard", weights.dashboard),
		("ranking.weights.model", weights.model),
		("ranking.weights.official_collection", weights.official_collection),
		("ranking.weights.verified", weights.verified),
		("ranking.text.exact_match", text.exact_match),
		("ranking.text.consecutivity", text.consecutivity),
		("ranking.text.total_occurrences", text.total_occurrences),
		("ranking.text.fullness", text.fullness),
		("ranking.text.prefix", text.prefix),
	] {
		if !value.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if value < 0.0 {
			return Err(Error::Validation { message: format!("{label} must be zero or greater.") });
		}
	}

	if weights.text == 0.0 {
		return Err(Error::Validation {
			message: "ranking.weights.text must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.search.engine = cfg.search.engine.trim().to_ascii_lowercase();

	let mut features: Vec<String> = cfg
		.search
		.features
		.iter()
		.map(|feature| feature.trim().to_ascii_lowercase())
		.filter(|feature| !feature.is_empty())
		.collect();

	features.sort();
	features.dedup();

	cfg.search.features = features;
}
