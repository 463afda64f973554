mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Catalog, Config, EmbeddingProviderConfig, Postgres, Providers, Qdrant, Ranking, Retrieval,
	Service, Sessions, Storage,
};

use std::{fs, path::Path};

pub const PROVIDER_PGVECTOR: &str = "pgvector";
pub const PROVIDER_DUAL_INDEX: &str = "dual_index";

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
	if cfg.storage.qdrant.collection.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.collection must be non-empty.".to_string(),
		});
	}
	if cfg.storage.qdrant.vector_dim == 0 {
		return Err(Error::Validation {
			message: "storage.qdrant.vector_dim must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.embedding.api_key must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}
	if cfg.providers.embedding.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.timeout_ms must be greater than zero.".to_string(),
		});
	}

	if !matches!(cfg.retrieval.provider.as_str(), PROVIDER_PGVECTOR | PROVIDER_DUAL_INDEX) {
		return Err(Error::Validation {
			message: "retrieval.provider must be one of pgvector or dual_index.".to_string(),
		});
	}
	if cfg.retrieval.candidate_k == 0 {
		return Err(Error::Validation {
			message: "retrieval.candidate_k must be greater than zero.".to_string(),
		});
	}
	if !cfg.retrieval.blend_weight.is_finite() || !(0.0..=1.0).contains(&cfg.retrieval.blend_weight)
	{
		return Err(Error::Validation {
			message: "retrieval.blend_weight must be in the range 0.0-1.0.".to_string(),
		});
	}
	if cfg.retrieval.rrf_k == 0 {
		return Err(Error::Validation {
			message: "retrieval.rrf_k must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "retrieval.timeout_ms must be greater than zero.".to_string(),
		});
	}

	for (path, value) in [
		("ranking.exact_match_weight", cfg.ranking.exact_match_weight),
		("ranking.brand_match_weight", cfg.ranking.brand_match_weight),
		("ranking.recency_weight", cfg.ranking.recency_weight),
		("ranking.popularity_weight", cfg.ranking.popularity_weight),
		("ranking.price_position_weight", cfg.ranking.price_position_weight),
	] {
		if !value.is_finite() || value < 0.0 {
			return Err(Error::Validation {
				message: format!("{path} must be a finite number of zero or greater."),
			});
		}
	}
	if !cfg.ranking.recency_half_life_days.is_finite() || cfg.ranking.recency_half_life_days <= 0.0
	{
		return Err(Error::Validation {
			message: "ranking.recency_half_life_days must be greater than zero.".to_string(),
		});
	}
	if !cfg.ranking.max_boost.is_finite() || cfg.ranking.max_boost < 1.0 {
		return Err(Error::Validation {
			message: "ranking.max_boost must be 1.0 or greater.".to_string(),
		});
	}
	if !cfg.ranking.max_total_boost.is_finite() || cfg.ranking.max_total_boost < cfg.ranking.max_boost
	{
		return Err(Error::Validation {
			message: "ranking.max_total_boost must be at least ranking.max_boost.".to_string(),
		});
	}

	if cfg.catalog.lookup_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "catalog.lookup_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.sessions.ttl_minutes <= 0 {
		return Err(Error::Validation {
			message: "sessions.ttl_minutes must be greater than zero.".to_string(),
		});
	}
	if cfg.sessions.capacity == 0 {
		return Err(Error::Validation {
			message: "sessions.capacity must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.retrieval.provider = cfg.retrieval.provider.trim().to_ascii_lowercase();
	cfg.service.log_level = cfg.service.log_level.trim().to_string();
}
