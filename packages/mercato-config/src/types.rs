use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub retrieval: Retrieval,
	#[serde(default)]
	pub ranking: Ranking,
	#[serde(default)]
	pub catalog: Catalog,
	#[serde(default)]
	pub sessions: Sessions,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

/// Which vector index backend serves this process. A static startup choice,
/// never a per-request decision.
#[derive(Debug, Deserialize)]
pub struct Retrieval {
	pub provider: String,
	#[serde(default = "default_candidate_k")]
	pub candidate_k: u32,
	#[serde(default = "default_blend_weight")]
	pub blend_weight: f32,
	#[serde(default = "default_rrf_k")]
	pub rrf_k: u32,
	#[serde(default = "default_retrieval_timeout_ms")]
	pub timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Ranking {
	pub exact_match_weight: f32,
	pub brand_match_weight: f32,
	pub recency_weight: f32,
	pub recency_half_life_days: f32,
	pub popularity_weight: f32,
	pub price_position_weight: f32,
	pub max_boost: f32,
	pub max_total_boost: f32,
}
impl Default for Ranking {
	fn default() -> Self {
		Self {
			exact_match_weight: 0.25,
			brand_match_weight: 0.2,
			recency_weight: 0.15,
			recency_half_life_days: 30.0,
			popularity_weight: 0.1,
			price_position_weight: 0.1,
			max_boost: 1.5,
			max_total_boost: 3.0,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Catalog {
	pub lookup_timeout_ms: u64,
}
impl Default for Catalog {
	fn default() -> Self {
		Self { lookup_timeout_ms: 1_500 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Sessions {
	pub ttl_minutes: i64,
	pub capacity: u32,
}
impl Default for Sessions {
	fn default() -> Self {
		Self { ttl_minutes: 15, capacity: 1_024 }
	}
}

fn default_candidate_k() -> u32 {
	50
}

fn default_blend_weight() -> f32 {
	0.5
}

fn default_rrf_k() -> u32 {
	60
}

fn default_retrieval_timeout_ms() -> u64 {
	2_000
}
