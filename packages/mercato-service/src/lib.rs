pub mod boost;
pub mod compare;
mod enrich;
mod error;
pub mod filter;
pub mod fusion;
pub mod retrieval;
pub mod search;
pub mod session;

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc, time::Duration};

pub use compare::{Aspect, AspectDiff, AspectValue, ComparisonReport, Recommendation};
pub use error::{Error, Result};
pub use filter::FilterResponse;
pub use retrieval::{ChannelCandidates, ChannelFailure, RetrievalInput, RetrievalOutput};
pub use search::SearchResponse;
pub use session::SessionCache;

use mercato_config::{Config, EmbeddingProviderConfig};
use mercato_domain::CatalogAttributes;
use mercato_providers::QueryEmbedding;
use mercato_storage::{db::Db, qdrant::QdrantStore};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Text → vector adapter over the external embedding service.
pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		text: &'a str,
	) -> BoxFuture<'a, Result<QueryEmbedding>>;
}

/// Similarity search over a configured index backend. Implementations report
/// per-channel failures instead of failing the whole call so the engine can
/// degrade to the surviving channel.
pub trait VectorIndexProvider
where
	Self: Send + Sync,
{
	fn search<'a>(&'a self, input: &'a RetrievalInput) -> BoxFuture<'a, Result<RetrievalOutput>>;
}

/// Read-only batched catalog lookup.
pub trait CatalogProvider
where
	Self: Send + Sync,
{
	fn get_by_keys<'a>(
		&'a self,
		keys: &'a [String],
	) -> BoxFuture<'a, Result<HashMap<String, CatalogAttributes>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub index: Arc<dyn VectorIndexProvider>,
	pub catalog: Arc<dyn CatalogProvider>,
}

impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		index: Arc<dyn VectorIndexProvider>,
		catalog: Arc<dyn CatalogProvider>,
	) -> Self {
		Self { embedding, index, catalog }
	}

	/// Wires the default collaborators. The index backend is a static startup
	/// choice from `[retrieval] provider`; there is no per-request switching.
	pub fn from_config(cfg: &Config, db: &Db) -> Result<Self> {
		let retrieval_timeout = Duration::from_millis(cfg.retrieval.timeout_ms);
		let index: Arc<dyn VectorIndexProvider> = match cfg.retrieval.provider.as_str() {
			mercato_config::PROVIDER_PGVECTOR => Arc::new(retrieval::PgVectorProvider::new(
				db.pool.clone(),
				retrieval_timeout,
			)),
			mercato_config::PROVIDER_DUAL_INDEX => {
				let store = QdrantStore::new(&cfg.storage.qdrant)?;

				Arc::new(retrieval::DualIndexProvider::new(store, retrieval_timeout))
			},
			other => {
				return Err(Error::InvalidArgument {
					message: format!("Unknown retrieval provider '{other}'."),
				});
			},
		};

		Ok(Self {
			embedding: Arc::new(DefaultEmbedding),
			index,
			catalog: Arc::new(enrich::DbCatalog::new(
				db.pool.clone(),
				Duration::from_millis(cfg.catalog.lookup_timeout_ms),
			)),
		})
	}
}

pub struct Service {
	pub cfg: Config,
	pub providers: Providers,
	pub sessions: SessionCache,
}

impl Service {
	/// Production wiring: connect storage, select the index backend, create
	/// the session cache. Call once at process start.
	pub async fn connect(cfg: Config) -> Result<Self> {
		let db = Db::connect(&cfg.storage.postgres).await?;
		let providers = Providers::from_config(&cfg, &db)?;
		let sessions = SessionCache::new(&cfg.sessions);

		Ok(Self::with_providers(cfg, providers, sessions))
	}

	pub fn with_providers(cfg: Config, providers: Providers, sessions: SessionCache) -> Self {
		Self { cfg, providers, sessions }
	}
}

struct DefaultEmbedding;

impl EmbeddingProvider for DefaultEmbedding {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		text: &'a str,
	) -> BoxFuture<'a, Result<QueryEmbedding>> {
		Box::pin(async move { mercato_providers::embed(cfg, text).await.map_err(Error::from) })
	}
}
