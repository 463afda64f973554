use std::{collections::HashMap, sync::Arc};

use time::OffsetDateTime;

use mercato_config::Config;
use mercato_domain::{
	Candidate, CandidateMeta, CatalogAttributes, Channel, FilterCriteria, ResultSet, SearchQuery,
};
use mercato_providers::QueryEmbedding;
use mercato_service::{
	BoxFuture, CatalogProvider, ChannelCandidates, ChannelFailure, EmbeddingProvider, Error,
	Providers, Result, RetrievalInput, RetrievalOutput, Service, SessionCache,
	VectorIndexProvider,
};

const VECTOR_DIM: usize = 4;

fn config() -> Config {
	Config {
		service: mercato_config::Service { log_level: "info".to_string() },
		storage: mercato_config::Storage {
			postgres: mercato_config::Postgres {
				dsn: "postgres://unused".to_string(),
				pool_max_conns: 1,
			},
			qdrant: mercato_config::Qdrant {
				url: "http://unused:6334".to_string(),
				collection: "catalog_products".to_string(),
				vector_dim: VECTOR_DIM as u32,
			},
		},
		providers: mercato_config::Providers {
			embedding: mercato_config::EmbeddingProviderConfig {
				provider_id: "stub".to_string(),
				api_base: "http://unused".to_string(),
				api_key: "unused".to_string(),
				path: "/v1/embeddings".to_string(),
				model: "stub".to_string(),
				dimensions: VECTOR_DIM as u32,
				timeout_ms: 1_000,
				default_headers: serde_json::Map::new(),
			},
		},
		retrieval: mercato_config::Retrieval {
			provider: "dual_index".to_string(),
			candidate_k: 50,
			blend_weight: 0.5,
			rrf_k: 60,
			timeout_ms: 1_000,
		},
		ranking: mercato_config::Ranking::default(),
		catalog: mercato_config::Catalog::default(),
		sessions: mercato_config::Sessions::default(),
	}
}

struct StubEmbedding;

impl EmbeddingProvider for StubEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a mercato_config::EmbeddingProviderConfig,
		_text: &'a str,
	) -> BoxFuture<'a, Result<QueryEmbedding>> {
		Box::pin(async move { Ok(QueryEmbedding { dense: vec![0.1; VECTOR_DIM], sparse: None }) })
	}
}

struct FailingEmbedding;

impl EmbeddingProvider for FailingEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a mercato_config::EmbeddingProviderConfig,
		_text: &'a str,
	) -> BoxFuture<'a, Result<QueryEmbedding>> {
		Box::pin(async move {
			Err(Error::EmbeddingUnavailable { message: "stub outage".to_string() })
		})
	}
}

struct StubIndex {
	output: RetrievalOutput,
}

impl VectorIndexProvider for StubIndex {
	fn search<'a>(&'a self, _input: &'a RetrievalInput) -> BoxFuture<'a, Result<RetrievalOutput>> {
		let output = self.output.clone();

		Box::pin(async move { Ok(output) })
	}
}

struct StubCatalog {
	map: HashMap<String, CatalogAttributes>,
}

impl CatalogProvider for StubCatalog {
	fn get_by_keys<'a>(
		&'a self,
		keys: &'a [String],
	) -> BoxFuture<'a, Result<HashMap<String, CatalogAttributes>>> {
		let out: HashMap<String, CatalogAttributes> = keys
			.iter()
			.filter_map(|key| self.map.get(key).map(|attrs| (key.clone(), attrs.clone())))
			.collect();

		Box::pin(async move { Ok(out) })
	}
}

fn candidate(key: &str, channel: Channel, score: f32, rank: u32) -> Candidate {
	Candidate { key: key.to_string(), channel, score, rank, meta: CandidateMeta::default() }
}

fn reference_output() -> RetrievalOutput {
	RetrievalOutput {
		channels: vec![
			ChannelCandidates {
				channel: Channel::Dense,
				candidates: vec![
					candidate("A", Channel::Dense, 0.9, 1),
					candidate("B", Channel::Dense, 0.7, 2),
					candidate("C", Channel::Dense, 0.5, 3),
				],
			},
			ChannelCandidates {
				channel: Channel::Sparse,
				candidates: vec![
					candidate("B", Channel::Sparse, 0.8, 1),
					candidate("A", Channel::Sparse, 0.6, 2),
				],
			},
		],
		failures: Vec::new(),
	}
}

fn attrs(key: &str, price: f64) -> CatalogAttributes {
	CatalogAttributes {
		key: key.to_string(),
		name: format!("Boot {key}"),
		brand: Some("Trekline".to_string()),
		category: Some("footwear".to_string()),
		description: Some("Waterproof trail boot.".to_string()),
		price: Some(price),
		currency: Some("USD".to_string()),
		availability: Some("InStock".to_string()),
		media: serde_json::Value::Null,
		popularity: 0,
		published_at: None,
	}
}

fn catalog() -> StubCatalog {
	StubCatalog {
		map: [
			("A".to_string(), attrs("A", 30.0)),
			("B".to_string(), attrs("B", 60.0)),
			("C".to_string(), attrs("C", 45.0)),
		]
		.into(),
	}
}

fn service_with(
	embedding: Arc<dyn EmbeddingProvider>,
	output: RetrievalOutput,
	catalog: StubCatalog,
) -> Service {
	let cfg = config();
	let sessions = SessionCache::new(&cfg.sessions);
	let providers =
		Providers::new(embedding, Arc::new(StubIndex { output }), Arc::new(catalog));

	Service::with_providers(cfg, providers, sessions)
}

#[tokio::test]
async fn search_filter_compare_chain() {
	let service = service_with(Arc::new(StubEmbedding), reference_output(), catalog());
	let response = service
		.search(SearchQuery::new("waterproof boots"))
		.await
		.expect("search");

	// RRF with the documented tie-break ranks B, A, C.
	let keys: Vec<&str> = response.results.iter().map(|result| result.key.as_str()).collect();

	assert_eq!(keys, vec!["B", "A", "C"]);
	assert_eq!(response.total, 3);
	assert!(!response.partial);

	// Chained filter: subset in fused order, under a new handle.
	let filtered = service
		.filter(
			response.handle.as_str(),
			FilterCriteria { max_price: Some(50.0), ..Default::default() },
		)
		.expect("filter");
	let filtered_keys: Vec<&str> =
		filtered.results.iter().map(|result| result.key.as_str()).collect();

	assert_eq!(filtered_keys, vec!["A", "C"]);
	assert_ne!(filtered.handle, response.handle);

	// The parent handle is untouched by the chained filter.
	let parent_again = service
		.filter(
			response.handle.as_str(),
			FilterCriteria { max_price: Some(100.0), ..Default::default() },
		)
		.expect("parent still valid");

	assert_eq!(parent_again.total, 3);

	// Chained compare over the filtered set: items differ only in price.
	let report = service.compare(filtered.handle.as_str(), &[0, 1], None).expect("compare");
	let aspect_names: Vec<&str> =
		report.aspects.iter().map(|aspect| aspect.as_str()).collect();

	assert_eq!(aspect_names, vec!["price"]);
	assert_eq!(report.recommendation.index, 0);
	assert_eq!(report.recommendation.key, "A");
}

#[tokio::test]
async fn pagination_windows_the_cached_set() {
	let service = service_with(Arc::new(StubEmbedding), reference_output(), catalog());
	let mut query = SearchQuery::new("waterproof boots");

	query.limit = 2;
	query.offset = 1;

	let response = service.search(query).await.expect("search");
	let keys: Vec<&str> = response.results.iter().map(|result| result.key.as_str()).collect();

	// Window over B, A, C.
	assert_eq!(keys, vec!["A", "C"]);
	assert_eq!(response.total, 3);
}

#[tokio::test]
async fn sparse_channel_failure_degrades_to_partial() {
	let output = RetrievalOutput {
		channels: vec![ChannelCandidates {
			channel: Channel::Dense,
			candidates: vec![
				candidate("A", Channel::Dense, 0.9, 1),
				candidate("B", Channel::Dense, 0.7, 2),
			],
		}],
		failures: vec![ChannelFailure {
			channel: Channel::Sparse,
			message: "quota exceeded".to_string(),
			timed_out: false,
		}],
	};
	let service = service_with(Arc::new(StubEmbedding), output, catalog());
	let response = service.search(SearchQuery::new("boots")).await.expect("search");

	assert!(response.partial);
	assert_eq!(response.total, 2);
}

#[tokio::test]
async fn total_channel_failure_fails_the_search() {
	let output = RetrievalOutput {
		channels: Vec::new(),
		failures: vec![
			ChannelFailure {
				channel: Channel::Dense,
				message: "down".to_string(),
				timed_out: false,
			},
			ChannelFailure {
				channel: Channel::Sparse,
				message: "down".to_string(),
				timed_out: false,
			},
		],
	};
	let service = service_with(Arc::new(StubEmbedding), output, catalog());
	let err = service.search(SearchQuery::new("boots")).await.expect_err("must fail");

	assert!(matches!(err, Error::Retrieval { .. }));
	assert!(err.retryable());
}

#[tokio::test]
async fn embedding_outage_is_fatal_to_search_but_not_chaining() {
	let service = service_with(Arc::new(StubEmbedding), reference_output(), catalog());
	let response = service.search(SearchQuery::new("boots")).await.expect("search");

	// Swap in a dead embedding provider; existing handles keep working.
	let broken = Service::with_providers(
		config(),
		Providers::new(
			Arc::new(FailingEmbedding),
			Arc::new(StubIndex { output: reference_output() }),
			Arc::new(catalog()),
		),
		SessionCache::new(&config().sessions),
	);
	let err = broken.search(SearchQuery::new("boots")).await.expect_err("embedding down");

	assert!(matches!(err, Error::EmbeddingUnavailable { .. }));

	let filtered = service
		.filter(
			response.handle.as_str(),
			FilterCriteria { max_price: Some(100.0), ..Default::default() },
		)
		.expect("chaining unaffected");

	assert_eq!(filtered.total, 3);
}

#[tokio::test]
async fn catalog_gaps_are_dropped_not_nulled() {
	let mut sparse_catalog = catalog();

	sparse_catalog.map.remove("B");

	let service = service_with(Arc::new(StubEmbedding), reference_output(), sparse_catalog);
	let response = service.search(SearchQuery::new("boots")).await.expect("search");
	let keys: Vec<&str> = response.results.iter().map(|result| result.key.as_str()).collect();

	assert_eq!(keys, vec!["A", "C"]);
	assert_eq!(response.total, 2);
	assert_eq!(response.results[0].rank, 1);
	assert_eq!(response.results[1].rank, 2);
}

#[tokio::test]
async fn empty_retrieval_is_an_empty_result_set_not_an_error() {
	let output = RetrievalOutput {
		channels: vec![
			ChannelCandidates { channel: Channel::Dense, candidates: Vec::new() },
			ChannelCandidates { channel: Channel::Sparse, candidates: Vec::new() },
		],
		failures: Vec::new(),
	};
	let service = service_with(Arc::new(StubEmbedding), output, catalog());
	let response = service.search(SearchQuery::new("boots")).await.expect("search");

	assert_eq!(response.total, 0);
	assert!(response.results.is_empty());

	// The empty set is still addressable for chaining diagnostics.
	let report_err = service.compare(response.handle.as_str(), &[0, 1], None).expect_err("bounds");

	assert!(matches!(report_err, Error::InvalidArgument { .. }));
}

#[tokio::test]
async fn expired_handles_read_as_not_found() {
	let service = service_with(Arc::new(StubEmbedding), reference_output(), catalog());
	let stale = ResultSet {
		results: Vec::new(),
		total: 0,
		query: SearchQuery::new("boots"),
		applied_filters: Vec::new(),
		partial: false,
		created_at: OffsetDateTime::now_utc(),
		expires_at: OffsetDateTime::now_utc(),
	};
	// Backdate creation far enough that the TTL has elapsed.
	let (handle, _) = service
		.sessions
		.put_at(stale, OffsetDateTime::now_utc() - time::Duration::minutes(60));
	let err = service
		.filter(handle.as_str(), FilterCriteria { max_price: Some(10.0), ..Default::default() })
		.expect_err("expired");

	assert!(matches!(err, Error::NotFound { .. }));
}

#[tokio::test]
async fn malformed_handles_are_rejected_before_lookup() {
	let service = service_with(Arc::new(StubEmbedding), reference_output(), catalog());
	let err = service
		.filter("not-a-handle", FilterCriteria { max_price: Some(10.0), ..Default::default() })
		.expect_err("malformed");

	assert!(matches!(err, Error::InvalidArgument { .. }));
}

#[tokio::test]
async fn blank_queries_are_invalid() {
	let service = service_with(Arc::new(StubEmbedding), reference_output(), catalog());
	let err = service.search(SearchQuery::new("   ")).await.expect_err("blank");

	assert!(matches!(err, Error::InvalidArgument { .. }));
	assert!(!err.retryable());
}
