use std::{collections::HashMap, time::Duration};

use qdrant_client::qdrant::{
	Condition, Document, Filter, Query, QueryPointsBuilder, Range, ScoredPoint, Value, VectorInput,
	value::Kind,
};
use sqlx::PgPool;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{BoxFuture, Result, VectorIndexProvider};
use mercato_domain::{Candidate, CandidateMeta, Channel, QueryFilters};
use mercato_providers::SparseVector;
use mercato_storage::qdrant::{BM25_MODEL, DENSE_VECTOR_NAME, QdrantStore, SPARSE_VECTOR_NAME};

#[derive(Clone, Debug)]
pub struct RetrievalInput {
	pub text: String,
	pub dense: Vec<f32>,
	pub sparse: Option<SparseVector>,
	pub candidate_k: u32,
	pub filters: QueryFilters,
}

#[derive(Clone, Debug)]
pub struct ChannelCandidates {
	pub channel: Channel,
	pub candidates: Vec<Candidate>,
}

#[derive(Clone, Debug)]
pub struct ChannelFailure {
	pub channel: Channel,
	pub message: String,
	pub timed_out: bool,
}

/// Per-channel outcome of one provider call. Channel-level policy (degrade
/// with a partial flag vs fail the search) belongs to the engine.
#[derive(Clone, Debug, Default)]
pub struct RetrievalOutput {
	pub channels: Vec<ChannelCandidates>,
	pub failures: Vec<ChannelFailure>,
}

/// Dense-only similarity over the relational store's native vector column.
/// Structured filters are pushed into the WHERE clause so they prune before
/// ranking, not after the LIMIT.
pub struct PgVectorProvider {
	pool: PgPool,
	timeout: Duration,
}

impl PgVectorProvider {
	pub fn new(pool: PgPool, timeout: Duration) -> Self {
		Self { pool, timeout }
	}

	async fn search_dense(&self, input: &RetrievalInput) -> Result<Vec<Candidate>> {
		let vec_text = vector_to_pg(&input.dense);
		let mut builder = sqlx::QueryBuilder::new(
			"\
SELECT
	p.urn AS key,
	(1 - (p.embedding <=> ",
		);

		builder.push_bind(vec_text.clone());
		builder.push(
			"::text::vector))::real AS score,
	p.name AS title,
	b.name AS brand,
	c.name AS category,
	o.price,
	o.availability,
	p.popularity,
	p.published_at
FROM products p
LEFT JOIN brands b ON p.brand_id = b.id
LEFT JOIN categories c ON p.category_id = c.id
LEFT JOIN offers o ON o.product_id = p.id
WHERE p.embedding IS NOT NULL",
		);

		if let Some(brand) = &input.filters.brand {
			builder.push(" AND LOWER(b.name) = LOWER(");
			builder.push_bind(brand);
			builder.push(")");
		}
		if let Some(category) = &input.filters.category {
			builder.push(" AND LOWER(c.name) = LOWER(");
			builder.push_bind(category);
			builder.push(")");
		}
		if let Some(min_price) = input.filters.min_price {
			builder.push(" AND o.price >= ");
			builder.push_bind(min_price);
		}
		if let Some(max_price) = input.filters.max_price {
			builder.push(" AND o.price <= ");
			builder.push_bind(max_price);
		}

		builder.push(" ORDER BY p.embedding <=> ");
		builder.push_bind(vec_text);
		builder.push("::text::vector LIMIT ");
		builder.push_bind(input.candidate_k as i64);

		let rows: Vec<SimilarityRow> = builder.build_query_as().fetch_all(&self.pool).await?;
		let mut out = Vec::with_capacity(rows.len());
		let mut seen = std::collections::HashSet::new();

		for row in rows {
			// The offers join can emit one row per offer for the same product.
			if !seen.insert(row.key.clone()) {
				continue;
			}

			let rank = out.len() as u32 + 1;

			out.push(Candidate {
				key: row.key,
				channel: Channel::Dense,
				score: row.score,
				rank,
				meta: CandidateMeta {
					title: Some(row.title),
					brand: row.brand,
					category: row.category,
					price: row.price,
					availability: row.availability,
					popularity: Some(row.popularity),
					published_at: row.published_at,
				},
			});
		}

		Ok(out)
	}
}

impl VectorIndexProvider for PgVectorProvider {
	fn search<'a>(&'a self, input: &'a RetrievalInput) -> BoxFuture<'a, Result<RetrievalOutput>> {
		Box::pin(async move {
			let mut output = RetrievalOutput::default();

			match tokio::time::timeout(self.timeout, self.search_dense(input)).await {
				Ok(Ok(candidates)) => {
					output.channels.push(ChannelCandidates { channel: Channel::Dense, candidates });
				},
				Ok(Err(err)) => {
					output.failures.push(ChannelFailure {
						channel: Channel::Dense,
						message: err.to_string(),
						timed_out: false,
					});
				},
				Err(_) => {
					output.failures.push(ChannelFailure {
						channel: Channel::Dense,
						message: "Dense channel query timed out.".to_string(),
						timed_out: true,
					});
				},
			}

			Ok(output)
		})
	}
}

#[derive(Debug, sqlx::FromRow)]
struct SimilarityRow {
	key: String,
	score: f32,
	title: String,
	brand: Option<String>,
	category: Option<String>,
	price: Option<f64>,
	availability: Option<String>,
	popularity: i64,
	published_at: Option<OffsetDateTime>,
}

/// Dual-channel provider over one collection with named `dense` and `sparse`
/// vectors. Both channels are queried concurrently with independent
/// timeouts; the request is bounded by the slower channel, not the sum.
pub struct DualIndexProvider {
	store: QdrantStore,
	timeout: Duration,
}

impl DualIndexProvider {
	pub fn new(store: QdrantStore, timeout: Duration) -> Self {
		Self { store, timeout }
	}

	async fn query_channel(
		&self,
		channel: Channel,
		input: &RetrievalInput,
		filter: Option<&Filter>,
	) -> Result<Vec<Candidate>> {
		let mut query = QueryPointsBuilder::new(self.store.collection.clone())
			.limit(input.candidate_k as u64)
			.with_payload(true);
		query = match channel {
			Channel::Dense =>
				query.query(Query::new_nearest(input.dense.clone())).using(DENSE_VECTOR_NAME),
			Channel::Sparse => match &input.sparse {
				Some(sparse) => query
					.query(Query::new_nearest(VectorInput::new_sparse(
						sparse.indices.clone(),
						sparse.values.clone(),
					)))
					.using(SPARSE_VECTOR_NAME),
				None => query
					.query(Query::new_nearest(Document::new(input.text.clone(), BM25_MODEL)))
					.using(SPARSE_VECTOR_NAME),
			},
		};

		if let Some(filter) = filter {
			query = query.filter(filter.clone());
		}

		let response = self
			.store
			.client
			.query(query)
			.await
			.map_err(|err| crate::Error::Retrieval { message: err.to_string() })?;

		Ok(collect_candidates(channel, &response.result))
	}
}

impl VectorIndexProvider for DualIndexProvider {
	fn search<'a>(&'a self, input: &'a RetrievalInput) -> BoxFuture<'a, Result<RetrievalOutput>> {
		Box::pin(async move {
			let filter = build_qdrant_filter(&input.filters);
			let dense = tokio::time::timeout(
				self.timeout,
				self.query_channel(Channel::Dense, input, filter.as_ref()),
			);
			let sparse = tokio::time::timeout(
				self.timeout,
				self.query_channel(Channel::Sparse, input, filter.as_ref()),
			);
			let (dense_result, sparse_result) = tokio::join!(dense, sparse);
			let mut output = RetrievalOutput::default();

			for (channel, result) in
				[(Channel::Dense, dense_result), (Channel::Sparse, sparse_result)]
			{
				match result {
					Ok(Ok(candidates)) => {
						output.channels.push(ChannelCandidates { channel, candidates });
					},
					Ok(Err(err)) => {
						output.failures.push(ChannelFailure {
							channel,
							message: err.to_string(),
							timed_out: false,
						});
					},
					Err(_) => {
						output.failures.push(ChannelFailure {
							channel,
							message: format!("{} channel query timed out.", channel.as_str()),
							timed_out: true,
						});
					},
				}
			}

			Ok(output)
		})
	}
}

/// Structured filters as an index-side pre-filter, evaluated by the backend
/// before ranking.
fn build_qdrant_filter(filters: &QueryFilters) -> Option<Filter> {
	let mut must = Vec::new();

	if let Some(brand) = &filters.brand {
		must.push(Condition::matches("brand", brand.clone()));
	}
	if let Some(category) = &filters.category {
		must.push(Condition::matches("category", category.clone()));
	}
	if filters.min_price.is_some() || filters.max_price.is_some() {
		must.push(Condition::range(
			"price",
			Range {
				gte: filters.min_price,
				lte: filters.max_price,
				..Default::default()
			},
		));
	}

	if must.is_empty() {
		None
	} else {
		Some(Filter { must, should: Vec::new(), must_not: Vec::new(), min_should: None })
	}
}

fn collect_candidates(channel: Channel, points: &[ScoredPoint]) -> Vec<Candidate> {
	let mut out = Vec::with_capacity(points.len());

	for point in points {
		let Some(key) = payload_str(&point.payload, "key") else {
			tracing::warn!(channel = channel.as_str(), "Scored point is missing a catalog key.");

			continue;
		};
		let rank = out.len() as u32 + 1;

		out.push(Candidate {
			key,
			channel,
			score: point.score,
			rank,
			meta: CandidateMeta {
				title: payload_str(&point.payload, "name"),
				brand: payload_str(&point.payload, "brand"),
				category: payload_str(&point.payload, "category"),
				price: payload_f64(&point.payload, "price"),
				availability: payload_str(&point.payload, "availability"),
				popularity: payload_i64(&point.payload, "popularity"),
				published_at: payload_rfc3339(&point.payload, "published_at"),
			},
		});
	}

	out
}

pub(crate) fn vector_to_pg(vec: &[f32]) -> String {
	let mut out = String::with_capacity(vec.len() * 8);

	out.push('[');

	for (i, value) in vec.iter().enumerate() {
		if i > 0 {
			out.push(',');
		}

		out.push_str(&value.to_string());
	}

	out.push(']');

	out
}

fn payload_str(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	match &payload.get(key)?.kind {
		Some(Kind::StringValue(text)) => Some(text.clone()),
		_ => None,
	}
}

fn payload_f64(payload: &HashMap<String, Value>, key: &str) -> Option<f64> {
	match &payload.get(key)?.kind {
		Some(Kind::DoubleValue(value)) => Some(*value),
		Some(Kind::IntegerValue(value)) => Some(*value as f64),
		_ => None,
	}
}

fn payload_i64(payload: &HashMap<String, Value>, key: &str) -> Option<i64> {
	match &payload.get(key)?.kind {
		Some(Kind::IntegerValue(value)) => Some(*value),
		_ => None,
	}
}

fn payload_rfc3339(payload: &HashMap<String, Value>, key: &str) -> Option<OffsetDateTime> {
	match &payload.get(key)?.kind {
		Some(Kind::StringValue(text)) => OffsetDateTime::parse(text, &Rfc3339).ok(),
		_ => None,
	}
}
