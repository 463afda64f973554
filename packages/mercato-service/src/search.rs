use serde::Serialize;
use time::OffsetDateTime;

use crate::{
	Error, Result, Service,
	boost::{self, BoostContext},
	enrich, fusion,
	retrieval::{RetrievalInput, RetrievalOutput},
};
use mercato_domain::{MAX_LIMIT, MAX_QUERY_CHARS, RankedResult, ResultSet, SearchQuery};

#[derive(Clone, Debug, Serialize)]
pub struct SearchResponse {
	pub handle: mercato_domain::Handle,
	/// The `offset..offset+limit` window over the cached set.
	pub results: Vec<RankedResult>,
	pub total: u32,
	/// True when at least one configured retrieval channel was down and the
	/// set was ranked from the survivors.
	pub partial: bool,
	#[serde(with = "mercato_domain::time_serde")]
	pub expires_at: OffsetDateTime,
}

impl Service {
	/// query text → embed → retrieve (fan-out) → fuse → boost → enrich →
	/// publish under a fresh handle.
	pub async fn search(&self, query: SearchQuery) -> Result<SearchResponse> {
		let text = query.text.trim().to_string();

		if text.is_empty() {
			return Err(Error::InvalidArgument {
				message: "Search query must be non-empty.".to_string(),
			});
		}
		if text.chars().count() > MAX_QUERY_CHARS {
			return Err(Error::InvalidArgument {
				message: format!("Search query exceeds {MAX_QUERY_CHARS} characters."),
			});
		}
		if query.limit == 0 || query.limit > MAX_LIMIT {
			return Err(Error::InvalidArgument {
				message: format!("limit must be between 1 and {MAX_LIMIT}."),
			});
		}
		if let (Some(min), Some(max)) = (query.filters.min_price, query.filters.max_price)
			&& min > max
		{
			return Err(Error::InvalidArgument {
				message: "min_price cannot be greater than max_price.".to_string(),
			});
		}

		// Embedding failure is fatal to ranking; there is no vector to search
		// with. Chained filter/compare on existing handles stay available.
		let embedding = self.providers.embedding.embed(&self.cfg.providers.embedding, &text).await?;

		if embedding.dense.len() != self.cfg.storage.qdrant.vector_dim as usize {
			return Err(Error::EmbeddingUnavailable {
				message: "Embedding vector dimension mismatch.".to_string(),
			});
		}

		let candidate_k = self.cfg.retrieval.candidate_k.max(query.offset + query.limit);
		let input = RetrievalInput {
			text: text.clone(),
			dense: embedding.dense,
			sparse: embedding.sparse,
			candidate_k,
			filters: query.filters.clone(),
		};
		let output = self.providers.index.search(&input).await?;
		let partial = check_degradation(&output)?;
		let fused =
			fusion::fuse(&output.channels, self.cfg.retrieval.rrf_k, self.cfg.retrieval.blend_weight);
		let now = OffsetDateTime::now_utc();
		let context = BoostContext {
			query_text: &text,
			filters: &query.filters,
			now,
			cfg: &self.cfg.ranking,
		};
		let mut boosted = boost::apply_boosts(&context, fused);

		boosted.truncate(candidate_k as usize);

		let ranked = enrich::enrich(self.providers.catalog.as_ref(), boosted).await?;
		let total = ranked.len() as u32;
		let offset = query.offset;
		let limit = query.limit;
		let set = ResultSet {
			results: ranked,
			total,
			query: SearchQuery { text, ..query },
			applied_filters: Vec::new(),
			partial,
			created_at: now,
			expires_at: now,
		};
		let (handle, stored) = self.sessions.put(set);

		tracing::info!(
			handle = handle.as_str(),
			total,
			partial,
			"Search result set published."
		);

		Ok(SearchResponse {
			handle,
			results: window(&stored.results, offset, limit),
			total,
			partial,
			expires_at: stored.expires_at,
		})
	}
}

/// Degradation policy: a channel failure with a surviving channel is absorbed
/// into the partial flag; losing every channel is a hard error, with timeouts
/// surfaced as the retryable timeout kind.
fn check_degradation(output: &RetrievalOutput) -> Result<bool> {
	for failure in &output.failures {
		tracing::warn!(
			channel = failure.channel.as_str(),
			timed_out = failure.timed_out,
			error = failure.message.as_str(),
			"Retrieval channel failed; continuing degraded."
		);
	}

	if output.channels.is_empty() {
		let message = if output.failures.is_empty() {
			"Retrieval produced no channels.".to_string()
		} else {
			output
				.failures
				.iter()
				.map(|failure| format!("{}: {}", failure.channel.as_str(), failure.message))
				.collect::<Vec<_>>()
				.join("; ")
		};

		if !output.failures.is_empty() && output.failures.iter().all(|failure| failure.timed_out) {
			return Err(Error::Timeout { message });
		}

		return Err(Error::Retrieval { message });
	}

	Ok(!output.failures.is_empty())
}

pub(crate) fn window(results: &[RankedResult], offset: u32, limit: u32) -> Vec<RankedResult> {
	let start = (offset as usize).min(results.len());
	let end = (start + limit as usize).min(results.len());

	results[start..end].to_vec()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::retrieval::ChannelFailure;
	use mercato_domain::Channel;

	fn failure(channel: Channel, timed_out: bool) -> ChannelFailure {
		ChannelFailure { channel, message: "boom".to_string(), timed_out }
	}

	#[test]
	fn no_failures_is_not_partial() {
		let output = RetrievalOutput {
			channels: vec![crate::retrieval::ChannelCandidates {
				channel: Channel::Dense,
				candidates: Vec::new(),
			}],
			failures: Vec::new(),
		};

		assert!(!check_degradation(&output).expect("ok"));
	}

	#[test]
	fn surviving_channel_degrades_to_partial() {
		let output = RetrievalOutput {
			channels: vec![crate::retrieval::ChannelCandidates {
				channel: Channel::Dense,
				candidates: Vec::new(),
			}],
			failures: vec![failure(Channel::Sparse, false)],
		};

		assert!(check_degradation(&output).expect("ok"));
	}

	#[test]
	fn losing_every_channel_fails_the_search() {
		let output = RetrievalOutput {
			channels: Vec::new(),
			failures: vec![failure(Channel::Dense, false), failure(Channel::Sparse, false)],
		};

		assert!(matches!(check_degradation(&output), Err(Error::Retrieval { .. })));
	}

	#[test]
	fn all_channels_timing_out_is_a_timeout() {
		let output = RetrievalOutput {
			channels: Vec::new(),
			failures: vec![failure(Channel::Dense, true), failure(Channel::Sparse, true)],
		};

		assert!(matches!(check_degradation(&output), Err(Error::Timeout { .. })));
	}

	#[test]
	fn window_clamps_to_bounds() {
		let results: Vec<RankedResult> = Vec::new();

		assert!(window(&results, 10, 20).is_empty());
	}
}
