use std::collections::HashMap;

use crate::retrieval::ChannelCandidates;
use mercato_domain::{Candidate, CandidateMeta, Channel, ChannelScore};

/// A candidate after cross-channel fusion, before boosts.
#[derive(Clone, Debug)]
pub struct FusedCandidate {
	pub key: String,
	pub rrf_score: f32,
	/// Weighted sum of per-channel min-max normalized native scores. Used as
	/// the tie-break when RRF sums collide; raw score scales across channels
	/// are not comparable, their normalized positions are.
	pub normalized_score: f32,
	pub channels: Vec<ChannelScore>,
	pub meta: CandidateMeta,
}

/// Reciprocal rank fusion over one or two channels:
/// `score = Σ weight_c / (rrf_k + rank_c)`, candidates absent from a channel
/// contribute nothing for it. The blend weight sets dense-vs-sparse emphasis
/// (dense gets `blend_weight`, sparse `1 - blend_weight`); a lone channel
/// always weighs 1.0. Ordering is RRF desc, then normalized score desc, then
/// catalog key, so repeated runs over the same inputs agree exactly.
pub fn fuse(channels: &[ChannelCandidates], rrf_k: u32, blend_weight: f32) -> Vec<FusedCandidate> {
	let mut fused: HashMap<String, FusedCandidate> = HashMap::new();

	for channel_candidates in channels {
		let channel = channel_candidates.channel;
		let weight = channel_weight(channel, channels.len(), blend_weight);
		let deduped = dedup_best_rank(&channel_candidates.candidates);
		let (min, max) = score_bounds(&deduped);

		for candidate in deduped {
			let rrf = weight / (rrf_k as f32 + candidate.rank as f32);
			let normalized = weight * normalize(candidate.score, min, max);
			let entry = fused.entry(candidate.key.clone()).or_insert_with(|| FusedCandidate {
				key: candidate.key.clone(),
				rrf_score: 0.0,
				normalized_score: 0.0,
				channels: Vec::new(),
				meta: CandidateMeta::default(),
			});

			entry.rrf_score += rrf;
			entry.normalized_score += normalized;
			entry.channels.push(ChannelScore {
				channel,
				score: candidate.score,
				rank: candidate.rank,
			});
			merge_missing_meta(&mut entry.meta, &candidate.meta);
		}
	}

	let mut out: Vec<FusedCandidate> = fused.into_values().collect();

	out.sort_by(|a, b| {
		b.rrf_score
			.partial_cmp(&a.rrf_score)
			.unwrap_or(std::cmp::Ordering::Equal)
			.then_with(|| {
				b.normalized_score
					.partial_cmp(&a.normalized_score)
					.unwrap_or(std::cmp::Ordering::Equal)
			})
			.then_with(|| a.key.cmp(&b.key))
	});

	out
}

fn channel_weight(channel: Channel, channel_count: usize, blend_weight: f32) -> f32 {
	if channel_count <= 1 {
		return 1.0;
	}

	match channel {
		Channel::Dense => blend_weight,
		Channel::Sparse => 1.0 - blend_weight,
	}
}

/// A key surfacing twice in one channel keeps its better (lower) rank; it
/// must contribute exactly one fused entry, never two.
fn dedup_best_rank(candidates: &[Candidate]) -> Vec<Candidate> {
	let mut best: HashMap<&str, &Candidate> = HashMap::new();

	for candidate in candidates {
		let replace = match best.get(candidate.key.as_str()) {
			Some(existing) => existing.rank > candidate.rank,
			None => true,
		};

		if replace {
			best.insert(candidate.key.as_str(), candidate);
		}
	}

	let mut out: Vec<Candidate> = best.into_values().cloned().collect();

	out.sort_by_key(|candidate| candidate.rank);

	out
}

fn score_bounds(candidates: &[Candidate]) -> (f32, f32) {
	let mut min = f32::INFINITY;
	let mut max = f32::NEG_INFINITY;

	for candidate in candidates {
		min = min.min(candidate.score);
		max = max.max(candidate.score);
	}

	(min, max)
}

fn normalize(score: f32, min: f32, max: f32) -> f32 {
	let range = max - min;

	if range > 0.0 { (score - min) / range } else { 1.0 }
}

fn merge_missing_meta(target: &mut CandidateMeta, source: &CandidateMeta) {
	if target.title.is_none() {
		target.title = source.title.clone();
	}
	if target.brand.is_none() {
		target.brand = source.brand.clone();
	}
	if target.category.is_none() {
		target.category = source.category.clone();
	}
	if target.price.is_none() {
		target.price = source.price;
	}
	if target.availability.is_none() {
		target.availability = source.availability.clone();
	}
	if target.popularity.is_none() {
		target.popularity = source.popularity;
	}
	if target.published_at.is_none() {
		target.published_at = source.published_at;
	}
}
