use time::OffsetDateTime;

use crate::fusion::FusedCandidate;
use mercato_domain::{BoostFactor, CandidateMeta, ChannelScore, QueryFilters};

const SECONDS_PER_DAY: f32 = 86_400.0;

pub struct BoostContext<'a> {
	pub query_text: &'a str,
	pub filters: &'a QueryFilters,
	pub now: OffsetDateTime,
	pub cfg: &'a mercato_config::Ranking,
}

#[derive(Clone, Debug)]
pub struct BoostedCandidate {
	pub key: String,
	pub score: f32,
	pub normalized_score: f32,
	pub channels: Vec<ChannelScore>,
	pub boosts: Vec<BoostFactor>,
	pub meta: CandidateMeta,
}

struct BoostRule {
	name: &'static str,
	apply: fn(&BoostContext<'_>, &CandidateMeta) -> f32,
}

/// Application order is part of the contract: the compounded cap makes the
/// fold order-sensitive, so reordering this table changes scores.
const BOOST_PIPELINE: &[BoostRule] = &[
	BoostRule { name: "exact_title_match", apply: exact_title_match },
	BoostRule { name: "brand_match", apply: brand_match },
	BoostRule { name: "recency", apply: recency },
	BoostRule { name: "popularity", apply: popularity },
	BoostRule { name: "price_position", apply: price_position },
];

/// Multiplies each fused score through the pipeline. Every factor is clamped
/// to `[1.0, max_boost]` and the running product to `max_total_boost`;
/// factors that end up applying are recorded in order. The result is
/// re-sorted (score desc, normalized-score tie-break, then catalog key).
pub fn apply_boosts(ctx: &BoostContext<'_>, fused: Vec<FusedCandidate>) -> Vec<BoostedCandidate> {
	let mut out = Vec::with_capacity(fused.len());

	for candidate in fused {
		let mut total = 1.0_f32;
		let mut factors = Vec::new();

		for rule in BOOST_PIPELINE {
			let raw = (rule.apply)(ctx, &candidate.meta);
			let capped = raw.clamp(1.0, ctx.cfg.max_boost);
			let headroom = ctx.cfg.max_total_boost / total;
			let applied = capped.min(headroom).max(1.0);

			if applied > 1.0 {
				total *= applied;
				factors.push(BoostFactor { name: rule.name.to_string(), multiplier: applied });
			}
		}

		out.push(BoostedCandidate {
			key: candidate.key,
			score: candidate.rrf_score * total,
			normalized_score: candidate.normalized_score,
			channels: candidate.channels,
			boosts: factors,
			meta: candidate.meta,
		});
	}

	out.sort_by(|a, b| {
		b.score
			.partial_cmp(&a.score)
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

fn exact_title_match(ctx: &BoostContext<'_>, meta: &CandidateMeta) -> f32 {
	let query = ctx.query_text.trim().to_lowercase();

	if query.is_empty() {
		return 1.0;
	}

	match &meta.title {
		Some(title) if title.to_lowercase().contains(&query) =>
			1.0 + ctx.cfg.exact_match_weight,
		_ => 1.0,
	}
}

fn brand_match(ctx: &BoostContext<'_>, meta: &CandidateMeta) -> f32 {
	match (&ctx.filters.brand, &meta.brand) {
		(Some(wanted), Some(brand)) if wanted.eq_ignore_ascii_case(brand) =>
			1.0 + ctx.cfg.brand_match_weight,
		_ => 1.0,
	}
}

/// Half-life decay: a result published exactly one half-life ago receives
/// half the full recency weight.
fn recency(ctx: &BoostContext<'_>, meta: &CandidateMeta) -> f32 {
	let Some(published_at) = meta.published_at else {
		return 1.0;
	};
	let age_days = ((ctx.now - published_at).as_seconds_f32() / SECONDS_PER_DAY).max(0.0);
	let decay = 0.5_f32.powf(age_days / ctx.cfg.recency_half_life_days);

	1.0 + ctx.cfg.recency_weight * decay
}

fn popularity(ctx: &BoostContext<'_>, meta: &CandidateMeta) -> f32 {
	match meta.popularity {
		Some(count) if count > 0 => 1.0 + ctx.cfg.popularity_weight * (1.0 + count as f32).ln(),
		_ => 1.0,
	}
}

/// Rewards results toward the cheap end of an explicitly requested price
/// range; inert without a max price bound.
fn price_position(ctx: &BoostContext<'_>, meta: &CandidateMeta) -> f32 {
	let Some(max) = ctx.filters.max_price else {
		return 1.0;
	};
	let min = ctx.filters.min_price.unwrap_or(0.0);
	let Some(price) = meta.price else {
		return 1.0;
	};

	if price < min || price > max || max <= min {
		return 1.0;
	}

	let position = ((price - min) / (max - min)) as f32;

	1.0 + ctx.cfg.price_position_weight * (1.0 - position)
}
