use std::cmp::Ordering;

use regex::Regex;
use serde::Serialize;
use time::OffsetDateTime;

use crate::{Error, Result, Service};
use mercato_domain::{FilterCriteria, Handle, PriceSort, RankedResult, ResultSet};

#[derive(Clone, Debug, Serialize)]
pub struct FilterResponse {
	pub handle: Handle,
	pub results: Vec<RankedResult>,
	/// Matching count before any `limit` shaping.
	pub total: u32,
	#[serde(with = "mercato_domain::time_serde")]
	pub expires_at: OffsetDateTime,
}

impl Service {
	/// Pure refinement of a cached result set: no backend is re-queried, the
	/// parent handle stays valid, and the subset is published under a new
	/// handle with a fresh TTL.
	pub fn filter(&self, handle: &str, criteria: FilterCriteria) -> Result<FilterResponse> {
		let parent = self.sessions.get(handle)?;
		let (results, total) = apply_criteria(&parent.results, &criteria)?;
		let mut applied_filters = parent.applied_filters.clone();

		applied_filters.push(criteria);

		let set = ResultSet {
			results,
			total,
			query: parent.query.clone(),
			applied_filters,
			partial: parent.partial,
			created_at: parent.created_at,
			expires_at: parent.expires_at,
		};
		let (new_handle, stored) = self.sessions.put(set);

		tracing::info!(
			parent = handle,
			handle = new_handle.as_str(),
			total,
			"Filtered result set published."
		);

		Ok(FilterResponse {
			handle: new_handle,
			results: stored.results.clone(),
			total,
			expires_at: stored.expires_at,
		})
	}
}

/// Applies the criteria as an order-preserving predicate, then the optional
/// price sort and limit, and reassigns ordinals. Total counts matches before
/// the limit.
pub(crate) fn apply_criteria(
	results: &[RankedResult],
	criteria: &FilterCriteria,
) -> Result<(Vec<RankedResult>, u32)> {
	if !criteria.has_criteria() {
		return Err(Error::InvalidArgument {
			message:
				"At least one filter criterion is required (pattern, price bounds, or categorical equality)."
					.to_string(),
		});
	}
	if let (Some(min), Some(max)) = (criteria.min_price, criteria.max_price)
		&& min > max
	{
		return Err(Error::InvalidArgument {
			message: "min_price cannot be greater than max_price.".to_string(),
		});
	}
	if criteria.limit == Some(0) {
		return Err(Error::InvalidArgument {
			message: "limit must be greater than zero.".to_string(),
		});
	}

	let matcher = criteria.pattern.as_deref().map(PatternMatcher::build);
	let mut kept: Vec<RankedResult> = results
		.iter()
		.filter(|result| matches_criteria(result, criteria, matcher.as_ref()))
		.cloned()
		.collect();
	let total = kept.len() as u32;

	if let Some(sort) = criteria.sort {
		kept.sort_by(|a, b| price_order(a, b, sort));
	}
	if let Some(limit) = criteria.limit {
		kept.truncate(limit as usize);
	}

	for (idx, result) in kept.iter_mut().enumerate() {
		result.rank = idx as u32 + 1;
	}

	Ok((kept, total))
}

fn matches_criteria(
	result: &RankedResult,
	criteria: &FilterCriteria,
	matcher: Option<&PatternMatcher>,
) -> bool {
	let product = &result.product;

	if let Some(matcher) = matcher
		&& !matcher.is_match(&searchable_text(result))
	{
		return false;
	}
	if let Some(brand) = &criteria.brand {
		match &product.brand {
			Some(value) if value.eq_ignore_ascii_case(brand) => {},
			_ => return false,
		}
	}
	if let Some(category) = &criteria.category {
		match &product.category {
			Some(value) if value.eq_ignore_ascii_case(category) => {},
			_ => return false,
		}
	}
	if let Some(availability) = &criteria.availability {
		match &product.availability {
			Some(value) if value.eq_ignore_ascii_case(availability) => {},
			_ => return false,
		}
	}
	if criteria.min_price.is_some() || criteria.max_price.is_some() {
		// Price bounds exclude unpriced results.
		let Some(price) = product.price else {
			return false;
		};

		if criteria.min_price.map(|min| price < min).unwrap_or(false) {
			return false;
		}
		if criteria.max_price.map(|max| price > max).unwrap_or(false) {
			return false;
		}
	}

	true
}

fn searchable_text(result: &RankedResult) -> String {
	let product = &result.product;
	let mut parts = vec![product.name.clone()];

	if let Some(description) = &product.description {
		parts.push(description.clone());
	}
	if let Some(category) = &product.category {
		parts.push(category.clone());
	}
	if let Some(brand) = &product.brand {
		parts.push(brand.clone());
	}

	parts.join(" ").to_lowercase()
}

fn price_order(a: &RankedResult, b: &RankedResult, sort: PriceSort) -> Ordering {
	let by_price = match (a.product.price, b.product.price) {
		(Some(lhs), Some(rhs)) => {
			let ord = lhs.partial_cmp(&rhs).unwrap_or(Ordering::Equal);

			match sort {
				PriceSort::Asc => ord,
				PriceSort::Desc => ord.reverse(),
			}
		},
		// Unpriced results sink to the end either way.
		(Some(_), None) => Ordering::Less,
		(None, Some(_)) => Ordering::Greater,
		(None, None) => Ordering::Equal,
	};

	by_price.then_with(|| a.key.cmp(&b.key))
}

enum PatternMatcher {
	Pattern(Regex),
	Substring(String),
}

impl PatternMatcher {
	/// Canned patterns catch the marketing spellings ("water-resistant" for
	/// "waterproof"); anything else gets the escaped criteria with flexible
	/// word joins. A pattern that fails to compile degrades to a substring
	/// test.
	fn build(criteria: &str) -> Self {
		let lowered = criteria.trim().to_lowercase();
		let pattern = match canned_pattern(&lowered) {
			Some(canned) => canned.to_string(),
			None => regex::escape(&lowered).replace(' ', r"[-\s]?"),
		};

		match Regex::new(&pattern) {
			Ok(regex) => Self::Pattern(regex),
			Err(err) => {
				tracing::warn!(pattern = pattern.as_str(), error = %err, "Filter pattern failed to compile; falling back to substring match.");

				Self::Substring(lowered)
			},
		}
	}

	fn is_match(&self, text: &str) -> bool {
		match self {
			Self::Pattern(regex) => regex.is_match(text),
			Self::Substring(needle) => text.contains(needle),
		}
	}
}

fn canned_pattern(criteria: &str) -> Option<&'static str> {
	let pattern = match criteria {
		"waterproof" | "water resistant" => r"water[-\s]?(proof|resistant|repellent)",
		"weatherproof" => r"weather[-\s]?(proof|resistant)",
		"dustproof" => r"dust[-\s]?(proof|resistant)",
		"shockproof" => r"shock[-\s]?(proof|resistant)",
		"lightweight" => r"(light[-\s]?weight|ultra[-\s]?light)",
		"heavy duty" => r"heavy[-\s]?duty",
		"wireless" => r"wireless|wi[-\s]?fi|bluetooth",
		"rechargeable" => r"rechargeable|battery",
		"eco friendly" => r"eco[-\s]?friendly|sustainable|green|environmentally",
		"organic" => r"organic|natural",
		"premium" => r"premium|luxury|high[-\s]?end",
		"budget" => r"budget|affordable|cheap|economy",
		"durable" => r"durable|long[-\s]?lasting|robust",
		"compact" => r"compact|small|mini",
		"quiet" => r"quiet|silent|noise[-\s]?less",
		_ => return None,
	};

	Some(pattern)
}
