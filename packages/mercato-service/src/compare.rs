use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::{Error, Result, Service};
use mercato_domain::{Handle, RankedResult};

pub const MIN_COMPARE_ITEMS: usize = 2;
pub const MAX_COMPARE_ITEMS: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aspect {
	Price,
	Brand,
	Category,
	Availability,
}

impl Aspect {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Price => "price",
			Self::Brand => "brand",
			Self::Category => "category",
			Self::Availability => "availability",
		}
	}

	fn all() -> [Self; 4] {
		[Self::Price, Self::Brand, Self::Category, Self::Availability]
	}

	fn value_of(self, result: &RankedResult) -> Value {
		let product = &result.product;

		match self {
			Self::Price => product.price.map(|price| Value::from(price)).unwrap_or(Value::Null),
			Self::Brand => option_string(&product.brand),
			Self::Category => option_string(&product.category),
			Self::Availability => option_string(&product.availability),
		}
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct AspectValue {
	/// The caller's 0-based index into the cached result order.
	pub index: usize,
	pub key: String,
	pub name: String,
	pub value: Value,
}

#[derive(Clone, Debug, Serialize)]
pub struct AspectDiff {
	pub aspect: Aspect,
	pub values: Vec<AspectValue>,
	/// For price: the index of the cheapest priced selection.
	pub winner: Option<usize>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Recommendation {
	pub index: usize,
	pub key: String,
	pub reason: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ComparisonReport {
	pub source_handle: Handle,
	pub indices: Vec<usize>,
	pub aspects: Vec<Aspect>,
	pub diffs: Vec<AspectDiff>,
	pub recommendation: Recommendation,
	#[serde(with = "mercato_domain::time_serde")]
	pub generated_at: OffsetDateTime,
}

impl Service {
	/// Terminal transform over already-cached data: no retrieval, and no new
	/// handle is minted for the report.
	pub fn compare(
		&self,
		handle: &str,
		indices: &[usize],
		aspects: Option<Vec<Aspect>>,
	) -> Result<ComparisonReport> {
		let parent = self.sessions.get(handle)?;
		let source_handle = Handle::parse(handle)?;
		let (aspects, diffs, recommendation) =
			build_comparison(&parent.results, indices, aspects)?;

		Ok(ComparisonReport {
			source_handle,
			indices: indices.to_vec(),
			aspects,
			diffs,
			recommendation,
			generated_at: OffsetDateTime::now_utc(),
		})
	}
}

pub(crate) fn build_comparison(
	results: &[RankedResult],
	indices: &[usize],
	aspects: Option<Vec<Aspect>>,
) -> Result<(Vec<Aspect>, Vec<AspectDiff>, Recommendation)> {
	validate_indices(indices, results.len())?;

	let selected: Vec<(usize, &RankedResult)> =
		indices.iter().map(|&idx| (idx, &results[idx])).collect();
	let aspects = match aspects {
		Some(requested) => {
			if requested.is_empty() {
				return Err(Error::InvalidArgument {
					message: "aspects must be non-empty when provided.".to_string(),
				});
			}

			let mut seen = HashSet::new();

			requested.into_iter().filter(|aspect| seen.insert(*aspect)).collect()
		},
		None => detect_aspects(&selected),
	};
	let diffs = aspects.iter().map(|&aspect| build_diff(aspect, &selected)).collect();
	let recommendation = recommend(&selected);

	Ok((aspects, diffs, recommendation))
}

fn validate_indices(indices: &[usize], total: usize) -> Result<()> {
	if indices.len() < MIN_COMPARE_ITEMS {
		return Err(Error::InvalidArgument {
			message: format!("At least {MIN_COMPARE_ITEMS} results are required for comparison."),
		});
	}
	if indices.len() > MAX_COMPARE_ITEMS {
		return Err(Error::InvalidArgument {
			message: format!(
				"At most {MAX_COMPARE_ITEMS} results can be compared; got {}.",
				indices.len()
			),
		});
	}

	let mut seen = HashSet::new();

	for &idx in indices {
		if !seen.insert(idx) {
			return Err(Error::InvalidArgument {
				message: format!("Duplicate comparison index {idx}."),
			});
		}
	}

	let out_of_bounds: Vec<usize> = indices.iter().copied().filter(|&idx| idx >= total).collect();

	if !out_of_bounds.is_empty() {
		let upper = total.saturating_sub(1);

		return Err(Error::InvalidArgument {
			message: format!(
				"Indices {out_of_bounds:?} are out of range. Available results: 0-{upper}."
			),
		});
	}

	Ok(())
}

/// An aspect is only worth reporting when the selected items actually differ
/// on it.
fn detect_aspects(selected: &[(usize, &RankedResult)]) -> Vec<Aspect> {
	Aspect::all()
		.into_iter()
		.filter(|&aspect| {
			let distinct: HashSet<String> = selected
				.iter()
				.map(|(_, result)| aspect.value_of(result).to_string())
				.collect();

			distinct.len() > 1
		})
		.collect()
}

fn build_diff(aspect: Aspect, selected: &[(usize, &RankedResult)]) -> AspectDiff {
	let values = selected
		.iter()
		.map(|&(index, result)| AspectValue {
			index,
			key: result.key.clone(),
			name: result.product.name.clone(),
			value: aspect.value_of(result),
		})
		.collect();
	let winner = match aspect {
		Aspect::Price => selected
			.iter()
			.filter_map(|&(index, result)| result.product.price.map(|price| (index, price)))
			.min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
			.map(|(index, _)| index),
		_ => None,
	};

	AspectDiff { aspect, values, winner }
}

fn recommend(selected: &[(usize, &RankedResult)]) -> Recommendation {
	let cheapest_in_stock = selected
		.iter()
		.filter(|(_, result)| result.product.availability.as_deref() == Some("InStock"))
		.filter_map(|&(index, result)| result.product.price.map(|price| (index, result, price)))
		.min_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));

	if let Some((index, result, _)) = cheapest_in_stock {
		return Recommendation {
			index,
			key: result.key.clone(),
			reason: "Lowest price among in-stock selections.".to_string(),
		};
	}

	let cheapest = selected
		.iter()
		.filter_map(|&(index, result)| result.product.price.map(|price| (index, result, price)))
		.min_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));

	if let Some((index, result, _)) = cheapest {
		return Recommendation {
			index,
			key: result.key.clone(),
			reason: "Lowest price among selections.".to_string(),
		};
	}

	let (index, result) = selected[0];

	Recommendation {
		index,
		key: result.key.clone(),
		reason: "No pricing available; defaulting to the first selection.".to_string(),
	}
}

fn option_string(value: &Option<String>) -> Value {
	value.as_ref().map(|inner| Value::from(inner.clone())).unwrap_or(Value::Null)
}
