use serde::{Deserialize, Serialize};

pub const MAX_QUERY_CHARS: usize = 500;
pub const MAX_LIMIT: u32 = 100;
pub const DEFAULT_LIMIT: u32 = 20;

/// Structured pre-filters pushed down to the index backends before ranking.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryFilters {
	pub brand: Option<String>,
	pub category: Option<String>,
	pub min_price: Option<f64>,
	pub max_price: Option<f64>,
}
impl QueryFilters {
	pub fn is_empty(&self) -> bool {
		self.brand.is_none()
			&& self.category.is_none()
			&& self.min_price.is_none()
			&& self.max_price.is_none()
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
	pub text: String,
	#[serde(default)]
	pub filters: QueryFilters,
	#[serde(default = "default_limit")]
	pub limit: u32,
	#[serde(default)]
	pub offset: u32,
}
impl SearchQuery {
	pub fn new(text: impl Into<String>) -> Self {
		Self {
			text: text.into(),
			filters: QueryFilters::default(),
			limit: DEFAULT_LIMIT,
			offset: 0,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSort {
	Asc,
	Desc,
}

/// Criteria for the chained filter operation over a cached result set.
/// `sort` and `limit` shape the output; they do not count as criteria on
/// their own.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
	pub pattern: Option<String>,
	pub min_price: Option<f64>,
	pub max_price: Option<f64>,
	pub brand: Option<String>,
	pub category: Option<String>,
	pub availability: Option<String>,
	pub sort: Option<PriceSort>,
	pub limit: Option<u32>,
}
impl FilterCriteria {
	pub fn has_criteria(&self) -> bool {
		self.pattern.is_some()
			|| self.min_price.is_some()
			|| self.max_price.is_some()
			|| self.brand.is_some()
			|| self.category.is_some()
			|| self.availability.is_some()
	}
}

fn default_limit() -> u32 {
	DEFAULT_LIMIT
}
