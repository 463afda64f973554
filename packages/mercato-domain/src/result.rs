use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::query::{FilterCriteria, SearchQuery};

/// Retrieval channel provenance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
	Dense,
	Sparse,
}
impl Channel {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Dense => "dense",
			Self::Sparse => "sparse",
		}
	}
}

/// Attributes carried in the index payload alongside each hit. These feed the
/// boost stage; the authoritative snapshot comes later from enrichment.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateMeta {
	pub title: Option<String>,
	pub brand: Option<String>,
	pub category: Option<String>,
	pub price: Option<f64>,
	pub availability: Option<String>,
	pub popularity: Option<i64>,
	#[serde(default, with = "crate::time_serde::option")]
	pub published_at: Option<OffsetDateTime>,
}

/// One raw hit from one retrieval channel. `rank` is 1-based within the
/// channel's native ordering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
	pub key: String,
	pub channel: Channel,
	pub score: f32,
	pub rank: u32,
	#[serde(default)]
	pub meta: CandidateMeta,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelScore {
	pub channel: Channel,
	pub score: f32,
	pub rank: u32,
}

/// A named multiplicative adjustment, recorded in application order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoostFactor {
	pub name: String,
	pub multiplier: f32,
}

/// Denormalized catalog snapshot taken at enrichment time. Frozen: later
/// catalog mutations never reach a published result set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogAttributes {
	pub key: String,
	pub name: String,
	pub brand: Option<String>,
	pub category: Option<String>,
	pub description: Option<String>,
	pub price: Option<f64>,
	pub currency: Option<String>,
	pub availability: Option<String>,
	#[serde(default)]
	pub media: Value,
	#[serde(default)]
	pub popularity: i64,
	#[serde(default, with = "crate::time_serde::option")]
	pub published_at: Option<OffsetDateTime>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
	pub key: String,
	pub rank: u32,
	pub score: f32,
	pub channels: Vec<ChannelScore>,
	pub boosts: Vec<BoostFactor>,
	pub product: CatalogAttributes,
}

/// An immutable, cacheable set of ranked results. Filter and compare never
/// mutate one of these; they derive new sets under new handles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
	pub results: Vec<RankedResult>,
	pub total: u32,
	pub query: SearchQuery,
	#[serde(default)]
	pub applied_filters: Vec<FilterCriteria>,
	pub partial: bool,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub expires_at: OffsetDateTime,
}
