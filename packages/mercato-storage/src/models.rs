use serde_json::Value;
use time::OffsetDateTime;

/// One catalog row per (product, offer) pair. Products without offers come
/// back once with NULL offer columns.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CatalogRow {
	pub urn: String,
	pub name: String,
	pub brand: Option<String>,
	pub category: Option<String>,
	pub description: Option<String>,
	pub price: Option<f64>,
	pub currency: Option<String>,
	pub availability: Option<String>,
	pub media: Option<Value>,
	pub popularity: i64,
	pub published_at: Option<OffsetDateTime>,
}
