use std::collections::{HashMap, hash_map::Entry};

use sqlx::PgPool;

use crate::{Result, models::CatalogRow};
use mercato_domain::CatalogAttributes;

/// Batched, read-only catalog lookup: one round trip per result set.
pub async fn fetch_catalog_by_keys(
	pool: &PgPool,
	keys: &[String],
) -> Result<HashMap<String, CatalogAttributes>> {
	if keys.is_empty() {
		return Ok(HashMap::new());
	}

	let rows: Vec<CatalogRow> = sqlx::query_as(
		"\
SELECT
	p.urn,
	p.name,
	b.name AS brand,
	c.name AS category,
	p.description,
	o.price,
	o.price_currency AS currency,
	o.availability,
	p.media,
	p.popularity,
	p.published_at
FROM products p
LEFT JOIN brands b ON p.brand_id = b.id
LEFT JOIN categories c ON p.category_id = c.id
LEFT JOIN offers o ON o.product_id = p.id
WHERE p.urn = ANY($1)",
	)
	.bind(keys)
	.fetch_all(pool)
	.await?;

	let mut out: HashMap<String, CatalogAttributes> = HashMap::new();

	for row in rows {
		match out.entry(row.urn.clone()) {
			Entry::Occupied(mut entry) => {
				let existing = entry.get_mut();

				if offer_preference(row.price, row.availability.as_deref())
					< offer_preference(existing.price, existing.availability.as_deref())
				{
					existing.price = row.price;
					existing.currency = row.currency;
					existing.availability = row.availability;
				}
			},
			Entry::Vacant(entry) => {
				entry.insert(row_to_attributes(row));
			},
		}
	}

	Ok(out)
}

fn row_to_attributes(row: CatalogRow) -> CatalogAttributes {
	CatalogAttributes {
		key: row.urn,
		name: row.name,
		brand: row.brand,
		category: row.category,
		description: row.description,
		price: row.price,
		currency: row.currency,
		availability: row.availability,
		media: row.media.unwrap_or(serde_json::Value::Null),
		popularity: row.popularity,
		published_at: row.published_at,
	}
}

/// Lower is better: in-stock offers beat out-of-stock ones, then the lowest
/// price wins; offers without a price sort last.
fn offer_preference(price: Option<f64>, availability: Option<&str>) -> (u8, u8, f64) {
	let stock_rank = if availability == Some("InStock") { 0 } else { 1 };
	let (price_rank, price) = match price {
		Some(value) => (0, value),
		None => (1, f64::MAX),
	};

	(stock_rank, price_rank, price)
}
