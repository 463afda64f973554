use std::{collections::HashMap, time::Duration};

use sqlx::PgPool;

use crate::{BoxFuture, CatalogProvider, Error, Result, boost::BoostedCandidate};
use mercato_domain::{CatalogAttributes, RankedResult};

/// Default catalog collaborator: one batched Postgres lookup per result set,
/// bounded by its own timeout.
pub(crate) struct DbCatalog {
	pool: PgPool,
	timeout: Duration,
}

impl DbCatalog {
	pub(crate) fn new(pool: PgPool, timeout: Duration) -> Self {
		Self { pool, timeout }
	}
}

impl CatalogProvider for DbCatalog {
	fn get_by_keys<'a>(
		&'a self,
		keys: &'a [String],
	) -> BoxFuture<'a, Result<HashMap<String, CatalogAttributes>>> {
		Box::pin(async move {
			match tokio::time::timeout(
				self.timeout,
				mercato_storage::catalog::fetch_catalog_by_keys(&self.pool, keys),
			)
			.await
			{
				Ok(result) => result.map_err(Error::from),
				Err(_) =>
					Err(Error::Timeout { message: "Catalog lookup timed out.".to_string() }),
			}
		})
	}
}

/// Attaches frozen catalog snapshots to the ranked candidates. Keys deleted
/// from the catalog since indexing are dropped outright; the caller reads the
/// adjusted total off the returned length.
pub(crate) async fn enrich(
	catalog: &dyn CatalogProvider,
	boosted: Vec<BoostedCandidate>,
) -> Result<Vec<RankedResult>> {
	if boosted.is_empty() {
		return Ok(Vec::new());
	}

	let keys: Vec<String> = boosted.iter().map(|candidate| candidate.key.clone()).collect();
	let attributes = catalog.get_by_keys(&keys).await?;
	let mut out = Vec::with_capacity(boosted.len());
	let mut dropped = 0_usize;

	for candidate in boosted {
		let Some(product) = attributes.get(&candidate.key) else {
			dropped += 1;

			continue;
		};
		let rank = out.len() as u32 + 1;

		out.push(RankedResult {
			key: candidate.key,
			rank,
			score: candidate.score,
			channels: candidate.channels,
			boosts: candidate.boosts,
			product: product.clone(),
		});
	}

	if dropped > 0 {
		tracing::info!(dropped, "Dropped ranked candidates missing from the catalog.");
	}

	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::*;
	use mercato_domain::CandidateMeta;

	struct MapCatalog {
		map: HashMap<String, CatalogAttributes>,
	}

	impl CatalogProvider for MapCatalog {
		fn get_by_keys<'a>(
			&'a self,
			keys: &'a [String],
		) -> BoxFuture<'a, Result<HashMap<String, CatalogAttributes>>> {
			let out: HashMap<String, CatalogAttributes> = keys
				.iter()
				.filter_map(|key| self.map.get(key).map(|attrs| (key.clone(), attrs.clone())))
				.collect();

			Box::pin(async move { Ok(out) })
		}
	}

	fn attrs(key: &str) -> CatalogAttributes {
		CatalogAttributes {
			key: key.to_string(),
			name: format!("Product {key}"),
			brand: None,
			category: None,
			description: None,
			price: Some(10.0),
			currency: Some("USD".to_string()),
			availability: Some("InStock".to_string()),
			media: serde_json::Value::Null,
			popularity: 0,
			published_at: None,
		}
	}

	fn boosted(key: &str, score: f32) -> BoostedCandidate {
		BoostedCandidate {
			key: key.to_string(),
			score,
			normalized_score: 0.0,
			channels: Vec::new(),
			boosts: Vec::new(),
			meta: CandidateMeta::default(),
		}
	}

	#[tokio::test]
	async fn drops_keys_missing_from_the_catalog_and_reranks() {
		let catalog = MapCatalog {
			map: [("A".to_string(), attrs("A")), ("C".to_string(), attrs("C"))].into(),
		};
		let ranked = enrich(
			&catalog,
			vec![boosted("A", 0.3), boosted("B", 0.2), boosted("C", 0.1)],
		)
		.await
		.expect("enrich");

		assert_eq!(ranked.len(), 2);
		assert_eq!(ranked[0].key, "A");
		assert_eq!(ranked[0].rank, 1);
		assert_eq!(ranked[1].key, "C");
		assert_eq!(ranked[1].rank, 2);
	}

	#[tokio::test]
	async fn empty_input_skips_the_catalog_call() {
		let catalog = MapCatalog { map: HashMap::new() };
		let ranked = enrich(&catalog, Vec::new()).await.expect("enrich");

		assert!(ranked.is_empty());
	}
}
