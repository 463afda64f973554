use serde_json::Value;
use time::OffsetDateTime;

use mercato_domain::{
	BoostFactor, CatalogAttributes, Channel, ChannelScore, FilterCriteria, PriceSort, QueryFilters,
	RankedResult, ResultSet, SearchQuery,
};

fn snapshot(key: &str, price: Option<f64>) -> CatalogAttributes {
	CatalogAttributes {
		key: key.to_string(),
		name: format!("Product {key}"),
		brand: Some("Altra".to_string()),
		category: Some("footwear".to_string()),
		description: None,
		price,
		currency: Some("USD".to_string()),
		availability: Some("InStock".to_string()),
		media: Value::Null,
		popularity: 12,
		published_at: None,
	}
}

#[test]
fn query_filters_emptiness() {
	assert!(QueryFilters::default().is_empty());
	assert!(!QueryFilters { max_price: Some(50.0), ..Default::default() }.is_empty());
}

#[test]
fn sort_and_limit_are_not_criteria() {
	let shaping_only = FilterCriteria {
		sort: Some(PriceSort::Asc),
		limit: Some(5),
		..Default::default()
	};

	assert!(!shaping_only.has_criteria());
	assert!(FilterCriteria { pattern: Some("waterproof".to_string()), ..Default::default() }
		.has_criteria());
	assert!(FilterCriteria { max_price: Some(50.0), ..Default::default() }.has_criteria());
}

#[test]
fn result_set_round_trips_through_serde() {
	let created_at = OffsetDateTime::from_unix_timestamp(1_750_000_000).expect("timestamp");
	let set = ResultSet {
		results: vec![RankedResult {
			key: "urn:prod:a1".to_string(),
			rank: 1,
			score: 0.031,
			channels: vec![ChannelScore { channel: Channel::Dense, score: 0.9, rank: 1 }],
			boosts: vec![BoostFactor { name: "recency".to_string(), multiplier: 1.1 }],
			product: snapshot("urn:prod:a1", Some(39.5)),
		}],
		total: 1,
		query: SearchQuery::new("trail shoes"),
		applied_filters: Vec::new(),
		partial: false,
		created_at,
		expires_at: created_at + time::Duration::minutes(15),
	};
	let encoded = serde_json::to_string(&set).expect("serialize");

	assert!(encoded.contains("\"created_at\":\"2025-06-15T15:06:40Z\""));

	let decoded: ResultSet = serde_json::from_str(&encoded).expect("deserialize");

	assert_eq!(decoded, set);
}
