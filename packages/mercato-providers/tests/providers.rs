use reqwest::header::AUTHORIZATION;
use serde_json::Map;

#[test]
fn builds_bearer_auth_header() {
	let headers =
		mercato_providers::auth_headers("secret", &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
}

#[test]
fn forwards_default_headers() {
	let mut defaults = Map::new();

	defaults.insert("x-org".to_string(), serde_json::json!("acme"));

	let headers = mercato_providers::auth_headers("secret", &defaults)
		.expect("Failed to build headers.");

	assert_eq!(headers.get("x-org").expect("Missing default header."), "acme");
}

#[test]
fn rejects_non_string_default_headers() {
	let mut defaults = Map::new();

	defaults.insert("x-retries".to_string(), serde_json::json!(3));

	assert!(mercato_providers::auth_headers("secret", &defaults).is_err());
}
