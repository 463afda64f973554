use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// Dense query embedding plus the optional sparse term-weight vector some
/// providers return alongside it.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryEmbedding {
	pub dense: Vec<f32>,
	pub sparse: Option<SparseVector>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SparseVector {
	pub indices: Vec<u32>,
	pub values: Vec<f32>,
}

pub async fn embed(
	cfg: &mercato_config::EmbeddingProviderConfig,
	text: &str,
) -> Result<QueryEmbedding> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"input": [text],
		"dimensions": cfg.dimensions,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;
	let parsed = parse_embedding_response(json)?;

	parsed.into_iter().next().ok_or_else(|| Error::InvalidResponse {
		message: "Embedding response contained no vectors.".to_string(),
	})
}

fn parse_embedding_response(json: Value) -> Result<Vec<QueryEmbedding>> {
	let data = json.get("data").and_then(|v| v.as_array()).ok_or_else(|| {
		Error::InvalidResponse { message: "Embedding response is missing data array.".to_string() }
	})?;

	let mut indexed: Vec<(usize, QueryEmbedding)> = Vec::with_capacity(data.len());

	for (fallback_index, item) in data.iter().enumerate() {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.map(|v| v as usize)
			.unwrap_or(fallback_index);
		let dense = parse_f32_array(item.get("embedding").ok_or_else(|| Error::InvalidResponse {
			message: "Embedding item missing embedding array.".to_string(),
		})?)?;
		let sparse = item.get("sparse_embedding").map(parse_sparse).transpose()?;

		indexed.push((index, QueryEmbedding { dense, sparse }));
	}

	indexed.sort_by_key(|(index, _)| *index);

	Ok(indexed.into_iter().map(|(_, embedding)| embedding).collect())
}

fn parse_sparse(raw: &Value) -> Result<SparseVector> {
	let indices = raw
		.get("indices")
		.and_then(|v| v.as_array())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Sparse embedding missing indices array.".to_string(),
		})?
		.iter()
		.map(|value| {
			value.as_u64().and_then(|v| u32::try_from(v).ok()).ok_or_else(|| {
				Error::InvalidResponse {
					message: "Sparse embedding index must be an unsigned integer.".to_string(),
				}
			})
		})
		.collect::<Result<Vec<u32>>>()?;
	let values = parse_f32_array(raw.get("values").ok_or_else(|| Error::InvalidResponse {
		message: "Sparse embedding missing values array.".to_string(),
	})?)?;

	if indices.len() != values.len() {
		return Err(Error::InvalidResponse {
			message: "Sparse embedding indices and values must have equal length.".to_string(),
		});
	}

	Ok(SparseVector { indices, values })
}

fn parse_f32_array(raw: &Value) -> Result<Vec<f32>> {
	let values = raw.as_array().ok_or_else(|| Error::InvalidResponse {
		message: "Embedding values must be an array.".to_string(),
	})?;
	let mut out = Vec::with_capacity(values.len());

	for value in values {
		let number = value.as_f64().ok_or_else(|| Error::InvalidResponse {
			message: "Embedding value must be numeric.".to_string(),
		})?;

		out.push(number as f32);
	}

	Ok(out)
}
