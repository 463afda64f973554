use std::fmt::{Display, Formatter};

use rand::Rng;
use serde::Serialize;

/// Handles are short enough to relay over any transport and URL-safe by
/// construction (uppercase letters and digits only).
pub const HANDLE_LEN: usize = 6;

const HANDLE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Opaque token referencing a cached, immutable result set.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(try_from = "String")]
pub struct Handle(String);

impl Handle {
	/// Draws a fresh random token. Uniqueness against live cache entries is
	/// the caller's concern; expired tokens are never recycled.
	pub fn generate() -> Self {
		let mut rng = rand::rng();
		let token = (0..HANDLE_LEN)
			.map(|_| {
				let idx = rng.random_range(0..HANDLE_ALPHABET.len());

				HANDLE_ALPHABET[idx] as char
			})
			.collect();

		Self(token)
	}

	pub fn parse(raw: &str) -> Result<Self, InvalidHandle> {
		let well_formed = raw.len() == HANDLE_LEN
			&& raw.bytes().all(|byte| byte.is_ascii_uppercase() || byte.is_ascii_digit());

		if !well_formed {
			return Err(InvalidHandle { raw: raw.to_string() });
		}

		Ok(Self(raw.to_string()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl Display for Handle {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

impl TryFrom<String> for Handle {
	type Error = InvalidHandle;

	fn try_from(raw: String) -> Result<Self, Self::Error> {
		Self::parse(&raw)
	}
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid result handle '{raw}': expected {HANDLE_LEN} uppercase alphanumeric characters.")]
pub struct InvalidHandle {
	pub raw: String,
}
