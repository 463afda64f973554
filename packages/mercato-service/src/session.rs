use std::{
	collections::{HashMap, VecDeque},
	sync::{Arc, Mutex},
};

use time::OffsetDateTime;

use crate::{Error, Result};
use mercato_domain::{Handle, ResultSet};

/// Short-lived store of immutable result sets keyed by handle. Initialized
/// once at process start and injected into the service; operators never reach
/// for a hidden singleton.
///
/// TTL is absolute from creation (no extension-on-read), so worst-case
/// staleness is bounded regardless of traffic. Capacity eviction reclaims the
/// oldest entry by creation order, which the insertion deque yields in O(1).
pub struct SessionCache {
	ttl: time::Duration,
	capacity: usize,
	inner: Mutex<Inner>,
}

struct Inner {
	entries: HashMap<String, Arc<ResultSet>>,
	order: VecDeque<String>,
}

impl SessionCache {
	pub fn new(cfg: &mercato_config::Sessions) -> Self {
		Self {
			ttl: time::Duration::minutes(cfg.ttl_minutes),
			capacity: cfg.capacity as usize,
			inner: Mutex::new(Inner { entries: HashMap::new(), order: VecDeque::new() }),
		}
	}

	pub fn ttl(&self) -> time::Duration {
		self.ttl
	}

	/// Publishes a result set under a fresh handle. The set is stamped and
	/// inserted whole behind the lock, so a concurrent `get` either misses or
	/// sees the complete immutable value.
	pub fn put(&self, rs: ResultSet) -> (Handle, Arc<ResultSet>) {
		self.put_at(rs, OffsetDateTime::now_utc())
	}

	pub fn put_at(&self, mut rs: ResultSet, now: OffsetDateTime) -> (Handle, Arc<ResultSet>) {
		rs.created_at = now;
		rs.expires_at = now + self.ttl;

		let stored = Arc::new(rs);
		let mut inner = self.inner.lock().unwrap_or_else(|err| err.into_inner());

		sweep_expired(&mut inner, now);

		while inner.entries.len() >= self.capacity {
			let Some(oldest) = inner.order.pop_front() else {
				break;
			};

			if inner.entries.remove(&oldest).is_some() {
				tracing::info!(handle = oldest.as_str(), "Evicted result set at capacity.");
			}
		}

		// Tokens are never reused; a collision with a live entry gets a fresh
		// draw.
		let handle = loop {
			let candidate = Handle::generate();

			if !inner.entries.contains_key(candidate.as_str()) {
				break candidate;
			}
		};

		inner.entries.insert(handle.as_str().to_string(), stored.clone());
		inner.order.push_back(handle.as_str().to_string());

		(handle, stored)
	}

	pub fn get(&self, raw: &str) -> Result<Arc<ResultSet>> {
		self.get_at(raw, OffsetDateTime::now_utc())
	}

	/// A malformed token is the client's mistake (`InvalidArgument`); a
	/// well-formed token that is unknown, evicted, or past its TTL reads as
	/// `NotFound` so the client knows to re-search.
	pub fn get_at(&self, raw: &str, now: OffsetDateTime) -> Result<Arc<ResultSet>> {
		let handle = Handle::parse(raw)?;
		let mut inner = self.inner.lock().unwrap_or_else(|err| err.into_inner());

		match inner.entries.get(handle.as_str()) {
			Some(rs) if rs.expires_at > now => return Ok(rs.clone()),
			Some(_) => {},
			None =>
				return Err(Error::NotFound {
					message: format!("Unknown or expired result handle '{handle}'."),
				}),
		}

		inner.entries.remove(handle.as_str());

		Err(Error::NotFound { message: format!("Result handle '{handle}' has expired.") })
	}

	pub fn len(&self) -> usize {
		self.inner.lock().unwrap_or_else(|err| err.into_inner()).entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Entries expire in creation order because the TTL is constant, so sweeping
/// from the front of the deque is enough. Keys already removed lazily by
/// `get_at` are skipped over.
fn sweep_expired(inner: &mut Inner, now: OffsetDateTime) {
	while let Some(front) = inner.order.front().cloned() {
		match inner.entries.get(&front) {
			Some(rs) if rs.expires_at > now => break,
			Some(_) => {
				inner.entries.remove(&front);
				inner.order.pop_front();
			},
			None => {
				inner.order.pop_front();
			},
		}
	}
}
