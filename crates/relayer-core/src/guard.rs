//! Replay guard.
//!
//! Remembers the transactions that already triggered an exchange action so a
//! rescanned range cannot trigger them twice. Memory is bounded: entries
//! expire after a TTL and the oldest entry is dropped once capacity is
//! reached. State is process-lifetime only.

use relayer_types::TransactionHash;
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};
use tracing::debug;

/// Shortest retention; a zero TTL would let a transaction replay within
/// the same scan.
const MIN_TTL: Duration = Duration::from_secs(1);

pub struct ReplayGuard {
	capacity: usize,
	ttl: Duration,
	/// Insertion order, oldest first.
	order: VecDeque<(TransactionHash, Instant)>,
	seen: HashSet<TransactionHash>,
}

impl ReplayGuard {
	pub fn new(capacity: usize, ttl: Duration) -> Self {
		Self {
			capacity: capacity.max(1),
			ttl: ttl.max(MIN_TTL),
			order: VecDeque::new(),
			seen: HashSet::new(),
		}
	}

	/// Returns true the first time `tx_hash` is seen and marks it; false while
	/// it is retained.
	pub fn should_process(&mut self, tx_hash: &TransactionHash) -> bool {
		self.should_process_at(tx_hash, Instant::now())
	}

	pub(crate) fn should_process_at(&mut self, tx_hash: &TransactionHash, now: Instant) -> bool {
		self.evict_expired(now);

		if self.seen.contains(tx_hash) {
			return false;
		}

		if self.order.len() >= self.capacity {
			if let Some((oldest, _)) = self.order.pop_front() {
				self.seen.remove(&oldest);
				debug!(tx_hash = %oldest.short(), "Replay guard full, evicted oldest entry");
			}
		}

		self.seen.insert(*tx_hash);
		self.order.push_back((*tx_hash, now));
		true
	}

	pub fn len(&self) -> usize {
		self.seen.len()
	}

	pub fn is_empty(&self) -> bool {
		self.seen.is_empty()
	}

	fn evict_expired(&mut self, now: Instant) {
		let mut evicted = 0usize;
		while let Some((hash, inserted)) = self.order.front() {
			if now.saturating_duration_since(*inserted) < self.ttl {
				break;
			}
			self.seen.remove(hash);
			self.order.pop_front();
			evicted += 1;
		}

		if evicted > 0 {
			debug!(evicted, remaining = self.order.len(), "Expired replay guard entries");
		}
	}
}
