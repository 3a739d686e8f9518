//! Block watermark tracking and range scanning.
//!
//! The scanner remembers the last fully processed block. Each poll reads the
//! chain head, splits `(last_block, head]` into ranges and fetches the three
//! event kinds of a range in fixed order. The caller dispatches a batch and
//! only then calls [`BlockScanner::advance`], so a failure mid-range leaves the
//! watermark where it was.

use crate::{decode_log, DiscoveryError, LedgerInterface};
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use relayer_types::{EventKind, IntentEvent};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Inclusive block range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
	pub from: u64,
	pub to: u64,
}

/// Decoded events of one range, Created first, then Updated, then Cancelled.
#[derive(Debug, Clone)]
pub struct ScanBatch {
	pub range: BlockRange,
	pub events: Vec<IntentEvent>,
	/// Logs that could not be decoded and were skipped.
	pub malformed: usize,
}

/// Exponential backoff applied to every ledger call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
	pub initial_interval: Duration,
	pub max_interval: Duration,
	/// Once exceeded, the last error is returned to the caller.
	pub max_elapsed: Duration,
}

impl RetryPolicy {
	fn backoff(&self) -> ExponentialBackoff {
		ExponentialBackoffBuilder::new()
			.with_initial_interval(self.initial_interval)
			.with_max_interval(self.max_interval)
			.with_max_elapsed_time(Some(self.max_elapsed))
			.build()
	}
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			initial_interval: Duration::from_millis(500),
			max_interval: Duration::from_secs(10),
			max_elapsed: Duration::from_secs(120),
		}
	}
}

#[derive(Debug, Clone, Default)]
pub struct ScannerConfig {
	/// Upper bound on blocks per log query; `None` fetches the whole gap at once.
	pub max_block_range: Option<u64>,
	pub retry: RetryPolicy,
}

pub struct BlockScanner {
	ledger: Arc<dyn LedgerInterface>,
	last_block: u64,
	config: ScannerConfig,
}

impl BlockScanner {
	/// Creates a scanner whose next range starts at `last_block + 1`.
	pub fn new(ledger: Arc<dyn LedgerInterface>, last_block: u64, config: ScannerConfig) -> Self {
		Self {
			ledger,
			last_block,
			config,
		}
	}

	/// Creates a scanner positioned before `start_block`, or at the current
	/// head when no start block is given (history is not replayed).
	pub async fn start(
		ledger: Arc<dyn LedgerInterface>,
		start_block: Option<u64>,
		config: ScannerConfig,
	) -> Result<Self, DiscoveryError> {
		let mut scanner = Self::new(ledger, 0, config);
		scanner.last_block = match start_block {
			Some(block) => block.saturating_sub(1),
			None => scanner.head().await?,
		};

		debug!(last_block = scanner.last_block, "Block scanner positioned");
		Ok(scanner)
	}

	/// Last block whose events have been fully processed.
	pub fn last_block(&self) -> u64 {
		self.last_block
	}

	/// Reads the chain head, retrying transient failures.
	pub async fn head(&self) -> Result<u64, DiscoveryError> {
		self.with_retry("block_number", || self.ledger.block_number())
			.await
	}

	/// Splits the blocks after the watermark up to `head` into query ranges.
	pub fn pending_ranges(&self, head: u64) -> Vec<BlockRange> {
		if head <= self.last_block {
			return Vec::new();
		}

		let from = self.last_block + 1;
		let step = match self.config.max_block_range {
			Some(step) if step > 0 => step,
			_ => return vec![BlockRange { from, to: head }],
		};

		let mut ranges = Vec::new();
		let mut start = from;
		while start <= head {
			let end = start.saturating_add(step - 1).min(head);
			ranges.push(BlockRange {
				from: start,
				to: end,
			});
			start = end + 1;
		}
		ranges
	}

	/// Fetches and decodes every event kind in `range`.
	///
	/// Undecodable logs are logged and counted, never returned.
	pub async fn fetch(&self, range: BlockRange) -> Result<ScanBatch, DiscoveryError> {
		let mut events = Vec::new();
		let mut malformed = 0;

		for kind in EventKind::SCAN_ORDER {
			let mut logs = self
				.with_retry("get_logs", || {
					self.ledger.get_logs(kind, range.from, range.to)
				})
				.await?;
			logs.sort_by_key(|log| (log.block_number, log.log_index));

			debug!(
				kind = %kind,
				from_block = range.from,
				to_block = range.to,
				count = logs.len(),
				"Fetched logs"
			);

			for log in &logs {
				match decode_log(kind, log) {
					Ok(event) => events.push(event),
					Err(e) => {
						malformed += 1;
						warn!(
							tx_hash = ?log.transaction_hash,
							block = ?log.block_number,
							error = %e,
							"Skipping undecodable log"
						);
					}
				}
			}
		}

		Ok(ScanBatch {
			range,
			events,
			malformed,
		})
	}

	/// Marks every block up to `to` as processed. Never moves backwards.
	pub fn advance(&mut self, to: u64) {
		self.last_block = self.last_block.max(to);
	}

	async fn with_retry<T, F, Fut>(&self, call: &'static str, mut op: F) -> Result<T, DiscoveryError>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T, DiscoveryError>>,
	{
		backoff::future::retry_notify(
			self.config.retry.backoff(),
			|| {
				let attempt = op();
				async move { attempt.await.map_err(backoff::Error::transient) }
			},
			|e: DiscoveryError, wait: Duration| {
				warn!(call, error = %e, retry_in_ms = wait.as_millis() as u64, "Ledger call failed, retrying");
			},
		)
		.await
	}
}
