//! Main scan loop.

use crate::dispatcher::{DispatchOutcome, IntentDispatcher};
use crate::RelayerError;
use relayer_discovery::{BlockRange, BlockScanner};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Summary of one pass over the pending block range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
	/// Blocks covered, `None` when the chain had not advanced.
	pub range: Option<BlockRange>,
	pub events: usize,
	pub malformed: usize,
	pub executed: usize,
	pub duplicates: usize,
	pub unsupported: usize,
	pub ambiguous: usize,
}

impl ScanReport {
	pub fn is_idle(&self) -> bool {
		self.range.is_none()
	}

	fn record(&mut self, outcome: &DispatchOutcome) {
		match outcome {
			DispatchOutcome::Duplicate => self.duplicates += 1,
			DispatchOutcome::Unsupported(_) => self.unsupported += 1,
			DispatchOutcome::Executed(outcome) => {
				self.executed += 1;
				if outcome.is_ambiguous() {
					self.ambiguous += 1;
				}
			}
		}
	}

	fn extend_range(&mut self, range: BlockRange) {
		self.range = Some(match self.range {
			Some(current) => BlockRange {
				from: current.from,
				to: range.to,
			},
			None => range,
		});
	}
}

pub struct RelayerEngine {
	scanner: BlockScanner,
	dispatcher: IntentDispatcher,
	poll_interval: Duration,
}

impl RelayerEngine {
	pub fn new(scanner: BlockScanner, dispatcher: IntentDispatcher, poll_interval: Duration) -> Self {
		Self {
			scanner,
			dispatcher,
			poll_interval,
		}
	}

	pub fn last_block(&self) -> u64 {
		self.scanner.last_block()
	}

	/// Scans every block after the watermark up to the current head.
	///
	/// Each range is fetched Created, Updated, Cancelled and dispatched in that
	/// order; the watermark moves past a range only once all of its events
	/// have been dispatched. Ledger errors that outlast the retry policy are
	/// returned.
	pub async fn scan_once(&mut self) -> Result<ScanReport, RelayerError> {
		let head = self.scanner.head().await?;
		let ranges = self.scanner.pending_ranges(head);
		let mut report = ScanReport::default();

		if ranges.is_empty() {
			debug!(head, "No new blocks");
			return Ok(report);
		}

		for range in ranges {
			let batch = self.scanner.fetch(range).await?;
			report.events += batch.events.len();
			report.malformed += batch.malformed;

			for event in &batch.events {
				let outcome = self.dispatcher.dispatch(event).await;
				report.record(&outcome);
			}

			self.scanner.advance(range.to);
			report.extend_range(range);
		}

		Ok(report)
	}

	/// Runs until `shutdown` resolves. Shutdown is observed while sleeping
	/// between scans, never in the middle of one.
	pub async fn run<S>(mut self, shutdown: S) -> Result<(), RelayerError>
	where
		S: Future<Output = ()>,
	{
		tokio::pin!(shutdown);

		info!(
			last_block = self.scanner.last_block(),
			poll_interval_secs = self.poll_interval.as_secs(),
			"Relayer started"
		);

		loop {
			let report = self.scan_once().await?;
			if let Some(range) = report.range {
				info!(
					from_block = range.from,
					to_block = range.to,
					events = report.events,
					executed = report.executed,
					duplicates = report.duplicates,
					unsupported = report.unsupported,
					malformed = report.malformed,
					ambiguous = report.ambiguous,
					"Processed block range"
				);
			}

			tokio::select! {
				_ = &mut shutdown => {
					info!(
						last_block = self.scanner.last_block(),
						ambiguous_closes = self.dispatcher.ambiguous_closes(),
						"Shutting down relayer"
					);
					break;
				}
				_ = tokio::time::sleep(self.poll_interval) => {}
			}
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dispatcher::tests::{ExecCall, RecordingExecutor};
	use crate::guard::ReplayGuard;
	use alloy_primitives::B256;
	use relayer_discovery::testing::{cancelled_log, created_log, rpc_log, MockLedger, TestIntent};
	use relayer_discovery::{DiscoveryError, RetryPolicy, ScannerConfig};
	use relayer_types::EventKind;
	use std::sync::Arc;

	fn scanner_config(max_block_range: Option<u64>) -> ScannerConfig {
		ScannerConfig {
			max_block_range,
			retry: RetryPolicy {
				initial_interval: Duration::from_millis(1),
				max_interval: Duration::from_millis(5),
				max_elapsed: Duration::from_millis(50),
			},
		}
	}

	fn engine(
		ledger: &Arc<MockLedger>,
		executor: &Arc<RecordingExecutor>,
		last_block: u64,
		max_block_range: Option<u64>,
	) -> RelayerEngine {
		RelayerEngine::new(
			BlockScanner::new(ledger.clone(), last_block, scanner_config(max_block_range)),
			IntentDispatcher::new(
				ReplayGuard::new(100, Duration::from_secs(3600)),
				executor.clone(),
			),
			Duration::from_millis(10),
		)
	}

	#[tokio::test]
	async fn test_scan_dispatches_and_advances() {
		let ledger = Arc::new(MockLedger::new(105));
		let executor = Arc::new(RecordingExecutor::default());
		let intent = TestIntent::eth_short();
		ledger.push_log(EventKind::Cancelled, cancelled_log(&intent, B256::repeat_byte(2), 104));
		ledger.push_log(EventKind::Created, created_log(&intent, B256::repeat_byte(1), 103));
		ledger.push_log(EventKind::Created, rpc_log(Default::default(), B256::repeat_byte(3), 103));

		let mut engine = engine(&ledger, &executor, 100, None);
		let report = engine.scan_once().await.unwrap();

		assert_eq!(report.range, Some(BlockRange { from: 101, to: 105 }));
		assert_eq!(report.events, 2);
		assert_eq!(report.malformed, 1);
		assert_eq!(report.executed, 2);
		assert_eq!(engine.last_block(), 105);
		assert!(matches!(executor.calls()[0], ExecCall::Open { .. }));
		assert!(matches!(executor.calls()[1], ExecCall::Cancel { .. }));
	}

	#[tokio::test]
	async fn test_idle_when_head_unchanged() {
		let ledger = Arc::new(MockLedger::new(100));
		let executor = Arc::new(RecordingExecutor::default());

		let mut engine = engine(&ledger, &executor, 100, None);
		let report = engine.scan_once().await.unwrap();

		assert!(report.is_idle());
		assert!(ledger.queries().is_empty());
		assert_eq!(engine.last_block(), 100);
	}

	#[tokio::test]
	async fn test_rescan_does_not_execute_twice() {
		let ledger = Arc::new(MockLedger::new(101));
		let executor = Arc::new(RecordingExecutor::default());
		ledger.push_log(
			EventKind::Created,
			created_log(&TestIntent::eth_short(), B256::repeat_byte(1), 101),
		);

		let mut engine = engine(&ledger, &executor, 100, None);
		engine.scan_once().await.unwrap();

		// Same range handed out again, e.g. after a reorg-driven restart.
		engine.scanner = BlockScanner::new(ledger.clone(), 100, scanner_config(None));
		let report = engine.scan_once().await.unwrap();

		assert_eq!(report.duplicates, 1);
		assert_eq!(executor.calls().len(), 1);
	}

	#[tokio::test]
	async fn test_chunks_are_processed_in_order() {
		let ledger = Arc::new(MockLedger::new(110));
		let executor = Arc::new(RecordingExecutor::default());

		let mut engine = engine(&ledger, &executor, 100, Some(5));
		let report = engine.scan_once().await.unwrap();

		assert_eq!(report.range, Some(BlockRange { from: 101, to: 110 }));
		assert_eq!(
			ledger.queries(),
			vec![
				(EventKind::Created, 101, 105),
				(EventKind::Updated, 101, 105),
				(EventKind::Cancelled, 101, 105),
				(EventKind::Created, 106, 110),
				(EventKind::Updated, 106, 110),
				(EventKind::Cancelled, 106, 110),
			]
		);
	}

	#[tokio::test]
	async fn test_ledger_failure_is_fatal_and_keeps_watermark() {
		let ledger = Arc::new(MockLedger::new(110));
		ledger.fail_next(usize::MAX);
		let executor = Arc::new(RecordingExecutor::default());

		let mut engine = engine(&ledger, &executor, 100, None);
		let result = engine.scan_once().await;

		assert!(matches!(
			result,
			Err(RelayerError::Discovery(DiscoveryError::Rpc(_)))
		));
		assert_eq!(engine.last_block(), 100);
	}

	#[tokio::test]
	async fn test_run_stops_on_shutdown() {
		let ledger = Arc::new(MockLedger::new(102));
		let executor = Arc::new(RecordingExecutor::default());
		ledger.push_log(
			EventKind::Created,
			created_log(&TestIntent::eth_short(), B256::repeat_byte(1), 102),
		);

		let engine = engine(&ledger, &executor, 100, None);
		engine.run(async {}).await.unwrap();

		assert_eq!(executor.calls().len(), 1);
	}
}
