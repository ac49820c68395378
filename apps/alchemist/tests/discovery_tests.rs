//! Integration tests for the discovery loop.
//!
//! A table-driven stub oracle stands in for the network so every iteration
//! is deterministic; the loop runs against both store backends.

use alchemist::{
    CancellationToken, Discovery, DiscoveryError, IterationOutcome, Oracle, OracleError,
    OracleReply, OracleResult, RunSummary,
};
use alchemist::oracle::CallMetadata;
use alchemist_core::primitives::{DEFAULT_SEEDS, MAX_NAME_LENGTH};
use alchemist_core::{
    AlchemyError, Element, ElementStore, MemoryMetrics, MemoryStore, RedbMetricsLog, RedbStore,
    StoreStats,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

// =============================================================================
// STUB ORACLE
// =============================================================================

/// How the stub oracle fails every call, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    Refused,
    Unreachable,
    Malformed,
}

/// Answers from a fixed table; unknown pairs make `Dust`.
#[derive(Debug, Default, Clone)]
struct StubOracle {
    answers: HashMap<(String, String), (String, bool)>,
    calls: Arc<AtomicUsize>,
    failure: Option<Failure>,
    cancel_on_call: Option<CancellationToken>,
}

impl StubOracle {
    fn new() -> Self {
        Self::default()
    }

    fn answer(mut self, a: &str, b: &str, result: &str, is_new: bool) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        self.answers.insert(
            (lo.to_string(), hi.to_string()),
            (result.to_string(), is_new),
        );
        self
    }

    fn failing(mut self, failure: Failure) -> Self {
        self.failure = Some(failure);
        self
    }

    fn cancelling(mut self, token: &CancellationToken) -> Self {
        self.cancel_on_call = Some(token.clone());
        self
    }

    fn call_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Oracle for StubOracle {
    async fn combine(&self, a: &str, b: &str) -> Result<OracleReply, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = &self.cancel_on_call {
            token.cancel();
        }

        let url = format!("stub://pair?first={a}&second={b}");
        match self.failure {
            Some(Failure::Refused) => return Err(OracleError::Refused { status: 403, url }),
            Some(Failure::Unreachable) => {
                return Err(OracleError::Unreachable {
                    url,
                    reason: "connection refused".to_string(),
                });
            }
            Some(Failure::Malformed) => {
                return Err(OracleError::Malformed {
                    url,
                    reason: "expected value at line 1 column 1".to_string(),
                });
            }
            None => {}
        }

        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let (result, is_new) = self
            .answers
            .get(&(lo.to_string(), hi.to_string()))
            .cloned()
            .unwrap_or_else(|| ("Dust".to_string(), false));

        Ok(OracleReply {
            result: OracleResult {
                result,
                emoji: Some("✨".to_string()),
                is_new,
            },
            call: CallMetadata {
                url,
                http_status: 200,
                requested_at: "Sun, 18 Oct 2026 12:00:00 GMT".to_string(),
                responded_at: Some("Sun, 18 Oct 2026 12:00:01 GMT".to_string()),
            },
        })
    }
}

fn memory_store(names: &[&str]) -> MemoryStore {
    MemoryStore::with_elements(names.iter().copied()).expect("seed store")
}

/// Memory store whose combo writes fail like a full disk.
#[derive(Debug)]
struct BrokenComboStore {
    inner: MemoryStore,
}

impl ElementStore for BrokenComboStore {
    fn element_exists(&self, name: &str) -> Result<bool, AlchemyError> {
        self.inner.element_exists(name)
    }

    fn get_element(&self, name: &str) -> Result<Option<Element>, AlchemyError> {
        self.inner.get_element(name)
    }

    fn insert_element(&mut self, element: Element) -> Result<(), AlchemyError> {
        self.inner.insert_element(element)
    }

    fn remove_element(&mut self, name: &str) -> Result<(), AlchemyError> {
        self.inner.remove_element(name)
    }

    fn combo_exists(&self, a: &str, b: &str) -> Result<bool, AlchemyError> {
        self.inner.combo_exists(a, b)
    }

    fn combo_exists_with_result(
        &self,
        a: &str,
        b: &str,
        result: &str,
    ) -> Result<bool, AlchemyError> {
        self.inner.combo_exists_with_result(a, b, result)
    }

    fn insert_combo(&mut self, _a: &str, _b: &str, _result: &str) -> Result<(), AlchemyError> {
        Err(AlchemyError::IoError("disk full".to_string()))
    }

    fn remove_combo(&mut self, a: &str, b: &str, result: &str) -> Result<(), AlchemyError> {
        self.inner.remove_combo(a, b, result)
    }

    fn count_elements(&self) -> Result<u64, AlchemyError> {
        self.inner.count_elements()
    }

    fn element_at(&self, position: u64) -> Result<Option<String>, AlchemyError> {
        self.inner.element_at(position)
    }

    fn stats(&self) -> Result<StoreStats, AlchemyError> {
        self.inner.stats()
    }
}

// =============================================================================
// SINGLE ITERATION
// =============================================================================

#[tokio::test]
async fn fire_and_water_make_steam_once() {
    let oracle = StubOracle::new().answer("Fire", "Water", "Steam", false);
    let calls = oracle.call_count();
    let mut discovery = Discovery::new(
        memory_store(&["Fire", "Water"]),
        oracle,
        MemoryMetrics::new(),
    );
    assert!(!discovery.store().combo_exists("Fire", "Water").expect("exists"));

    let outcome = discovery.explore("Fire", "Water").await.expect("explore");
    assert_eq!(
        outcome,
        IterationOutcome::Discovered {
            a: "Fire".to_string(),
            b: "Water".to_string(),
            result: "Steam".to_string(),
            element_inserted: true,
            combo_inserted: true,
        }
    );

    let store = discovery.store();
    assert!(store.element_exists("Steam").expect("exists"));
    assert!(store.combo_exists("Water", "Fire").expect("exists"));
    assert_eq!(store.count_elements().expect("count"), 3);

    let records = discovery.metrics().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].agent_id, discovery.agent_id().to_string());
    assert_eq!(records[0].result, "Steam");
    assert_eq!(records[0].http_status, 200);

    // Reversed order is the same pair: no second oracle call, no new record.
    let again = discovery.explore("Water", "Fire").await.expect("explore");
    assert!(matches!(again, IterationOutcome::Skipped { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(discovery.metrics().records().len(), 1);
    assert_eq!(discovery.store().combos().len(), 1);
}

#[tokio::test]
async fn sampled_step_explores_then_skips() {
    // A single element always samples as (Water, Water).
    let oracle = StubOracle::new().answer("Water", "Water", "Lake", false);
    let calls = oracle.call_count();
    let mut discovery = Discovery::new(memory_store(&["Water"]), oracle, MemoryMetrics::new())
        .with_seed(11);
    assert!(!discovery.store().combo_exists("Water", "Water").expect("exists"));

    let first = discovery.step().await.expect("step");
    assert!(matches!(first, IterationOutcome::Discovered { ref result, .. } if result == "Lake"));
    assert!(discovery.store().element_exists("Lake").expect("exists"));
    assert!(discovery.store().combo_exists_with_result("Water", "Water", "Lake").expect("exists"));
    assert_eq!(discovery.metrics().records().len(), 1);

    // Two elements now; keep stepping until (Water, Water) comes up again.
    let mut saw_skip = false;
    for _ in 0..256 {
        let before = calls.load(Ordering::SeqCst);
        if let IterationOutcome::Skipped { a, b } = discovery.step().await.expect("step") {
            assert_eq!(calls.load(Ordering::SeqCst), before);
            saw_skip |= a == "Water" && b == "Water";
        }
        if saw_skip {
            break;
        }
    }
    assert!(saw_skip);
}

#[tokio::test]
async fn known_result_still_records_combo_and_metric() {
    let oracle = StubOracle::new().answer("Water", "Water", "Water", false);
    let mut discovery = Discovery::new(memory_store(&["Water"]), oracle, MemoryMetrics::new());

    let outcome = discovery.explore("Water", "Water").await.expect("explore");
    assert_eq!(
        outcome,
        IterationOutcome::Discovered {
            a: "Water".to_string(),
            b: "Water".to_string(),
            result: "Water".to_string(),
            element_inserted: false,
            combo_inserted: true,
        }
    );
    assert_eq!(discovery.store().count_elements().expect("count"), 1);
    assert!(discovery.store().combo_exists("Water", "Water").expect("exists"));
    assert_eq!(discovery.metrics().records().len(), 1);
}

#[tokio::test]
async fn first_discovery_flag_and_emoji_are_stored() {
    let oracle = StubOracle::new().answer("Fire", "Earth", "Volcano", true);
    let mut discovery = Discovery::new(
        memory_store(&["Fire", "Earth"]),
        oracle,
        MemoryMetrics::new(),
    );

    discovery.explore("Earth", "Fire").await.expect("explore");

    let volcano = discovery
        .store()
        .get_element("Volcano")
        .expect("get")
        .expect("present");
    assert!(volcano.is_new);
    assert_eq!(volcano.emoji.as_deref(), Some("✨"));
    assert!(!discovery
        .store()
        .get_element("Fire")
        .expect("get")
        .expect("present")
        .is_new);
}

// =============================================================================
// FATAL CONDITIONS
// =============================================================================

#[tokio::test]
async fn refusal_is_fatal_and_writes_nothing() {
    let oracle = StubOracle::new().failing(Failure::Refused);
    let calls = oracle.call_count();
    let mut discovery = Discovery::new(
        memory_store(&["Fire", "Water"]),
        oracle,
        MemoryMetrics::new(),
    )
    .with_pace(Duration::ZERO);

    let result = discovery.run(&CancellationToken::new(), None).await;
    assert!(matches!(
        result,
        Err(DiscoveryError::Oracle(OracleError::Refused { status: 403, .. }))
    ));

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(discovery.metrics().records().is_empty());
    assert!(discovery.store().combos().is_empty());
    assert_eq!(discovery.store().count_elements().expect("count"), 2);
}

#[tokio::test]
async fn unreachable_and_malformed_are_fatal_and_write_nothing() {
    for failure in [Failure::Unreachable, Failure::Malformed] {
        let oracle = StubOracle::new().failing(failure);
        let calls = oracle.call_count();
        let mut discovery = Discovery::new(
            memory_store(&["Fire", "Water"]),
            oracle,
            MemoryMetrics::new(),
        )
        .with_pace(Duration::ZERO);

        let result = discovery.run(&CancellationToken::new(), None).await;
        let matched = match failure {
            Failure::Unreachable => matches!(
                result,
                Err(DiscoveryError::Oracle(OracleError::Unreachable { .. }))
            ),
            Failure::Malformed => matches!(
                result,
                Err(DiscoveryError::Oracle(OracleError::Malformed { .. }))
            ),
            Failure::Refused => false,
        };
        assert!(matched, "{failure:?}: {result:?}");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(discovery.metrics().records().is_empty());
        assert!(discovery.store().combos().is_empty());
        assert_eq!(discovery.store().count_elements().expect("count"), 2);
    }
}

#[tokio::test]
async fn store_failure_after_answer_still_records_metric() {
    let oracle = StubOracle::new().answer("Fire", "Water", "Steam", false);
    let calls = oracle.call_count();
    let store = BrokenComboStore {
        inner: memory_store(&["Fire", "Water"]),
    };
    let mut discovery = Discovery::new(store, oracle, MemoryMetrics::new());

    let result = discovery.explore("Fire", "Water").await;
    assert!(matches!(
        result,
        Err(DiscoveryError::Store(AlchemyError::IoError(_)))
    ));

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let records = discovery.metrics().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].result, "Steam");
}

#[tokio::test]
async fn oversized_answer_is_malformed_and_writes_nothing() {
    let huge = "x".repeat(MAX_NAME_LENGTH + 1);
    let oracle = StubOracle::new().answer("Fire", "Water", &huge, true);
    let mut discovery = Discovery::new(
        memory_store(&["Fire", "Water"]),
        oracle,
        MemoryMetrics::new(),
    );

    let result = discovery.explore("Fire", "Water").await;
    assert!(matches!(
        result,
        Err(DiscoveryError::Oracle(OracleError::Malformed { .. }))
    ));
    assert!(discovery.metrics().records().is_empty());
    assert!(discovery.store().combos().is_empty());
    assert_eq!(discovery.store().count_elements().expect("count"), 2);
}

#[tokio::test]
async fn long_answer_within_limit_is_stored() {
    let long = "Philosopher's Stone ".repeat(20);
    let long = long.trim_end();
    let oracle = StubOracle::new().answer("Fire", "Water", long, false);
    let mut discovery = Discovery::new(
        memory_store(&["Fire", "Water"]),
        oracle,
        MemoryMetrics::new(),
    );

    discovery.explore("Fire", "Water").await.expect("explore");
    assert!(discovery.store().element_exists(long).expect("exists"));
}

#[tokio::test]
async fn empty_store_is_fatal_before_any_call() {
    let oracle = StubOracle::new();
    let calls = oracle.call_count();
    let mut discovery = Discovery::new(MemoryStore::new(), oracle, MemoryMetrics::new());

    let result = discovery.step().await;
    assert!(matches!(
        result,
        Err(DiscoveryError::Store(AlchemyError::EmptyStore))
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// =============================================================================
// RUN: BOUNDS AND CANCELLATION
// =============================================================================

#[tokio::test]
async fn iteration_limit_bounds_the_run() {
    // With a single element every sample is (Fire, Fire).
    let oracle = StubOracle::new().answer("Fire", "Fire", "Fire", false);
    let calls = oracle.call_count();
    let mut discovery = Discovery::new(memory_store(&["Fire"]), oracle, MemoryMetrics::new())
        .with_pace(Duration::ZERO);

    let summary = discovery
        .run(&CancellationToken::new(), Some(3))
        .await
        .expect("run");

    assert_eq!(
        summary,
        RunSummary {
            iterations: 3,
            skipped: 2,
            oracle_calls: 1,
            new_elements: 0,
        }
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn zero_iteration_limit_calls_nothing() {
    let oracle = StubOracle::new();
    let calls = oracle.call_count();
    let mut discovery = Discovery::new(memory_store(&["Fire"]), oracle, MemoryMetrics::new())
        .with_pace(Duration::ZERO);

    let summary = discovery
        .run(&CancellationToken::new(), Some(0))
        .await
        .expect("run");

    assert_eq!(summary, RunSummary::default());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(discovery.metrics().records().is_empty());
}

#[tokio::test]
async fn cancelled_before_start_runs_nothing() {
    let oracle = StubOracle::new();
    let calls = oracle.call_count();
    let mut discovery = Discovery::new(memory_store(&["Fire"]), oracle, MemoryMetrics::new());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let summary = discovery.run(&cancel, None).await.expect("run");

    assert_eq!(summary, RunSummary::default());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cancel_mid_iteration_lets_it_finish() {
    let cancel = CancellationToken::new();
    let oracle = StubOracle::new()
        .answer("Fire", "Fire", "Inferno", false)
        .cancelling(&cancel);
    let mut discovery = Discovery::new(memory_store(&["Fire"]), oracle, MemoryMetrics::new())
        .with_pace(Duration::from_secs(3600));

    let summary = discovery.run(&cancel, None).await.expect("run");

    // The in-flight iteration completed and persisted before the loop stopped.
    assert_eq!(summary.iterations, 1);
    assert!(discovery.store().element_exists("Inferno").expect("exists"));
    assert!(discovery.store().combo_exists("Fire", "Fire").expect("exists"));
    assert_eq!(discovery.metrics().records().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_interrupts_pacing() {
    let oracle = StubOracle::new();
    let calls = oracle.call_count();
    let mut discovery = Discovery::new(memory_store(&["Fire"]), oracle, MemoryMetrics::new())
        .with_pace(Duration::from_secs(3600));

    let cancel = CancellationToken::new();
    let loop_token = cancel.clone();
    let handle = tokio::spawn(async move {
        let summary = discovery.run(&loop_token, None).await;
        (summary, discovery)
    });

    tokio::time::sleep(Duration::from_secs(1)).await;
    cancel.cancel();

    let (summary, discovery) = handle.await.expect("join");
    let summary = summary.expect("run");
    assert_eq!(summary.iterations, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(discovery.metrics().records().len(), 1);
}

// =============================================================================
// REDB BACKENDS
// =============================================================================

#[tokio::test]
async fn seeded_run_on_redb_keeps_everything_unique() {
    let temp = tempfile::tempdir().expect("temp dir");
    let mut store = RedbStore::open(temp.path().join("store.redb")).expect("open store");
    for seed in DEFAULT_SEEDS {
        store
            .insert_element(Element::new(seed))
            .expect("seed");
    }
    let metrics = RedbMetricsLog::open(temp.path().join("metrics.redb")).expect("open metrics");

    let oracle = StubOracle::new()
        .answer("Fire", "Water", "Steam", false)
        .answer("Earth", "Water", "Mud", false)
        .answer("Fire", "Earth", "Lava", false);
    let mut discovery = Discovery::new(store, oracle, metrics)
        .with_pace(Duration::ZERO)
        .with_seed(42);
    let agent_id = discovery.agent_id().to_string();

    let summary = discovery
        .run(&CancellationToken::new(), Some(25))
        .await
        .expect("run");
    let (store, _, metrics) = discovery.into_parts();

    assert_eq!(summary.iterations, 25);
    assert_eq!(summary.iterations, summary.skipped + summary.oracle_calls);

    // One record per oracle call, one combo per explored pair.
    assert_eq!(metrics.len().expect("len"), summary.oracle_calls);
    assert_eq!(
        metrics.records_for(&agent_id).expect("records").len() as u64,
        summary.oracle_calls
    );
    let combos = store.combos().expect("combos");
    assert_eq!(combos.len() as u64, summary.oracle_calls);

    let mut keys: Vec<_> = combos.iter().map(|c| c.key()).collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), combos.len());

    assert_eq!(
        store.count_elements().expect("count"),
        DEFAULT_SEEDS.len() as u64 + summary.new_elements
    );
}
