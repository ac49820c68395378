//! # Discovery Loop
//!
//! The single worker that explores the combination space:
//!
//! ```text
//! Sampling -> Checking -> Calling -> Persisting -> Recording -> Pacing -> Sampling ...
//!                 |
//!                 +-- pair already explored --> Pacing
//! ```
//!
//! Iterations run strictly one after another and at most one oracle call is
//! ever in flight. Cancellation is checked at the top of every iteration and
//! while pacing; an iteration that has started always runs to completion or
//! to a fatal error.
//!
//! Dedup is this loop's job: the pair check happens before the oracle call,
//! and each insert re-checks its own key inside the store transaction.
//!
//! Once the oracle has answered, its metric record is written before any
//! store failure is reported, so every answered call is in the metrics log.

use crate::cancel::CancellationToken;
use crate::error::DiscoveryError;
use crate::oracle::{Oracle, OracleError};
use alchemist_core::{
    AlchemyError, Element, ElementStore, MetricRecord, MetricsSink, validate_name,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Default pause between iterations.
pub const DEFAULT_PACE: Duration = Duration::from_millis(1000);

/// What one iteration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    /// The pair was already explored; the oracle was not called.
    Skipped { a: String, b: String },
    /// The oracle was called and its answer persisted.
    Discovered {
        a: String,
        b: String,
        result: String,
        /// False if the element was already known.
        element_inserted: bool,
        /// False if this exact combo was already recorded.
        combo_inserted: bool,
    },
}

/// Totals over a `run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub iterations: u64,
    pub skipped: u64,
    pub oracle_calls: u64,
    pub new_elements: u64,
}

impl RunSummary {
    fn absorb(&mut self, outcome: &IterationOutcome) {
        self.iterations = self.iterations.saturating_add(1);
        match outcome {
            IterationOutcome::Skipped { .. } => {
                self.skipped = self.skipped.saturating_add(1);
            }
            IterationOutcome::Discovered {
                element_inserted, ..
            } => {
                self.oracle_calls = self.oracle_calls.saturating_add(1);
                if *element_inserted {
                    self.new_elements = self.new_elements.saturating_add(1);
                }
            }
        }
    }
}

/// The discovery loop and everything it depends on.
///
/// Built once at startup; the only state carried between iterations is the
/// agent identifier and the sampling RNG.
pub struct Discovery<S, O, M> {
    agent_id: Uuid,
    store: S,
    oracle: O,
    metrics: M,
    pace: Duration,
    rng: StdRng,
}

impl<S, O, M> std::fmt::Debug for Discovery<S, O, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Discovery")
            .field("agent_id", &self.agent_id)
            .field("pace", &self.pace)
            .finish_non_exhaustive()
    }
}

impl<S, O, M> Discovery<S, O, M>
where
    S: ElementStore,
    O: Oracle,
    M: MetricsSink,
{
    /// Bundle the collaborators under a fresh agent identifier.
    pub fn new(store: S, oracle: O, metrics: M) -> Self {
        Self {
            agent_id: Uuid::new_v4(),
            store,
            oracle,
            metrics,
            pace: DEFAULT_PACE,
            rng: StdRng::from_entropy(),
        }
    }

    /// Set the pause between iterations.
    #[must_use]
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    /// Seed the sampling RNG for reproducible runs.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// The identifier stamped on every metric record of this process.
    pub fn agent_id(&self) -> Uuid {
        self.agent_id
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn metrics(&self) -> &M {
        &self.metrics
    }

    /// Release the collaborators.
    pub fn into_parts(self) -> (S, O, M) {
        (self.store, self.oracle, self.metrics)
    }

    /// Draw two elements independently. `a == b` is a valid pair.
    pub fn sample_pair(&mut self) -> Result<(String, String), DiscoveryError> {
        let count = self.store.count_elements()?;
        if count == 0 {
            return Err(AlchemyError::EmptyStore.into());
        }
        let a = self.store.sample_element(count, &mut self.rng)?;
        let b = self.store.sample_element(count, &mut self.rng)?;
        Ok((a, b))
    }

    /// Explore one pair: check, call, persist, record.
    pub async fn explore(&mut self, a: &str, b: &str) -> Result<IterationOutcome, DiscoveryError> {
        let started = Instant::now();

        if self.store.combo_exists(a, b)? {
            tracing::info!(
                a,
                b,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Pair already explored, skipping"
            );
            return Ok(IterationOutcome::Skipped {
                a: a.to_string(),
                b: b.to_string(),
            });
        }

        let reply = self.oracle.combine(a, b).await?;
        let result = reply.result.result;

        // A name the store cannot hold is a bad answer, not a store failure.
        validate_name(&result).map_err(|e| OracleError::Malformed {
            url: reply.call.url.clone(),
            reason: e.to_string(),
        })?;

        // Both inserts are attempted before either outcome is judged.
        let element = Element::new(result.clone())
            .discovered(reply.result.is_new)
            .with_emoji(reply.result.emoji);
        let element_outcome = self.store.insert_element(element);
        let combo_outcome = self.store.insert_combo(a, b, &result);

        // The call is accounted for even when persisting it failed.
        self.metrics.record(&MetricRecord {
            agent_id: self.agent_id.to_string(),
            result: result.clone(),
            url: reply.call.url,
            http_status: reply.call.http_status,
            requested_at: reply.call.requested_at,
            responded_at: reply.call.responded_at,
        })?;

        let element_inserted = settle(element_outcome)?;
        let combo_inserted = settle(combo_outcome)?;

        tracing::info!(
            a,
            b,
            result = %result,
            new_element = element_inserted,
            new_combo = combo_inserted,
            first_discovery = reply.result.is_new,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Combination recorded"
        );

        Ok(IterationOutcome::Discovered {
            a: a.to_string(),
            b: b.to_string(),
            result,
            element_inserted,
            combo_inserted,
        })
    }

    /// Run one iteration on a freshly sampled pair.
    pub async fn step(&mut self) -> Result<IterationOutcome, DiscoveryError> {
        let (a, b) = self.sample_pair()?;
        tracing::debug!(a = %a, b = %b, "Sampled pair");
        self.explore(&a, &b).await
    }

    /// Iterate until `cancel` fires, `max_iterations` is reached, or a fatal
    /// error occurs.
    pub async fn run(
        &mut self,
        cancel: &CancellationToken,
        max_iterations: Option<u64>,
    ) -> Result<RunSummary, DiscoveryError> {
        let mut summary = RunSummary::default();
        tracing::info!(
            agent_id = %self.agent_id,
            pace_ms = self.pace.as_millis() as u64,
            "Discovery loop starting"
        );

        loop {
            if cancel.is_cancelled() {
                tracing::info!("Cancelled, not starting another iteration");
                break;
            }
            if limit_reached(&summary, max_iterations) {
                break;
            }

            let outcome = self.step().await?;
            summary.absorb(&outcome);

            // Checked again here so the last iteration is not followed by a pause.
            if limit_reached(&summary, max_iterations) {
                break;
            }

            tokio::select! {
                () = tokio::time::sleep(self.pace) => {}
                () = cancel.cancelled() => {
                    tracing::info!("Cancelled while pacing");
                    break;
                }
            }
        }

        tracing::info!(
            iterations = summary.iterations,
            skipped = summary.skipped,
            oracle_calls = summary.oracle_calls,
            new_elements = summary.new_elements,
            "Discovery loop stopped"
        );
        Ok(summary)
    }
}

fn limit_reached(summary: &RunSummary, max_iterations: Option<u64>) -> bool {
    let reached = max_iterations.is_some_and(|max| summary.iterations >= max);
    if reached {
        tracing::info!(iterations = summary.iterations, "Iteration limit reached");
    }
    reached
}

/// Turn an insert outcome into "was written", swallowing benign duplicates.
fn settle(outcome: Result<(), AlchemyError>) -> Result<bool, AlchemyError> {
    match outcome {
        Ok(()) => Ok(true),
        Err(e) if e.is_benign() => {
            tracing::info!("{}", e);
            Ok(false)
        }
        Err(e) => Err(e),
    }
}
