//! Scale manager — turns per-monitor votes into one scale decision.
//!
//! One aggregation pass enumerates the active monitors once, reads their
//! retained metrics for exactly that set, and asks each monitor to vote
//! with a context carrying its own samples. The pass holds no state
//! between calls, so concurrent passes are independent.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use warpscale_core::{
    MetricsRepository, MonitorId, MonitorRegistry, ScaleResult, ScaleStatusContext, ScaleVote,
    VoteFailurePolicy,
};

/// One monitor's contribution to an aggregation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitorVote {
    pub monitor: MonitorId,
    pub vote: ScaleVote,
    /// Number of samples the monitor voted on.
    pub samples: usize,
}

/// Outcome of an aggregation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScaleEvaluation {
    pub decision: ScaleVote,
    pub worker_count: u32,
    pub votes: Vec<MonitorVote>,
    /// Monitors whose vote failed under [`VoteFailurePolicy::Abstain`].
    pub abstained: Vec<MonitorId>,
}

/// Aggregates scale votes across all active monitors.
pub struct ScaleManager {
    registry: Arc<dyn MonitorRegistry>,
    repository: Arc<dyn MetricsRepository>,
    vote_failure: VoteFailurePolicy,
}

impl ScaleManager {
    /// Create a scale manager that fails the pass on any vote failure.
    pub fn new(registry: Arc<dyn MonitorRegistry>, repository: Arc<dyn MetricsRepository>) -> Self {
        Self {
            registry,
            repository,
            vote_failure: VoteFailurePolicy::Propagate,
        }
    }

    /// Set how vote failures are treated.
    pub fn with_vote_failure_policy(mut self, policy: VoteFailurePolicy) -> Self {
        self.vote_failure = policy;
        self
    }

    pub fn vote_failure_policy(&self) -> VoteFailurePolicy {
        self.vote_failure
    }

    /// Current scale vote for the pool described by `context`.
    ///
    /// `context.metrics` is ignored; each monitor gets its own samples.
    pub async fn get_scale_status(&self, context: &ScaleStatusContext) -> ScaleResult<ScaleVote> {
        Ok(self.evaluate(context).await?.decision)
    }

    /// Current scale vote for a pool of `worker_count` workers.
    pub async fn get_scale_decision(&self, worker_count: u32) -> ScaleResult<ScaleVote> {
        self.get_scale_status(&ScaleStatusContext::new(worker_count)).await
    }

    /// Run one aggregation pass and return the decision with its votes.
    pub async fn evaluate(&self, context: &ScaleStatusContext) -> ScaleResult<ScaleEvaluation> {
        let monitors = self.registry.get_monitors()?;
        let mut metrics = self.repository.read(&monitors).await?;

        let mut votes = Vec::with_capacity(monitors.len());
        let mut abstained = Vec::new();

        for monitor in &monitors {
            let id = monitor.id();
            let samples = metrics.remove(id).unwrap_or_default();
            let sample_count = samples.len();
            let monitor_context = context.with_metrics(samples);

            match monitor.get_scale_status(&monitor_context) {
                Ok(status) => {
                    debug!(monitor = %id, vote = %status.vote, samples = sample_count, "monitor voted");
                    votes.push(MonitorVote {
                        monitor: id.clone(),
                        vote: status.vote,
                        samples: sample_count,
                    });
                }
                Err(e) if e.is_fatal() || self.vote_failure == VoteFailurePolicy::Propagate => {
                    warn!(monitor = %id, error = %e, "monitor vote failed, aborting scale decision");
                    return Err(e);
                }
                Err(e) => {
                    warn!(monitor = %id, error = %e, "monitor vote failed, excluding from decision");
                    abstained.push(id.clone());
                }
            }
        }

        let raw: Vec<ScaleVote> = votes.iter().map(|v| v.vote).collect();
        let decision = aggregate_votes(&raw, context.worker_count);

        debug!(
            %decision,
            worker_count = context.worker_count,
            monitors = monitors.len(),
            abstained = abstained.len(),
            "scale decision computed"
        );

        Ok(ScaleEvaluation {
            decision,
            worker_count: context.worker_count,
            votes,
            abstained,
        })
    }
}

/// Fold individual votes into one decision.
///
/// Requires unanimity; scale-in additionally requires at least one worker.
/// An empty vote set yields `None`.
pub fn aggregate_votes(votes: &[ScaleVote], worker_count: u32) -> ScaleVote {
    if votes.is_empty() {
        return ScaleVote::None;
    }

    if votes.iter().all(|v| *v == ScaleVote::ScaleOut) {
        ScaleVote::ScaleOut
    } else if worker_count > 0 && votes.iter().all(|v| *v == ScaleVote::ScaleIn) {
        ScaleVote::ScaleIn
    } else {
        ScaleVote::None
    }
}
