//! Approval Reviewer: the Provincial Director's approve/reject pass over
//! allocations awaiting a decision.

use std::collections::HashMap;

use strum::Display;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::{
    domain::{ActivityStatus, ActivityUpdate, Allocation, ApprovalRecord, TransitionError},
    ApiError, BudgetBackend,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject { reason: String },
}

impl Decision {
    pub fn reject(reason: impl Into<String>) -> Self {
        Decision::Reject {
            reason: reason.into(),
        }
    }

    pub fn target_status(&self) -> ActivityStatus {
        match self {
            Decision::Approve => ActivityStatus::PdApproved,
            Decision::Reject { .. } => ActivityStatus::PdRejected,
        }
    }

    fn reason(&self) -> Option<String> {
        match self {
            Decision::Approve => None,
            Decision::Reject { reason } => Some(reason.trim().to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("No allocation found for activity {0}")]
    NotFound(i64),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("Please provide a reason for rejecting activity {0}")]
    MissingReason(i64),
    #[error("No decisions to submit")]
    NothingToSubmit,
    #[error(
        "Failed to submit approvals: {step} for activity {failed} failed, {count} applied",
        count = .applied.len()
    )]
    Batch {
        /// Activities whose status change reached the server, in submission order.
        applied: Vec<i64>,
        failed: i64,
        step: BatchStep,
        #[source]
        source: ApiError,
    },
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ReviewError {
    pub fn user_message(&self) -> String {
        match self {
            ReviewError::Api(e) => e.user_message(),
            ReviewError::Batch {
                applied,
                failed,
                step,
                source,
            } => format!(
                "Activity {}: {} failed ({}). {} decision(s) were applied before the batch stopped.",
                failed,
                step,
                source.user_message(),
                applied.len()
            ),
            other => other.to_string(),
        }
    }
}

/// Which write of an item stopped the batch.
///
/// When the audit record fails the status change has already landed, so the
/// item is listed as applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BatchStep {
    #[strum(serialize = "status update")]
    StatusUpdate,
    #[strum(serialize = "audit record")]
    AuditRecord,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewOutcome {
    /// `(activity_id, new status)` in submission order.
    pub applied: Vec<(i64, ActivityStatus)>,
}

/// View model behind the director's approval screen.
#[derive(Debug, Clone, Default)]
pub struct ApprovalReviewer {
    allocations: Vec<Allocation>,
    decisions: HashMap<i64, Decision>,
}

impl ApprovalReviewer {
    pub async fn load(backend: &dyn BudgetBackend) -> Result<Self, ReviewError> {
        let mut reviewer = Self::default();
        reviewer.refresh(backend).await?;
        Ok(reviewer)
    }

    pub async fn refresh(&mut self, backend: &dyn BudgetBackend) -> Result<(), ReviewError> {
        self.allocations = backend.allocations().await?;
        self.prune_decisions();
        Ok(())
    }

    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    /// Allocations waiting for a decision, in list order.
    pub fn pending(&self) -> Vec<&Allocation> {
        self.allocations
            .iter()
            .filter(|a| a.status.is_pending_decision())
            .collect()
    }

    /// Allocations already approved or rejected.
    pub fn history(&self) -> Vec<&Allocation> {
        self.allocations
            .iter()
            .filter(|a| a.status.is_decided())
            .collect()
    }

    /// Records a decision for a pending allocation, replacing any earlier one.
    pub fn decide(&mut self, activity_id: i64, decision: Decision) -> Result<(), ReviewError> {
        let allocation = self
            .allocations
            .iter()
            .find(|a| a.activity_id == activity_id)
            .ok_or(ReviewError::NotFound(activity_id))?;
        allocation.status.transition(decision.target_status())?;

        self.decisions.insert(activity_id, decision);
        Ok(())
    }

    pub fn clear_decision(&mut self, activity_id: i64) {
        self.decisions.remove(&activity_id);
    }

    pub fn decision(&self, activity_id: i64) -> Option<&Decision> {
        self.decisions.get(&activity_id)
    }

    /// Drops decisions for rows that are no longer awaiting one.
    fn prune_decisions(&mut self) {
        let pending: Vec<i64> = self.pending().iter().map(|a| a.activity_id).collect();
        self.decisions.retain(|id, _| pending.contains(id));
    }

    /// Checks every decision can be sent: rejects need a non-blank reason.
    pub fn validate(&self) -> Result<(), ReviewError> {
        let mut decided = 0;
        for allocation in self.pending() {
            match self.decisions.get(&allocation.activity_id) {
                Some(Decision::Reject { reason }) if reason.trim().is_empty() => {
                    return Err(ReviewError::MissingReason(allocation.activity_id));
                }
                Some(_) => decided += 1,
                None => {}
            }
        }
        if decided == 0 {
            return Err(ReviewError::NothingToSubmit);
        }
        Ok(())
    }

    pub fn can_submit(&self) -> bool {
        self.validate().is_ok()
    }

    /// Applies the decisions one at a time, in list order.
    ///
    /// Each item gets a status update followed by an audit record. The first
    /// failure stops the loop; items already applied stay applied and are
    /// listed in [`ReviewError::Batch`]. The list is re-fetched either way.
    #[instrument(name = "ApprovalReviewer::submit", skip(self, backend), fields(decisions = self.decisions.len()))]
    pub async fn submit(&mut self, backend: &dyn BudgetBackend) -> Result<ReviewOutcome, ReviewError> {
        self.validate()?;

        let queue: Vec<(Allocation, Decision)> = self
            .pending()
            .into_iter()
            .filter_map(|a| {
                self.decisions
                    .get(&a.activity_id)
                    .map(|d| (a.clone(), d.clone()))
            })
            .collect();

        let mut outcome = ReviewOutcome::default();
        let mut failure = None;

        for (allocation, decision) in queue {
            let activity_id = allocation.activity_id;
            match apply_decision(backend, &allocation, &decision).await {
                Ok(status) => outcome.applied.push((activity_id, status)),
                Err(StepFailure::Status(e)) => {
                    failure = Some((activity_id, BatchStep::StatusUpdate, e));
                    break;
                }
                Err(StepFailure::Audit(status, e)) => {
                    outcome.applied.push((activity_id, status));
                    failure = Some((activity_id, BatchStep::AuditRecord, e));
                    break;
                }
            }
        }

        for (activity_id, _) in &outcome.applied {
            self.decisions.remove(activity_id);
        }
        let refreshed = self.refresh(backend).await;

        if let Some((failed, step, source)) = failure {
            warn!(
                failed,
                %step,
                applied = outcome.applied.len(),
                "approval batch stopped part way"
            );
            if let Err(e) = refreshed {
                warn!("Failed to re-fetch allocations after a partial batch: {}", e);
            }
            return Err(ReviewError::Batch {
                applied: outcome.applied.into_iter().map(|(id, _)| id).collect(),
                failed,
                step,
                source,
            });
        }

        refreshed?;
        info!(applied = outcome.applied.len(), "approval batch submitted");
        Ok(outcome)
    }
}

enum StepFailure {
    Status(ApiError),
    /// The status change landed; only the audit record is missing.
    Audit(ActivityStatus, ApiError),
}

async fn apply_decision(
    backend: &dyn BudgetBackend,
    allocation: &Allocation,
    decision: &Decision,
) -> Result<ActivityStatus, StepFailure> {
    let status = decision.target_status();
    let reason = decision.reason();

    let mut update = ActivityUpdate::status(allocation.activity_id, status.clone());
    update.rejection_reason = reason.clone();
    backend
        .update_activity(&update)
        .await
        .map_err(StepFailure::Status)?;

    let record = ApprovalRecord {
        activity_id: allocation.activity_id,
        approval_status: status.clone(),
        rejection_reason: reason,
        component: allocation.component.clone(),
        subcomponent: allocation.subcomponent.clone(),
    };
    if let Err(e) = backend.record_approval(&record).await {
        return Err(StepFailure::Audit(status, e));
    }

    Ok(status)
}
