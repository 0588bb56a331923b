//! Site Engineer costing: attach a budget and a priority to an activity.

use thiserror::Error;
use tracing::instrument;

use crate::{
    domain::{Activity, ActivityDetails, ActivityStatus, MAX_PRIORITY, MIN_PRIORITY},
    ApiError, BudgetBackend,
};

#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("Budget must be a positive amount")]
    InvalidBudget,
    #[error("Priority must be between {min} and {max}", min = MIN_PRIORITY, max = MAX_PRIORITY)]
    InvalidPriority,
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl AnnotateError {
    pub fn user_message(&self) -> String {
        match self {
            AnnotateError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// Activities an engineer may still cost: approved for site review or
/// already accepted but not yet allocated.
pub fn annotatable(activities: &[Activity]) -> Vec<&Activity> {
    activities
        .iter()
        .filter(|a| matches!(a.status, ActivityStatus::Approved | ActivityStatus::Accepted))
        .collect()
}

pub fn validate(budget: f64, priority: i32) -> Result<ActivityDetails, AnnotateError> {
    if !budget.is_finite() || budget <= 0.0 {
        return Err(AnnotateError::InvalidBudget);
    }
    if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
        return Err(AnnotateError::InvalidPriority);
    }
    Ok(ActivityDetails {
        activity_id: 0,
        budget,
        priority,
    })
}

#[instrument(skip(backend))]
pub async fn annotate_activity(
    backend: &dyn BudgetBackend,
    activity_id: i64,
    budget: f64,
    priority: i32,
) -> Result<ActivityDetails, AnnotateError> {
    let details = ActivityDetails {
        activity_id,
        ..validate(budget, priority)?
    };
    backend.set_activity_details(&details).await?;
    Ok(details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DevBackend;

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(validate(0.0, 1), Err(AnnotateError::InvalidBudget)));
        assert!(matches!(validate(f64::INFINITY, 1), Err(AnnotateError::InvalidBudget)));
        assert!(matches!(validate(10.0, 0), Err(AnnotateError::InvalidPriority)));
        assert!(matches!(validate(10.0, 11), Err(AnnotateError::InvalidPriority)));
        assert!(validate(10.0, 4).is_ok());
    }

    #[test]
    fn whole_priority_scale_is_assignable() {
        assert_eq!(validate(10.0, 7).unwrap().priority, 7);
        assert_eq!(validate(10.0, MAX_PRIORITY).unwrap().priority, 10);
        let err = validate(10.0, MAX_PRIORITY + 1).unwrap_err();
        assert_eq!(err.to_string(), "Priority must be between 1 and 10");
    }

    #[tokio::test]
    async fn annotated_activity_becomes_allocatable() {
        let backend = DevBackend::new();
        assert!(!backend.activity(4).unwrap().is_allocatable());

        annotate_activity(&backend, 4, 250_000.0, 2).await.unwrap();

        let activity = backend.activity(4).unwrap();
        assert_eq!(activity.budget, Some(250_000.0));
        assert_eq!(activity.priority, Some(2));
        assert!(activity.is_allocatable());
    }

    #[tokio::test]
    async fn only_reviewable_activities_are_offered() {
        let backend = DevBackend::new();
        let activities = backend.assigned_activities().await.unwrap();
        assert!(annotatable(&activities)
            .iter()
            .all(|a| matches!(a.status, ActivityStatus::Approved | ActivityStatus::Accepted)));
    }
}
