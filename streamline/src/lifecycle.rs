//! Activity intake and review before costing: a Responsible Person submits,
//! a Development Officer approves and assigns an engineer, the engineer
//! accepts or turns the assignment down.

use thiserror::Error;
use tracing::{info, instrument};

use crate::{
    domain::{Activity, ActivityStatus, ActivityUpdate, Engineer, NewActivity, TransitionError},
    ApiError, BudgetBackend,
};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Please fill all required fields: {0}")]
    MissingField(&'static str),
    #[error("Please assign an engineer for approved activities")]
    MissingEngineer,
    #[error("Engineer {0} is not registered")]
    UnknownEngineer(i64),
    #[error("Please provide a reason for rejecting activity {0}")]
    MissingReason(i64),
    #[error("New activities must be Pending or Approved, not {0}")]
    InvalidInitialStatus(ActivityStatus),
    #[error("Activity {0} not found")]
    NotFound(i64),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl LifecycleError {
    pub fn user_message(&self) -> String {
        match self {
            LifecycleError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// A Development Officer's answer to a pending activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfficerDecision {
    Approve {
        engineer_id: i64,
        component: Option<String>,
        subcomponent: Option<String>,
        /// Replaces the submitted description when set.
        description: Option<String>,
    },
    Reject {
        reason: String,
    },
}

/// A Site Engineer's answer to an assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineerDecision {
    Accept,
    Reject { reason: String },
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Checks the form the way the intake screens do before anything is sent.
pub fn validate_new_activity(activity: &NewActivity) -> Result<(), LifecycleError> {
    let required = [
        ("description", &activity.description),
        ("province", &activity.location.province),
        ("district", &activity.location.district),
        ("zone", &activity.location.zone),
    ];
    if let Some((name, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
        return Err(LifecycleError::MissingField(*name));
    }

    match activity.status {
        ActivityStatus::Pending => Ok(()),
        ActivityStatus::Approved if activity.assigned_engineer_id.is_none() => {
            Err(LifecycleError::MissingEngineer)
        }
        ActivityStatus::Approved => Ok(()),
        ref other => Err(LifecycleError::InvalidInitialStatus(other.clone())),
    }
}

#[instrument(skip_all, fields(description = %activity.description, images = activity.images.len()))]
pub async fn submit_activity(
    backend: &dyn BudgetBackend,
    activity: &NewActivity,
) -> Result<(), LifecycleError> {
    validate_new_activity(activity)?;
    backend.add_activity(activity).await?;
    info!("activity submitted");
    Ok(())
}

pub fn find_engineer(engineers: &[Engineer], id: i64) -> Result<&Engineer, LifecycleError> {
    engineers
        .iter()
        .find(|e| e.id == id)
        .ok_or(LifecycleError::UnknownEngineer(id))
}

pub fn find_activity(activities: &[Activity], id: i64) -> Result<&Activity, LifecycleError> {
    activities
        .iter()
        .find(|a| a.id == id)
        .ok_or(LifecycleError::NotFound(id))
}

/// Builds the `activity/update` body for an officer decision after checking
/// the transition out of the activity's current status.
pub fn officer_update(
    activity: &Activity,
    decision: &OfficerDecision,
) -> Result<ActivityUpdate, LifecycleError> {
    match decision {
        OfficerDecision::Approve {
            engineer_id,
            component,
            subcomponent,
            description,
        } => {
            let status = activity.status.transition(ActivityStatus::Approved)?;
            Ok(ActivityUpdate {
                assigned_engineer_id: Some(*engineer_id),
                component: non_blank(component).or_else(|| activity.component.clone()),
                subcomponent: non_blank(subcomponent).or_else(|| activity.subcomponent.clone()),
                description: non_blank(description),
                ..ActivityUpdate::status(activity.id, status)
            })
        }
        OfficerDecision::Reject { reason } => {
            let status = activity.status.transition(ActivityStatus::Rejected)?;
            let reason = reason.trim();
            if reason.is_empty() {
                return Err(LifecycleError::MissingReason(activity.id));
            }
            Ok(ActivityUpdate::status(activity.id, status).with_rejection_reason(reason))
        }
    }
}

#[instrument(skip(backend, activity), fields(activity_id = activity.id))]
pub async fn review_activity(
    backend: &dyn BudgetBackend,
    activity: &Activity,
    decision: &OfficerDecision,
) -> Result<ActivityStatus, LifecycleError> {
    let update = officer_update(activity, decision)?;
    backend.update_activity(&update).await?;
    info!(status = %update.status, "activity reviewed");
    Ok(update.status)
}

pub fn engineer_update(
    activity: &Activity,
    decision: &EngineerDecision,
) -> Result<ActivityUpdate, LifecycleError> {
    match decision {
        EngineerDecision::Accept => {
            let status = activity.status.transition(ActivityStatus::Accepted)?;
            Ok(ActivityUpdate::status(activity.id, status))
        }
        EngineerDecision::Reject { reason } => {
            let status = activity.status.transition(ActivityStatus::Rejected)?;
            let reason = reason.trim();
            if reason.is_empty() {
                return Err(LifecycleError::MissingReason(activity.id));
            }
            Ok(ActivityUpdate::status(activity.id, status).with_rejection_reason(reason))
        }
    }
}

#[instrument(skip(backend, activity), fields(activity_id = activity.id))]
pub async fn respond_to_assignment(
    backend: &dyn BudgetBackend,
    activity: &Activity,
    decision: &EngineerDecision,
) -> Result<ActivityStatus, LifecycleError> {
    let update = engineer_update(activity, decision)?;
    backend.update_assigned_activity(&update).await?;
    info!(status = %update.status, "assignment answered");
    Ok(update.status)
}

/// Assignments still waiting for the engineer's answer.
pub fn awaiting_response(activities: &[Activity]) -> Vec<&Activity> {
    activities
        .iter()
        .filter(|a| a.status == ActivityStatus::Approved)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::Location, DevBackend};

    fn location() -> Location {
        Location {
            province: "Central".to_string(),
            district: "Kandy".to_string(),
            zone: "Gampola".to_string(),
        }
    }

    fn approve(engineer_id: i64) -> OfficerDecision {
        OfficerDecision::Approve {
            engineer_id,
            component: Some("Health".to_string()),
            subcomponent: Some("  ".to_string()),
            description: None,
        }
    }

    #[test]
    fn intake_form_needs_every_location_field() {
        let mut activity = NewActivity::new("Drainage", location());
        assert!(validate_new_activity(&activity).is_ok());

        activity.location.zone = " ".to_string();
        assert!(matches!(
            validate_new_activity(&activity),
            Err(LifecycleError::MissingField("zone"))
        ));
    }

    #[test]
    fn approved_intake_needs_an_engineer() {
        let mut activity = NewActivity::new("Drainage", location());
        activity.status = ActivityStatus::Approved;
        assert!(matches!(
            validate_new_activity(&activity),
            Err(LifecycleError::MissingEngineer)
        ));

        activity.assigned_engineer_id = Some(2);
        assert!(validate_new_activity(&activity).is_ok());

        activity.status = ActivityStatus::Accepted;
        assert!(matches!(
            validate_new_activity(&activity),
            Err(LifecycleError::InvalidInitialStatus(_))
        ));
    }

    #[tokio::test]
    async fn submitted_activity_starts_pending() {
        let backend = DevBackend::new();
        submit_activity(&backend, &NewActivity::new("Drainage", location()))
            .await
            .unwrap();

        let own = backend.own_activities().await.unwrap();
        let added = own.iter().find(|a| a.description == "Drainage").unwrap();
        assert_eq!(added.status, ActivityStatus::Pending);
        assert!(backend.calls().contains(&"POST activity/add".to_string()));
    }

    #[tokio::test]
    async fn officer_approval_assigns_engineer_and_component() {
        let backend = DevBackend::new();
        let activities = backend.managed_activities().await.unwrap();
        let pending = find_activity(&activities, 6).unwrap();

        let status = review_activity(&backend, pending, &approve(2)).await.unwrap();
        assert_eq!(status, ActivityStatus::Approved);

        let reviewed = backend.activity(6).unwrap();
        assert_eq!(reviewed.status, ActivityStatus::Approved);
        assert_eq!(reviewed.assigned_engineer_id, Some(2));
        assert_eq!(reviewed.component.as_deref(), Some("Health"));
        // Blank subcomponent keeps what was there.
        assert_eq!(reviewed.subcomponent.as_deref(), Some("Rural Development"));
        assert!(backend.calls().contains(&"PUT activity/update 6".to_string()));
    }

    #[test]
    fn officer_update_body_carries_assignment() {
        let activity: Activity = serde_json::from_value(serde_json::json!({
            "id": 4, "description": "Well", "zone": "Matale", "status": "Pending",
            "component": null, "subcomponent": null, "budget": null
        }))
        .unwrap();
        let update = officer_update(
            &activity,
            &OfficerDecision::Approve {
                engineer_id: 7,
                component: Some("Water".to_string()),
                subcomponent: Some("Wells".to_string()),
                description: Some("Village well".to_string()),
            },
        )
        .unwrap();
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({
                "id": 4, "status": "Approved", "assigned_engineer_id": 7,
                "component": "Water", "subcomponent": "Wells", "description": "Village well"
            })
        );
    }

    #[tokio::test]
    async fn officer_rejection_needs_reason_and_pending_status() {
        let backend = DevBackend::new();
        let activities = backend.managed_activities().await.unwrap();

        let pending = find_activity(&activities, 6).unwrap();
        let err = review_activity(
            &backend,
            pending,
            &OfficerDecision::Reject {
                reason: " ".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LifecycleError::MissingReason(6)));

        let accepted = find_activity(&activities, 1).unwrap();
        let err = review_activity(&backend, accepted, &approve(1))
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Transition(_)));
        assert!(!backend.calls().iter().any(|c| c.starts_with("PUT")));
    }

    #[tokio::test]
    async fn engineer_accepts_or_rejects_assignment() {
        let backend = DevBackend::new();
        let assigned = backend.assigned_activities().await.unwrap();
        let waiting = awaiting_response(&assigned);
        assert_eq!(waiting.iter().map(|a| a.id).collect::<Vec<_>>(), [5]);

        let status = respond_to_assignment(&backend, waiting[0], &EngineerDecision::Accept)
            .await
            .unwrap();
        assert_eq!(status, ActivityStatus::Accepted);
        assert_eq!(backend.activity(5).unwrap().status, ActivityStatus::Accepted);
        assert!(backend
            .calls()
            .contains(&"PUT activity/update_id 5".to_string()));
    }

    #[test]
    fn engineer_rejection_carries_reason() {
        let activity: Activity = serde_json::from_value(serde_json::json!({
            "id": 9, "description": "Road", "zone": "Kandy", "status": "Approved",
            "component": null, "subcomponent": null, "budget": null
        }))
        .unwrap();
        let update = engineer_update(
            &activity,
            &EngineerDecision::Reject {
                reason: " Site inaccessible ".to_string(),
            },
        )
        .unwrap();
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({"id": 9, "status": "Rejected", "rejectionReason": "Site inaccessible"})
        );

        let err = engineer_update(
            &activity,
            &EngineerDecision::Reject {
                reason: String::new(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, LifecycleError::MissingReason(9)));
    }

    #[test]
    fn unknown_engineer_is_reported() {
        let engineers = vec![Engineer {
            id: 1,
            name: "N. Perera".to_string(),
            specialization: None,
        }];
        assert!(find_engineer(&engineers, 1).is_ok());
        assert_eq!(
            find_engineer(&engineers, 3).unwrap_err().user_message(),
            "Engineer 3 is not registered"
        );
    }
}
