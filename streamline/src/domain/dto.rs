use serde::{Deserialize, Serialize};

use super::{Activity, ActivityStatus, Allocation, Budget, Engineer, Location};

#[derive(Debug, Deserialize)]
pub struct BudgetsResponse {
    #[serde(default)]
    pub budgets: Vec<Budget>,
}

#[derive(Debug, Deserialize)]
pub struct ActivitiesResponse {
    pub success: Option<bool>,
    #[serde(default)]
    pub activities: Vec<Activity>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AllocationsResponse {
    pub success: Option<bool>,
    #[serde(default)]
    pub allocations: Vec<Allocation>,
    pub message: Option<String>,
}

/// `activity/get_all_id` lists the caller's own submissions under `data`.
#[derive(Debug, Deserialize)]
pub struct OwnActivitiesResponse {
    pub success: Option<bool>,
    #[serde(default)]
    pub data: Vec<Activity>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EngineersResponse {
    pub success: Option<bool>,
    #[serde(default)]
    pub engineers: Vec<Engineer>,
    pub message: Option<String>,
}

/// Envelope shared by every write endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct AckResponse {
    pub success: Option<bool>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub success: Option<bool>,
    pub token: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CreateBudgetRequest {
    pub budget: f64,
}

#[derive(Debug, Serialize)]
pub struct UpdateBudgetRequest {
    pub id: i64,
    pub budget: f64,
}

/// Budget and priority assigned to an activity by a Site Engineer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDetails {
    pub activity_id: i64,
    pub budget: f64,
    pub priority: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationRequest {
    pub activity_id: i64,
    pub amount: f64,
    pub priority: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    pub budget_id: i64,
    pub allocations: Vec<AllocationRequest>,
}

/// Body of `PUT activity/update`. Only `id` and `status` are always sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityUpdate {
    pub id: i64,
    pub status: ActivityStatus,
    #[serde(rename = "rejectionReason", skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcomponent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_engineer_id: Option<i64>,
}

impl ActivityUpdate {
    pub fn status(id: i64, status: ActivityStatus) -> Self {
        Self {
            id,
            status,
            rejection_reason: None,
            component: None,
            subcomponent: None,
            description: None,
            assigned_engineer_id: None,
        }
    }

    pub fn with_rejection_reason(mut self, reason: impl Into<String>) -> Self {
        self.rejection_reason = Some(reason.into());
        self
    }
}

/// A photo attached to a new activity, sent as a multipart `images` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Form fields of `POST activity/add`.
///
/// Responsible Persons always submit `Pending`. A Development Officer may
/// create an activity already `Approved` with an engineer assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub description: String,
    pub location: Location,
    pub component: Option<String>,
    pub subcomponent: Option<String>,
    pub status: ActivityStatus,
    pub assigned_engineer_id: Option<i64>,
    pub images: Vec<ImageUpload>,
}

impl NewActivity {
    pub fn new(description: impl Into<String>, location: Location) -> Self {
        Self {
            description: description.into(),
            location,
            component: None,
            subcomponent: None,
            status: ActivityStatus::Pending,
            assigned_engineer_id: None,
            images: Vec::new(),
        }
    }

    /// Text parts of the form, in the order they are sent.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("description", self.description.clone()),
            ("province", self.location.province.clone()),
            ("district", self.location.district.clone()),
            ("zone", self.location.zone.clone()),
        ];
        if let Some(component) = &self.component {
            fields.push(("component", component.clone()));
        }
        if let Some(subcomponent) = &self.subcomponent {
            fields.push(("subcomponent", subcomponent.clone()));
        }
        fields.push(("status", self.status.to_string()));
        if let Some(id) = self.assigned_engineer_id {
            fields.push(("assigned_engineer_id", id.to_string()));
        }
        fields
    }
}

/// Audit row written to `pd-approvals` for every director decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalRecord {
    pub activity_id: i64,
    pub approval_status: ActivityStatus,
    pub rejection_reason: Option<String>,
    pub component: Option<String>,
    pub subcomponent: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finalize_request_uses_camel_case() {
        let request = FinalizeRequest {
            budget_id: 4,
            allocations: vec![AllocationRequest {
                activity_id: 9,
                amount: 1200.0,
                priority: 1,
            }],
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"budgetId": 4, "allocations": [{"activityId": 9, "amount": 1200.0, "priority": 1}]})
        );
    }

    #[test]
    fn activity_update_omits_unset_fields() {
        let approve = ActivityUpdate::status(5, ActivityStatus::PdApproved);
        assert_eq!(
            serde_json::to_value(&approve).unwrap(),
            json!({"id": 5, "status": "PDApproved"})
        );

        let reject =
            ActivityUpdate::status(5, ActivityStatus::PdRejected).with_rejection_reason("Duplicate");
        assert_eq!(
            serde_json::to_value(&reject).unwrap(),
            json!({"id": 5, "status": "PDRejected", "rejectionReason": "Duplicate"})
        );
    }

    #[test]
    fn activity_details_uses_camel_case() {
        let details = ActivityDetails {
            activity_id: 2,
            budget: 500.0,
            priority: 3,
        };
        assert_eq!(
            serde_json::to_value(&details).unwrap(),
            json!({"activityId": 2, "budget": 500.0, "priority": 3})
        );
    }

    #[test]
    fn new_activity_form_skips_unset_fields() {
        let mut activity = NewActivity::new(
            "Roof repair",
            Location {
                province: "Central".to_string(),
                district: "Kandy".to_string(),
                zone: "Gampola".to_string(),
            },
        );
        let names: Vec<&str> = activity.form_fields().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, ["description", "province", "district", "zone", "status"]);
        assert_eq!(activity.form_fields()[4].1, "Pending");

        activity.status = ActivityStatus::Approved;
        activity.assigned_engineer_id = Some(8);
        activity.component = Some("Health".to_string());
        let fields = activity.form_fields();
        assert!(fields.contains(&("component", "Health".to_string())));
        assert!(fields.contains(&("status", "Approved".to_string())));
        assert!(fields.contains(&("assigned_engineer_id", "8".to_string())));
    }

    #[test]
    fn own_activities_are_listed_under_data() {
        let response: OwnActivitiesResponse = serde_json::from_value(json!({
            "success": true,
            "data": [{"id": 3, "description": "Well", "zone": "Matale", "status": "Pending",
                      "component": null, "subcomponent": null, "budget": null}]
        }))
        .unwrap();
        assert_eq!(response.data.len(), 1);
        assert_eq!(response.data[0].status, ActivityStatus::Pending);
    }
}
