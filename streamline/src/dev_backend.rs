use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::{
    domain::{
        Activity, ActivityDetails, ActivityStatus, ActivityUpdate, Allocation, ApprovalRecord,
        Budget, Engineer, FinalizeRequest, Location, NewActivity,
    },
    ApiError, BudgetBackend,
};

/// In-memory stand-in for the REST API, used by `--dev` runs and tests.
///
/// Behaves like a well-mannered server: it applies the status state machine
/// and joins activities into allocation rows on finalize.
#[derive(Debug, Clone, Default)]
pub struct DevBackend {
    store: Arc<Mutex<DevStore>>,
}

#[derive(Debug, Default)]
struct DevStore {
    budgets: Vec<Budget>,
    activities: Vec<Activity>,
    allocations: Vec<Allocation>,
    approvals: Vec<ApprovalRecord>,
    engineers: Vec<Engineer>,
    calls: Vec<String>,
    /// Endpoint -> the 1-based call that should fail.
    failures: HashMap<String, usize>,
    call_counts: HashMap<String, usize>,
    next_id: i64,
}

impl DevStore {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Logs a call to `endpoint` and fails it if it was scheduled to fail.
    fn call(&mut self, endpoint: &str, target: Option<i64>) -> Result<(), ApiError> {
        self.calls.push(match target {
            Some(id) => format!("{} {}", endpoint, id),
            None => endpoint.to_string(),
        });
        let count = {
            let count = self.call_counts.entry(endpoint.to_string()).or_default();
            *count += 1;
            *count
        };
        if self.failures.get(endpoint) == Some(&count) {
            return Err(ApiError::Server {
                status: 500,
                message: "Simulated failure".to_string(),
            });
        }
        Ok(())
    }

    fn find_activity(&mut self, id: i64) -> Result<&mut Activity, ApiError> {
        self.activities
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| not_found("Activity", id))
    }
}

impl DevBackend {
    /// A backend seeded with sample budget, activities and allocations.
    pub fn new() -> Self {
        let backend = Self::empty();
        {
            let mut store = backend.lock();
            store.next_id = 100;
            store.budgets = vec![Budget {
                id: 1,
                total_amount: 5_000_000.0,
                created_at: Some(seed_time(1)),
                updated_at: None,
            }];
            store.activities = seed_activities();
            store.engineers = seed_engineers();
            store.allocations = seed_allocations(&store.activities, 5_000_000.0);
        }
        backend
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_budget(self, id: i64, amount: f64) -> Self {
        self.lock().budgets = vec![Budget {
            id,
            total_amount: amount,
            created_at: Some(Utc::now()),
            updated_at: None,
        }];
        self
    }

    pub fn with_activities(self, activities: Vec<Activity>) -> Self {
        self.lock().activities = activities;
        self
    }

    pub fn with_allocations(self, allocations: Vec<Allocation>) -> Self {
        self.lock().allocations = allocations;
        self
    }

    pub fn with_engineers(self, engineers: Vec<Engineer>) -> Self {
        self.lock().engineers = engineers;
        self
    }

    /// Makes the `n`-th call (1-based) to `endpoint`, e.g. `GET budgets/get`,
    /// fail with a server error.
    pub fn fail_call_at(self, endpoint: &str, n: usize) -> Self {
        self.lock().failures.insert(endpoint.to_string(), n);
        self
    }

    /// Makes the `n`-th status update fail.
    pub fn fail_status_update_at(self, n: usize) -> Self {
        self.fail_call_at("PUT activity/update", n)
    }

    /// Makes the `n`-th audit record fail.
    pub fn fail_audit_at(self, n: usize) -> Self {
        self.fail_call_at("POST pd-approvals", n)
    }

    /// Audit records written so far.
    pub fn approvals(&self) -> Vec<ApprovalRecord> {
        self.lock().approvals.clone()
    }

    /// Every call made against the backend, in order, e.g. `PUT activity/update 4`.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn activity(&self, id: i64) -> Option<Activity> {
        self.lock().activities.iter().find(|a| a.id == id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, DevStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found(what: &str, id: i64) -> ApiError {
    ApiError::Server {
        status: 404,
        message: format!("{} {} not found", what, id),
    }
}

#[async_trait]
impl BudgetBackend for DevBackend {
    async fn budgets(&self) -> Result<Vec<Budget>, ApiError> {
        let mut store = self.lock();
        store.call("GET budgets/get", None)?;
        Ok(store.budgets.clone())
    }

    async fn create_budget(&self, amount: f64) -> Result<(), ApiError> {
        let mut store = self.lock();
        store.call("POST budgets/add", None)?;
        let id = store.next_id();
        store.budgets.push(Budget {
            id,
            total_amount: amount,
            created_at: Some(Utc::now()),
            updated_at: None,
        });
        Ok(())
    }

    async fn update_budget(&self, id: i64, amount: f64) -> Result<(), ApiError> {
        let mut store = self.lock();
        store.call("PUT budgets/update", Some(id))?;
        let budget = store
            .budgets
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| not_found("Budget", id))?;
        budget.total_amount = amount;
        budget.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn activities(&self) -> Result<Vec<Activity>, ApiError> {
        let mut store = self.lock();
        store.call("GET update_activity/get", None)?;
        Ok(store.activities.clone())
    }

    async fn assigned_activities(&self) -> Result<Vec<Activity>, ApiError> {
        let mut store = self.lock();
        store.call("GET update_activity/get_id", None)?;
        Ok(store
            .activities
            .iter()
            .filter(|a| {
                matches!(
                    a.status,
                    ActivityStatus::Approved | ActivityStatus::Accepted
                )
            })
            .cloned()
            .collect())
    }

    async fn set_activity_details(&self, details: &ActivityDetails) -> Result<(), ApiError> {
        let mut store = self.lock();
        store.call("POST update_activity/details", Some(details.activity_id))?;
        let activity = store.find_activity(details.activity_id)?;
        activity.budget = Some(details.budget);
        activity.priority = Some(details.priority);
        Ok(())
    }

    async fn finalize(&self, request: &FinalizeRequest) -> Result<(), ApiError> {
        let mut store = self.lock();
        store.call("POST budgets/finalize", Some(request.budget_id))?;

        let total_budget = store
            .budgets
            .iter()
            .find(|b| b.id == request.budget_id)
            .map(|b| b.total_amount)
            .ok_or_else(|| not_found("Budget", request.budget_id))?;

        // Validate the whole batch before touching anything.
        for item in &request.allocations {
            let activity = store
                .activities
                .iter()
                .find(|a| a.id == item.activity_id)
                .ok_or_else(|| not_found("Activity", item.activity_id))?;
            if !activity.status.can_transition_to(&ActivityStatus::NotStarted) {
                return Err(ApiError::Rejected {
                    message: format!(
                        "Activity {} cannot be allocated while {}",
                        activity.id, activity.status
                    ),
                });
            }
        }

        for item in &request.allocations {
            let id = store.next_id();
            let Some(activity) = store
                .activities
                .iter_mut()
                .find(|a| a.id == item.activity_id)
            else {
                continue;
            };
            activity.status = ActivityStatus::NotStarted;
            activity.budget = Some(item.amount);
            activity.priority = Some(item.priority);

            let row = Allocation {
                id,
                activity_id: activity.id,
                description: activity.description.clone(),
                zone: activity.location.zone.clone(),
                district: activity.location.district.clone(),
                allocated_amount: item.amount,
                priority: Some(item.priority),
                status: ActivityStatus::NotStarted,
                component: activity.component.clone(),
                subcomponent: activity.subcomponent.clone(),
                total_budget: Some(total_budget),
                created_at: Utc::now(),
            };
            store.allocations.push(row);
        }

        Ok(())
    }

    async fn allocations(&self) -> Result<Vec<Allocation>, ApiError> {
        let mut store = self.lock();
        store.call("GET budgets/get_all", None)?;
        Ok(store.allocations.clone())
    }

    async fn update_activity(&self, update: &ActivityUpdate) -> Result<(), ApiError> {
        let mut store = self.lock();
        store.call("PUT activity/update", Some(update.id))?;

        // Allocation rows carry the status for activities that were allocated.
        let current = match store.activities.iter().find(|a| a.id == update.id) {
            Some(activity) => activity.status.clone(),
            None => store
                .allocations
                .iter()
                .find(|a| a.activity_id == update.id)
                .map(|a| a.status.clone())
                .ok_or_else(|| not_found("Activity", update.id))?,
        };

        let next = current
            .transition(update.status.clone())
            .map_err(|e| ApiError::Rejected {
                message: e.to_string(),
            })?;

        if let Some(activity) = store.activities.iter_mut().find(|a| a.id == update.id) {
            if next == ActivityStatus::Approved {
                activity.assigned_engineer_id = update.assigned_engineer_id;
            }
            if let Some(component) = &update.component {
                activity.component = Some(component.clone());
            }
            if let Some(subcomponent) = &update.subcomponent {
                activity.subcomponent = Some(subcomponent.clone());
            }
            if let Some(description) = &update.description {
                activity.description = description.clone();
            }
            activity.status = next.clone();
        }
        for row in store
            .allocations
            .iter_mut()
            .filter(|a| a.activity_id == update.id)
        {
            row.status = next.clone();
        }
        Ok(())
    }

    async fn record_approval(&self, record: &ApprovalRecord) -> Result<(), ApiError> {
        let mut store = self.lock();
        store.call("POST pd-approvals", Some(record.activity_id))?;
        store.approvals.push(record.clone());
        Ok(())
    }

    async fn managed_activities(&self) -> Result<Vec<Activity>, ApiError> {
        let mut store = self.lock();
        store.call("GET activity/get", None)?;
        Ok(store.activities.clone())
    }

    async fn own_activities(&self) -> Result<Vec<Activity>, ApiError> {
        let mut store = self.lock();
        store.call("GET activity/get_all_id", None)?;
        Ok(store.activities.clone())
    }

    async fn engineers(&self) -> Result<Vec<Engineer>, ApiError> {
        let mut store = self.lock();
        store.call("GET engineers", None)?;
        Ok(store.engineers.clone())
    }

    async fn add_activity(&self, activity: &NewActivity) -> Result<(), ApiError> {
        let mut store = self.lock();
        store.call("POST activity/add", None)?;
        let id = store.next_id();
        let images = activity
            .images
            .iter()
            .map(|image| format!("uploads/{}", image.file_name))
            .collect();
        store.activities.push(Activity {
            id,
            description: activity.description.clone(),
            location: activity.location.clone(),
            component: activity.component.clone(),
            subcomponent: activity.subcomponent.clone(),
            status: activity.status.clone(),
            budget: None,
            priority: None,
            images,
            assigned_engineer_id: activity.assigned_engineer_id,
            created_at: Some(Utc::now()),
        });
        Ok(())
    }

    async fn update_assigned_activity(&self, update: &ActivityUpdate) -> Result<(), ApiError> {
        let mut store = self.lock();
        store.call("PUT activity/update_id", Some(update.id))?;
        let activity = store.find_activity(update.id)?;
        if activity.status != ActivityStatus::Approved {
            return Err(ApiError::Rejected {
                message: format!("Activity {} is not awaiting an engineer", update.id),
            });
        }
        activity.status = activity
            .status
            .transition(update.status.clone())
            .map_err(|e| ApiError::Rejected {
                message: e.to_string(),
            })?;
        Ok(())
    }
}

fn seed_engineers() -> Vec<Engineer> {
    [(1, "N. Perera", "Civil"), (2, "A. Silva", "Water supply")]
        .into_iter()
        .map(|(id, name, specialization)| Engineer {
            id,
            name: name.to_string(),
            specialization: Some(specialization.to_string()),
        })
        .collect()
}

fn seed_time(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

fn seed_activity(
    id: i64,
    description: &str,
    district: &str,
    zone: &str,
    component: Option<&str>,
    status: ActivityStatus,
    budget: Option<f64>,
    priority: Option<i32>,
) -> Activity {
    let assigned_engineer_id =
        matches!(status, ActivityStatus::Approved | ActivityStatus::Accepted).then_some(1);
    Activity {
        id,
        description: description.to_string(),
        location: Location {
            province: "Central".to_string(),
            district: district.to_string(),
            zone: zone.to_string(),
        },
        component: component.map(str::to_string),
        subcomponent: component.map(|_| "Rural Development".to_string()),
        status,
        budget,
        priority,
        images: vec![],
        assigned_engineer_id,
        created_at: Some(seed_time(id as u32 % 28 + 1)),
    }
}

fn seed_activities() -> Vec<Activity> {
    use ActivityStatus::*;
    vec![
        seed_activity(1, "School roof repair", "Kandy", "Kandy", Some("Education"), Accepted, Some(750_000.0), Some(1)),
        seed_activity(2, "Rural road resurfacing", "Matale", "Dambulla", Some("Infrastructure"), Accepted, Some(1_200_000.0), Some(2)),
        seed_activity(3, "Community well", "Nuwara Eliya", "Hatton", Some("Water"), Accepted, Some(300_000.0), Some(3)),
        seed_activity(4, "Clinic extension", "Kandy", "Gampola", Some("Health"), Accepted, None, None),
        seed_activity(5, "Library books", "Matale", "Matale", None, Approved, None, None),
        seed_activity(6, "Playground fencing", "Kandy", "Kandy", Some("Education"), Pending, None, None),
        seed_activity(7, "Irrigation canal", "Matale", "Galewela", Some("Agriculture"), NotStarted, Some(900_000.0), Some(1)),
        seed_activity(8, "Bridge railing", "Nuwara Eliya", "Nuwara Eliya", Some("Infrastructure"), PdApproved, Some(450_000.0), Some(2)),
        seed_activity(9, "Market stalls", "Kandy", "Teldeniya", None, PdRejected, Some(600_000.0), Some(4)),
    ]
}

fn seed_allocations(activities: &[Activity], total_budget: f64) -> Vec<Allocation> {
    activities
        .iter()
        .filter(|a| {
            matches!(
                a.status,
                ActivityStatus::NotStarted | ActivityStatus::PdApproved | ActivityStatus::PdRejected
            )
        })
        .map(|a| Allocation {
            id: a.id + 50,
            activity_id: a.id,
            description: a.description.clone(),
            zone: a.location.zone.clone(),
            district: a.location.district.clone(),
            allocated_amount: a.budget.unwrap_or_default(),
            priority: a.priority,
            status: a.status.clone(),
            component: a.component.clone(),
            subcomponent: a.subcomponent.clone(),
            total_budget: Some(total_budget),
            created_at: a.created_at.unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AllocationRequest;

    #[tokio::test]
    async fn finalize_turns_accepted_activities_into_allocations() {
        let backend = DevBackend::new();
        let before = backend.allocations().await.unwrap().len();

        backend
            .finalize(&FinalizeRequest {
                budget_id: 1,
                allocations: vec![AllocationRequest {
                    activity_id: 1,
                    amount: 700_000.0,
                    priority: 1,
                }],
            })
            .await
            .unwrap();

        let allocations = backend.allocations().await.unwrap();
        assert_eq!(allocations.len(), before + 1);
        let row = allocations.iter().find(|a| a.activity_id == 1).unwrap();
        assert_eq!(row.allocated_amount, 700_000.0);
        assert_eq!(row.status, ActivityStatus::NotStarted);
        assert_eq!(row.total_budget, Some(5_000_000.0));
        assert_eq!(
            backend.activity(1).unwrap().status,
            ActivityStatus::NotStarted
        );
    }

    #[tokio::test]
    async fn finalize_rejects_unaccepted_activity_without_side_effects() {
        let backend = DevBackend::new();
        let err = backend
            .finalize(&FinalizeRequest {
                budget_id: 1,
                allocations: vec![
                    AllocationRequest {
                        activity_id: 1,
                        amount: 1.0,
                        priority: 1,
                    },
                    AllocationRequest {
                        activity_id: 6,
                        amount: 1.0,
                        priority: 1,
                    },
                ],
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Rejected { .. }));
        assert_eq!(backend.activity(1).unwrap().status, ActivityStatus::Accepted);
    }

    #[tokio::test]
    async fn status_update_enforces_transitions() {
        let backend = DevBackend::new();
        let err = backend
            .update_activity(&ActivityUpdate::status(6, ActivityStatus::PdApproved))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Rejected { .. }));

        backend
            .update_activity(&ActivityUpdate::status(7, ActivityStatus::PdApproved))
            .await
            .unwrap();
        let allocations = backend.allocations().await.unwrap();
        let row = allocations.iter().find(|a| a.activity_id == 7).unwrap();
        assert_eq!(row.status, ActivityStatus::PdApproved);
    }

    #[tokio::test]
    async fn injected_failure_hits_the_requested_update() {
        let backend = DevBackend::new().fail_status_update_at(1);
        let err = backend
            .update_activity(&ActivityUpdate::status(7, ActivityStatus::PdApproved))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Server { status: 500, .. }));
    }

    #[tokio::test]
    async fn failures_are_counted_per_endpoint() {
        let backend = DevBackend::new().fail_call_at("GET budgets/get", 2);
        backend.allocations().await.unwrap();
        backend.budgets().await.unwrap();
        assert!(backend.budgets().await.is_err());
        backend.budgets().await.unwrap();
        assert_eq!(
            backend.calls(),
            [
                "GET budgets/get_all",
                "GET budgets/get",
                "GET budgets/get",
                "GET budgets/get"
            ]
        );
    }

    #[tokio::test]
    async fn engineer_answers_only_approved_assignments() {
        let backend = DevBackend::new();
        backend
            .update_assigned_activity(&ActivityUpdate::status(5, ActivityStatus::Accepted))
            .await
            .unwrap();
        assert_eq!(backend.activity(5).unwrap().status, ActivityStatus::Accepted);

        let err = backend
            .update_assigned_activity(&ActivityUpdate::status(6, ActivityStatus::Accepted))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Rejected { .. }));
    }

    #[tokio::test]
    async fn added_activity_is_listed() {
        let backend = DevBackend::new();
        let mut activity = NewActivity::new(
            "Drainage",
            Location {
                province: "Central".to_string(),
                district: "Kandy".to_string(),
                zone: "Kandy".to_string(),
            },
        );
        activity.images.push(crate::domain::ImageUpload {
            file_name: "site.jpg".to_string(),
            bytes: vec![0xff, 0xd8],
        });
        backend.add_activity(&activity).await.unwrap();

        let listed = backend.own_activities().await.unwrap();
        let added = listed.iter().find(|a| a.description == "Drainage").unwrap();
        assert_eq!(added.status, ActivityStatus::Pending);
        assert_eq!(added.images, ["uploads/site.jpg"]);
    }
}
