use async_trait::async_trait;

use crate::{
    domain::{
        Activity, ActivityDetails, ActivityUpdate, Allocation, ApprovalRecord, Budget, Engineer,
        FinalizeRequest, NewActivity,
    },
    ApiError,
};

/// The REST operations the workflows depend on.
///
/// Implemented over HTTP by [`crate::HttpBackend`] and in memory by
/// [`crate::DevBackend`].
#[async_trait]
pub trait BudgetBackend: Send + Sync {
    /// `GET budgets/get`
    async fn budgets(&self) -> Result<Vec<Budget>, ApiError>;

    /// `POST budgets/add`
    async fn create_budget(&self, amount: f64) -> Result<(), ApiError>;

    /// `PUT budgets/update`
    async fn update_budget(&self, id: i64, amount: f64) -> Result<(), ApiError>;

    /// `GET update_activity/get`, every activity with its budget/priority annotation.
    async fn activities(&self) -> Result<Vec<Activity>, ApiError>;

    /// `GET update_activity/get_id`, the activities assigned to the logged-in engineer.
    async fn assigned_activities(&self) -> Result<Vec<Activity>, ApiError>;

    /// `GET activity/get`, every submitted activity for Development Officer review.
    async fn managed_activities(&self) -> Result<Vec<Activity>, ApiError>;

    /// `GET activity/get_all_id`, the logged-in Responsible Person's own submissions.
    async fn own_activities(&self) -> Result<Vec<Activity>, ApiError>;

    /// `GET engineers`
    async fn engineers(&self) -> Result<Vec<Engineer>, ApiError>;

    /// `POST activity/add`, sent as a multipart form with the images attached.
    async fn add_activity(&self, activity: &NewActivity) -> Result<(), ApiError>;

    /// `PUT activity/update_id`, an engineer's answer to an assignment.
    async fn update_assigned_activity(&self, update: &ActivityUpdate) -> Result<(), ApiError>;

    /// `POST update_activity/details`
    async fn set_activity_details(&self, details: &ActivityDetails) -> Result<(), ApiError>;

    /// `POST budgets/finalize`
    async fn finalize(&self, request: &FinalizeRequest) -> Result<(), ApiError>;

    /// `GET budgets/get_all`
    async fn allocations(&self) -> Result<Vec<Allocation>, ApiError>;

    /// `PUT activity/update`
    async fn update_activity(&self, update: &ActivityUpdate) -> Result<(), ApiError>;

    /// `POST pd-approvals`
    async fn record_approval(&self, record: &ApprovalRecord) -> Result<(), ApiError>;
}
