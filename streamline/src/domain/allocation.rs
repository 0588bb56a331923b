use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use super::{deserialize_priority, ActivityStatus};

pub const NOT_AVAILABLE: &str = "N/A";

/// An activity joined with its allocated budget, as listed by `budgets/get_all`.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: i64,
    pub activity_id: i64,
    pub description: String,
    pub zone: String,
    pub district: String,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub allocated_amount: f64,
    #[serde(default, deserialize_with = "deserialize_priority")]
    pub priority: Option<i32>,
    pub status: ActivityStatus,
    pub component: Option<String>,
    pub subcomponent: Option<String>,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub total_budget: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Allocation {
    pub fn component_or_na(&self) -> &str {
        self.component.as_deref().unwrap_or(NOT_AVAILABLE)
    }

    pub fn subcomponent_or_na(&self) -> &str {
        self.subcomponent.as_deref().unwrap_or(NOT_AVAILABLE)
    }

    pub fn is_pd_approved(&self) -> bool {
        self.status == ActivityStatus::PdApproved
    }
}
