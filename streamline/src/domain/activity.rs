use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use super::{deserialize_priority, ActivityStatus};

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub zone: String,
}

/// A unit of work submitted by a Responsible Person and carried through
/// review, costing, allocation and the director's decision.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub description: String,
    #[serde(flatten)]
    pub location: Location,
    pub component: Option<String>,
    pub subcomponent: Option<String>,
    pub status: ActivityStatus,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub budget: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_priority")]
    pub priority: Option<i32>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub assigned_engineer_id: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Activity {
    /// Accepted by the Site Engineer and costed, so it can be allocated.
    pub fn is_allocatable(&self) -> bool {
        self.status == ActivityStatus::Accepted && self.budget.is_some() && self.priority.is_some()
    }

    /// Case-insensitive substring match over description and zone.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.description.to_lowercase().contains(&term)
            || self.location.zone.to_lowercase().contains(&term)
    }
}
