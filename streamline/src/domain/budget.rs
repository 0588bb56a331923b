use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

/// The budget ceiling for the current planning period.
///
/// Only one budget is expected to be active; callers treat the first record
/// returned by the API as the current one.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    #[serde(rename = "budget")]
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub total_amount: f64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Picks the active budget out of a list response.
pub fn current_budget(budgets: &[Budget]) -> Option<&Budget> {
    budgets.first()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_string_amounts() {
        let budget: Budget = serde_json::from_str(
            r#"{"id": 3, "budget": "250000.00", "created_at": "2025-01-05T08:30:00.000Z", "updated_at": null}"#,
        )
        .unwrap();
        assert_eq!(budget.id, 3);
        assert_eq!(budget.total_amount, 250000.0);
        assert!(budget.created_at.is_some());
        assert!(budget.updated_at.is_none());
    }

    #[test]
    fn parses_plain_number_amounts() {
        let budget: Budget = serde_json::from_str(r#"{"id": 1, "budget": 1000}"#).unwrap();
        assert_eq!(budget.total_amount, 1000.0);
    }
}
