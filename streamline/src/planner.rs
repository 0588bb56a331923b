//! Allocation Planner: pick costed activities against the budget ceiling and
//! submit the chosen set as one batch.

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::{
    domain::{current_budget, Activity, AllocationRequest, Budget, FinalizeRequest},
    ApiError, BudgetBackend,
};

/// Share of the ceiling below which the remaining budget is flagged.
pub const WARNING_THRESHOLD: f64 = 0.2;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("Please select at least one activity to allocate budget")]
    EmptySelection,
    #[error("No budget available to allocate")]
    NoBudget,
    #[error("Please enter a valid budget amount")]
    InvalidAmount,
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl PlannerError {
    pub fn user_message(&self) -> String {
        match self {
            PlannerError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetHealth {
    Ok,
    Warning,
    OverBudget,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllocationTotals {
    pub total_budget: f64,
    pub total_allocated: f64,
    pub remaining: f64,
    pub usage_percent: f64,
}

impl AllocationTotals {
    pub fn compute<'a>(total_budget: f64, selected: impl IntoIterator<Item = &'a Activity>) -> Self {
        let total_allocated: f64 = selected
            .into_iter()
            .map(|a| a.budget.unwrap_or_default())
            .sum();
        let usage_percent = if total_budget > 0.0 {
            total_allocated / total_budget * 100.0
        } else {
            0.0
        };

        Self {
            total_budget,
            total_allocated,
            remaining: total_budget - total_allocated,
            usage_percent,
        }
    }

    pub fn health(&self) -> BudgetHealth {
        if self.remaining < 0.0 {
            BudgetHealth::OverBudget
        } else if self.remaining < self.total_budget * WARNING_THRESHOLD {
            BudgetHealth::Warning
        } else {
            BudgetHealth::Ok
        }
    }
}

/// Search text and priority filter applied to the eligible list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlannerFilter {
    pub search: Option<String>,
    pub priority: Option<i32>,
}

impl PlannerFilter {
    pub fn matches(&self, activity: &Activity) -> bool {
        let search_ok = match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => activity.matches_search(term),
            _ => true,
        };
        let priority_ok = self.priority.map_or(true, |p| activity.priority == Some(p));
        search_ok && priority_ok
    }
}

/// Chosen activities, unique by id, in the order they were picked.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    items: Vec<Activity>,
}

impl Selection {
    pub fn contains(&self, id: i64) -> bool {
        self.items.iter().any(|a| a.id == id)
    }

    /// Adds the activity if absent, removes it if present. Returns whether it
    /// is selected afterwards.
    pub fn toggle(&mut self, activity: &Activity) -> bool {
        if self.contains(activity.id) {
            self.remove(activity.id);
            false
        } else {
            self.items.push(activity.clone());
            true
        }
    }

    pub fn insert(&mut self, activity: &Activity) {
        if !self.contains(activity.id) {
            self.items.push(activity.clone());
        }
    }

    pub fn remove(&mut self, id: i64) {
        self.items.retain(|a| a.id != id);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Activity> {
        self.items.iter()
    }

    pub fn to_requests(&self) -> Vec<AllocationRequest> {
        self.items
            .iter()
            .map(|a| AllocationRequest {
                activity_id: a.id,
                amount: a.budget.unwrap_or_default(),
                priority: a.priority.unwrap_or_default(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinalizeReceipt {
    pub budget_id: i64,
    pub allocations: Vec<AllocationRequest>,
    /// `false` when the lists could not be re-fetched after the batch landed.
    pub refreshed: bool,
}

/// View model behind the Development Officer's allocation screen.
///
/// Holds no authoritative state: after every write it re-fetches the budget
/// and the activity list.
#[derive(Debug, Clone, Default)]
pub struct AllocationPlanner {
    budgets: Vec<Budget>,
    activities: Vec<Activity>,
    selection: Selection,
    pub filter: PlannerFilter,
}

impl AllocationPlanner {
    pub async fn load(backend: &dyn BudgetBackend) -> Result<Self, PlannerError> {
        let mut planner = Self::default();
        planner.refresh(backend).await?;
        Ok(planner)
    }

    pub async fn refresh(&mut self, backend: &dyn BudgetBackend) -> Result<(), PlannerError> {
        self.budgets = backend.budgets().await?;
        self.activities = backend.activities().await?;
        Ok(())
    }

    pub fn budget(&self) -> Option<&Budget> {
        current_budget(&self.budgets)
    }

    pub fn total_budget(&self) -> f64 {
        self.budget().map(|b| b.total_amount).unwrap_or_default()
    }

    /// Accepted activities that have both a budget and a priority.
    pub fn eligible(&self) -> impl Iterator<Item = &Activity> {
        self.activities.iter().filter(|a| a.is_allocatable())
    }

    /// Eligible activities passing the current filter.
    pub fn visible(&self) -> Vec<&Activity> {
        self.eligible().filter(|a| self.filter.matches(a)).collect()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    fn find_eligible(&self, id: i64) -> Option<&Activity> {
        self.eligible().find(|a| a.id == id)
    }

    /// Toggles an eligible activity. Returns `None` if `id` is not eligible.
    pub fn toggle(&mut self, id: i64) -> Option<bool> {
        let activity = self.find_eligible(id)?.clone();
        Some(self.selection.toggle(&activity))
    }

    /// Selects an eligible activity. Returns `false` if `id` is not eligible.
    pub fn select(&mut self, id: i64) -> bool {
        match self.find_eligible(id).cloned() {
            Some(activity) => {
                self.selection.insert(&activity);
                true
            }
            None => false,
        }
    }

    pub fn deselect(&mut self, id: i64) {
        self.selection.remove(id);
    }

    pub fn totals(&self) -> AllocationTotals {
        AllocationTotals::compute(self.total_budget(), self.selection.iter())
    }

    /// Creates the budget if none exists yet, otherwise updates the current one.
    #[instrument(name = "AllocationPlanner::save_budget", skip(self, backend))]
    pub async fn save_budget(
        &mut self,
        backend: &dyn BudgetBackend,
        amount: f64,
    ) -> Result<(), PlannerError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(PlannerError::InvalidAmount);
        }

        match self.budget().map(|b| b.id) {
            Some(id) => backend.update_budget(id, amount).await?,
            None => backend.create_budget(amount).await?,
        }

        self.budgets = backend.budgets().await?;
        Ok(())
    }

    /// Submits the selection as a single batch.
    ///
    /// On success the selection is cleared and both lists are re-fetched. A
    /// failed re-fetch does not undo a landed batch: it is logged and reported
    /// through [`FinalizeReceipt::refreshed`]. On failure the selection is left
    /// untouched so the caller can retry.
    #[instrument(name = "AllocationPlanner::finalize", skip(self, backend), fields(selected = self.selection.len()))]
    pub async fn finalize(
        &mut self,
        backend: &dyn BudgetBackend,
    ) -> Result<FinalizeReceipt, PlannerError> {
        if self.selection.is_empty() {
            return Err(PlannerError::EmptySelection);
        }
        let budget_id = self.budget().map(|b| b.id).ok_or(PlannerError::NoBudget)?;

        let totals = self.totals();
        if totals.health() == BudgetHealth::OverBudget {
            warn!(
                remaining = totals.remaining,
                "finalizing an allocation that exceeds the budget"
            );
        }

        let request = FinalizeRequest {
            budget_id,
            allocations: self.selection.to_requests(),
        };
        backend.finalize(&request).await?;
        info!(
            budget_id,
            count = request.allocations.len(),
            total = totals.total_allocated,
            "allocation finalized"
        );

        self.selection.clear();
        let refreshed = match self.refresh(backend).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "allocation saved but lists could not be re-fetched");
                false
            }
        };

        Ok(FinalizeReceipt {
            budget_id,
            allocations: request.allocations,
            refreshed,
        })
    }
}
