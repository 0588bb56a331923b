//! Report Generator: read-only filter, sort and totals over the allocation list.

use std::cmp::Ordering;

use strum::{Display, EnumString};
use tracing::warn;

use crate::domain::{Allocation, Budget};

pub const ALL: &str = "All";

/// Exact-match filter on one column; `None` keeps every row.
fn matches_facet(filter: Option<&str>, value: &str) -> bool {
    match filter {
        None => true,
        Some(f) if f == ALL => true,
        Some(f) => f == value,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    pub zone: Option<String>,
    pub district: Option<String>,
    pub component: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

impl ReportFilter {
    pub fn matches(&self, allocation: &Allocation) -> bool {
        if !matches_facet(self.zone.as_deref(), &allocation.zone)
            || !matches_facet(self.district.as_deref(), &allocation.district)
            || !matches_facet(self.component.as_deref(), allocation.component_or_na())
            || !matches_facet(self.status.as_deref(), allocation.status.as_str())
        {
            return false;
        }

        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                allocation.description.to_lowercase().contains(&term)
                    || allocation.zone.to_lowercase().contains(&term)
                    || allocation.district.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortKey {
    /// Ascending priority number.
    #[default]
    Priority,
    /// Largest allocation first.
    Amount,
    /// Newest first.
    Date,
    /// Zone name, A to Z.
    Zone,
}

impl SortKey {
    pub fn compare(self, a: &Allocation, b: &Allocation) -> Ordering {
        match self {
            SortKey::Priority => a
                .priority
                .unwrap_or(i32::MAX)
                .cmp(&b.priority.unwrap_or(i32::MAX)),
            SortKey::Amount => b.allocated_amount.total_cmp(&a.allocated_amount),
            SortKey::Date => b.created_at.cmp(&a.created_at),
            SortKey::Zone => a.zone.cmp(&b.zone),
        }
    }
}

/// Filters then sorts. Sorting is stable, so ties keep list order.
pub fn filter_and_sort<'a>(
    allocations: &'a [Allocation],
    filter: &ReportFilter,
    sort: SortKey,
) -> Vec<&'a Allocation> {
    let mut rows: Vec<&Allocation> = allocations.iter().filter(|a| filter.matches(a)).collect();
    rows.sort_by(|a, b| sort.compare(a, b));
    rows
}

/// Allocations approved by the Provincial Director, in list order.
pub fn approved(allocations: &[Allocation]) -> Vec<&Allocation> {
    allocations.iter().filter(|a| a.is_pd_approved()).collect()
}

/// Distinct values offered by the filter drop-downs, first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Facets {
    pub zones: Vec<String>,
    pub districts: Vec<String>,
    pub components: Vec<String>,
    pub statuses: Vec<String>,
}

impl Facets {
    pub fn collect(allocations: &[Allocation]) -> Self {
        fn push_unique(values: &mut Vec<String>, value: &str) {
            if !values.iter().any(|v| v == value) {
                values.push(value.to_string());
            }
        }

        let mut facets = Facets::default();
        for allocation in allocations {
            push_unique(&mut facets.zones, &allocation.zone);
            push_unique(&mut facets.districts, &allocation.district);
            push_unique(&mut facets.components, allocation.component_or_na());
            push_unique(&mut facets.statuses, allocation.status.as_str());
        }
        facets
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReportSummary {
    pub total_budget: f64,
    pub total_allocated: f64,
    pub total_pd_approved: f64,
}

impl ReportSummary {
    /// Totals over the whole, unfiltered list.
    ///
    /// The budget comes from the budget record when there is one. Without it
    /// the first row's `total_budget` is used.
    pub fn compute(budget: Option<&Budget>, allocations: &[Allocation]) -> Self {
        let total_budget = match budget {
            Some(b) => b.total_amount,
            None => budget_from_rows(allocations),
        };
        let total_allocated = allocations.iter().map(|a| a.allocated_amount).sum();
        let total_pd_approved = approved(allocations)
            .iter()
            .map(|a| a.allocated_amount)
            .sum();

        Self {
            total_budget,
            total_allocated,
            total_pd_approved,
        }
    }
}

fn budget_from_rows(allocations: &[Allocation]) -> f64 {
    let Some(first) = allocations.first() else {
        return 0.0;
    };
    let total = first.total_budget.unwrap_or_default();

    if allocations
        .iter()
        .any(|a| a.total_budget.unwrap_or_default() != total)
    {
        warn!(
            first = total,
            "allocation rows disagree on total_budget; using the first row"
        );
    }
    total
}
