use anyhow::{bail, Result};
use streamline::{
    annotate::annotate_activity,
    domain::{priority_marker, Activity, PriorityLevel},
    export::format_amount,
    planner::{
        AllocationPlanner, AllocationTotals, BudgetHealth, PlannerFilter, WARNING_THRESHOLD,
    },
    roles::Screen,
};

use super::{truncate, Env, UserContext};
use crate::cli::{ActivityFilterArgs, AnnotateArgs, BudgetCommand, PlanArgs};

impl From<ActivityFilterArgs> for PlannerFilter {
    fn from(args: ActivityFilterArgs) -> Self {
        PlannerFilter {
            search: args.search,
            priority: args.priority,
        }
    }
}

pub async fn budget(env: &Env, command: BudgetCommand) -> Result<()> {
    env.authorize("budget", &[Screen::AllocationPlanner])?;
    let backend = env.backend()?;
    let mut planner = AllocationPlanner::load(backend.as_ref())
        .await
        .user_context("Failed to load budget")?;

    if let BudgetCommand::Set { amount } = command {
        planner
            .save_budget(backend.as_ref(), amount)
            .await
            .user_context("Failed to save budget")?;
    }

    match planner.budget() {
        Some(budget) => println!("Budget #{}: LKR {}", budget.id, format_amount(budget.total_amount)),
        None => println!("No budget set. Use `streamline budget set <amount>`."),
    }
    Ok(())
}

pub async fn annotate(env: &Env, args: AnnotateArgs) -> Result<()> {
    env.authorize("annotate", &[Screen::MyActivities])?;
    let backend = env.backend()?;

    let details = annotate_activity(backend.as_ref(), args.id, args.budget, args.priority)
        .await
        .user_context(&format!("Failed to update activity {}", args.id))?;
    println!(
        "Activity {}: budget LKR {}, priority {}",
        details.activity_id,
        format_amount(details.budget),
        PriorityLevel::marker(details.priority)
    );
    Ok(())
}

pub async fn plan(env: &Env, args: PlanArgs) -> Result<()> {
    env.authorize("plan", &[Screen::AllocationPlanner])?;
    let backend = env.backend()?;
    let mut planner = AllocationPlanner::load(backend.as_ref())
        .await
        .user_context("Failed to load allocation data")?;
    planner.filter = args.filter.into();

    for id in &args.select {
        if !planner.select(*id) {
            bail!(
                "Activity {} cannot be allocated. Only accepted activities with a budget and priority are eligible.",
                id
            );
        }
    }

    let visible = planner.visible();
    if visible.is_empty() {
        println!("No eligible activities.");
    }
    for activity in visible {
        print_activity(activity, Some(planner.selection().contains(activity.id)));
    }
    println!();
    print_totals(&planner.totals());

    if !args.finalize {
        return Ok(());
    }

    let receipt = planner
        .finalize(backend.as_ref())
        .await
        .user_context("Failed to finalize allocation")?;
    println!(
        "Allocated {} activities against budget #{}.",
        receipt.allocations.len(),
        receipt.budget_id
    );
    if !receipt.refreshed {
        println!("The allocation was saved, but the lists could not be reloaded. Re-run to see them.");
    }
    Ok(())
}

pub(super) fn print_activity(activity: &Activity, selected: Option<bool>) {
    let check = match selected {
        Some(true) => "[x] ",
        Some(false) => "[ ] ",
        None => "",
    };
    let budget = activity
        .budget
        .map(|b| format!("LKR {}", format_amount(b)))
        .unwrap_or_else(|| "-".to_string());
    let priority = priority_marker(activity.priority);

    println!(
        "{}{:>4}  {:<12} {:<24} {:>18} {:<12} {}",
        check,
        activity.id,
        activity.status.as_str(),
        truncate(
            &format!("{}, {}", activity.location.zone, activity.location.district),
            24
        ),
        budget,
        priority,
        truncate(&activity.description, 40)
    );
}

fn print_totals(totals: &AllocationTotals) {
    println!("Total budget:    LKR {}", format_amount(totals.total_budget));
    println!("Allocated:       LKR {}", format_amount(totals.total_allocated));
    println!(
        "Remaining:       LKR {} ({:.1}% used)",
        format_amount(totals.remaining),
        totals.usage_percent
    );
    match totals.health() {
        BudgetHealth::Ok => {}
        BudgetHealth::Warning => println!(
            "Warning: less than {:.0}% of the budget remains.",
            WARNING_THRESHOLD * 100.0
        ),
        BudgetHealth::OverBudget => println!("Warning: the selection exceeds the budget."),
    }
}
