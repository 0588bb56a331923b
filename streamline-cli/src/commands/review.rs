use anyhow::{anyhow, Result};
use streamline::{
    domain::{priority_marker, Allocation},
    export::format_amount,
    reviewer::{ApprovalReviewer, Decision, ReviewError},
    roles::Screen,
};

use super::{truncate, Env, UserContext};
use crate::cli::ReviewArgs;

pub async fn review(env: &Env, args: ReviewArgs) -> Result<()> {
    env.authorize("review", &[Screen::ApprovalReviewer])?;
    let backend = env.backend()?;
    let mut reviewer = ApprovalReviewer::load(backend.as_ref())
        .await
        .user_context("Failed to load allocations")?;

    for id in args.approve {
        reviewer
            .decide(id, Decision::Approve)
            .user_context(&format!("Cannot approve activity {}", id))?;
    }
    for (id, reason) in args.reject {
        reviewer
            .decide(id, Decision::reject(reason))
            .user_context(&format!("Cannot reject activity {}", id))?;
    }

    println!("Awaiting decision:");
    print_rows(&reviewer, &reviewer.pending());
    println!();
    println!("Decided:");
    print_rows(&reviewer, &reviewer.history());

    if !args.submit {
        return Ok(());
    }

    println!();
    match reviewer.submit(backend.as_ref()).await {
        Ok(outcome) => {
            for (id, status) in &outcome.applied {
                println!("Activity {} -> {}", id, status);
            }
            println!("Submitted {} decisions.", outcome.applied.len());
            Ok(())
        }
        Err(e @ ReviewError::Batch { .. }) => {
            if let ReviewError::Batch { applied, .. } = &e {
                for id in applied {
                    println!("Activity {} updated", id);
                }
            }
            println!("Remaining decisions were not sent. Re-run review to retry them.");
            Err(anyhow!("Approval batch stopped part way. {}", e.user_message()))
        }
        Err(e) => Err(e).user_context("Failed to submit decisions"),
    }
}

pub async fn allocations(env: &Env) -> Result<()> {
    env.authorize("allocations", &[Screen::AllocationList])?;
    let backend = env.backend()?;
    let allocations = backend
        .allocations()
        .await
        .user_context("Failed to load allocations")?;

    if allocations.is_empty() {
        println!("No allocations yet.");
        return Ok(());
    }
    for allocation in &allocations {
        println!(
            "{:>4}  {:<12} {:<24} LKR {:>16} {:<12} {}",
            allocation.activity_id,
            allocation.status.as_str(),
            truncate(&format!("{}, {}", allocation.zone, allocation.district), 24),
            format_amount(allocation.allocated_amount),
            priority_marker(allocation.priority),
            truncate(&allocation.description, 40)
        );
    }
    Ok(())
}

fn print_rows(reviewer: &ApprovalReviewer, rows: &[&Allocation]) {
    if rows.is_empty() {
        println!("  (none)");
        return;
    }
    for allocation in rows {
        let decision = match reviewer.decision(allocation.activity_id) {
            Some(Decision::Approve) => "approve".to_string(),
            Some(Decision::Reject { reason }) => format!("reject: {}", reason),
            None => String::new(),
        };
        println!(
            "  {:>4}  {:<12} {:<24} LKR {:>16} {:<12} {}  {}",
            allocation.activity_id,
            allocation.status.as_str(),
            truncate(&format!("{}, {}", allocation.zone, allocation.district), 24),
            format_amount(allocation.allocated_amount),
            priority_marker(allocation.priority),
            truncate(&allocation.description, 32),
            decision
        );
    }
}
