use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use streamline::{
    domain::{current_budget, priority_marker},
    export::{default_file_name, format_amount, to_csv, ExportFormat, ReportDocument},
    report::{approved, filter_and_sort, Facets, ReportFilter, ReportSummary},
    roles::Screen,
};
use tracing::warn;

use super::{truncate, Env, UserContext};
use crate::cli::ReportArgs;

pub async fn report(env: &Env, args: ReportArgs) -> Result<()> {
    env.authorize("report", &[Screen::ReportGenerator])?;
    let backend = env.backend()?;

    let allocations = backend
        .allocations()
        .await
        .user_context("Failed to load allocations")?;
    let budgets = match backend.budgets().await {
        Ok(budgets) => budgets,
        Err(e) => {
            warn!(error = %e, "budget record unavailable; using allocation rows");
            Vec::new()
        }
    };
    let summary = ReportSummary::compute(current_budget(&budgets), &allocations);

    let filter = ReportFilter {
        zone: args.zone,
        district: args.district,
        component: args.component,
        status: args.status,
        search: args.search,
    };
    let rows = filter_and_sort(&allocations, &filter, args.sort);

    println!("Total budget:  LKR {}", format_amount(summary.total_budget));
    println!("Allocated:     LKR {}", format_amount(summary.total_allocated));
    println!("PD approved:   LKR {}", format_amount(summary.total_pd_approved));
    println!();

    let facets = Facets::collect(&allocations);
    println!("Zones: {}", facets.zones.join(", "));
    println!("Districts: {}", facets.districts.join(", "));
    println!("Components: {}", facets.components.join(", "));
    println!("Statuses: {}", facets.statuses.join(", "));
    println!();

    if rows.is_empty() {
        println!("No allocations match the current filters.");
    }
    for allocation in &rows {
        println!(
            "{:>4}  {:<24} {:<16} LKR {:>16} {:<12} {:<12} {}",
            allocation.activity_id,
            truncate(&format!("{}, {}", allocation.zone, allocation.district), 24),
            truncate(allocation.component_or_na(), 16),
            format_amount(allocation.allocated_amount),
            priority_marker(allocation.priority),
            allocation.status.as_str(),
            truncate(&allocation.description, 40)
        );
    }

    let approved = approved(&allocations);
    let today = Local::now().date_naive();

    if let Some(path) = args.csv {
        let path = output_path(path, today.year(), ExportFormat::Csv);
        let csv = to_csv(&approved).context("Cannot export CSV")?;
        std::fs::write(&path, csv)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Wrote {}", path.display());
    }

    if let Some(path) = args.document {
        let path = output_path(path, today.year(), ExportFormat::Document);
        let document =
            ReportDocument::build(summary, &approved, today).context("Cannot export document")?;
        std::fs::write(&path, document.render())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Wrote {}", path.display());
    }

    Ok(())
}

/// An empty path means "use the default file name in the current directory".
fn output_path(path: String, year: i32, format: ExportFormat) -> PathBuf {
    if path.trim().is_empty() {
        PathBuf::from(default_file_name(year, format))
    } else {
        PathBuf::from(path)
    }
}
