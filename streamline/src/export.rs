//! CSV and plain-text renderings of the approved annual plan.

use chrono::NaiveDate;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use num_format::{Locale, ToFormattedString as _};

use crate::domain::{priority_marker, Allocation};
use crate::report::ReportSummary;

pub const TITLE: &str = "Annual Development Plan";
const CURRENCY: &str = "LKR";

const CSV_HEADER: [&str; 8] = [
    "No",
    "Description",
    "Zone",
    "District",
    "Component",
    "Subcomponent",
    "Amount (LKR)",
    "Priority",
];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("no PD-approved allocations to export")]
    Empty,
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Document,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Document => "txt",
        }
    }
}

/// `Annual_Development_Plan_<year>.<ext>`
pub fn default_file_name(year: i32, format: ExportFormat) -> String {
    format!(
        "{}_{}.{}",
        TITLE.replace(' ', "_"),
        year,
        format.extension()
    )
}

/// `1234.5` -> `1,234.50`
pub fn format_amount(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!(
        "{}{}.{:02}",
        sign,
        (cents / 100).to_formatted_string(&Locale::en),
        cents % 100
    )
}

fn format_currency(amount: f64) -> String {
    format!("{} {}", CURRENCY, format_amount(amount))
}

/// Header row unquoted, every data field quoted, `\n` line endings.
pub fn to_csv(approved: &[&Allocation]) -> Result<String, ExportError> {
    if approved.is_empty() {
        return Err(ExportError::Empty);
    }

    let mut out = Vec::new();
    {
        let mut header = WriterBuilder::new()
            .quote_style(QuoteStyle::Necessary)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(&mut out);
        header.write_record(CSV_HEADER)?;
        header.flush()?;
    }
    {
        let mut rows = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(&mut out);
        for (index, allocation) in approved.iter().enumerate() {
            rows.write_record([
                (index + 1).to_string(),
                allocation.description.clone(),
                allocation.zone.clone(),
                allocation.district.clone(),
                allocation.component_or_na().to_string(),
                allocation.subcomponent_or_na().to_string(),
                format!("{:.2}", allocation.allocated_amount),
                allocation.priority.map(|p| p.to_string()).unwrap_or_default(),
            ])?;
        }
        rows.flush()?;
    }

    Ok(String::from_utf8_lossy(&out).into_owned())
}

#[derive(Debug, Clone, PartialEq)]
struct DocumentRow {
    cells: [String; 7],
}

/// The printable plan: title block, summary boxes, approved table.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    generated_on: NaiveDate,
    summary: ReportSummary,
    rows: Vec<DocumentRow>,
    total: f64,
}

impl ReportDocument {
    const COLUMNS: [&'static str; 7] = [
        "#",
        "Description",
        "Location",
        "Component",
        "Subcomponent",
        "Amount",
        "Priority",
    ];

    pub fn build(
        summary: ReportSummary,
        approved: &[&Allocation],
        generated_on: NaiveDate,
    ) -> Result<Self, ExportError> {
        if approved.is_empty() {
            return Err(ExportError::Empty);
        }

        let rows = approved
            .iter()
            .enumerate()
            .map(|(index, a)| DocumentRow {
                cells: [
                    (index + 1).to_string(),
                    a.description.clone(),
                    format!("{}, {}", a.zone, a.district),
                    a.component_or_na().to_string(),
                    a.subcomponent_or_na().to_string(),
                    format_currency(a.allocated_amount),
                    priority_marker(a.priority),
                ],
            })
            .collect();
        let total = approved.iter().map(|a| a.allocated_amount).sum();

        Ok(Self {
            generated_on,
            summary,
            rows,
            total,
        })
    }

    pub fn year(&self) -> i32 {
        use chrono::Datelike as _;
        self.generated_on.year()
    }

    pub fn render(&self) -> String {
        let mut widths = Self::COLUMNS.map(str::len);
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(&row.cells) {
                *width = (*width).max(cell.chars().count());
            }
        }
        let total_cell = format_currency(self.total);
        widths[5] = widths[5].max(total_cell.len());

        let line = |cells: &[&str]| -> String {
            let padded: Vec<String> = cells
                .iter()
                .zip(widths)
                .enumerate()
                .map(|(i, (cell, width))| {
                    // Amounts right-aligned.
                    if i == 5 {
                        format!("{:>width$}", cell)
                    } else {
                        format!("{:<width$}", cell)
                    }
                })
                .collect();
            format!("| {} |", padded.join(" | "))
        };
        let table_width = widths.iter().sum::<usize>() + 3 * widths.len() + 1;
        let rule = "-".repeat(table_width);

        let mut out = String::new();
        out.push_str(TITLE);
        out.push('\n');
        out.push_str(&format!(
            "Generated on: {}\n\n",
            self.generated_on.format("%B %-d, %Y")
        ));

        for (label, amount) in [
            ("Total Budget", self.summary.total_budget),
            ("Total Allocated", self.summary.total_allocated),
            ("PD Approved", self.summary.total_pd_approved),
        ] {
            out.push_str(&format!("[ {}: {} ]\n", label, format_currency(amount)));
        }
        out.push('\n');

        out.push_str(&rule);
        out.push('\n');
        out.push_str(&line(&Self::COLUMNS[..]));
        out.push('\n');
        out.push_str(&rule);
        out.push('\n');
        for row in &self.rows {
            let cells: Vec<&str> = row.cells.iter().map(String::as_str).collect();
            out.push_str(&line(cells.as_slice()));
            out.push('\n');
        }
        out.push_str(&rule);
        out.push('\n');
        out.push_str(&line(&["", "TOTAL", "", "", "", total_cell.as_str(), ""][..]));
        out.push('\n');
        out.push_str(&rule);
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn roof_repair() -> Allocation {
        serde_json::from_value(json!({
            "id": 11,
            "activity_id": 4,
            "description": "Roof repair",
            "zone": "Kandy",
            "district": "Kandy",
            "allocated_amount": "1000.5",
            "priority": 2,
            "status": "PDApproved",
            "component": "X",
            "subcomponent": "Y",
            "total_budget": 5000,
            "created_at": "2025-02-01T00:00:00Z",
        }))
        .unwrap()
    }

    fn well(component: Option<&str>) -> Allocation {
        serde_json::from_value(json!({
            "id": 12,
            "activity_id": 5,
            "description": "Well, \"deep\"",
            "zone": "Matale",
            "district": "Matale",
            "allocated_amount": 1234567.0,
            "priority": 1,
            "status": "PDApproved",
            "component": component,
            "subcomponent": null,
            "total_budget": 5000,
            "created_at": "2025-02-02T00:00:00Z",
        }))
        .unwrap()
    }

    #[test]
    fn csv_matches_expected_bytes() {
        let row = roof_repair();
        let csv = to_csv(&[&row]).unwrap();
        assert_eq!(
            csv,
            "No,Description,Zone,District,Component,Subcomponent,Amount (LKR),Priority\n\
             \"1\",\"Roof repair\",\"Kandy\",\"Kandy\",\"X\",\"Y\",\"1000.50\",\"2\"\n"
        );
    }

    #[test]
    fn csv_escapes_quotes_and_fills_missing_components() {
        let row = well(None);
        let csv = to_csv(&[&row]).unwrap();
        let data = csv.lines().nth(1).unwrap();
        assert_eq!(
            data,
            "\"1\",\"Well, \"\"deep\"\"\",\"Matale\",\"Matale\",\"N/A\",\"N/A\",\"1234567.00\",\"1\""
        );
    }

    #[test]
    fn empty_exports_are_refused() {
        assert!(matches!(to_csv(&[]), Err(ExportError::Empty)));
        let date = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        assert!(matches!(
            ReportDocument::build(ReportSummary::default(), &[], date),
            Err(ExportError::Empty)
        ));
    }

    #[test]
    fn amounts_are_grouped_with_two_decimals() {
        assert_eq!(format_amount(1234.5), "1,234.50");
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(999.999), "1,000.00");
        assert_eq!(format_amount(5_000_000.0), "5,000,000.00");
    }

    #[test]
    fn document_has_title_summary_and_total() {
        let a = roof_repair();
        let b = well(Some("Water"));
        let summary = ReportSummary {
            total_budget: 5_000_000.0,
            total_allocated: 1_300_000.0,
            total_pd_approved: 1_235_567.5,
        };
        let date = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        let doc = ReportDocument::build(summary, &[&a, &b], date).unwrap();
        let text = doc.render();

        assert!(text.starts_with("Annual Development Plan\nGenerated on: March 4, 2025\n"));
        assert!(text.contains("[ Total Budget: LKR 5,000,000.00 ]"));
        assert!(text.contains("[ PD Approved: LKR 1,235,567.50 ]"));
        assert!(text.contains("Kandy, Kandy"));
        assert!(text.contains("[2 Medium]"));
        let total_line = text.lines().find(|l| l.contains("TOTAL")).unwrap();
        assert!(total_line.contains("LKR 1,235,567.50"));
        assert_eq!(doc.year(), 2025);
    }

    #[test]
    fn file_names_carry_the_year() {
        assert_eq!(
            default_file_name(2025, ExportFormat::Csv),
            "Annual_Development_Plan_2025.csv"
        );
        assert_eq!(
            default_file_name(2024, ExportFormat::Document),
            "Annual_Development_Plan_2024.txt"
        );
    }
}
