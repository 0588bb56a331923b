use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use streamline::{report::SortKey, roles::Role};

#[derive(Debug, Parser)]
#[command(name = "streamline")]
#[command(about = "Budget allocation, approval and reporting for development activities")]
pub struct Cli {
    /// Run against local in-memory sample data instead of the API
    #[arg(long, global = true)]
    pub dev: bool,

    /// Verbose logging (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Log in as one of the workflow roles
    Login(LoginArgs),
    /// Remove the saved session
    Logout,
    /// Print config path and create default file if missing
    ConfigPath,
    /// List roles and the screens each one may open
    Roles,
    /// Show or set the planning budget
    #[command(subcommand)]
    Budget(BudgetCommand),
    /// List activities visible to the current role
    Activities(ActivityFilterArgs),
    /// Submit, review and answer activities before costing
    #[command(subcommand)]
    Activity(ActivityCommand),
    /// List allocated activities and their status
    Allocations,
    /// Set the budget and priority of an activity
    Annotate(AnnotateArgs),
    /// Pick costed activities and finalize their allocation
    Plan(PlanArgs),
    /// Approve or reject allocated activities
    Review(ReviewArgs),
    /// Filter allocations and export the approved plan
    Report(ReportArgs),
}

#[derive(Debug, Args)]
pub struct LoginArgs {
    #[arg(long)]
    pub role: Role,
    #[arg(long)]
    pub email: Option<String>,
    /// Use an existing session token instead of email and password
    #[arg(long)]
    pub token: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum BudgetCommand {
    Show,
    /// Create the budget, or update the current one
    Set { amount: f64 },
}

#[derive(Debug, Clone, Default, Args)]
pub struct ActivityFilterArgs {
    /// Match description or zone
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long)]
    pub priority: Option<i32>,
}

#[derive(Debug, Subcommand)]
pub enum ActivityCommand {
    /// Submit a new activity
    Add(AddActivityArgs),
    /// Approve or reject a pending activity
    Review(ReviewActivityArgs),
    /// Accept or reject an assignment
    Respond(RespondArgs),
    /// List engineers that activities can be assigned to
    Engineers,
}

#[derive(Debug, Args)]
pub struct AddActivityArgs {
    #[arg(long)]
    pub description: String,
    #[arg(long)]
    pub province: String,
    #[arg(long)]
    pub district: String,
    #[arg(long)]
    pub zone: String,
    #[arg(long)]
    pub component: Option<String>,
    #[arg(long)]
    pub subcomponent: Option<String>,
    /// Create the activity already approved and assigned (Development Officer)
    #[arg(long, value_name = "ENGINEER_ID")]
    pub assign: Option<i64>,
    /// Photo to attach; repeat for more
    #[arg(long = "image", value_name = "PATH")]
    pub images: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ReviewActivityArgs {
    pub id: i64,
    /// Approve and assign to this engineer
    #[arg(long, value_name = "ENGINEER_ID", conflicts_with = "reject", required_unless_present = "reject")]
    pub assign: Option<i64>,
    #[arg(long, value_name = "REASON")]
    pub reject: Option<String>,
    #[arg(long, requires = "assign")]
    pub component: Option<String>,
    #[arg(long, requires = "assign")]
    pub subcomponent: Option<String>,
    /// Replace the submitted description
    #[arg(long, requires = "assign")]
    pub description: Option<String>,
}

#[derive(Debug, Args)]
pub struct RespondArgs {
    pub id: i64,
    #[arg(long, conflicts_with = "reject", required_unless_present = "reject")]
    pub accept: bool,
    #[arg(long, value_name = "REASON")]
    pub reject: Option<String>,
}

#[derive(Debug, Args)]
pub struct AnnotateArgs {
    pub id: i64,
    #[arg(long)]
    pub budget: f64,
    #[arg(long)]
    pub priority: i32,
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Activity ids to allocate, comma separated
    #[arg(long, value_delimiter = ',')]
    pub select: Vec<i64>,
    #[command(flatten)]
    pub filter: ActivityFilterArgs,
    /// Submit the selection
    #[arg(long)]
    pub finalize: bool,
}

#[derive(Debug, Args)]
pub struct ReviewArgs {
    #[arg(long = "approve", value_name = "ID")]
    pub approve: Vec<i64>,
    /// Reject with a reason, e.g. `--reject 12="Over budget"`
    #[arg(long = "reject", value_name = "ID=REASON", value_parser = parse_rejection)]
    pub reject: Vec<(i64, String)>,
    #[arg(long)]
    pub submit: bool,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[arg(long)]
    pub zone: Option<String>,
    #[arg(long)]
    pub district: Option<String>,
    #[arg(long)]
    pub component: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long, default_value_t = SortKey::Priority)]
    pub sort: SortKey,
    /// Write the approved plan as CSV
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = "")]
    pub csv: Option<String>,
    /// Write the approved plan as a printable document
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = "")]
    pub document: Option<String>,
}

fn parse_rejection(raw: &str) -> Result<(i64, String), String> {
    let (id, reason) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=REASON, got `{}`", raw))?;
    let id = id
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("invalid activity id `{}`: {}", id, e))?;
    Ok((id, reason.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_review_flags() {
        let cli = Cli::try_parse_from([
            "streamline",
            "review",
            "--approve",
            "3",
            "--approve",
            "4",
            "--reject",
            "5=Duplicate of 4",
            "--submit",
        ])
        .unwrap();

        match cli.command {
            Commands::Review(args) => {
                assert_eq!(args.approve, vec![3, 4]);
                assert_eq!(args.reject, vec![(5, "Duplicate of 4".to_string())]);
                assert!(args.submit);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn rejection_needs_an_id() {
        assert!(parse_rejection("no reason").is_err());
        assert!(parse_rejection("x=reason").is_err());
        assert_eq!(parse_rejection("7=").unwrap(), (7, String::new()));
    }

    #[test]
    fn parses_plan_selection_and_globals() {
        let cli = Cli::try_parse_from([
            "streamline", "plan", "--select", "1,3", "--priority", "2", "--finalize", "--dev",
        ])
        .unwrap();
        assert!(cli.dev);
        match cli.command {
            Commands::Plan(args) => {
                assert_eq!(args.select, vec![1, 3]);
                assert_eq!(args.filter.priority, Some(2));
                assert!(args.finalize);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn parses_role_and_sort_values() {
        let cli = Cli::try_parse_from(["streamline", "login", "--role", "provincial-director", "--token", "t"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Login(LoginArgs { role: Role::ProvincialDirector, .. })
        ));

        let cli = Cli::try_parse_from(["streamline", "report", "--sort", "amount", "--csv"]).unwrap();
        match cli.command {
            Commands::Report(args) => {
                assert_eq!(args.sort, SortKey::Amount);
                assert_eq!(args.csv.as_deref(), Some(""));
                assert!(args.document.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn activity_review_needs_exactly_one_decision() {
        let cli = Cli::try_parse_from([
            "streamline", "activity", "review", "6", "--assign", "2", "--component", "Health",
        ])
        .unwrap();
        match cli.command {
            Commands::Activity(ActivityCommand::Review(args)) => {
                assert_eq!(args.id, 6);
                assert_eq!(args.assign, Some(2));
                assert_eq!(args.component.as_deref(), Some("Health"));
            }
            other => panic!("unexpected command: {:?}", other),
        }

        assert!(Cli::try_parse_from(["streamline", "activity", "review", "6"]).is_err());
        assert!(Cli::try_parse_from([
            "streamline", "activity", "review", "6", "--assign", "2", "--reject", "No"
        ])
        .is_err());
        assert!(Cli::try_parse_from([
            "streamline", "activity", "review", "6", "--reject", "No", "--component", "Health"
        ])
        .is_err());
    }

    #[test]
    fn parses_activity_add_with_images() {
        let cli = Cli::try_parse_from([
            "streamline", "activity", "add", "--description", "Well", "--province", "Central",
            "--district", "Matale", "--zone", "Matale", "--image", "a.jpg", "--image", "b.jpg",
        ])
        .unwrap();
        match cli.command {
            Commands::Activity(ActivityCommand::Add(args)) => {
                assert_eq!(args.images, vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")]);
                assert!(args.assign.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn respond_takes_accept_or_reason() {
        let cli = Cli::try_parse_from(["streamline", "activity", "respond", "5", "--accept"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Activity(ActivityCommand::Respond(RespondArgs { id: 5, accept: true, .. }))
        ));
        assert!(Cli::try_parse_from(["streamline", "activity", "respond", "5"]).is_err());
    }
}
