mod activity;
mod plan;
mod report;
mod review;
mod session;

use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, bail, Result};
use streamline::{
    annotate::AnnotateError,
    lifecycle::LifecycleError,
    planner::PlannerError,
    reviewer::ReviewError,
    roles::{Role, Screen},
    ApiError, BudgetBackend, DevBackend, HttpBackend,
};
use tracing::debug;

use crate::{
    cli::{Cli, Commands},
    config::StreamlineConfig,
    session_store::{self, FileCredentials},
};

/// Library errors that carry a message written for the person at the terminal.
pub(crate) trait UserFacing: std::fmt::Debug {
    fn user_message(&self) -> String;
}

macro_rules! user_facing {
    ($($error:ty),*) => {
        $(impl UserFacing for $error {
            fn user_message(&self) -> String {
                <$error>::user_message(self)
            }
        })*
    };
}

user_facing!(ApiError, AnnotateError, LifecycleError, PlannerError, ReviewError);

pub(crate) trait UserContext<T> {
    /// Reports `action: <user message>` instead of the raw error chain, which
    /// is kept in the debug log.
    fn user_context(self, action: &str) -> Result<T>;
}

impl<T, E: UserFacing> UserContext<T> for std::result::Result<T, E> {
    fn user_context(self, action: &str) -> Result<T> {
        self.map_err(|e| {
            debug!(error = ?e, "{}", action);
            anyhow!("{}: {}", action, e.user_message())
        })
    }
}

/// Everything a command needs besides its own arguments.
pub struct Env {
    pub dev: bool,
    pub config: StreamlineConfig,
    pub session_path: PathBuf,
}

impl Env {
    pub fn session(&self) -> Result<Option<session_store::Session>> {
        session_store::load_session(&self.session_path)
    }

    /// The logged-in role. `--dev` runs may fall back to the configured role.
    pub fn role(&self) -> Result<Role> {
        if let Some(session) = self.session()? {
            return Ok(session.role);
        }
        match (self.dev, self.config.role) {
            (true, Some(role)) => Ok(role),
            _ => bail!("Not logged in. Run `streamline login --role <role>` first."),
        }
    }

    /// Checks the role table before a command touches the backend.
    pub fn authorize(&self, command: &str, screens: &[Screen]) -> Result<Role> {
        let role = self.role()?;
        check_access(role, command, screens)?;
        Ok(role)
    }

    pub fn backend(&self) -> Result<Box<dyn BudgetBackend>> {
        if self.dev {
            debug!("using in-memory dev backend");
            return Ok(Box::new(DevBackend::new()));
        }
        let credentials = Arc::new(FileCredentials::new(self.session_path.clone()));
        Ok(Box::new(HttpBackend::new(self.config.api_url(), credentials)?))
    }
}

fn check_access(role: Role, command: &str, screens: &[Screen]) -> Result<()> {
    if screens.iter().any(|s| role.can_open(*s)) {
        return Ok(());
    }

    let mut allowed: Vec<&str> = Vec::new();
    for screen in screens {
        for r in Role::with_access_to(*screen) {
            let title = r.profile().title;
            if !allowed.contains(&title) {
                allowed.push(title);
            }
        }
    }
    bail!(
        "`{}` is not available to {}. Allowed roles: {}",
        command,
        role.profile().title,
        allowed.join(", ")
    )
}

pub async fn run(cli: Cli) -> Result<()> {
    let env = Env {
        dev: cli.dev,
        config: StreamlineConfig::load()?,
        session_path: session_store::session_path()?,
    };

    match cli.command {
        Commands::Login(args) => session::login(&env, args).await,
        Commands::Logout => session::logout(&env),
        Commands::ConfigPath => session::config_path(),
        Commands::Roles => {
            session::roles(&env);
            Ok(())
        }
        Commands::Budget(command) => plan::budget(&env, command).await,
        Commands::Activities(args) => activity::activities(&env, args).await,
        Commands::Activity(command) => activity::activity(&env, command).await,
        Commands::Allocations => review::allocations(&env).await,
        Commands::Annotate(args) => plan::annotate(&env, args).await,
        Commands::Plan(args) => plan::plan(&env, args).await,
        Commands::Review(args) => review::review(&env, args).await,
        Commands::Report(args) => report::report(&env, args).await,
    }
}

/// Cuts long descriptions down for one-line listings.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session_store::Session;

    #[test]
    fn access_follows_role_table() {
        assert!(check_access(Role::DevelopmentOfficer, "plan", &[Screen::AllocationPlanner]).is_ok());
        assert!(check_access(Role::ProvincialDirector, "report", &[Screen::ReportGenerator]).is_ok());

        let err = check_access(Role::SiteEngineer, "review", &[Screen::ApprovalReviewer])
            .unwrap_err()
            .to_string();
        assert!(err.contains("not available to Site Engineer"));
        assert!(err.contains("Provincial Director"));
    }

    #[test]
    fn any_listed_screen_grants_access() {
        let screens = [Screen::ActivityList, Screen::EngineerActivities];
        assert!(check_access(Role::ResponsiblePerson, "activities", &screens).is_ok());
        assert!(check_access(Role::SiteEngineer, "activities", &screens).is_ok());
        assert!(check_access(Role::ProvincialDirector, "activities", &screens).is_err());
    }

    #[test]
    fn dev_runs_fall_back_to_configured_role() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = Env {
            dev: true,
            config: StreamlineConfig {
                role: Some(Role::ProvincialDirector),
                ..Default::default()
            },
            session_path: dir.path().join("session.toml"),
        };
        assert_eq!(env.role().unwrap(), Role::ProvincialDirector);

        env.dev = false;
        assert!(env.role().is_err());

        session_store::save_session(
            &env.session_path,
            &Session {
                role: Role::SiteEngineer,
                token: "t".to_string(),
            },
        )
        .unwrap();
        assert_eq!(env.role().unwrap(), Role::SiteEngineer);
    }

    #[test]
    fn library_errors_surface_their_user_message() {
        let failed: std::result::Result<(), PlannerError> =
            Err(PlannerError::Api(ApiError::Unauthorized));
        let err = failed.user_context("Failed to load budget").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to load budget: Session expired or invalid. Log in again."
        );
        assert_eq!(err.chain().count(), 1);

        let failed: std::result::Result<(), ApiError> =
            Err(ApiError::Request("tcp connect error: refused".to_string()));
        let err = failed.user_context("Login failed").unwrap_err();
        assert!(!format!("{:?}", err).contains("tcp connect"));
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Roof repair at school", 10), "Roof repa…");
    }
}
