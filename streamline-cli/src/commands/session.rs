use std::{io::Write, sync::Arc};

use anyhow::{bail, Context, Result};
use streamline::{roles::ROLE_TABLE, HttpBackend, StaticToken};
use tracing::info;

use super::{Env, UserContext};
use crate::{
    cli::LoginArgs,
    config::StreamlineConfig,
    session_store::{self, Session},
};

const DEV_TOKEN: &str = "dev-session";

pub async fn login(env: &Env, args: LoginArgs) -> Result<()> {
    let role = args.role;
    let profile = role.profile();

    let token = match (args.token, env.dev) {
        (Some(token), _) => token,
        (None, true) => DEV_TOKEN.to_string(),
        (None, false) => {
            if profile.login_path.is_none() {
                bail!(
                    "{} has no server login. Pass an existing session token with --token.",
                    profile.title
                );
            }
            let email = match args.email {
                Some(email) => email,
                None => prompt("Email: ")?,
            };
            let password =
                rpassword::prompt_password("Password: ").context("Failed to read password")?;

            let backend = HttpBackend::new(env.config.api_url(), Arc::new(StaticToken::anonymous()))
                .user_context("Cannot set up the API client")?;
            backend
                .login(role, email.trim(), &password)
                .await
                .user_context("Login failed")?
        }
    };

    if token.trim().is_empty() {
        bail!("Session token must not be empty");
    }

    session_store::save_session(&env.session_path, &Session { role, token })?;
    info!(%role, "session saved");
    println!("Logged in as {}.", profile.title);
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read input")?;
    Ok(line.trim().to_string())
}

pub fn logout(env: &Env) -> Result<()> {
    session_store::clear_session(&env.session_path)?;
    println!("Logged out. Local session removed.");
    Ok(())
}

pub fn config_path() -> Result<()> {
    let path = StreamlineConfig::ensure_file()?;
    println!("{}", path.display());
    Ok(())
}

pub fn roles(env: &Env) {
    let current = env.session().ok().flatten().map(|s| s.role);

    for profile in ROLE_TABLE.iter() {
        let marker = if current == Some(profile.role) { "*" } else { " " };
        let screens: Vec<String> = profile.screens.iter().map(|s| s.to_string()).collect();
        println!(
            "{} {:<20} {:<22} {}",
            marker,
            profile.role.to_string(),
            profile.title,
            screens.join(", ")
        );
    }
}
