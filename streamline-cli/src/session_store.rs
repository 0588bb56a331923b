use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
#[cfg(unix)]
use std::{io::Write, os::unix::fs::OpenOptionsExt};
use streamline::{roles::Role, CredentialStore};

/// What `login` leaves behind for later commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub role: Role,
    pub token: String,
}

pub fn session_path() -> Result<PathBuf> {
    Ok(crate::config::root_path()?.join("session.toml"))
}

fn secure_write(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    #[cfg(unix)]
    {
        std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)?
            .write_all(content.as_bytes())?;
    }

    #[cfg(not(unix))]
    {
        std::fs::write(path, content)?;
    }

    Ok(())
}

pub fn load_session(path: &Path) -> Result<Option<Session>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(path).context("Failed to read session file")?;
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let session: Session = toml::from_str(&raw).context("Failed to parse session file")?;
    if session.token.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(session))
}

pub fn save_session(path: &Path, session: &Session) -> Result<()> {
    let raw = toml::to_string(session)?;
    secure_write(path, &raw)
}

pub fn clear_session(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

/// Reads the token from the session file on every request, so a `login`
/// from another shell is picked up without restarting.
#[derive(Debug, Clone)]
pub struct FileCredentials {
    path: PathBuf,
}

impl FileCredentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialStore for FileCredentials {
    fn token(&self) -> Option<String> {
        match load_session(&self.path) {
            Ok(session) => session.map(|s| s.token),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable session file");
                None
            }
        }
    }
}
