use std::sync::RwLock;

/// Source of the session token attached to every API request.
///
/// The client never reads ambient storage; whoever builds it decides where
/// the token lives (a session file, memory, a fixed value in tests).
pub trait CredentialStore: Send + Sync + std::fmt::Debug {
    fn token(&self) -> Option<String>;
}

/// A fixed token, or none at all.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl CredentialStore for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Token held in memory, replaceable after a login.
#[derive(Debug, Default)]
pub struct MemoryCredentials {
    token: RwLock<Option<String>>,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = token;
        }
    }
}

impl CredentialStore for MemoryCredentials {
    fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_credentials_replace_token() {
        let creds = MemoryCredentials::new();
        assert_eq!(creds.token(), None);

        creds.set(Some("abc".to_string()));
        assert_eq!(creds.token().as_deref(), Some("abc"));

        creds.set(None);
        assert_eq!(creds.token(), None);
    }

    #[test]
    fn static_token() {
        assert_eq!(StaticToken::new("t").token().as_deref(), Some("t"));
        assert!(StaticToken::anonymous().token().is_none());
    }
}
