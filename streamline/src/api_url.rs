/// Base URL of the workflow REST API, e.g. `http://localhost:4000/api`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiUrl(String);

impl AsRef<str> for ApiUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ApiUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl ApiUrl {
    pub const DEFAULT: &'static str = "http://localhost:4000/api";

    pub fn new(base: impl Into<String>) -> Self {
        Self(base.into().trim_end_matches('/').to_string())
    }

    /// Append the given path to the URL.
    pub fn append_path(&self, path: &str) -> Self {
        let trimmed_url = self.0.trim_end_matches('/');
        let trimmed_path = path.trim_start_matches('/');
        Self(format!("{}/{}", trimmed_url, trimmed_path))
    }
}

impl Default for ApiUrl {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}
