//! Jira connection settings.

use triage_core::defaults;
use triage_core::{Error, Result};

#[derive(Debug, Clone)]
pub struct JiraConfig {
    /// Site URL, e.g. `https://example.atlassian.net`.
    pub base_url: String,
    /// Account email used for Basic auth.
    pub email: String,
    pub api_token: String,
    pub timeout_seconds: u64,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            email: String::new(),
            api_token: String::new(),
            timeout_seconds: defaults::JIRA_TIMEOUT_SECS,
        }
    }
}

impl JiraConfig {
    /// Read `JIRA_*` environment variables over the defaults.
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            base_url: std::env::var("JIRA_BASE_URL").unwrap_or(base.base_url),
            email: std::env::var("JIRA_EMAIL").unwrap_or(base.email),
            api_token: std::env::var("JIRA_API_TOKEN").unwrap_or(base.api_token),
            timeout_seconds: std::env::var("JIRA_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(base.timeout_seconds),
        }
    }

    /// Whether enough is set to talk to a real site.
    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty() && !self.email.is_empty() && !self.api_token.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "JIRA_BASE_URL must start with http:// or https://, got: {:?}",
                self.base_url
            )));
        }
        if self.email.trim().is_empty() {
            return Err(Error::Config("JIRA_EMAIL is required".to_string()));
        }
        if self.api_token.trim().is_empty() {
            return Err(Error::Config("JIRA_API_TOKEN is required".to_string()));
        }
        if self.timeout_seconds == 0 {
            return Err(Error::Config("JIRA_TIMEOUT must be positive".to_string()));
        }
        Ok(())
    }
}
