//! Server settings.

use axum::http::HeaderValue;

use triage_core::defaults;
use triage_core::{Error, Result};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed by CORS. Empty disables the CORS layer.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: defaults::SERVER_PORT,
            allowed_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Read `HOST`, `PORT` and `ALLOWED_ORIGINS` (comma separated).
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(base.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(base.port),
            allowed_origins: std::env::var("ALLOWED_ORIGINS")
                .map(|v| parse_origins(&v))
                .unwrap_or(base.allowed_origins),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("HOST cannot be empty".to_string()));
        }
        if self.port == 0 {
            return Err(Error::Config("PORT must be non-zero".to_string()));
        }
        for origin in &self.allowed_origins {
            if origin.parse::<HeaderValue>().is_err() {
                return Err(Error::Config(format!(
                    "ALLOWED_ORIGINS contains an invalid origin: {:?}",
                    origin
                )));
            }
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins("https://a.example.com/, http://localhost:3000 ,,"),
            vec!["https://a.example.com", "http://localhost:3000"]
        );
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn test_validate() {
        assert!(ServerConfig::default().validate().is_ok());
        let bad_port = ServerConfig {
            port: 0,
            ..Default::default()
        };
        assert!(matches!(bad_port.validate(), Err(Error::Config(_))));
        let bad_origin = ServerConfig {
            allowed_origins: vec!["http://bad\norigin".to_string()],
            ..Default::default()
        };
        assert!(matches!(bad_origin.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_bind_address() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Default::default()
        };
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }
}
