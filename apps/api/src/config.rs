use anyhow::{Context, Result};
use secrecy::SecretString;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug)]
pub struct Config {
    /// Deployment-time secret. `Debug` prints it as redacted.
    pub gemini_api_key: SecretString,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: SecretString::from(require_env("GEMINI_API_KEY")?),
            port: parse_port(std::env::var("PORT").ok())?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_port(raw: Option<String>) -> Result<u16> {
    raw.unwrap_or_else(|| "8080".to_string())
        .parse::<u16>()
        .context("PORT must be a valid port number")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_defaults_to_8080() {
        assert_eq!(parse_port(None).unwrap(), 8080);
    }

    #[test]
    fn test_port_parses_and_rejects_garbage() {
        assert_eq!(parse_port(Some("3000".to_string())).unwrap(), 3000);
        assert!(parse_port(Some("not-a-port".to_string())).is_err());
        assert!(parse_port(Some("70000".to_string())).is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = Config {
            gemini_api_key: SecretString::from("AIza-very-secret".to_string()),
            port: 8080,
            rust_log: "info".to_string(),
        };
        assert!(!format!("{config:?}").contains("AIza-very-secret"));
    }
}
