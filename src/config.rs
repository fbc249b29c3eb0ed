// src/config.rs

use serde::Deserialize;

#[derive(Deserialize, Clone)]
pub struct Config {
    // Database
    pub database_url: Option<String>,

    // Server
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_app_env")]
    pub app_env: String,

    // Auth
    pub jwt_secret: Option<String>,
    #[serde(default = "default_jwt_expires_in_hours")]
    pub jwt_expires_in_hours: i64,

    // AI gateway
    #[serde(default = "default_ai_service_url")]
    pub ai_service_url: String,
    #[serde(default = "default_ai_request_timeout_secs")]
    pub ai_request_timeout_secs: u64,
    #[serde(default = "default_ai_max_idle_connections")]
    pub ai_max_idle_connections: usize,

    // Message pipeline
    #[serde(default = "default_history_window")]
    pub history_window: i64,
    #[serde(default = "default_max_title_len")]
    pub max_title_len: usize,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("port", &self.port)
            .field("app_env", &self.app_env)
            .field(
                "jwt_secret",
                &self.jwt_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("jwt_expires_in_hours", &self.jwt_expires_in_hours)
            .field("ai_service_url", &self.ai_service_url)
            .field("ai_request_timeout_secs", &self.ai_request_timeout_secs)
            .field("ai_max_idle_connections", &self.ai_max_idle_connections)
            .field("history_window", &self.history_window)
            .field("max_title_len", &self.max_title_len)
            .finish()
    }
}

impl Config {
    /// Loads the configuration from environment variables.
    pub fn load() -> Result<Self, anyhow::Error> {
        envy::from_env::<Self>().map_err(anyhow::Error::from)
    }

    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }
}

fn default_port() -> u16 {
    3000
}

fn default_app_env() -> String {
    "development".to_string()
}

fn default_jwt_expires_in_hours() -> i64 {
    24
}

fn default_ai_service_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_ai_request_timeout_secs() -> u64 {
    30
}

fn default_ai_max_idle_connections() -> usize {
    100
}

fn default_history_window() -> i64 {
    14
}

fn default_max_title_len() -> usize {
    40
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_tunable() {
        let config: Config = envy::from_iter(std::iter::empty::<(String, String)>())
            .expect("Config should load with no env vars set");
        assert_eq!(config.port, 3000);
        assert_eq!(config.app_env, "development");
        assert_eq!(config.jwt_expires_in_hours, 24);
        assert_eq!(config.ai_request_timeout_secs, 30);
        assert_eq!(config.history_window, 14);
        assert_eq!(config.max_title_len, 40);
        assert!(!config.is_production());
    }

    #[test]
    fn debug_redacts_secrets() {
        let config: Config = envy::from_iter(vec![
            ("DATABASE_URL".to_string(), "postgres://u:p@h/db".to_string()),
            ("JWT_SECRET".to_string(), "top-secret".to_string()),
        ])
        .expect("Config should load");
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("top-secret"));
        assert!(!debug_output.contains("postgres://"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
