use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

use crate::auth::password::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};
use crate::auth::token::MAX_TOKEN_TTL_HOURS;

#[derive(Parser, Debug, Default)]
#[command(name = "quorum", about = "A blog and forum backend")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// SQLite database path
    #[arg(long)]
    pub database_url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("database connection string is not set (DATABASE_URL)")]
    MissingDatabaseUrl,

    #[error("token signing secret is not set (JWT_SECRET)")]
    MissingJwtSecret,

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_hours: 24,
            bcrypt_cost: 10,
        }
    }
}

// Keeps the signing secret out of logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

impl Config {
    /// Builds the process configuration: config file, then environment, then
    /// CLI flags, each layer overriding the previous one.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        Self::load_with(cli, |key| std::env::var(key).ok())
    }

    /// `load` with the environment supplied by `lookup`.
    pub fn load_with<F>(cli: &Cli, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match cli.config {
            Some(ref path) => {
                let content = std::fs::read_to_string(path)?;
                toml::from_str(&content)?
            }
            None => Config::default(),
        };

        config.apply_env(lookup)?;

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref url) = cli.database_url {
            config.database.url = Some(url.clone());
        }

        config.validate()?;
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = Some(secret);
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = parse_value("PORT", port)?;
        }
        if let Some(ttl) = lookup("TOKEN_TTL_HOURS") {
            self.auth.token_ttl_hours = parse_value("TOKEN_TTL_HOURS", ttl)?;
        }
        if let Some(cost) = lookup("BCRYPT_COST") {
            self.auth.bcrypt_cost = parse_value("BCRYPT_COST", cost)?;
        }
        Ok(())
    }

    /// The database URL and signing secret have no defaults.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url().is_none() {
            return Err(ConfigError::MissingDatabaseUrl);
        }
        if self.jwt_secret().is_none() {
            return Err(ConfigError::MissingJwtSecret);
        }
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&self.auth.token_ttl_hours) {
            return Err(ConfigError::InvalidValue {
                key: "token_ttl_hours",
                value: self.auth.token_ttl_hours.to_string(),
            });
        }
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.auth.bcrypt_cost) {
            return Err(ConfigError::InvalidValue {
                key: "bcrypt_cost",
                value: self.auth.bcrypt_cost.to_string(),
            });
        }
        Ok(())
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database
            .url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn jwt_secret(&self) -> Option<&str> {
        self.auth.jwt_secret.as_deref().filter(|s| !s.is_empty())
    }

    /// Filesystem path of the SQLite database; accepts an optional
    /// `sqlite://` prefix.
    pub fn db_path(&self) -> Option<PathBuf> {
        self.database_url().map(|url| {
            PathBuf::from(
                url.strip_prefix("sqlite://")
                    .or_else(|| url.strip_prefix("sqlite:"))
                    .unwrap_or(url),
            )
        })
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}
