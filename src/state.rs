use std::sync::Arc;

use chrono::Duration;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::token::TokenService;
use crate::config::{Config, ConfigError};

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    /// Fails when the config carries no signing secret.
    pub fn new(db: DbPool, config: Config) -> Result<Self, ConfigError> {
        let secret = config.jwt_secret().ok_or(ConfigError::MissingJwtSecret)?;
        let ttl = Duration::try_hours(config.auth.token_ttl_hours).ok_or_else(|| {
            ConfigError::InvalidValue {
                key: "token_ttl_hours",
                value: config.auth.token_ttl_hours.to_string(),
            }
        })?;
        let tokens = TokenService::new(secret, ttl)?;

        Ok(Self {
            db,
            config,
            tokens: Arc::new(tokens),
        })
    }
}
