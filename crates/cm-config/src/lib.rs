//! # cm-config
//!
//! Runtime settings for the commune binaries, loaded from the environment
//! (with `.env` support for local development). Prefix: `COMMUNE_`.

use anyhow::Context;
use secrecy::SecretString;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Socket address the server binds, e.g. "127.0.0.1:8080".
    pub bind_addr: String,
    /// sqlx connection string, e.g. "sqlite:commune.db".
    pub database_url: String,
    /// Key for signing session tokens. Rotating it logs everyone out.
    pub session_secret: SecretString,
}

impl Settings {
    /// Reads `COMMUNE_BIND_ADDR`, `COMMUNE_DATABASE_URL`,
    /// `COMMUNE_SESSION_SECRET`, falling back to local-dev defaults for
    /// everything but the secret.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .set_default("bind_addr", "127.0.0.1:8080")?
            .set_default("database_url", "sqlite:commune.db?mode=rwc")?
            .add_source(config::Environment::with_prefix("COMMUNE"))
            .build()
            .context("assembling configuration")?;

        settings
            .try_deserialize()
            .context("invalid configuration; is COMMUNE_SESSION_SECRET set?")
    }
}
