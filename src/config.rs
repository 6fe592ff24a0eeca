use std::env;

/// AppConfig
///
/// Holds the application's entire configuration state. This struct is designed to be
/// immutable once loaded, ensuring consistency across all threads and services (e.g.,
/// Repository, Renderer). It is pulled into the application state via FromRef,
/// embodying the "immutable AppConfig" part of the Unified State Pattern.
#[derive(Clone)]
pub struct AppConfig {
    // Database connection string (SQLite).
    pub database_url: String,
    // Secret used to sign and verify the session token carried in the session cookie.
    pub secret_key: String,
    // Runtime environment marker. Controls logging format and fail-fast behavior.
    pub env: Env,
}

/// Env
///
/// Defines the runtime context, used to switch between development conveniences
/// (on-disk SQLite fallback, dev signing secret) and hardened production settings
/// (all secrets explicitly provided).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// default
    ///
    /// Provides a safe, non-panicking AppConfig instance primarily used for test setup.
    /// This allows us to instantiate the configuration without needing to set environment
    /// variables for lightweight unit or integration testing state scaffolding.
    fn default() -> Self {
        Self {
            // In-memory store so tests never touch the filesystem.
            database_url: "sqlite::memory:".to_string(),
            secret_key: "insecure-local-development-secret".to_string(),
            env: Env::Local,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// The canonical function for initializing the application configuration at startup.
    /// It reads all parameters from environment variables and implements the **fail-fast**
    /// principle.
    ///
    /// # Panics
    /// Panics if a critical environment variable required for the current runtime
    /// environment (especially Production) is not found. This prevents the application
    /// from starting with an incomplete or insecure configuration.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        // Session Signing Secret Resolution
        // The production secret is mandatory and must be explicitly set: every session
        // cookie in circulation is only as trustworthy as this value.
        let secret_key = match env {
            Env::Production => {
                env::var("SECRET_KEY").expect("FATAL: SECRET_KEY must be set in production.")
            }
            // In local, we provide a fallback, though the developer should ideally set one.
            _ => env::var("SECRET_KEY")
                .unwrap_or_else(|_| "insecure-local-development-secret".to_string()),
        };

        match env {
            Env::Local => Self {
                env: Env::Local,
                // Local development falls back to an on-disk SQLite file, created on demand.
                database_url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:blog.db?mode=rwc".to_string()),
                secret_key,
            },
            Env::Production => Self {
                env: Env::Production,
                // Production demands an explicit database location.
                database_url: env::var("DATABASE_URL")
                    .expect("FATAL: DATABASE_URL required in production"),
                secret_key,
            },
        }
    }
}
