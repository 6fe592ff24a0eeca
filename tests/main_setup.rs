use club_blog::{AppConfig, config::Env};
use std::{
    env, panic,
    sync::{Mutex, MutexGuard},
};

// --- Setup/Teardown Utilities ---

// Process environment is shared mutable state; serialize every test touching it.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn env_guard() -> MutexGuard<'static, ()> {
    // A panicking test poisons the lock, but the environment is still restored.
    ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Utility to run a test function and restore environment variables afterward
fn run_with_env<T, R>(test: T, cleanup_vars: Vec<&'static str>) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    let _guard = env_guard();

    // Save current environment variables
    let originals: Vec<(String, Option<String>)> = cleanup_vars
        .iter()
        .map(|&var| (var.to_string(), env::var(var).ok()))
        .collect();

    // Run the test
    let result = panic::catch_unwind(test);

    // Restore original environment variables
    for (key, original_value) in originals.into_iter().rev() {
        unsafe {
            if let Some(val) = original_value {
                env::set_var(&key, val);
            } else {
                env::remove_var(&key);
            }
        }
    }

    // Re-panic if the test failed
    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

// --- Tests ---

#[test]
fn test_app_config_production_fails_fast_without_secret_key() {
    let result = run_with_env(
        || {
            panic::catch_unwind(|| {
                unsafe {
                    env::set_var("APP_ENV", "production");
                    env::set_var("DATABASE_URL", "sqlite:prod.db");
                    env::remove_var("SECRET_KEY");
                }
                AppConfig::load()
            })
        },
        vec!["APP_ENV", "DATABASE_URL", "SECRET_KEY"],
    );

    assert!(
        result.is_err(),
        "Production config loading should panic on a missing SECRET_KEY"
    );
}

#[test]
fn test_app_config_production_fails_fast_without_database_url() {
    let result = run_with_env(
        || {
            panic::catch_unwind(|| {
                unsafe {
                    env::set_var("APP_ENV", "production");
                    env::set_var("SECRET_KEY", "explicit-production-secret");
                    env::remove_var("DATABASE_URL");
                }
                AppConfig::load()
            })
        },
        vec!["APP_ENV", "DATABASE_URL", "SECRET_KEY"],
    );

    assert!(
        result.is_err(),
        "Production config loading should panic on a missing DATABASE_URL"
    );
}

#[test]
fn test_app_config_local_env_defaults() {
    // Local mode should not panic, and should use hardcoded fallbacks
    let config = run_with_env(
        || {
            unsafe {
                env::set_var("APP_ENV", "local");
                env::remove_var("DATABASE_URL");
                env::remove_var("SECRET_KEY");
            }
            AppConfig::load()
        },
        vec!["APP_ENV", "DATABASE_URL", "SECRET_KEY"],
    );

    assert_eq!(config.env, Env::Local);
    // The on-disk SQLite fallback, created on demand.
    assert_eq!(config.database_url, "sqlite:blog.db?mode=rwc");
    // The development signing secret fallback.
    assert_eq!(config.secret_key, "insecure-local-development-secret");
}

#[test]
fn test_app_config_local_honors_explicit_values() {
    let config = run_with_env(
        || {
            unsafe {
                env::set_var("APP_ENV", "local");
                env::set_var("DATABASE_URL", "sqlite:custom.db");
                env::set_var("SECRET_KEY", "my-own-secret");
            }
            AppConfig::load()
        },
        vec!["APP_ENV", "DATABASE_URL", "SECRET_KEY"],
    );

    assert_eq!(config.database_url, "sqlite:custom.db");
    assert_eq!(config.secret_key, "my-own-secret");
}
