//! Process configuration.
//!
//! All settings come from environment variables with sensible defaults, so
//! the server runs with no arguments:
//!
//! - `BANCO_BIND_ADDR`: listen address, default `127.0.0.1:8080`
//! - `BANCO_JWT_SECRET`: token signing secret
//! - `BANCO_TOKEN_TTL_MINUTES`: token validity window, default 30
//! - `BANCO_LEDGER_DB`: sqlite ledger path; unset keeps the ledger in memory
//! - `RUST_LOG`: logging verbosity (`env_logger`)

use log::warn;
use std::env;
use std::path::PathBuf;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;

// Development-only fallback; a deployment must override it.
const DEFAULT_JWT_SECRET: &str = "super_secret_key";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind_addr: String,

    /// Secret used to sign and verify session tokens.
    pub jwt_secret: String,

    /// How long an issued token stays valid.
    pub token_ttl_minutes: i64,

    /// Sqlite ledger database path. `None` keeps the ledger in memory.
    pub ledger_path: Option<PathBuf>,
}

impl Config {
    /// Reads the configuration from the environment.
    pub fn from_env() -> Self {
        let bind_addr =
            env::var("BANCO_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        let jwt_secret = env::var("BANCO_JWT_SECRET").unwrap_or_else(|_| {
            warn!("BANCO_JWT_SECRET not set, using the development secret");
            DEFAULT_JWT_SECRET.to_string()
        });

        let token_ttl_minutes = match env::var("BANCO_TOKEN_TTL_MINUTES") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(
                    "invalid BANCO_TOKEN_TTL_MINUTES {:?}, using {}",
                    raw, DEFAULT_TOKEN_TTL_MINUTES
                );
                DEFAULT_TOKEN_TTL_MINUTES
            }),
            Err(_) => DEFAULT_TOKEN_TTL_MINUTES,
        };

        let ledger_path = env::var_os("BANCO_LEDGER_DB").map(PathBuf::from);

        Config {
            bind_addr,
            jwt_secret,
            token_ttl_minutes,
            ledger_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test covers defaults and overrides to avoid racing on the
    // process environment.
    #[test]
    fn test_from_env_defaults_and_overrides() {
        env::remove_var("BANCO_BIND_ADDR");
        env::remove_var("BANCO_JWT_SECRET");
        env::remove_var("BANCO_TOKEN_TTL_MINUTES");
        env::remove_var("BANCO_LEDGER_DB");

        let config = Config::from_env();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.jwt_secret, DEFAULT_JWT_SECRET);
        assert_eq!(config.token_ttl_minutes, DEFAULT_TOKEN_TTL_MINUTES);
        assert!(config.ledger_path.is_none());

        env::set_var("BANCO_BIND_ADDR", "0.0.0.0:9000");
        env::set_var("BANCO_JWT_SECRET", "segredo");
        env::set_var("BANCO_TOKEN_TTL_MINUTES", "5");
        env::set_var("BANCO_LEDGER_DB", "/tmp/ledger.db");

        let config = Config::from_env();
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.jwt_secret, "segredo");
        assert_eq!(config.token_ttl_minutes, 5);
        assert_eq!(config.ledger_path, Some(PathBuf::from("/tmp/ledger.db")));

        env::set_var("BANCO_TOKEN_TTL_MINUTES", "nao_numero");
        let config = Config::from_env();
        assert_eq!(config.token_ttl_minutes, DEFAULT_TOKEN_TTL_MINUTES);

        env::remove_var("BANCO_BIND_ADDR");
        env::remove_var("BANCO_JWT_SECRET");
        env::remove_var("BANCO_TOKEN_TTL_MINUTES");
        env::remove_var("BANCO_LEDGER_DB");
    }
}
