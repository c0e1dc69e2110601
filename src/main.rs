//! Banco API server
//!
//! Serves the banking endpoints over HTTP. Demo users and accounts are
//! seeded at startup; the transaction ledger lives in memory unless
//! `BANCO_LEDGER_DB` points at a sqlite database.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=info cargo run
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: set to `debug` or `warn` to control logging verbosity
//! - `BANCO_BIND_ADDR`, `BANCO_JWT_SECRET`, `BANCO_TOKEN_TTL_MINUTES`,
//!   `BANCO_LEDGER_DB`: see [`banco_api::config`]

use actix_web::{web, App, HttpServer};
use banco_api::api::{self, AppState};
use banco_api::config::Config;
use banco_api::{
    Account, AccountStore, AuthGate, Bank, Ledger, MemoryCredentials, MemoryLedger, Money,
    SqliteLedger,
};
use log::info;
use rust_decimal::Decimal;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let config = Config::from_env();

    let ledger: Arc<dyn Ledger> = match &config.ledger_path {
        Some(path) => {
            info!("using sqlite ledger at {}", path.display());
            let ledger = SqliteLedger::open(path)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
            Arc::new(ledger)
        }
        None => {
            info!("using in-memory ledger");
            Arc::new(MemoryLedger::new())
        }
    };

    let store = AccountStore::new();
    store.insert(Account::new(1, "usuario1", Money::new(Decimal::new(100050, 2))));
    store.insert(Account::new(2, "usuario2", Money::new(Decimal::new(500000, 2))));

    let credentials = MemoryCredentials::new()
        .with_user("usuario1", "senha123")
        .with_user("usuario2", "senha456");
    let auth = AuthGate::new(
        &config.jwt_secret,
        config.token_ttl_minutes,
        Arc::new(credentials),
    );

    let state = web::Data::new(AppState {
        bank: Bank::new(store, ledger),
        auth,
    });

    info!("listening on {}", config.bind_addr);
    HttpServer::new(move || App::new().app_data(state.clone()).configure(api::configure))
        .bind(&config.bind_addr)?
        .run()
        .await
}
