//! Integration tests for the sqlite-backed ledger variant.
//!
//! Runs the HTTP application against a `SqliteLedger` in a temporary
//! directory and verifies that entries survive a reopen of the database.

use actix_web::{test, web, App};
use banco_api::api::{self, AppState};
use banco_api::{
    Account, AccountStore, AuthGate, Bank, Ledger, MemoryCredentials, Money, SqliteLedger,
};
use serde_json::{json, Value};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

fn money(s: &str) -> Money {
    Money::from_str(s).unwrap()
}

fn app_state(db_path: &Path) -> web::Data<AppState> {
    let store = AccountStore::new();
    store.insert(Account::new(1, "usuario1", money("1000.50")));
    store.insert(Account::new(2, "usuario2", money("5000.00")));

    let credentials = MemoryCredentials::new().with_user("usuario1", "senha123");
    let ledger = SqliteLedger::open(db_path).unwrap();

    web::Data::new(AppState {
        bank: Bank::new(store, Arc::new(ledger)),
        auth: AuthGate::new("chave_de_teste", 30, Arc::new(credentials)),
    })
}

#[actix_web::test]
async fn test_operations_persist_to_the_sqlite_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("transacoes.db");

    {
        let app =
            test::init_service(App::new().app_data(app_state(&db_path)).configure(api::configure))
                .await;

        let req = test::TestRequest::post()
            .uri("/login")
            .set_json(json!({ "username": "usuario1", "password": "senha123" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let body: Value = test::read_body_json(resp).await;
        let token = body["access_token"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri("/deposito")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .set_json(json!({ "valor": "250.00" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);

        let req = test::TestRequest::post()
            .uri("/transferencia")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .set_json(json!({ "usuario_destino": 2, "valor": "100.00" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);

        let req = test::TestRequest::get().uri("/transacoes").to_request();
        let resp = test::call_service(&app, req).await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["transacoes"].as_array().unwrap().len(), 3);
    }

    // The application is gone; the history must still be on disk.
    let reopened = SqliteLedger::open(&db_path).unwrap();
    let all = reopened.list_all().unwrap();
    assert_eq!(all.len(), 3);

    let for_one = reopened.list_for(1).unwrap();
    assert_eq!(for_one.len(), 2);
    assert_eq!(for_one[0].amount.to_string(), "250.00");
    assert_eq!(for_one[1].counterparty, Some(2));

    let for_two = reopened.list_for(2).unwrap();
    assert_eq!(for_two.len(), 1);
    assert_eq!(for_two[0].counterparty, Some(1));
}
