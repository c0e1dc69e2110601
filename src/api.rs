//! HTTP surface: endpoint handlers and error payloads.
//!
//! Keeps the banking core free of transport concerns by translating
//! [`BankError`] into responses here. Errors surface as
//! `{"erro": <message>}` with the status mapping: 400 for bad input and
//! insufficient funds, 404 for unknown accounts, 401 for auth failures,
//! 500 for storage failures.

use crate::account::AccountId;
use crate::auth::AuthGate;
use crate::bank::Bank;
use crate::error::BankError;
use crate::money::Money;
use actix_web::dev::Payload;
use actix_web::http::{header, StatusCode};
use actix_web::{get, post, web, FromRequest, HttpRequest, HttpResponse, ResponseError};
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::future::{ready, Ready};

/// Shared application state handed to every handler.
pub struct AppState {
    /// The banking engine.
    pub bank: Bank,
    /// Token issuer/verifier.
    pub auth: AuthGate,
}

/// A domain error crossing the HTTP boundary.
#[derive(Debug)]
pub struct ApiError(BankError);

impl From<BankError> for ApiError {
    fn from(err: BankError) -> Self {
        ApiError(err)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            BankError::NotFound(_) | BankError::UserNotFound(_) => StatusCode::NOT_FOUND,
            BankError::InvalidAmount
            | BankError::InsufficientFunds { .. }
            | BankError::Validation(_) => StatusCode::BAD_REQUEST,
            BankError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            BankError::Storage(_) | BankError::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Internal failures are redacted; the detail goes to the log only.
        let message = if self.status_code() == StatusCode::INTERNAL_SERVER_ERROR {
            error!("internal error: {}", self.0);
            "internal server error".to_string()
        } else {
            self.0.to_string()
        };
        HttpResponse::build(self.status_code()).json(json!({ "erro": message }))
    }
}

/// Convenience alias for HTTP handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// The authenticated caller, extracted from the `Authorization` header.
///
/// Mutating endpoints take this as an argument; extraction fails with 401
/// when the bearer token is missing, malformed, or expired.
pub struct AuthUser {
    /// Username the token was issued to.
    pub username: String,
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<std::result::Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> std::result::Result<AuthUser, ApiError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| BankError::Unauthorized("authentication unavailable".to_string()))?;

    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| BankError::Unauthorized("missing bearer token".to_string()))?;

    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| BankError::Unauthorized("malformed authorization header".to_string()))?;

    let username = state.auth.verify(token)?;
    Ok(AuthUser { username })
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    access_token: String,
    token_type: &'static str,
}

#[derive(Debug, Serialize)]
struct AccountSummary {
    usuario_id: AccountId,
    saldo: Money,
}

#[derive(Debug, Deserialize)]
struct AmountRequest {
    valor: Money,
}

#[derive(Debug, Deserialize)]
struct TransferRequest {
    usuario_destino: AccountId,
    valor: Money,
}

#[derive(Debug, Deserialize)]
struct CreateTransactionRequest {
    tipo: String,
    valor: Money,
    usuario_id: AccountId,
}

/// Authenticates a user and returns a bearer token.
#[post("/login")]
async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let token = state.auth.login(&body.username, &body.password)?;
    Ok(HttpResponse::Ok().json(TokenResponse {
        access_token: token,
        token_type: "bearer",
    }))
}

/// Lists every account with its balance.
#[get("/contas")]
async fn list_accounts(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let contas: Vec<AccountSummary> = state
        .bank
        .store()
        .list_accounts()
        .into_iter()
        .map(|(usuario_id, saldo)| AccountSummary { usuario_id, saldo })
        .collect();
    Ok(HttpResponse::Ok().json(contas))
}

/// Returns one account's balance.
#[get("/saldo/{usuario_id}")]
async fn balance(
    state: web::Data<AppState>,
    path: web::Path<AccountId>,
) -> ApiResult<HttpResponse> {
    let usuario_id = path.into_inner();
    let saldo = state.bank.store().get_balance(usuario_id)?;
    Ok(HttpResponse::Ok().json(AccountSummary { usuario_id, saldo }))
}

/// Deposits into the caller's account.
#[post("/deposito")]
async fn deposit(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<AmountRequest>,
) -> ApiResult<HttpResponse> {
    let account = state.bank.store().account_of(&user.username)?;
    let entry = state.bank.deposit(account, body.valor)?;
    Ok(HttpResponse::Ok().json(json!({
        "mensagem": format!("Depósito de {} realizado com sucesso.", entry.amount),
        "transacao": entry,
    })))
}

/// Withdraws from the caller's account.
#[post("/retirada")]
async fn withdraw(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<AmountRequest>,
) -> ApiResult<HttpResponse> {
    let account = state.bank.store().account_of(&user.username)?;
    let entry = state.bank.withdraw(account, body.valor)?;
    Ok(HttpResponse::Ok().json(json!({
        "mensagem": format!("Retirada de {} realizada com sucesso.", entry.amount),
        "transacao": entry,
    })))
}

/// Transfers from the caller's account to another.
#[post("/transferencia")]
async fn transfer(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<TransferRequest>,
) -> ApiResult<HttpResponse> {
    let origem = state.bank.store().account_of(&user.username)?;
    let (sent, _received) = state
        .bank
        .transfer(origem, body.usuario_destino, body.valor)?;
    Ok(HttpResponse::Ok().json(json!({
        "mensagem": format!("Transferência de {} realizada com sucesso!", sent.amount),
    })))
}

/// Creates a transaction for a named account by dispatching to the deposit
/// or withdrawal operation. A ledger entry only ever exists as the side
/// effect of an operation; there is no bare append.
#[post("/transacoes")]
async fn create_transaction(
    state: web::Data<AppState>,
    _user: AuthUser,
    body: web::Json<CreateTransactionRequest>,
) -> ApiResult<HttpResponse> {
    let entry = match body.tipo.as_str() {
        "deposito" => state.bank.deposit(body.usuario_id, body.valor)?,
        "retirada" => state.bank.withdraw(body.usuario_id, body.valor)?,
        other => {
            return Err(BankError::Validation(format!(
                "unknown transaction kind {}",
                other
            ))
            .into())
        }
    };
    Ok(HttpResponse::Ok().json(json!({
        "mensagem": "Transação criada com sucesso!",
        "transacao": entry,
    })))
}

/// Lists every ledger entry.
#[get("/transacoes")]
async fn list_transactions(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let transacoes = state.bank.transactions()?;
    Ok(HttpResponse::Ok().json(json!({
        "mensagem": "Todas as transações",
        "transacoes": transacoes,
    })))
}

/// Lists one account's ledger entries.
#[get("/transacoes/{usuario_id}")]
async fn list_account_transactions(
    state: web::Data<AppState>,
    path: web::Path<AccountId>,
) -> ApiResult<HttpResponse> {
    let usuario_id = path.into_inner();
    let transacoes = state.bank.transactions_for(usuario_id)?;
    Ok(HttpResponse::Ok().json(json!({
        "mensagem": format!("Transações do usuário {}", usuario_id),
        "transacoes": transacoes,
    })))
}

/// Returns the caller's statement: current balance plus full history.
#[get("/extrato")]
async fn statement(state: web::Data<AppState>, user: AuthUser) -> ApiResult<HttpResponse> {
    let account = state.bank.store().account_of(&user.username)?;
    let (saldo_atual, extrato) = state.bank.statement(account)?;
    Ok(HttpResponse::Ok().json(json!({
        "usuario": user.username,
        "saldo_atual": saldo_atual,
        "extrato": extrato,
    })))
}

/// Registers every endpoint and the JSON body error handler.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        ApiError::from(BankError::Validation(err.to_string())).into()
    }))
    .service(login)
    .service(list_accounts)
    .service(balance)
    .service(deposit)
    .service(withdraw)
    .service(transfer)
    .service(create_transaction)
    .service(list_transactions)
    .service(list_account_transactions)
    .service(statement);
}
