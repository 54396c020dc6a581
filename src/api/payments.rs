// src/api/payments.rs

use actix_web::{get, post, web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use super::auth::JwtMiddleware;
use super::current_account;
use crate::catalog::{self, CreditPackage};
use crate::error::AppError;
use crate::models::Transaction;
use crate::workflow;
use crate::AppState;

const HISTORY_LIMIT: i64 = 50;

#[derive(Debug, Serialize, ToSchema)]
pub struct PackageView {
    pub id: &'static str,
    pub creditos: i32,
    /// Pesos.
    pub precio_mxn: f64,
    pub precio_mxn_centavos: i64,
    pub nombre: &'static str,
    pub descripcion: &'static str,
    pub popular: bool,
    pub mejor_valor: bool,
}

impl From<&CreditPackage> for PackageView {
    fn from(p: &CreditPackage) -> Self {
        Self {
            id: p.id,
            creditos: p.credits,
            precio_mxn: p.price_mxn_cents as f64 / 100.0,
            precio_mxn_centavos: p.price_mxn_cents,
            nombre: p.name,
            descripcion: p.description,
            popular: p.popular,
            mejor_valor: p.best_value,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutBody {
    pub paquete_id: String,
    /// `mxn` (default) or `usd`.
    pub moneda: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub checkout_url: String,
    pub session_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionView {
    pub id: i32,
    pub creditos: i32,
    pub monto_mxn: f64,
    pub monto_usd: Option<f64>,
    pub estado: String,
    pub descripcion: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Transaction> for TransactionView {
    fn from(t: Transaction) -> Self {
        Self {
            id: t.id,
            creditos: t.credits,
            monto_mxn: t.amount_mxn_cents as f64 / 100.0,
            monto_usd: t.amount_usd_cents.map(|c| c as f64 / 100.0),
            estado: t.state.to_string(),
            descripcion: t.description,
            created_at: t.created_at,
            completed_at: t.completed_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/pagos/paquetes",
    tag = "pagos",
    responses((status = 200, description = "Credit packages", body = [PackageView]))
)]
#[get("/api/pagos/paquetes")]
pub async fn list_packages() -> HttpResponse {
    let packages: Vec<PackageView> = catalog::CREDIT_PACKAGES.iter().map(Into::into).collect();
    HttpResponse::Ok().json(packages)
}

#[utoipa::path(
    post,
    path = "/api/pagos/checkout",
    tag = "pagos",
    request_body = CheckoutBody,
    responses(
        (status = 200, description = "Hosted checkout created", body = CheckoutResponse),
        (status = 400, description = "Unknown package or currency"),
        (status = 500, description = "Payment processor error")
    ),
    security(("bearer" = []))
)]
#[post("/api/pagos/checkout", wrap = "JwtMiddleware")]
pub async fn checkout(
    state: web::Data<AppState>,
    account_id: web::ReqData<i32>,
    payload: web::Json<CheckoutBody>,
) -> Result<HttpResponse, AppError> {
    let account = current_account(&state, *account_id).await?;
    let outcome = workflow::create_checkout(
        &state,
        &account,
        &payload.paquete_id,
        payload.moneda.as_deref(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(CheckoutResponse {
        checkout_url: outcome.checkout_url,
        session_id: outcome.session_id,
    }))
}

#[utoipa::path(
    get,
    path = "/api/pagos/historial",
    tag = "pagos",
    responses((status = 200, description = "Latest transactions", body = [TransactionView])),
    security(("bearer" = []))
)]
#[get("/api/pagos/historial", wrap = "JwtMiddleware")]
pub async fn history(
    state: web::Data<AppState>,
    account_id: web::ReqData<i32>,
) -> Result<HttpResponse, AppError> {
    let account = current_account(&state, *account_id).await?;
    let transactions: Vec<TransactionView> = state
        .store
        .list_transactions(account.id, HISTORY_LIMIT)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(HttpResponse::Ok().json(transactions))
}

#[utoipa::path(
    get,
    path = "/api/pagos/creditos",
    tag = "pagos",
    responses((status = 200, description = "Credit balance")),
    security(("bearer" = []))
)]
#[get("/api/pagos/creditos", wrap = "JwtMiddleware")]
pub async fn credits(
    state: web::Data<AppState>,
    account_id: web::ReqData<i32>,
) -> Result<HttpResponse, AppError> {
    let account = current_account(&state, *account_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "creditos": account.credits_available,
        "creditos_usados": account.credits_used,
        "total_comprados": account.credits_available + account.credits_used,
    })))
}
