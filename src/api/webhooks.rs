// src/api/webhooks.rs

use actix_web::{post, web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde_json::json;

use crate::error::{AppError, WebhookError};
use crate::workflow::{self, WebhookOutcome};
use crate::AppState;

const SIGNATURE_HEADER: &str = "Stripe-Signature";

async fn process(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok());

    match workflow::handle_webhook(&state, &body, signature, Utc::now().timestamp()).await {
        Ok(outcome) => {
            if let WebhookOutcome::Ignored(kind) = &outcome {
                log::debug!("webhook type not handled type={}", kind);
            }
            Ok(HttpResponse::Ok().json(json!({ "received": true })))
        }
        Err(WebhookError::Signature(e)) => {
            log::warn!("webhook rejected err={}", e);
            Err(AppError::BadRequest("Firma inválida".to_string()))
        }
        Err(WebhookError::Malformed(e)) => {
            log::warn!("webhook payload unreadable err={}", e);
            Err(AppError::BadRequest("Payload inválido".to_string()))
        }
        // Storage failures answer 500 so the processor redelivers.
        Err(WebhookError::Store(e)) => Err(e.into()),
    }
}

#[utoipa::path(
    post,
    path = "/api/pagos/webhook",
    tag = "webhooks",
    request_body(content_type = "application/json", description = "Signed processor event"),
    responses(
        (status = 200, description = "Event acknowledged"),
        (status = 400, description = "Invalid signature or payload"),
        (status = 500, description = "Storage error, redelivery expected")
    )
)]
#[post("/api/pagos/webhook")]
pub async fn stripe_webhook(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    process(req, body, state).await
}

#[utoipa::path(
    post,
    path = "/stripe-webhook",
    tag = "webhooks",
    request_body(content_type = "application/json", description = "Signed processor event"),
    responses(
        (status = 200, description = "Event acknowledged"),
        (status = 400, description = "Invalid signature or payload")
    )
)]
#[post("/stripe-webhook")]
pub async fn stripe_webhook_alias(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    process(req, body, state).await
}
