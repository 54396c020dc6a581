// src/workflow/payment.rs
//
// Credit purchases: hosted checkout creation and webhook reconciliation.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::billing::{self, Currency, Quote};
use crate::catalog;
use crate::error::{CheckoutError, StoreError, WebhookError};
use crate::models::{Account, NewTransaction, SettleOutcome, Settlement};
use crate::payments::{signature, CheckoutMetadata, CheckoutRequest, NewCustomer};
use crate::AppState;

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
pub const ASYNC_PAYMENT_SUCCEEDED: &str = "checkout.session.async_payment_succeeded";
pub const ASYNC_PAYMENT_FAILED: &str = "checkout.session.async_payment_failed";

#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub checkout_url: String,
    pub session_id: String,
    pub quote: Quote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Event type this service does not act on.
    Ignored(String),
    /// Checkout finished but the voucher is not paid yet.
    AwaitingPayment,
    Settled(SettleOutcome),
}

/// Returns a processor customer id valid in the current mode, creating one
/// when the account has none or the stored one is unknown to the processor.
async fn ensure_customer(state: &AppState, account: &Account) -> Result<String, CheckoutError> {
    if let Some(existing) = account.payment_customer_id.as_deref() {
        if state.payments.customer_exists(existing).await? {
            return Ok(existing.to_string());
        }
        log::warn!(
            "stored customer is not valid for this key, recreating account_id={} customer={}",
            account.id,
            existing
        );
    }

    let customer_id = state
        .payments
        .create_customer(&NewCustomer {
            account_id: account.id,
            email: account.email.clone(),
            name: account
                .display_name
                .clone()
                .unwrap_or_else(|| account.email.clone()),
        })
        .await?;
    state
        .store
        .set_payment_customer(account.id, &customer_id)
        .await?;
    Ok(customer_id)
}

/// Opens a hosted checkout for a credit package and records the pending
/// transaction under the returned session id.
pub async fn create_checkout(
    state: &AppState,
    account: &Account,
    package_id: &str,
    currency: Option<&str>,
) -> Result<CheckoutOutcome, CheckoutError> {
    let package = catalog::credit_package(package_id)
        .ok_or_else(|| CheckoutError::UnknownPackage(package_id.to_string()))?;
    let currency: Currency = currency.unwrap_or_default().parse()?;
    let quote = billing::quote(package, currency, state.config.mxn_usd_rate);

    let customer_id = ensure_customer(state, account).await?;

    let base = state.config.base_url.trim_end_matches('/');
    let session = state
        .payments
        .create_checkout_session(&CheckoutRequest {
            customer_id,
            currency,
            unit_amount: quote.unit_amount,
            product_name: package.name.to_string(),
            product_description: package.description.to_string(),
            success_url: format!("{base}/pago-exitoso?session_id={{CHECKOUT_SESSION_ID}}"),
            cancel_url: format!("{base}/creditos"),
            metadata: CheckoutMetadata {
                account_id: account.id,
                package_id: package.id.to_string(),
                credits: package.credits,
            },
        })
        .await?;

    state
        .store
        .create_transaction(NewTransaction {
            account_id: account.id,
            checkout_session_id: session.id.clone(),
            credits: package.credits,
            amount_mxn_cents: quote.amount_mxn_cents,
            amount_usd_cents: quote.amount_usd_cents,
            description: Some(format!("Compra: {}", package.name)),
        })
        .await?;

    log::info!(
        "checkout created account_id={} package={} currency={} session={}",
        account.id,
        package.id,
        currency,
        session.id
    );

    Ok(CheckoutOutcome {
        checkout_url: session.url,
        session_id: session.id,
        quote,
    })
}

#[derive(Debug, Deserialize)]
struct Event {
    #[serde(rename = "type")]
    kind: String,
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: Value,
}

#[derive(Debug, Deserialize)]
struct SessionObject {
    id: String,
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

impl SessionObject {
    /// Positive integer under `key`; anything else is treated as absent.
    fn metadata_int(&self, key: &str) -> Option<i32> {
        self.metadata
            .get(key)
            .and_then(|v| v.trim().parse().ok())
            .filter(|n| *n > 0)
    }
}

/// Account and credit quantity to apply, taken from the session metadata or,
/// when the metadata is incomplete, from the pending transaction itself.
async fn paid_settlement(
    state: &AppState,
    session: &SessionObject,
) -> Result<Option<Settlement>, StoreError> {
    if let (Some(account_id), Some(credits)) =
        (session.metadata_int("user_id"), session.metadata_int("creditos"))
    {
        return Ok(Some(Settlement::Paid {
            account_id,
            credits,
        }));
    }

    log::warn!("checkout session without usable metadata session={}", session.id);
    Ok(state
        .store
        .transaction_by_session(&session.id)
        .await?
        .map(|tx| Settlement::Paid {
            account_id: tx.account_id,
            credits: tx.credits,
        }))
}

async fn settle(
    state: &AppState,
    session: &SessionObject,
    settlement: Option<Settlement>,
) -> Result<WebhookOutcome, WebhookError> {
    let outcome = match settlement {
        Some(settlement) => {
            state
                .store
                .settle_transaction(&session.id, settlement)
                .await?
        }
        None => SettleOutcome::UnknownSession,
    };

    match &outcome {
        SettleOutcome::Applied(next) => {
            log::info!("transaction settled session={} state={}", session.id, next)
        }
        SettleOutcome::AlreadySettled(current) => log::info!(
            "duplicate webhook ignored session={} state={}",
            session.id,
            current
        ),
        SettleOutcome::UnknownSession => {
            log::warn!("webhook for unknown session={}", session.id)
        }
        SettleOutcome::AccountMissing => {
            log::error!("webhook for missing account session={}", session.id)
        }
    }
    Ok(WebhookOutcome::Settled(outcome))
}

/// Verifies and applies one processor webhook delivery.
///
/// Only a bad signature or an unreadable body is an error; every other case
/// (unknown session, duplicate delivery, unhandled type) is acknowledged.
pub async fn handle_webhook(
    state: &AppState,
    payload: &[u8],
    signature_header: Option<&str>,
    now: i64,
) -> Result<WebhookOutcome, WebhookError> {
    signature::verify(
        signature_header,
        payload,
        &state.config.stripe_webhook_secret,
        now,
        state.config.stripe_webhook_tolerance_secs,
    )?;

    let event: Event = serde_json::from_slice(payload)?;
    log::info!("webhook received type={}", event.kind);

    match event.kind.as_str() {
        CHECKOUT_COMPLETED => {
            let session: SessionObject = serde_json::from_value(event.data.object)?;
            if session.payment_status.as_deref() != Some("paid") {
                log::info!(
                    "checkout completed without payment session={} payment_status={:?}",
                    session.id,
                    session.payment_status
                );
                return Ok(WebhookOutcome::AwaitingPayment);
            }
            let settlement = paid_settlement(state, &session).await?;
            settle(state, &session, settlement).await
        }
        ASYNC_PAYMENT_SUCCEEDED => {
            let session: SessionObject = serde_json::from_value(event.data.object)?;
            let settlement = paid_settlement(state, &session).await?;
            settle(state, &session, settlement).await
        }
        ASYNC_PAYMENT_FAILED => {
            let session: SessionObject = serde_json::from_value(event.data.object)?;
            settle(state, &session, Some(Settlement::Failed)).await
        }
        other => Ok(WebhookOutcome::Ignored(other.to_string())),
    }
}

