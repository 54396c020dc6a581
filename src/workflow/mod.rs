// src/workflow/mod.rs
//
// Credit-metered generation workflows and the payment workflow. Handlers
// parse and authenticate; everything that touches the ledger lives here.

pub mod image;
pub mod music;
pub mod payment;

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;

use crate::error::StageError;
use crate::models::Balance;
use crate::AppState;

pub use image::{generate_image, ImageOutcome, ImageRequest, ALLOWED_IMAGE_TYPES};
pub use music::{generate_music, MusicOutcome, MusicRequest};
pub use payment::{create_checkout, handle_webhook, CheckoutOutcome, WebhookOutcome};

/// Runs a generation stage, turning a panic inside it into
/// [`StageError::Panicked`] so the caller's compensation still runs.
pub(crate) async fn run_stage<T, F>(stage: F) -> Result<T, StageError>
where
    F: Future<Output = Result<T, StageError>>,
{
    match AssertUnwindSafe(stage).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(StageError::Panicked(panic_message(panic))),
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Gives back the credit reserved for a failed generation. Returns the
/// balance to report; `reserved` is used when the refund itself fails.
pub(crate) async fn refund(state: &AppState, account_id: i32, reserved: Balance) -> i32 {
    match state.store.refund_credit(account_id).await {
        Ok(balance) => balance.credits_available,
        Err(e) => {
            log::error!("credit refund failed account_id={} err={}", account_id, e);
            reserved.credits_available
        }
    }
}

pub(crate) fn elapsed_ms(started: std::time::Instant) -> i32 {
    i32::try_from(started.elapsed().as_millis()).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn explode() -> Result<(), StageError> {
        panic!("boom")
    }

    #[tokio::test]
    async fn panics_become_stage_errors() {
        let result = run_stage(async { explode() }).await;
        assert!(matches!(result, Err(StageError::Panicked(m)) if m == "boom"));
    }

    #[tokio::test]
    async fn errors_pass_through() {
        let result: Result<i32, StageError> =
            run_stage(async { Err(StageError::Generation("no image".into())) }).await;
        assert!(matches!(result, Err(StageError::Generation(m)) if m == "no image"));

        let ok = run_stage(async { Ok::<_, StageError>(3) }).await.unwrap();
        assert_eq!(ok, 3);
    }
}
