// src/payments/mod.rs

pub mod signature;
pub mod stripe;

use async_trait::async_trait;

use crate::billing::Currency;
use crate::error::PaymentError;

pub use stripe::StripeClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub account_id: i32,
    pub email: String,
    pub name: String,
}

/// Metadata embedded in the checkout session and echoed back by webhooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutMetadata {
    pub account_id: i32,
    pub package_id: String,
    pub credits: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub customer_id: String,
    pub currency: Currency,
    pub unit_amount: i64,
    pub product_name: String,
    pub product_description: String,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: CheckoutMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Hosted-checkout payment processor.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// `false` when the customer is unknown or deleted in the current mode.
    async fn customer_exists(&self, customer_id: &str) -> Result<bool, PaymentError>;
    async fn create_customer(&self, customer: &NewCustomer) -> Result<String, PaymentError>;
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;
}
