// src/payments/stripe.rs
//
// Minimal Stripe REST client: customers and hosted checkout sessions.
// Auth: bearer secret key, form-encoded bodies.

use async_trait::async_trait;
use serde::Deserialize;

use super::{CheckoutRequest, CheckoutSession, NewCustomer, PaymentProcessor};
use crate::config::Config;
use crate::error::PaymentError;

#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct CustomerResponse {
    id: String,
    #[serde(default)]
    deleted: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
}

/// Stripe reports unknown ids as `resource_missing`, not always with a 404.
fn is_resource_missing(body: &str) -> bool {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.code.as_deref() == Some("resource_missing"))
        .unwrap_or(false)
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

impl StripeClient {
    pub fn new(secret_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key: secret_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.stripe_secret_key, &config.stripe_api_base)
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, PaymentError> {
        let resp = self
            .http
            .post(format!("{}{path}", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(PaymentError::Api {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str::<T>(&body)
            .map_err(|e| PaymentError::InvalidResponse(format!("{e}; body={body}")))
    }
}

fn field(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}

/// Form fields of a one-item checkout session.
pub(crate) fn checkout_form(req: &CheckoutRequest) -> Vec<(String, String)> {
    let item = "line_items[0]";
    let mut form = vec![
        field("customer", &req.customer_id),
        field("mode", "payment"),
        field("locale", req.currency.locale()),
        field("success_url", &req.success_url),
        field("cancel_url", &req.cancel_url),
        field(&format!("{item}[quantity]"), 1),
        field(&format!("{item}[price_data][currency]"), req.currency.code()),
        field(&format!("{item}[price_data][unit_amount]"), req.unit_amount),
        field(
            &format!("{item}[price_data][product_data][name]"),
            &req.product_name,
        ),
        field(
            &format!("{item}[price_data][product_data][description]"),
            &req.product_description,
        ),
        field("payment_method_types[0]", "card"),
        field("metadata[user_id]", req.metadata.account_id),
        field("metadata[paquete_id]", &req.metadata.package_id),
        field("metadata[creditos]", req.metadata.credits),
    ];

    if req.currency.accepts_voucher() {
        form.push(field("payment_method_types[1]", "oxxo"));
        form.push(field("payment_method_options[oxxo][expires_after_days]", 3));
    }
    form
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    async fn customer_exists(&self, customer_id: &str) -> Result<bool, PaymentError> {
        let resp = self
            .http
            .get(format!("{}/v1/customers/{customer_id}", self.api_base))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        // Customers from the other mode (test vs live) come back as 404.
        if status.as_u16() == 404 || (!status.is_success() && is_resource_missing(&body)) {
            log::info!("stripe customer {} not found status={}", customer_id, status);
            return Ok(false);
        }
        if !status.is_success() {
            return Err(PaymentError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let customer: CustomerResponse = serde_json::from_str(&body)
            .map_err(|e| PaymentError::InvalidResponse(format!("{e}; body={body}")))?;
        Ok(!customer.deleted)
    }

    async fn create_customer(&self, customer: &NewCustomer) -> Result<String, PaymentError> {
        let form = vec![
            field("email", &customer.email),
            field("name", &customer.name),
            field("metadata[user_id]", customer.account_id),
        ];
        let created: CustomerResponse = self.post_form("/v1/customers", &form).await?;
        Ok(created.id)
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let session: SessionResponse = self
            .post_form("/v1/checkout/sessions", &checkout_form(request))
            .await?;

        let url = session.url.ok_or_else(|| {
            PaymentError::InvalidResponse(format!("session {} has no url", session.id))
        })?;
        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::Currency;
    use crate::payments::CheckoutMetadata;
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;
    use serde_json::json;

    fn request(currency: Currency) -> CheckoutRequest {
        CheckoutRequest {
            customer_id: "cus_1".into(),
            currency,
            unit_amount: 15_000,
            product_name: "10 Créditos".into(),
            product_description: "Paquete básico - 10 generaciones".into(),
            success_url: "http://localhost/pago-exitoso?session_id={CHECKOUT_SESSION_ID}".into(),
            cancel_url: "http://localhost/creditos".into(),
            metadata: CheckoutMetadata {
                account_id: 5,
                package_id: "pack_10".into(),
                credits: 10,
            },
        }
    }

    fn value<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn mxn_checkout_offers_voucher() {
        let form = checkout_form(&request(Currency::Mxn));
        assert_eq!(value(&form, "locale"), Some("es-419"));
        assert_eq!(value(&form, "payment_method_types[1]"), Some("oxxo"));
        assert_eq!(
            value(&form, "payment_method_options[oxxo][expires_after_days]"),
            Some("3")
        );
        assert_eq!(value(&form, "metadata[creditos]"), Some("10"));
        assert_eq!(value(&form, "metadata[user_id]"), Some("5"));
    }

    #[test]
    fn usd_checkout_is_card_only() {
        let form = checkout_form(&request(Currency::Usd));
        assert_eq!(value(&form, "locale"), Some("en"));
        assert_eq!(value(&form, "line_items[0][price_data][currency]"), Some("usd"));
        assert_eq!(value(&form, "payment_method_types[1]"), None);
    }

    #[tokio::test]
    async fn missing_customer_is_not_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/customers/cus_live");
                then.status(404)
                    .json_body(json!({"error": {"code": "resource_missing"}}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/customers/cus_gone");
                then.status(200).json_body(json!({"id": "cus_gone", "deleted": true}));
            })
            .await;

        let client = StripeClient::new("sk_test", server.base_url());
        assert!(!client.customer_exists("cus_live").await.unwrap());
        assert!(!client.customer_exists("cus_gone").await.unwrap());
    }

    #[tokio::test]
    async fn resource_missing_counts_as_absent_whatever_the_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/customers/cus_other_mode");
                then.status(400).json_body(json!({
                    "error": { "code": "resource_missing", "message": "No such customer" }
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/customers/cus_1");
                then.status(500)
                    .json_body(json!({"error": {"type": "api_error"}}));
            })
            .await;

        let client = StripeClient::new("sk_test", server.base_url());
        assert!(!client.customer_exists("cus_other_mode").await.unwrap());
        assert!(matches!(
            client.customer_exists("cus_1").await,
            Err(PaymentError::Api { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn creates_session_with_form_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/checkout/sessions")
                    .header("Authorization", "Bearer sk_test")
                    .body_contains("mode=payment");
                then.status(200).json_body(json!({
                    "id": "cs_test_1",
                    "url": "https://checkout.stripe.com/c/pay/cs_test_1"
                }));
            })
            .await;

        let client = StripeClient::new("sk_test", server.base_url());
        let session = client
            .create_checkout_session(&request(Currency::Mxn))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(session.id, "cs_test_1");
        assert!(session.url.ends_with("cs_test_1"));
    }
}
