//! Payment submission.
//!
//! Card payments go through a payment-intent backend (create, then confirm).
//! E-wallet and cash-on-delivery are simulated locally and always succeed
//! after a fixed delay. A submitter allows one submission in flight at a time.

use crate::checkout::card::{card_type, last_four};
use crate::checkout::validation::ValidationResult;
use crate::checkout::{CheckoutDraft, CheckoutStep, PaymentMethod, Totals};
use crate::config::Config;
use crate::retry::{with_retry_if, RetryConfig};
use crate::security::constant_time_compare;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("a payment is already being processed")]
    AlreadyInFlight,

    #[error("checkout draft failed validation ({} invalid field(s))", .0.errors.len())]
    InvalidDraft(ValidationResult),

    #[error("checkout is at {0:?}, not the payment step")]
    NotAtPaymentStep(CheckoutStep),

    #[error("no payment method selected")]
    NoMethod,

    #[error("payment API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("payment request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("payment was not completed (status: {0})")]
    Declined(String),

    #[error("payment API returned an invalid response: {0}")]
    InvalidResponse(String),
}

impl PaymentError {
    /// Rate limits, server errors and network failures are worth retrying;
    /// other client errors, declines and unreadable success bodies are not.
    /// A 2xx means the backend acted, so repeating it could duplicate an intent.
    pub fn is_retryable(&self) -> bool {
        match self {
            PaymentError::Api { status, .. } => *status == 429 || *status >= 500,
            PaymentError::Transport(_) => true,
            _ => false,
        }
    }
}

/// Metadata attached to every intent so webhook events map back to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentMetadata {
    pub order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntentRequest {
    /// Amount in the currency's minor unit
    pub amount: i64,
    pub currency: String,
    pub metadata: IntentMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub client_secret: String,
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmRequest<'a> {
    payment_intent_id: &'a str,
    payment_method_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct ConfirmResponse {
    status: String,
}

/// Backend that creates and confirms payment intents.
pub trait PaymentGateway: Send + Sync {
    fn create_intent(
        &self,
        request: &IntentRequest,
    ) -> impl Future<Output = Result<PaymentIntent, PaymentError>> + Send;

    /// Confirm an intent; returns the intent status reported by the backend.
    fn confirm_intent(
        &self,
        intent_id: &str,
        payment_method: &str,
    ) -> impl Future<Output = Result<String, PaymentError>> + Send;
}

/// JSON client for the storefront's payment-intent endpoints.
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    retry: RetryConfig,
}

impl HttpPaymentGateway {
    pub fn new(client: reqwest::Client, base_url: &str, token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            retry: RetryConfig::payment(),
        }
    }

    pub fn from_config(client: reqwest::Client, config: &Config) -> Self {
        Self::new(client, &config.payment_api_url, config.payment_api_token.clone())
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn post<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, PaymentError> {
        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            return Err(PaymentError::Api {
                status: status.as_u16(),
                body,
            });
        }

        // The request succeeded from here on; body problems must not be retried
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::InvalidResponse(format!("failed to read body: {}", e)))?;
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            PaymentError::InvalidResponse(format!("{} (body: {})", e, preview))
        })
    }
}

impl PaymentGateway for HttpPaymentGateway {
    async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent, PaymentError> {
        with_retry_if(
            &self.retry,
            "Create payment intent",
            || self.post("/api/payment/create-payment-intent", request),
            PaymentError::is_retryable,
        )
        .await
    }

    async fn confirm_intent(
        &self,
        intent_id: &str,
        payment_method: &str,
    ) -> Result<String, PaymentError> {
        let body = ConfirmRequest {
            payment_intent_id: intent_id,
            payment_method_id: payment_method,
        };
        let response: ConfirmResponse = with_retry_if(
            &self.retry,
            "Confirm payment intent",
            || self.post("/api/payment/confirm-payment-intent", &body),
            PaymentError::is_retryable,
        )
        .await?;
        Ok(response.status)
    }
}

/// Outcome of a successful submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Receipt {
    pub order_id: String,
    pub method: PaymentMethod,
    pub amount: f64,
    /// Gateway intent id; `None` for simulated methods
    pub intent_id: Option<String>,
}

/// Where a submitter is in its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionState {
    Idle,
    Processing,
    Succeeded(Receipt),
    Failed(String),
}

/// Resets the state if a submission future is dropped before finishing.
struct InFlight<'a> {
    state: &'a Mutex<SubmissionState>,
    finished: bool,
}

impl InFlight<'_> {
    fn finish(mut self, outcome: SubmissionState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = outcome;
        self.finished = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            *self.state.lock().unwrap_or_else(PoisonError::into_inner) = SubmissionState::Idle;
        }
    }
}

/// Hands a validated draft to the right payment path.
#[derive(Debug)]
pub struct PaymentSubmitter<G> {
    gateway: G,
    currency: String,
    simulated_delay: Duration,
    state: Mutex<SubmissionState>,
}

impl<G: PaymentGateway> PaymentSubmitter<G> {
    pub fn new(gateway: G, currency: &str, simulated_delay: Duration) -> Self {
        Self {
            gateway,
            currency: currency.to_string(),
            simulated_delay,
            state: Mutex::new(SubmissionState::Idle),
        }
    }

    /// Submitter using the configured currency and simulated-payment delay.
    pub fn from_config(gateway: G, config: &Config) -> Self {
        Self::new(
            gateway,
            &config.payment_currency,
            config.simulated_payment_delay,
        )
    }

    pub fn state(&self) -> SubmissionState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_processing(&self) -> bool {
        self.state() == SubmissionState::Processing
    }

    /// Leave the failed state so the user can try again. Entered data is untouched.
    ///
    /// # Returns
    /// `true` if the submitter was in the failed state.
    pub fn reset_after_failure(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, SubmissionState::Failed(_)) {
            *state = SubmissionState::Idle;
            true
        } else {
            false
        }
    }

    /// Submit payment for `draft`. Exactly one terminal state is recorded per call.
    pub async fn submit(
        &self,
        draft: &CheckoutDraft,
        totals: &Totals,
        order_id: &str,
    ) -> Result<Receipt, PaymentError> {
        let in_flight = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state == SubmissionState::Processing {
                return Err(PaymentError::AlreadyInFlight);
            }
            *state = SubmissionState::Processing;
            InFlight {
                state: &self.state,
                finished: false,
            }
        };

        info!("Submitting payment for order {}", order_id);
        let result = self.process(draft, totals, order_id).await;

        match &result {
            Ok(receipt) => {
                info!("Payment for order {} succeeded", order_id);
                in_flight.finish(SubmissionState::Succeeded(receipt.clone()));
            }
            Err(e) => {
                warn!("Payment for order {} failed: {}", order_id, e);
                in_flight.finish(SubmissionState::Failed(e.to_string()));
            }
        }
        result
    }

    async fn process(
        &self,
        draft: &CheckoutDraft,
        totals: &Totals,
        order_id: &str,
    ) -> Result<Receipt, PaymentError> {
        let method = draft.payment_method().ok_or(PaymentError::NoMethod)?;

        if !method.is_card() {
            debug!(
                "Simulating {} payment for order {} ({:?})",
                method.code(),
                order_id,
                self.simulated_delay
            );
            tokio::time::sleep(self.simulated_delay).await;
            return Ok(Receipt {
                order_id: order_id.to_string(),
                method,
                amount: totals.total,
                intent_id: None,
            });
        }

        let request = IntentRequest {
            amount: totals.total_minor_units(),
            currency: self.currency.clone(),
            metadata: IntentMetadata {
                order_id: order_id.to_string(),
                customer_email: Some(draft.shipping.email.clone()).filter(|e| !e.is_empty()),
            },
        };
        let intent = self.gateway.create_intent(&request).await?;

        let card_number = &draft.payment.card_number;
        let payment_method = format!(
            "card_{}_{}",
            card_type(card_number).code(),
            last_four(card_number)
        );
        let status = self
            .gateway
            .confirm_intent(&intent.id, &payment_method)
            .await?;

        if status != "succeeded" {
            return Err(PaymentError::Declined(status));
        }

        Ok(Receipt {
            order_id: order_id.to_string(),
            method,
            amount: totals.total,
            intent_id: Some(intent.id),
        })
    }
}

// ==================== Webhooks ====================

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook secret missing or incorrect")]
    Unauthorized,

    #[error("malformed webhook payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEventKind {
    Succeeded,
    Failed,
    Other(String),
}

/// A payment-intent webhook event, correlated to an order where possible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEvent {
    pub kind: PaymentEventKind,
    pub intent_id: String,
    /// From intent metadata; `None` for intents created without one
    pub order_id: Option<String>,
    pub failure_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    #[serde(rename = "type")]
    event_type: String,
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    object: WebhookObject,
}

#[derive(Debug, Deserialize)]
struct WebhookObject {
    id: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
    #[serde(default)]
    last_payment_error: Option<LastPaymentError>,
}

#[derive(Debug, Deserialize)]
struct LastPaymentError {
    message: Option<String>,
}

impl PaymentEvent {
    /// Verify and parse a webhook body.
    ///
    /// When `expected_secret` is set, `provided_secret` must match it.
    pub fn from_webhook(
        payload: &str,
        provided_secret: Option<&str>,
        expected_secret: Option<&str>,
    ) -> Result<Self, WebhookError> {
        if let Some(expected) = expected_secret {
            match provided_secret {
                Some(provided) if constant_time_compare(provided, expected) => {}
                _ => return Err(WebhookError::Unauthorized),
            }
        }

        let payload: WebhookPayload = serde_json::from_str(payload)?;
        let kind = match payload.event_type.as_str() {
            "payment_intent.succeeded" => PaymentEventKind::Succeeded,
            "payment_intent.payment_failed" => PaymentEventKind::Failed,
            other => PaymentEventKind::Other(other.to_string()),
        };

        let object = payload.data.object;
        let event = PaymentEvent {
            kind,
            order_id: object.metadata.get("order_id").cloned(),
            failure_message: object.last_payment_error.and_then(|e| e.message),
            intent_id: object.id,
        };

        if event.order_id.is_none() {
            warn!("Webhook for intent {} has no order_id metadata", event.intent_id);
        }
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::Field;
    use crate::config::PricingConfig;
    use crate::checkout::compute_totals;
    use tokio_test::{assert_err, assert_ok};
    use wiremock::{
        matchers::{body_partial_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn fast_retry() -> RetryConfig {
        RetryConfig::new(3, Duration::from_millis(10))
    }

    fn gateway(server: &MockServer) -> HttpPaymentGateway {
        HttpPaymentGateway::new(
            reqwest::Client::new(),
            &server.uri(),
            Some("test-token".to_string()),
        )
        .with_retry(fast_retry())
    }

    fn card_draft() -> CheckoutDraft {
        let mut draft = CheckoutDraft::new();
        draft.set(Field::Email, "jane@example.com");
        draft.set(Field::SelectedMethod, "card");
        draft.set(Field::CardNumber, "4532 0151 1283 0366");
        draft.set(Field::ExpiryDate, "12/30");
        draft.set(Field::Cvv, "123");
        draft.set(Field::CardholderName, "Jane Doe");
        draft
    }

    fn totals() -> Totals {
        compute_totals(50.0, &PricingConfig::default())
    }

    async fn mount_create_intent(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/api/payment/create-payment-intent"))
            .and(header("Authorization", "Bearer test-token"))
            .and(body_partial_json(serde_json::json!({
                "amount": 6400,
                "currency": "usd",
                "metadata": { "order_id": "order-1" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "clientSecret": "pi_123_secret_abc",
                "id": "pi_123"
            })))
            .mount(server)
            .await;
    }

    async fn mount_confirm(server: &MockServer, status: &str) {
        Mock::given(method("POST"))
            .and(path("/api/payment/confirm-payment-intent"))
            .and(body_partial_json(serde_json::json!({
                "paymentIntentId": "pi_123",
                "paymentMethodId": "card_visa_0366"
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "status": status })),
            )
            .mount(server)
            .await;
    }

    // ==================== Card Path Tests ====================

    #[tokio::test]
    async fn test_card_payment_success() {
        let server = MockServer::start().await;
        mount_create_intent(&server).await;
        mount_confirm(&server, "succeeded").await;

        let submitter = PaymentSubmitter::new(gateway(&server), "usd", Duration::ZERO);
        let receipt = assert_ok!(submitter.submit(&card_draft(), &totals(), "order-1").await);

        assert_eq!(receipt.intent_id.as_deref(), Some("pi_123"));
        assert_eq!(receipt.method, PaymentMethod::Card);
        assert!(matches!(submitter.state(), SubmissionState::Succeeded(_)));
    }

    #[tokio::test]
    async fn test_card_payment_declined() {
        let server = MockServer::start().await;
        mount_create_intent(&server).await;
        mount_confirm(&server, "requires_payment_method").await;

        let submitter = PaymentSubmitter::new(gateway(&server), "usd", Duration::ZERO);
        let err = assert_err!(submitter.submit(&card_draft(), &totals(), "order-1").await);

        assert!(matches!(err, PaymentError::Declined(ref s) if s == "requires_payment_method"));
        assert!(matches!(submitter.state(), SubmissionState::Failed(_)));

        assert!(submitter.reset_after_failure());
        assert_eq!(submitter.state(), SubmissionState::Idle);
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/payment/create-payment-intent"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_create_intent(&server).await;
        mount_confirm(&server, "succeeded").await;

        let submitter = PaymentSubmitter::new(gateway(&server), "usd", Duration::ZERO);
        assert_ok!(submitter.submit(&card_draft(), &totals(), "order-1").await);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/payment/create-payment-intent"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad amount"))
            .expect(1)
            .mount(&server)
            .await;

        let submitter = PaymentSubmitter::new(gateway(&server), "usd", Duration::ZERO);
        let err = assert_err!(submitter.submit(&card_draft(), &totals(), "order-1").await);

        assert!(matches!(err, PaymentError::Api { status: 400, .. }));
        assert!(err.to_string().contains("bad amount"));
    }

    #[tokio::test]
    async fn test_undecodable_success_body_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/payment/create-payment-intent"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let submitter = PaymentSubmitter::new(gateway(&server), "usd", Duration::ZERO);
        let err = assert_err!(submitter.submit(&card_draft(), &totals(), "order-1").await);

        assert!(matches!(err, PaymentError::InvalidResponse(ref msg) if msg.contains("oops")));
        assert!(!err.is_retryable());
        assert!(matches!(submitter.state(), SubmissionState::Failed(_)));
    }

    #[tokio::test]
    async fn test_second_submission_rejected_while_processing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/payment/create-payment-intent"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "clientSecret": "s", "id": "pi_123" }))
                    .set_delay(Duration::from_millis(200)),
            )
            .mount(&server)
            .await;
        mount_confirm(&server, "succeeded").await;

        let submitter = PaymentSubmitter::new(gateway(&server), "usd", Duration::ZERO);
        let draft = card_draft();
        let totals = totals();

        let (first, second) = tokio::join!(
            submitter.submit(&draft, &totals, "order-1"),
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                assert!(submitter.is_processing());
                submitter.submit(&draft, &totals, "order-1").await
            }
        );

        assert_ok!(first);
        assert!(matches!(second, Err(PaymentError::AlreadyInFlight)));
    }

    // ==================== Simulated Path Tests ====================

    #[tokio::test]
    async fn test_non_card_methods_always_succeed() {
        let server = MockServer::start().await;
        let submitter = PaymentSubmitter::new(gateway(&server), "usd", Duration::from_millis(10));

        for code in ["ewallet", "cash_on_delivery"] {
            let mut draft = CheckoutDraft::new();
            draft.set(Field::SelectedMethod, code);

            let receipt = assert_ok!(submitter.submit(&draft, &totals(), "order-2").await);
            assert!(receipt.intent_id.is_none());
            assert_eq!(receipt.amount, totals().total);
        }

        // No gateway calls for simulated methods
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn test_missing_method_fails() {
        let server = MockServer::start().await;
        let submitter = PaymentSubmitter::new(gateway(&server), "usd", Duration::ZERO);

        let err = assert_err!(submitter.submit(&CheckoutDraft::new(), &totals(), "order-3").await);
        assert!(matches!(err, PaymentError::NoMethod));
    }

    // ==================== Webhook Tests ====================

    fn webhook_body(event_type: &str) -> String {
        serde_json::json!({
            "type": event_type,
            "data": {
                "object": {
                    "id": "pi_123",
                    "metadata": { "order_id": "order-1" },
                    "last_payment_error": { "message": "Your card was declined." }
                }
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_from_config_wires_currency_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/payment/create-payment-intent"))
            .and(header("Authorization", "Bearer cfg-token"))
            .and(body_partial_json(serde_json::json!({ "currency": "idr" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "clientSecret": "pi_123_secret_abc",
                "id": "pi_123"
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_confirm(&server, "succeeded").await;

        let config = Config {
            payment_api_url: server.uri(),
            payment_api_token: Some("cfg-token".to_string()),
            payment_currency: "idr".to_string(),
            simulated_payment_delay: Duration::ZERO,
            ..Config::default()
        };
        let gateway =
            HttpPaymentGateway::from_config(reqwest::Client::new(), &config).with_retry(fast_retry());
        let submitter = PaymentSubmitter::from_config(gateway, &config);

        assert_ok!(submitter.submit(&card_draft(), &totals(), "order-1").await);
    }

    #[test]
    fn test_webhook_success_event() {
        let event =
            PaymentEvent::from_webhook(&webhook_body("payment_intent.succeeded"), None, None)
                .unwrap();

        assert_eq!(event.kind, PaymentEventKind::Succeeded);
        assert_eq!(event.intent_id, "pi_123");
        assert_eq!(event.order_id.as_deref(), Some("order-1"));
    }

    #[test]
    fn test_webhook_failed_event() {
        let event = PaymentEvent::from_webhook(
            &webhook_body("payment_intent.payment_failed"),
            Some("whsec"),
            Some("whsec"),
        )
        .unwrap();

        assert_eq!(event.kind, PaymentEventKind::Failed);
        assert_eq!(event.failure_message.as_deref(), Some("Your card was declined."));
    }

    #[test]
    fn test_webhook_rejects_bad_secret() {
        let body = webhook_body("payment_intent.succeeded");
        assert!(matches!(
            PaymentEvent::from_webhook(&body, Some("wrong"), Some("whsec")),
            Err(WebhookError::Unauthorized)
        ));
        assert!(matches!(
            PaymentEvent::from_webhook(&body, None, Some("whsec")),
            Err(WebhookError::Unauthorized)
        ));
    }

    #[test]
    fn test_webhook_other_and_uncorrelated() {
        let body = serde_json::json!({
            "type": "charge.refunded",
            "data": { "object": { "id": "ch_1" } }
        })
        .to_string();

        let event = PaymentEvent::from_webhook(&body, None, None).unwrap();
        assert_eq!(event.kind, PaymentEventKind::Other("charge.refunded".to_string()));
        assert!(event.order_id.is_none());
    }

    #[test]
    fn test_webhook_malformed() {
        assert!(matches!(
            PaymentEvent::from_webhook("{", None, None),
            Err(WebhookError::Malformed(_))
        ));
    }

    #[test]
    fn test_retryable_classification() {
        let api = |status| PaymentError::Api {
            status,
            body: String::new(),
        };
        assert!(api(500).is_retryable());
        assert!(api(429).is_retryable());
        assert!(!api(402).is_retryable());
        assert!(!PaymentError::Declined("canceled".to_string()).is_retryable());
    }
}
