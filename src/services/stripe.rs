// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! Stripe client: hosted checkout creation and webhook event verification.

use crate::error::AppError;
use crate::models::LicenseTier;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use std::sync::{Arc, Mutex};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const STRIPE_API_URL: &str = "https://api.stripe.com/v1";

/// Maximum age of a signed webhook payload, in seconds.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Product tag written into checkout metadata.
pub const PRODUCT_TAG: &str = "clarity";

/// Parameters for a one-time license purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub tier: LicenseTier,
    pub price_id: String,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

/// A created hosted checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

/// Stripe client.
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,

    /// Set in offline mode; checkout requests are recorded, not sent
    recorded: Option<Arc<Mutex<Vec<CheckoutRequest>>>>,
}

impl StripeClient {
    pub fn new(secret_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: STRIPE_API_URL.to_string(),
            secret_key,
            recorded: None,
        }
    }

    /// Create an offline client for testing.
    /// Only available in debug/test builds.
    #[cfg(debug_assertions)]
    pub fn new_mock() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "http://mock.invalid".to_string(),
            secret_key: String::new(),
            recorded: Some(Arc::new(Mutex::new(Vec::new()))),
        }
    }

    /// Checkout requests seen by the offline client.
    pub fn recorded_checkouts(&self) -> Vec<CheckoutRequest> {
        self.recorded
            .as_ref()
            .and_then(|r| r.lock().ok().map(|r| r.clone()))
            .unwrap_or_default()
    }

    pub async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, AppError> {
        if let Some(recorded) = &self.recorded {
            let id = format!("cs_test_{}", crate::tokens::document_id()?);
            recorded
                .lock()
                .map_err(|_| AppError::Internal(anyhow::anyhow!("Mock recorder poisoned")))?
                .push(request.clone());
            return Ok(CheckoutSession {
                url: Some(format!("https://checkout.stripe.com/c/pay/{}", id)),
                id,
            });
        }

        let mut form: Vec<(&str, &str)> = vec![
            ("mode", "payment"),
            ("payment_method_types[0]", "card"),
            ("line_items[0][price]", request.price_id.as_str()),
            ("line_items[0][quantity]", "1"),
            ("metadata[tier]", request.tier.as_str()),
            ("metadata[product]", PRODUCT_TAG),
            ("success_url", request.success_url.as_str()),
            ("cancel_url", request.cancel_url.as_str()),
        ];
        if let Some(email) = &request.customer_email {
            form.push(("customer_email", email.as_str()));
        }

        let response = self
            .http
            .post(format!("{}/checkout/sessions", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Payment(format!("Checkout request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Payment(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Payment(format!("JSON parse error: {}", e)))
    }
}

// ─── Webhooks ────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Malformed signature header")]
    MalformedHeader,
    #[error("Timestamp outside tolerance")]
    Stale,
    #[error("No matching signature")]
    Mismatch,
}

/// Verify a `stripe-signature` header against the raw request body.
///
/// Header format is `t=<unix>,v1=<hex>[,v1=<hex>...]`; the signed payload is
/// `"<t>.<body>"`. Any `v1` entry may match.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(value.parse().map_err(|_| SignatureError::MalformedHeader)?);
            }
            Some(("v1", value)) => {
                if let Ok(sig) = hex::decode(value) {
                    signatures.push(sig);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }
    if (now.timestamp() - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(SignatureError::Stale);
    }

    let expected = compute_signature(payload, timestamp, secret).ok_or(SignatureError::Mismatch)?;
    if signatures
        .iter()
        .any(|sig| bool::from(sig.as_slice().ct_eq(expected.as_slice())))
    {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// HMAC-SHA256 over `"<timestamp>.<payload>"`.
pub fn compute_signature(payload: &[u8], timestamp: i64, secret: &str) -> Option<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Some(mac.finalize().into_bytes().to_vec())
}

/// Build a header value for `payload`, as Stripe would send it.
pub fn sign_payload(payload: &[u8], timestamp: i64, secret: &str) -> Option<String> {
    let signature = compute_signature(payload, timestamp, secret)?;
    Some(format!("t={},v1={}", timestamp, hex::encode(signature)))
}

/// Webhook event envelope.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: Value,
}

/// The fields of a completed checkout session that drive issuance.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutCompleted {
    pub session_id: String,
    pub email: Option<String>,
    pub tier: Option<String>,
    pub customer_reference: Option<String>,
}

impl CheckoutCompleted {
    /// Extract from a `checkout.session` object. Email falls back to
    /// `customer_details.email`.
    pub fn from_session_object(object: &Value) -> Self {
        let text = |v: Option<&Value>| {
            v.and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Self {
            session_id: text(object.get("id")).unwrap_or_default(),
            email: text(object.get("customer_email"))
                .or_else(|| text(object.pointer("/customer_details/email"))),
            tier: text(object.pointer("/metadata/tier")),
            customer_reference: text(object.get("customer")),
        }
    }
}
