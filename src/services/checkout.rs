// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! Hosted checkout for one-time license purchases.

use crate::config::{Config, PriceIds};
use crate::error::{AppError, Result};
use crate::models::LicenseTier;
use crate::services::stripe::{CheckoutRequest, CheckoutSession, StripeClient};
use crate::validation::{is_valid_email, normalize_email};

#[derive(Clone)]
pub struct CheckoutService {
    stripe: StripeClient,
    app_url: String,
    price_ids: PriceIds,
}

impl CheckoutService {
    pub fn new(stripe: StripeClient, config: &Config) -> Self {
        Self {
            stripe,
            app_url: config.app_url.clone(),
            price_ids: config.price_ids.clone(),
        }
    }

    /// Start a checkout for a purchasable tier.
    pub async fn start(&self, tier_name: &str, email: Option<&str>) -> Result<CheckoutSession> {
        let tier = LicenseTier::parse(tier_name)
            .filter(|t| t.is_purchasable())
            .ok_or_else(|| {
                AppError::BadRequest("Invalid tier. Must be starter, pro, or agency.".to_string())
            })?;

        let price_id = self.price_ids.for_tier(tier).ok_or_else(|| {
            AppError::Payment(format!("Price not configured for tier {}", tier))
        })?;

        let customer_email = match email.map(normalize_email).filter(|e| !e.is_empty()) {
            Some(e) if !is_valid_email(&e) => {
                return Err(AppError::BadRequest("Invalid email".to_string()));
            }
            other => other,
        };

        let request = CheckoutRequest {
            tier,
            price_id: price_id.to_string(),
            customer_email,
            success_url: format!(
                "{}/account.html?purchase=success&tier={}",
                self.app_url, tier
            ),
            cancel_url: format!("{}/pricing.html?purchase=cancelled", self.app_url),
        };

        let session = self.stripe.create_checkout_session(&request).await?;
        tracing::info!(tier = %tier, session_id = %session.id, "Checkout session created");
        Ok(session)
    }
}
