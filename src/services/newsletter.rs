// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! Newsletter signups.

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::services::email::{ContactOutcome, Mailer};
use crate::validation::{is_valid_email, normalize_email};
use serde_json::json;

#[derive(Clone)]
pub struct NewsletterService {
    mailer: Mailer,
    list_id: u64,
    welcome_template: u64,
}

impl NewsletterService {
    pub fn new(mailer: Mailer, config: &Config) -> Self {
        Self {
            mailer,
            list_id: config.newsletter_list_id,
            welcome_template: config.email_templates.newsletter_welcome,
        }
    }

    /// Add `email` to the newsletter list. New subscribers get a welcome email.
    pub async fn subscribe(&self, email: &str) -> Result<ContactOutcome> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(AppError::BadRequest("Valid email is required".to_string()));
        }

        let outcome = self.mailer.add_contact(&email, self.list_id).await?;
        if outcome == ContactOutcome::AlreadySubscribed {
            return Ok(outcome);
        }

        if let Err(e) = self
            .mailer
            .send_template(self.welcome_template, &email, json!({ "EMAIL": email }))
            .await
        {
            tracing::warn!(error = %e, "Newsletter welcome email failed");
        }

        tracing::info!(list_id = self.list_id, "Newsletter subscription added");
        Ok(outcome)
    }
}
