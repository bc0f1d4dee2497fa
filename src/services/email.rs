// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! Brevo client for templated transactional email and newsletter contacts.
//!
//! Handles:
//! - Template sends (magic link, welcome, license key, newsletter welcome)
//! - Adding a contact to a list, with duplicate detection

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

const BREVO_API_URL: &str = "https://api.brevo.com/v3";

/// Brevo error code for a contact that already exists.
const DUPLICATE_CONTACT_CODE: &str = "duplicate_parameter";

/// One dispatched template email.
#[derive(Debug, Clone, PartialEq)]
pub struct SentEmail {
    pub template_id: u64,
    pub to: String,
    pub params: Value,
}

/// Result of adding a newsletter contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactOutcome {
    Added,
    AlreadySubscribed,
}

/// Recorded traffic of the offline mailer.
#[derive(Default)]
struct Outbox {
    sent: Vec<SentEmail>,
    contacts: HashSet<(String, u64)>,
    failing: bool,
}

#[derive(Serialize)]
struct Recipient<'a> {
    email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TemplateEmail<'a> {
    template_id: u64,
    to: [Recipient<'a>; 1],
    params: &'a Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateContact<'a> {
    email: &'a str,
    list_ids: [u64; 1],
    update_enabled: bool,
}

#[derive(Debug, Default, Deserialize)]
struct BrevoError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Transactional email sender.
#[derive(Clone)]
pub struct Mailer {
    http: reqwest::Client,
    base_url: String,
    api_key: String,

    /// Set in offline mode; requests are recorded instead of sent
    outbox: Option<Arc<Mutex<Outbox>>>,
}

impl Mailer {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: BREVO_API_URL.to_string(),
            api_key,
            outbox: None,
        }
    }

    /// Create an offline mailer that records traffic (tests, local dev).
    /// Only available in debug/test builds.
    #[cfg(debug_assertions)]
    pub fn new_mock() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "http://mock.invalid".to_string(),
            api_key: String::new(),
            outbox: Some(Arc::new(Mutex::new(Outbox::default()))),
        }
    }

    /// Emails recorded by the offline mailer, oldest first.
    pub fn sent_emails(&self) -> Vec<SentEmail> {
        self.outbox
            .as_ref()
            .and_then(|outbox| outbox.lock().ok().map(|o| o.sent.clone()))
            .unwrap_or_default()
    }

    /// Make every offline request fail, to exercise error paths.
    pub fn set_failing(&self, failing: bool) {
        if let Some(mut outbox) = self.outbox.as_ref().and_then(|o| o.lock().ok()) {
            outbox.failing = failing;
        }
    }

    /// Send a Brevo template to one recipient.
    pub async fn send_template(
        &self,
        template_id: u64,
        to: &str,
        params: Value,
    ) -> Result<(), AppError> {
        if let Some(outbox) = &self.outbox {
            let mut outbox = lock(outbox)?;
            if outbox.failing {
                return Err(AppError::Email("Mock send failure".to_string()));
            }
            outbox.sent.push(SentEmail {
                template_id,
                to: to.to_string(),
                params,
            });
            return Ok(());
        }

        let body = TemplateEmail {
            template_id,
            to: [Recipient { email: to }],
            params: &params,
        };

        let response = self
            .http
            .post(format!("{}/smtp/email", self.base_url))
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Email(format!("Send request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Email(format!("HTTP {}: {}", status, text)));
        }

        tracing::debug!(template_id, "Template email accepted");
        Ok(())
    }

    /// Add `email` to a contact list.
    pub async fn add_contact(&self, email: &str, list_id: u64) -> Result<ContactOutcome, AppError> {
        if let Some(outbox) = &self.outbox {
            let mut outbox = lock(outbox)?;
            if outbox.failing {
                return Err(AppError::Email("Mock contact failure".to_string()));
            }
            let added = outbox.contacts.insert((email.to_string(), list_id));
            return Ok(if added {
                ContactOutcome::Added
            } else {
                ContactOutcome::AlreadySubscribed
            });
        }

        let body = CreateContact {
            email,
            list_ids: [list_id],
            update_enabled: true,
        };

        let response = self
            .http
            .post(format!("{}/contacts", self.base_url))
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Email(format!("Contact request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(ContactOutcome::Added);
        }

        let error: BrevoError = response.json().await.unwrap_or_default();
        if error.code.as_deref() == Some(DUPLICATE_CONTACT_CODE) {
            return Ok(ContactOutcome::AlreadySubscribed);
        }

        Err(AppError::Email(format!(
            "HTTP {}: {}",
            status,
            error.message.unwrap_or_default()
        )))
    }
}

fn lock(outbox: &Mutex<Outbox>) -> Result<std::sync::MutexGuard<'_, Outbox>, AppError> {
    outbox
        .lock()
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Mock outbox poisoned")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_records_sends() {
        let mailer = Mailer::new_mock();
        mailer
            .send_template(37, "ada@example.com", json!({"EMAIL": "ada@example.com"}))
            .await
            .unwrap();

        let sent = mailer.sent_emails();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].template_id, 37);
        assert_eq!(sent[0].to, "ada@example.com");
    }

    #[tokio::test]
    async fn test_mock_detects_duplicate_contact() {
        let mailer = Mailer::new_mock();
        assert_eq!(
            mailer.add_contact("ada@example.com", 16).await.unwrap(),
            ContactOutcome::Added
        );
        assert_eq!(
            mailer.add_contact("ada@example.com", 16).await.unwrap(),
            ContactOutcome::AlreadySubscribed
        );
    }

    #[tokio::test]
    async fn test_mock_failure_mode() {
        let mailer = Mailer::new_mock();
        mailer.set_failing(true);
        let err = mailer.send_template(38, "a@b.co", json!({})).await.unwrap_err();
        assert!(matches!(err, AppError::Email(_)));
        assert!(mailer.sent_emails().is_empty());
    }

    #[test]
    fn test_template_email_wire_shape() {
        let params = json!({"MAGIC_LINK": "https://x.test"});
        let body = TemplateEmail {
            template_id: 37,
            to: [Recipient { email: "a@b.co" }],
            params: &params,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"templateId": 37, "to": [{"email": "a@b.co"}], "params": {"MAGIC_LINK": "https://x.test"}})
        );
    }
}
