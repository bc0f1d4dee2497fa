//! Application configuration loaded from environment variables.
//!
//! Secrets (email and payment provider keys) are read once at startup and
//! kept in memory for the life of the process.

use crate::models::LicenseTier;
use std::env;

/// Which record store backend to connect at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    Memory,
}

/// Transactional email template ids.
#[derive(Debug, Clone)]
pub struct EmailTemplates {
    pub magic_link: u64,
    pub welcome: u64,
    pub license_key: u64,
    pub newsletter_welcome: u64,
}

impl Default for EmailTemplates {
    fn default() -> Self {
        Self {
            magic_link: 37,
            welcome: 38,
            license_key: 40,
            newsletter_welcome: 36,
        }
    }
}

/// Stripe price ids, one per purchasable tier.
#[derive(Debug, Clone, Default)]
pub struct PriceIds {
    pub starter: Option<String>,
    pub pro: Option<String>,
    pub agency: Option<String>,
}

impl PriceIds {
    /// Price configured for a tier, if any. Free is never purchasable.
    pub fn for_tier(&self, tier: LicenseTier) -> Option<&str> {
        match tier {
            LicenseTier::Free => None,
            LicenseTier::Starter => self.starter.as_deref(),
            LicenseTier::Pro => self.pro.as_deref(),
            LicenseTier::Agency => self.agency.as_deref(),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Public origin of the web app; used in emailed links and redirects
    pub app_url: String,
    /// Server port
    pub port: u16,
    /// Record store selection
    pub store_backend: StoreBackend,
    /// GCP project hosting Firestore
    pub gcp_project_id: String,
    pub email_templates: EmailTemplates,
    /// Brevo contact list for newsletter signups
    pub newsletter_list_id: u64,
    pub price_ids: PriceIds,

    // --- Secrets ---
    /// Brevo API key
    pub brevo_api_key: String,
    /// Stripe secret API key
    pub stripe_secret_key: String,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
}

impl Config {
    /// Config for tests: memory store, no real providers.
    pub fn test_default() -> Self {
        Self {
            app_url: "https://app.example.test".to_string(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            gcp_project_id: "test-project".to_string(),
            email_templates: EmailTemplates::default(),
            newsletter_list_id: 16,
            price_ids: PriceIds {
                starter: Some("price_starter_test".to_string()),
                pro: Some("price_pro_test".to_string()),
                agency: None,
            },
            brevo_api_key: "test_brevo_key".to_string(),
            stripe_secret_key: "sk_test_key".to_string(),
            stripe_webhook_secret: "whsec_test_secret".to_string(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = EmailTemplates::default();

        Ok(Self {
            app_url: env::var("APP_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            store_backend: parse_store_backend(env::var("STORE_BACKEND").ok().as_deref())?,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            email_templates: EmailTemplates {
                magic_link: env_u64("BREVO_TEMPLATE_MAGIC_LINK", defaults.magic_link),
                welcome: env_u64("BREVO_TEMPLATE_WELCOME", defaults.welcome),
                license_key: env_u64("BREVO_TEMPLATE_LICENSE_KEY", defaults.license_key),
                newsletter_welcome: env_u64(
                    "BREVO_TEMPLATE_NEWSLETTER",
                    defaults.newsletter_welcome,
                ),
            },
            newsletter_list_id: env_u64("BREVO_NEWSLETTER_LIST_ID", 16),
            price_ids: PriceIds {
                starter: env_opt("STRIPE_STARTER_PRICE_ID"),
                pro: env_opt("STRIPE_PRO_PRICE_ID"),
                agency: env_opt("STRIPE_AGENCY_PRICE_ID"),
            },

            brevo_api_key: env::var("BREVO_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("BREVO_API_KEY"))?,
            stripe_secret_key: env::var("STRIPE_SECRET_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("STRIPE_SECRET_KEY"))?,
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("STRIPE_WEBHOOK_SECRET"))?,
        })
    }
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_store_backend(value: Option<&str>) -> Result<StoreBackend, ConfigError> {
    match value.map(str::trim) {
        None | Some("") | Some("firestore") => Ok(StoreBackend::Firestore),
        Some("memory") => Ok(StoreBackend::Memory),
        Some(_) => Err(ConfigError::Invalid("STORE_BACKEND")),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("BREVO_API_KEY", " brevo_key ");
        env::set_var("STRIPE_SECRET_KEY", "sk_test");
        env::set_var("STRIPE_WEBHOOK_SECRET", "whsec_test");
        env::set_var("APP_URL", "https://clarity.example/");
        env::set_var("STRIPE_PRO_PRICE_ID", "price_pro");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.brevo_api_key, "brevo_key");
        assert_eq!(config.app_url, "https://clarity.example");
        assert_eq!(config.price_ids.for_tier(LicenseTier::Pro), Some("price_pro"));
        assert_eq!(config.price_ids.for_tier(LicenseTier::Free), None);
    }

    #[test]
    fn test_parse_store_backend() {
        assert_eq!(parse_store_backend(None).unwrap(), StoreBackend::Firestore);
        assert_eq!(
            parse_store_backend(Some("memory")).unwrap(),
            StoreBackend::Memory
        );
        assert!(parse_store_backend(Some("postgres")).is_err());
    }
}
