use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Prices used to derive checkout totals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingConfig {
    /// Shipping fee charged when the subtotal is not above the threshold
    pub flat_shipping_fee: f64,
    /// Subtotal strictly above which shipping is free
    pub free_shipping_threshold: f64,
    /// Tax multiplier applied to the subtotal
    pub tax_rate: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            flat_shipping_fee: 10.0,
            free_shipping_threshold: 100.0,
            tax_rate: 0.08,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub storage_path: PathBuf,
    pub draft_debounce: Duration,

    // Payment backend
    pub payment_api_url: String,
    pub payment_api_token: Option<String>,
    pub payment_currency: String,
    pub payment_webhook_secret: Option<String>,
    pub simulated_payment_delay: Duration,

    // Pricing
    pub pricing: PricingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from(".storefront/storage.json"),
            draft_debounce: Duration::from_millis(1000),
            payment_api_url: "http://localhost:5000".to_string(),
            payment_api_token: None,
            payment_currency: "usd".to_string(),
            payment_webhook_secret: None,
            simulated_payment_delay: Duration::from_millis(2000),
            pricing: PricingConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = PricingConfig::default();

        let payment_api_url = std::env::var("PAYMENT_API_URL")
            .unwrap_or_else(|_| "http://localhost:5000".to_string());
        reqwest::Url::parse(&payment_api_url)
            .with_context(|| format!("PAYMENT_API_URL is not a valid URL: {}", payment_api_url))?;

        Ok(Self {
            storage_path: std::env::var("STOREFRONT_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".storefront/storage.json")),
            draft_debounce: Duration::from_millis(env_or("DRAFT_DEBOUNCE_MS", 1000)),

            payment_api_url: payment_api_url.trim_end_matches('/').to_string(),
            payment_api_token: std::env::var("PAYMENT_API_TOKEN").ok(),
            payment_currency: std::env::var("PAYMENT_CURRENCY")
                .unwrap_or_else(|_| "usd".to_string()),
            payment_webhook_secret: std::env::var("PAYMENT_WEBHOOK_SECRET").ok(),
            simulated_payment_delay: Duration::from_millis(env_or(
                "SIMULATED_PAYMENT_DELAY_MS",
                2000,
            )),

            pricing: PricingConfig {
                flat_shipping_fee: env_amount("FLAT_SHIPPING_FEE", defaults.flat_shipping_fee),
                free_shipping_threshold: env_amount(
                    "FREE_SHIPPING_THRESHOLD",
                    defaults.free_shipping_threshold,
                ),
                tax_rate: env_amount("TAX_RATE", defaults.tax_rate),
            },
        })
    }
}

/// Parse an environment variable, falling back to `default` when unset or invalid.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Like [`env_or`] for prices and rates: negative or non-finite values are
/// rejected so totals can never go below zero.
fn env_amount(name: &str, default: f64) -> f64 {
    let value = env_or(name, default);
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        warn!("Ignoring {}={}: must be a non-negative number", name, value);
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "STOREFRONT_STORAGE_PATH",
        "DRAFT_DEBOUNCE_MS",
        "PAYMENT_API_URL",
        "PAYMENT_API_TOKEN",
        "PAYMENT_CURRENCY",
        "PAYMENT_WEBHOOK_SECRET",
        "SIMULATED_PAYMENT_DELAY_MS",
        "FLAT_SHIPPING_FEE",
        "FREE_SHIPPING_THRESHOLD",
        "TAX_RATE",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = Config::from_env().expect("Should load defaults");

        assert_eq!(config.storage_path, PathBuf::from(".storefront/storage.json"));
        assert_eq!(config.draft_debounce, Duration::from_millis(1000));
        assert_eq!(config.payment_api_url, "http://localhost:5000");
        assert!(config.payment_api_token.is_none());
        assert_eq!(config.payment_currency, "usd");
        assert_eq!(config.simulated_payment_delay, Duration::from_millis(2000));
        assert_eq!(config.pricing, PricingConfig::default());
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear_env();
        std::env::set_var("DRAFT_DEBOUNCE_MS", "250");
        std::env::set_var("PAYMENT_API_URL", "https://pay.example.com/");
        std::env::set_var("PAYMENT_API_TOKEN", "token-123");
        std::env::set_var("TAX_RATE", "0.11");

        let config = Config::from_env().expect("Should load");
        clear_env();

        assert_eq!(config.draft_debounce, Duration::from_millis(250));
        assert_eq!(config.payment_api_url, "https://pay.example.com");
        assert_eq!(config.payment_api_token.as_deref(), Some("token-123"));
        assert_eq!(config.pricing.tax_rate, 0.11);
    }

    #[test]
    #[serial]
    fn test_invalid_number_falls_back() {
        clear_env();
        std::env::set_var("FLAT_SHIPPING_FEE", "ten dollars");

        let config = Config::from_env().expect("Should load");
        clear_env();

        assert_eq!(config.pricing.flat_shipping_fee, 10.0);
    }

    #[test]
    #[serial]
    fn test_negative_and_non_finite_pricing_fall_back() {
        clear_env();
        std::env::set_var("TAX_RATE", "-2");
        std::env::set_var("FLAT_SHIPPING_FEE", "NaN");
        std::env::set_var("FREE_SHIPPING_THRESHOLD", "inf");

        let config = Config::from_env().expect("Should load");
        clear_env();

        assert_eq!(config.pricing, PricingConfig::default());
    }

    #[test]
    #[serial]
    fn test_defaults_match_default_impl() {
        clear_env();
        let config = Config::from_env().expect("Should load defaults");

        let defaults = Config::default();
        assert_eq!(config.storage_path, defaults.storage_path);
        assert_eq!(config.draft_debounce, defaults.draft_debounce);
        assert_eq!(config.payment_api_url, defaults.payment_api_url);
        assert_eq!(config.simulated_payment_delay, defaults.simulated_payment_delay);
    }

    #[test]
    #[serial]
    fn test_invalid_payment_url_is_rejected() {
        clear_env();
        std::env::set_var("PAYMENT_API_URL", "not a url");

        let result = Config::from_env();
        clear_env();

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("PAYMENT_API_URL"));
    }
}
