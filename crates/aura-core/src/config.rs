use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::error::AuraError;

pub const DEFAULT_WEBHOOK_URL: &str =
    "https://fit-ai-fg.app.n8n.cloud/webhook-test/20123bc1-5e8c-429d-8790-f20e6138b0f3";
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub webhook: WebhookConfig,
    pub payment: PaymentConfig,
    pub storage: StorageConfig,
}

impl Config {
    /// Reads a TOML file and applies environment overrides on top.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AuraError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|err| AuraError::StorageFault(format!("read {}: {err}", path.display())))?;
        let mut config: Config = toml::from_str(&content)
            .map_err(|err| AuraError::MalformedPayload(format!("parse {}: {err}", path.display())))?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(err) => {
                tracing::info!(error = %err, "config not loaded, using defaults");
                let mut config = Self::default();
                config.apply_env_overrides();
                config
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        if let Some(url) = lookup("AURA_WEBHOOK_URL") {
            self.webhook.url = url;
        }
        if let Some(token) = lookup("AURA_BOT_TOKEN") {
            self.payment.bot_token = Some(token);
        }
        if let Some(base) = lookup("AURA_TELEGRAM_API_BASE") {
            self.payment.api_base = base;
        }
        if let Some(dir) = lookup("AURA_DATA_DIR") {
            self.storage.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(price) = lookup("AURA_PLUS_PRICE") {
            match price.parse() {
                Ok(amount) => self.payment.price_amount = amount,
                Err(_) => tracing::warn!(value = %price, "ignoring non-numeric AURA_PLUS_PRICE"),
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct WebhookConfig {
    /// Test endpoint. The production variant is derived by swapping the path segment.
    pub url: String,
    pub origin: String,
    pub path: String,
    pub timeout_secs: Option<u64>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WEBHOOK_URL.to_string(),
            origin: "AuraProject".to_string(),
            path: "/".to_string(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PaymentConfig {
    pub api_base: String,
    pub bot_token: Option<String>,
    pub title: String,
    pub description: String,
    pub price_label: String,
    pub price_amount: u32,
    pub currency: String,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_TELEGRAM_API_BASE.to_string(),
            bot_token: None,
            title: "Plus подписка".to_string(),
            description: "Подписка на расширенные возможности сервиса на 30 дней".to_string(),
            price_label: "Plus подписка".to_string(),
            price_amount: 500,
            currency: "XTR".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolved_data_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join("aura")))
    }
}
