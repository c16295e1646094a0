use std::time::Duration;

use async_trait::async_trait;
use aura_core::config::PaymentConfig;
use aura_core::config::WebhookConfig;
use aura_core::AuraError;
use chrono::SecondsFormat;
use chrono::Utc;
use serde_json::Value;

use crate::contracts::CreateInvoiceLinkRequest;
use crate::contracts::InvoiceLinkApi;
use crate::contracts::LabeledPrice;
use crate::contracts::TelegramResponse;
use crate::contracts::WebhookTransport;

const TEST_SEGMENT: &str = "/webhook-test/";
const PRODUCTION_SEGMENT: &str = "/webhook/";

fn build_http(timeout_secs: Option<u64>) -> Result<reqwest::Client, AuraError> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder
        .build()
        .map_err(|err| AuraError::NetworkUnreachable(format!("failed to build http client: {err}")))
}

fn transport_error(err: reqwest::Error) -> AuraError {
    AuraError::NetworkUnreachable(err.without_url().to_string())
}

/// Coaching webhook client. Tries the configured test endpoint first, then its
/// production twin.
pub struct HttpWebhookClient {
    http: reqwest::Client,
    url: String,
    origin: String,
    path: String,
}

impl HttpWebhookClient {
    pub fn new(config: &WebhookConfig) -> Result<Self, AuraError> {
        url::Url::parse(&config.url)
            .map_err(|err| AuraError::MalformedPayload(format!("webhook url: {err}")))?;
        Ok(Self {
            http: build_http(config.timeout_secs)?,
            url: config.url.clone(),
            origin: config.origin.clone(),
            path: config.path.clone(),
        })
    }

    pub fn endpoints(&self) -> Vec<String> {
        let mut endpoints = vec![self.url.clone()];
        let production = self.url.replace(TEST_SEGMENT, PRODUCTION_SEGMENT);
        if production != self.url {
            endpoints.push(production);
        }
        endpoints
    }
}

#[async_trait]
impl WebhookTransport for HttpWebhookClient {
    async fn send(&self, message: &str) -> Result<String, AuraError> {
        let sent_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let query = [
            ("message", message),
            ("sentAt", sent_at.as_str()),
            ("origin", self.origin.as_str()),
            ("path", self.path.as_str()),
        ];

        let mut last_error = None;
        for endpoint in self.endpoints() {
            let res = match self.http.get(&endpoint).query(&query).send().await {
                Ok(res) => res,
                Err(err) => {
                    tracing::debug!(error = %err.without_url(), "webhook endpoint unreachable");
                    last_error = Some(AuraError::NetworkUnreachable(
                        "webhook endpoint unreachable".to_string(),
                    ));
                    continue;
                }
            };
            let status = res.status();
            if !status.is_success() {
                tracing::debug!(status = status.as_u16(), "webhook endpoint rejected request");
                last_error = Some(AuraError::NonOkResponse {
                    status: status.as_u16(),
                });
                continue;
            }
            let body = res.text().await.map_err(transport_error)?;
            return Ok(normalize_body(&body));
        }

        Err(last_error.unwrap_or_else(|| {
            AuraError::NetworkUnreachable("no webhook endpoint configured".to_string())
        }))
    }
}

/// A JSON string body is unwrapped, any other JSON is compacted, anything else is
/// passed through.
pub fn normalize_body(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::String(text)) => text,
        Ok(value) => value.to_string(),
        Err(_) => body.to_string(),
    }
}

/// Bot API client for `createInvoiceLink`.
pub struct HttpInvoiceClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: Option<String>,
    title: String,
    description: String,
    price_label: String,
    price_amount: u32,
    currency: String,
}

impl HttpInvoiceClient {
    pub fn new(config: &PaymentConfig) -> Result<Self, AuraError> {
        Ok(Self {
            http: build_http(None)?,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            title: config.title.clone(),
            description: config.description.clone(),
            price_label: config.price_label.clone(),
            price_amount: config.price_amount,
            currency: config.currency.clone(),
        })
    }

    pub fn request_for(&self, payload: &str) -> CreateInvoiceLinkRequest {
        CreateInvoiceLinkRequest {
            title: self.title.clone(),
            description: self.description.clone(),
            payload: payload.to_string(),
            currency: self.currency.clone(),
            prices: vec![LabeledPrice {
                label: self.price_label.clone(),
                amount: self.price_amount,
            }],
        }
    }
}

#[async_trait]
impl InvoiceLinkApi for HttpInvoiceClient {
    async fn create_invoice_link(&self, payload: &str) -> Result<String, AuraError> {
        let Some(token) = self.bot_token.as_deref() else {
            return Err(AuraError::NetworkUnreachable(
                "invoice endpoint has no bot token configured".to_string(),
            ));
        };
        let url = format!("{}/bot{}/createInvoiceLink", self.api_base, token);

        let res = self
            .http
            .post(url)
            .json(&self.request_for(payload))
            .send()
            .await
            .map_err(transport_error)?;
        let status = res.status();
        let body = res.text().await.map_err(transport_error)?;

        let parsed = match serde_json::from_str::<TelegramResponse<String>>(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(AuraError::NonOkResponse {
                    status: status.as_u16(),
                })
            }
            Err(err) => return Err(err.into()),
        };

        if !parsed.ok {
            let message = parsed
                .description
                .unwrap_or_else(|| "createInvoiceLink returned ok=false".to_string());
            return Err(AuraError::MalformedPayload(message));
        }
        match parsed.result {
            Some(link) if !link.trim().is_empty() => Ok(link),
            _ => Err(AuraError::MalformedPayload(
                "createInvoiceLink returned no link".to_string(),
            )),
        }
    }
}
