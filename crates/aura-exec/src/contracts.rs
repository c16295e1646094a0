use async_trait::async_trait;
use aura_core::payment::InvoiceStatus;
use aura_core::AuraError;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::mpsc;

/// What the host can do for the payment flow. Checked before each call so a missing
/// capability falls through to the next navigation method instead of erroring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeCapabilities {
    pub open_invoice: bool,
    pub open_telegram_link: bool,
    pub open_link: bool,
}

/// Broadcast by the host when any invoice dialog closes, independently of the direct
/// callback of `open_invoice`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceClosedEvent {
    pub url: Option<String>,
    pub status: InvoiceStatus,
}

pub type InvoiceEvents = mpsc::UnboundedReceiver<InvoiceClosedEvent>;

/// The host application the client is embedded in.
#[async_trait]
pub trait HostBridge: Send + Sync {
    fn user_id(&self) -> Option<String>;

    fn is_inside_app(&self) -> bool;

    fn start_param(&self) -> Option<String>;

    fn capabilities(&self) -> BridgeCapabilities;

    /// Opens the native payment dialog and resolves with the status it closed with.
    async fn open_invoice(&self, link: &str) -> Result<InvoiceStatus, AuraError>;

    /// `None` when the host has no event channel.
    fn subscribe_invoice_closed(&self) -> Option<InvoiceEvents>;

    fn unsubscribe_invoice_closed(&self);

    fn open_telegram_link(&self, link: &str) -> Result<(), AuraError>;

    fn open_link(&self, link: &str) -> Result<(), AuraError>;
}

/// Rendering side of the session. Calls are fire-and-forget.
pub trait Presenter {
    fn scroll_to_bottom(&self);

    fn notify(&self, text: &str);

    fn refresh(&self);
}

#[async_trait]
pub trait WebhookTransport: Send + Sync {
    /// Returns the response body as display-ready text.
    async fn send(&self, message: &str) -> Result<String, AuraError>;
}

#[async_trait]
pub trait InvoiceLinkApi: Send + Sync {
    async fn create_invoice_link(&self, payload: &str) -> Result<String, AuraError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledPrice {
    pub label: String,
    pub amount: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateInvoiceLinkRequest {
    pub title: String,
    pub description: String,
    pub payload: String,
    pub currency: String,
    pub prices: Vec<LabeledPrice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TelegramResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}
