use chrono::Weekday;

use super::chat::QuickReply;
use super::payment::InvoiceStatus;
use super::payment::SignalSource;
use super::state::MessageVariant;

#[derive(Debug, Clone)]
pub enum AuraAction {
    User(UserAction),
    Runtime(RuntimeAction),
}

#[derive(Debug, Clone)]
pub enum UserAction {
    /// Splash finished and the chat became visible.
    RevealMain,
    SendMessage(String),
    SelectQuickReply(QuickReply),
    TogglePlanView,
    CompletePlanItem {
        id: u32,
        weekday: Weekday,
    },
    RequestPlus,
}

#[derive(Debug, Clone)]
pub enum RuntimeAction {
    /// Body of a successful webhook call, before routing.
    WebhookResponded(String),
    WebhookFailed(String),
    AppendBot {
        text: String,
        variant: MessageVariant,
    },
    /// Inbound deep-link start parameter.
    StartParam(String),
    InvoiceLinkReady(String),
    InvoiceLinkFailed(String),
    /// The bridge could not show a modal; the link was navigated to instead.
    InvoiceOpenedExternally,
    InvoiceOpenFailed(String),
    InvoiceClosed {
        status: InvoiceStatus,
        source: SignalSource,
    },
}
