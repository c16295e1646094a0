//! Plus subscription payment attempt: `idle → linkRequested → invoiceOpen → {paid, failed, cancelled}`.
//!
//! The transitions themselves live in the reducer; this module holds the phase types and
//! the small helpers shared with the effect runners.

pub const PLUS_PAYLOAD_PREFIX: &str = "plus_subscription_";

/// Start parameters that ask the app to open the Plus invoice right away.
pub const AUTO_PAY_START_PARAMS: &[&str] = &["plus", "pay_plus", "buy_plus"];

pub fn invoice_payload(user_id: &str) -> String {
    format!("{PLUS_PAYLOAD_PREFIX}{user_id}")
}

pub fn is_auto_pay_param(param: &str) -> bool {
    let param = param.trim();
    AUTO_PAY_START_PARAMS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(param))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceStatus {
    Paid,
    Failed,
    Cancelled,
    Pending,
}

impl InvoiceStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Pending => "pending",
        }
    }
}

/// Where a terminal invoice status came from. Both feed the same transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalSource {
    /// Completion callback passed to the bridge's open-invoice call.
    Callback,
    /// The bridge's invoice-closed event subscription.
    Event,
}

impl SignalSource {
    pub fn label(self) -> &'static str {
        match self {
            Self::Callback => "callback",
            Self::Event => "event",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceChannel {
    /// Opened in the host's payment modal; a callback is guaranteed.
    Modal,
    /// Opened through link navigation; only the event channel may ever report back.
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentTrigger {
    User,
    StartParam,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PaymentPhase {
    #[default]
    Idle,
    LinkRequested,
    InvoiceOpen {
        link: String,
        channel: InvoiceChannel,
    },
}

impl PaymentPhase {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::LinkRequested => "link-requested",
            Self::InvoiceOpen {
                channel: InvoiceChannel::Modal,
                ..
            } => "invoice-open",
            Self::InvoiceOpen {
                channel: InvoiceChannel::External,
                ..
            } => "invoice-open-external",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaymentState {
    pub phase: PaymentPhase,
    /// The start-parameter trigger fires at most once per session.
    pub auto_pay_consumed: bool,
    /// Set once any invoice was shown this session; gates late `paid` signals.
    pub invoice_opened: bool,
}

impl PaymentState {
    /// A new attempt may start from idle, or over an external invoice that may never report back.
    pub fn can_start(&self) -> bool {
        matches!(
            self.phase,
            PaymentPhase::Idle
                | PaymentPhase::InvoiceOpen {
                    channel: InvoiceChannel::External,
                    ..
                }
        )
    }

    pub fn open_link(&self) -> Option<&str> {
        match &self.phase {
            PaymentPhase::InvoiceOpen { link, .. } => Some(link.as_str()),
            _ => None,
        }
    }
}
