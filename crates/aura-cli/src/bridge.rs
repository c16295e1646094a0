use async_trait::async_trait;
use aura_core::payment::InvoiceStatus;
use aura_core::AuraError;
use aura_exec::BridgeCapabilities;
use aura_exec::HostBridge;
use aura_exec::InvoiceEvents;

/// Host bridge for a plain terminal: no payment dialog and no event channel, so the
/// invoice link is printed for the user to open elsewhere.
#[derive(Debug, Clone, Default)]
pub struct TerminalBridge {
    user_id: Option<String>,
    start_param: Option<String>,
}

impl TerminalBridge {
    pub fn new(user_id: Option<String>, start_param: Option<String>) -> Self {
        Self {
            user_id: user_id.filter(|id| !id.trim().is_empty()),
            start_param,
        }
    }
}

#[async_trait]
impl HostBridge for TerminalBridge {
    fn user_id(&self) -> Option<String> {
        self.user_id.clone()
    }

    fn is_inside_app(&self) -> bool {
        false
    }

    fn start_param(&self) -> Option<String> {
        self.start_param.clone()
    }

    fn capabilities(&self) -> BridgeCapabilities {
        BridgeCapabilities {
            open_link: true,
            ..BridgeCapabilities::default()
        }
    }

    async fn open_invoice(&self, _link: &str) -> Result<InvoiceStatus, AuraError> {
        Err(AuraError::BridgeUnavailable(
            "terminal has no payment dialog".to_string(),
        ))
    }

    fn subscribe_invoice_closed(&self) -> Option<InvoiceEvents> {
        None
    }

    fn unsubscribe_invoice_closed(&self) {}

    fn open_telegram_link(&self, _link: &str) -> Result<(), AuraError> {
        Err(AuraError::BridgeUnavailable(
            "terminal cannot open telegram links".to_string(),
        ))
    }

    fn open_link(&self, link: &str) -> Result<(), AuraError> {
        println!("Open this link to pay: {link}");
        Ok(())
    }
}
