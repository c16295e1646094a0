use std::collections::VecDeque;
use std::sync::Arc;

use aura_core::chat::QuickReply;
use aura_core::payment::SignalSource;
use aura_core::reduce;
use aura_core::resolve_user_id;
use aura_core::AppState;
use aura_core::AuraAction;
use aura_core::AuraEffect;
use aura_core::AuraError;
use aura_core::KeyValueSlot;
use aura_core::RuntimeAction;
use aura_core::SnapshotStore;
use aura_core::UserAction;
use chrono::Datelike;
use chrono::Weekday;

use crate::contracts::HostBridge;
use crate::contracts::InvoiceClosedEvent;
use crate::contracts::InvoiceEvents;
use crate::contracts::InvoiceLinkApi;
use crate::contracts::Presenter;
use crate::contracts::WebhookTransport;

/// External collaborators a session drives.
pub struct SessionServices {
    pub bridge: Arc<dyn HostBridge>,
    pub presenter: Box<dyn Presenter>,
    pub webhook: Box<dyn WebhookTransport>,
    pub invoices: Box<dyn InvoiceLinkApi>,
}

/// Owns the state and the store for one user and runs reducer effects in order.
///
/// Effects that produce follow-up actions (webhook replies, invoice links, dialog
/// results) are queued and reduced after the current batch, so a single `dispatch`
/// settles the whole chain before returning.
pub struct Session<S> {
    state: AppState,
    store: SnapshotStore<S>,
    services: SessionServices,
    events: Option<InvoiceEvents>,
}

impl<S: KeyValueSlot> Session<S> {
    /// Restores the user's snapshot (read once) and subscribes to invoice-closed events.
    pub fn open(store: SnapshotStore<S>, services: SessionServices) -> Self {
        let user_id = resolve_user_id(services.bridge.user_id().as_deref());
        let snapshot = store.load(&user_id);
        let state = AppState::restore(user_id, snapshot);
        let events = services.bridge.subscribe_invoice_closed();
        tracing::debug!(
            user = %state.user_id,
            inside_app = services.bridge.is_inside_app(),
            events = events.is_some(),
            "session opened"
        );
        Self {
            state,
            store,
            services,
            events,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn store(&self) -> &SnapshotStore<S> {
        &self.store
    }

    /// Forwards the launch start parameter, if any. Only auto-pay parameters act.
    pub async fn start(&mut self) {
        if let Some(param) = self.services.bridge.start_param() {
            self.dispatch(AuraAction::Runtime(RuntimeAction::StartParam(param)))
                .await;
        }
    }

    pub async fn reveal_main(&mut self) {
        self.dispatch(AuraAction::User(UserAction::RevealMain)).await;
    }

    pub async fn send_message(&mut self, text: impl Into<String>) {
        self.dispatch(AuraAction::User(UserAction::SendMessage(text.into())))
            .await;
    }

    pub async fn select_quick_reply(&mut self, reply: QuickReply) {
        self.dispatch(AuraAction::User(UserAction::SelectQuickReply(reply)))
            .await;
    }

    pub async fn toggle_plan_view(&mut self) {
        self.dispatch(AuraAction::User(UserAction::TogglePlanView))
            .await;
    }

    /// Credits the item on today's local weekday.
    pub async fn complete_plan_item(&mut self, id: u32) {
        let weekday = chrono::Local::now().weekday();
        self.complete_plan_item_on(id, weekday).await;
    }

    pub async fn complete_plan_item_on(&mut self, id: u32, weekday: Weekday) {
        self.dispatch(AuraAction::User(UserAction::CompletePlanItem { id, weekday }))
            .await;
    }

    pub async fn request_plus(&mut self) {
        self.dispatch(AuraAction::User(UserAction::RequestPlus))
            .await;
    }

    /// Reduces bridge events that are already waiting, without blocking.
    pub async fn pump_bridge_events(&mut self) -> usize {
        let mut pending = Vec::new();
        if let Some(events) = self.events.as_mut() {
            while let Ok(event) = events.try_recv() {
                pending.push(event);
            }
        }
        let drained = pending.len();
        for event in pending {
            self.apply_bridge_event(event).await;
        }
        drained
    }

    /// Waits for the next bridge event. Returns `false` once the channel is gone.
    pub async fn next_bridge_event(&mut self) -> bool {
        let Some(events) = self.events.as_mut() else {
            return false;
        };
        match events.recv().await {
            Some(event) => {
                self.apply_bridge_event(event).await;
                true
            }
            None => {
                self.events = None;
                false
            }
        }
    }

    /// Drops the event subscription and hands back the store.
    pub fn close(mut self) -> SnapshotStore<S> {
        if self.events.take().is_some() {
            self.services.bridge.unsubscribe_invoice_closed();
        }
        self.store
    }

    async fn apply_bridge_event(&mut self, event: InvoiceClosedEvent) {
        tracing::debug!(status = event.status.label(), url = ?event.url, "invoice closed event");
        self.dispatch(AuraAction::Runtime(RuntimeAction::InvoiceClosed {
            status: event.status,
            source: SignalSource::Event,
        }))
        .await;
    }

    pub async fn dispatch(&mut self, action: AuraAction) {
        let mut queue = VecDeque::from([action]);
        while let Some(action) = queue.pop_front() {
            for effect in reduce(&mut self.state, action) {
                if let Some(follow_up) = self.run_effect(effect).await {
                    queue.push_back(AuraAction::Runtime(follow_up));
                }
            }
        }
    }

    async fn run_effect(&mut self, effect: AuraEffect) -> Option<RuntimeAction> {
        match effect {
            AuraEffect::SaveSnapshot => {
                self.persist();
                None
            }
            AuraEffect::ScrollToBottom => {
                self.services.presenter.scroll_to_bottom();
                None
            }
            AuraEffect::RequestFrame => {
                self.services.presenter.refresh();
                None
            }
            AuraEffect::Notify(text) => {
                self.services.presenter.notify(&text);
                None
            }
            AuraEffect::SubmitWebhook { message } => {
                Some(match self.services.webhook.send(&message).await {
                    Ok(payload) => RuntimeAction::WebhookResponded(payload),
                    Err(err) => {
                        tracing::warn!(error = %err, kind = err.label(), "webhook request failed");
                        RuntimeAction::WebhookFailed(err.to_string())
                    }
                })
            }
            AuraEffect::RequestInvoiceLink { payload } => {
                Some(
                    match self.services.invoices.create_invoice_link(&payload).await {
                        Ok(link) => RuntimeAction::InvoiceLinkReady(link),
                        Err(err) => {
                            tracing::warn!(error = %err, kind = err.label(), "invoice link request failed");
                            RuntimeAction::InvoiceLinkFailed(err.to_string())
                        }
                    },
                )
            }
            AuraEffect::OpenInvoice { link } => Some(self.open_invoice(&link).await),
        }
    }

    fn persist(&mut self) {
        let snapshot = self.state.snapshot(chrono::Utc::now().timestamp_millis());
        self.store.save(&self.state.user_id, &snapshot);
    }

    /// Native dialog first, then bridge navigation, then raw navigation.
    async fn open_invoice(&self, link: &str) -> RuntimeAction {
        let bridge = &self.services.bridge;
        let capabilities = bridge.capabilities();

        if capabilities.open_invoice {
            match bridge.open_invoice(link).await {
                Ok(status) => {
                    tracing::info!(status = status.label(), "invoice dialog closed");
                    return RuntimeAction::InvoiceClosed {
                        status,
                        source: SignalSource::Callback,
                    };
                }
                Err(err) => tracing::warn!(error = %err, "invoice dialog failed, falling back"),
            }
        }
        if capabilities.open_telegram_link {
            match bridge.open_telegram_link(link) {
                Ok(()) => return RuntimeAction::InvoiceOpenedExternally,
                Err(err) => tracing::warn!(error = %err, "telegram link navigation failed"),
            }
        }
        if capabilities.open_link {
            match bridge.open_link(link) {
                Ok(()) => return RuntimeAction::InvoiceOpenedExternally,
                Err(err) => tracing::warn!(error = %err, "link navigation failed"),
            }
        }

        let err = AuraError::BridgeUnavailable("no way to open the invoice".to_string());
        tracing::warn!(error = %err, "invoice not opened");
        RuntimeAction::InvoiceOpenFailed(err.to_string())
    }
}
