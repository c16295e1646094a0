//! End-to-end session scenarios over fake collaborators.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use aura_core::chat::QuickReply;
use aura_core::chat::GREETING_TEXT;
use aura_core::chat::NETWORK_ERROR_TEXT;
use aura_core::chat::PAYMENT_SUCCESS_NOTICE;
use aura_core::chat::PAYMENT_UNAVAILABLE_NOTICE;
use aura_core::payment::InvoiceChannel;
use aura_core::payment::InvoiceStatus;
use aura_core::payment::PaymentPhase;
use aura_core::AppState;
use aura_core::AuraError;
use aura_core::MemorySlot;
use aura_core::SnapshotStore;
use aura_exec::BridgeCapabilities;
use aura_exec::HostBridge;
use aura_exec::InvoiceClosedEvent;
use aura_exec::InvoiceEvents;
use aura_exec::InvoiceLinkApi;
use aura_exec::Presenter;
use aura_exec::Session;
use aura_exec::SessionServices;
use aura_exec::WebhookTransport;
use chrono::Weekday;
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;

const LINK: &str = "https://t.me/$plus";

// ============================================================================
// Fakes
// ============================================================================

struct FakeBridge {
    user_id: Option<String>,
    start_param: Option<String>,
    capabilities: BridgeCapabilities,
    dialog_status: InvoiceStatus,
    events: Mutex<Option<InvoiceEvents>>,
    navigations: Mutex<Vec<String>>,
    unsubscribed: AtomicBool,
}

impl FakeBridge {
    fn new(capabilities: BridgeCapabilities) -> Self {
        Self {
            user_id: Some("4242".to_string()),
            start_param: None,
            capabilities,
            dialog_status: InvoiceStatus::Paid,
            events: Mutex::new(None),
            navigations: Mutex::new(Vec::new()),
            unsubscribed: AtomicBool::new(false),
        }
    }

    fn with_events(self) -> (Self, mpsc::UnboundedSender<InvoiceClosedEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.events.lock().expect("lock") = Some(rx);
        (self, tx)
    }

    fn navigations(&self) -> Vec<String> {
        self.navigations.lock().expect("lock").clone()
    }
}

#[async_trait]
impl HostBridge for FakeBridge {
    fn user_id(&self) -> Option<String> {
        self.user_id.clone()
    }

    fn is_inside_app(&self) -> bool {
        true
    }

    fn start_param(&self) -> Option<String> {
        self.start_param.clone()
    }

    fn capabilities(&self) -> BridgeCapabilities {
        self.capabilities
    }

    async fn open_invoice(&self, _link: &str) -> Result<InvoiceStatus, AuraError> {
        Ok(self.dialog_status)
    }

    fn subscribe_invoice_closed(&self) -> Option<InvoiceEvents> {
        self.events.lock().expect("lock").take()
    }

    fn unsubscribe_invoice_closed(&self) {
        self.unsubscribed.store(true, Ordering::SeqCst);
    }

    fn open_telegram_link(&self, link: &str) -> Result<(), AuraError> {
        self.navigations.lock().expect("lock").push(format!("tg:{link}"));
        Ok(())
    }

    fn open_link(&self, link: &str) -> Result<(), AuraError> {
        self.navigations.lock().expect("lock").push(link.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Scroll,
    Notify(String),
    Refresh,
}

#[derive(Clone, Default)]
struct RecordingPresenter {
    calls: Rc<RefCell<Vec<Call>>>,
}

impl RecordingPresenter {
    fn notices(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Notify(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Presenter for RecordingPresenter {
    fn scroll_to_bottom(&self) {
        self.calls.borrow_mut().push(Call::Scroll);
    }

    fn notify(&self, text: &str) {
        self.calls.borrow_mut().push(Call::Notify(text.to_string()));
    }

    fn refresh(&self) {
        self.calls.borrow_mut().push(Call::Refresh);
    }
}

#[derive(Default)]
struct ScriptedWebhook {
    replies: Mutex<VecDeque<Result<String, AuraError>>>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl ScriptedWebhook {
    fn replying(replies: Vec<Result<String, AuraError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            sent: Arc::default(),
        }
    }
}

#[async_trait]
impl WebhookTransport for ScriptedWebhook {
    async fn send(&self, message: &str) -> Result<String, AuraError> {
        self.sent.lock().expect("lock").push(message.to_string());
        self.replies
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

struct CountingInvoices {
    link: Option<String>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl InvoiceLinkApi for CountingInvoices {
    async fn create_invoice_link(&self, payload: &str) -> Result<String, AuraError> {
        assert_eq!(payload, "plus_subscription_4242");
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.link
            .clone()
            .ok_or_else(|| AuraError::MalformedPayload("ok=false".to_string()))
    }
}

struct Harness {
    session: Session<MemorySlot>,
    bridge: Arc<FakeBridge>,
    presenter: RecordingPresenter,
    invoice_calls: Arc<AtomicUsize>,
    sent: Arc<Mutex<Vec<String>>>,
}

fn harness_with(
    bridge: FakeBridge,
    webhook: ScriptedWebhook,
    link: Option<&str>,
    store: SnapshotStore<MemorySlot>,
) -> Harness {
    let bridge = Arc::new(bridge);
    let presenter = RecordingPresenter::default();
    let invoice_calls = Arc::new(AtomicUsize::new(0));
    let sent = webhook.sent.clone();
    let session = Session::open(
        store,
        SessionServices {
            bridge: bridge.clone(),
            presenter: Box::new(presenter.clone()),
            webhook: Box::new(webhook),
            invoices: Box::new(CountingInvoices {
                link: link.map(str::to_string),
                calls: invoice_calls.clone(),
            }),
        },
    );
    Harness {
        session,
        bridge,
        presenter,
        invoice_calls,
        sent,
    }
}

fn harness(bridge: FakeBridge) -> Harness {
    harness_with(
        bridge,
        ScriptedWebhook::default(),
        Some(LINK),
        SnapshotStore::new(MemorySlot::new()),
    )
}

fn modal() -> BridgeCapabilities {
    BridgeCapabilities {
        open_invoice: true,
        open_telegram_link: true,
        open_link: true,
    }
}

fn link_only() -> BridgeCapabilities {
    BridgeCapabilities {
        open_link: true,
        ..BridgeCapabilities::default()
    }
}

fn persisted_plus(h: &Harness) -> bool {
    h.session
        .store()
        .load("4242")
        .map(|snapshot| snapshot.is_plus)
        .unwrap_or(false)
}

// ============================================================================
// Payment
// ============================================================================

#[tokio::test]
async fn paid_dialog_sets_plus_persists_and_blocks_second_invoice() {
    let mut h = harness(FakeBridge::new(modal()));

    h.session.request_plus().await;

    assert!(h.session.state().ui.is_plus);
    assert!(persisted_plus(&h));
    assert_eq!(h.presenter.notices(), vec![PAYMENT_SUCCESS_NOTICE.to_string()]);
    assert_eq!(h.session.state().payment.phase, PaymentPhase::Idle);

    h.session.request_plus().await;
    assert_eq!(h.invoice_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn duplicate_paid_event_after_callback_is_ignored() {
    let (bridge, tx) = FakeBridge::new(modal()).with_events();
    let mut h = harness(bridge);

    h.session.request_plus().await;
    tx.send(InvoiceClosedEvent {
        url: Some(LINK.to_string()),
        status: InvoiceStatus::Paid,
    })
    .expect("send");

    assert_eq!(h.session.pump_bridge_events().await, 1);
    assert_eq!(h.presenter.notices().len(), 1);
    assert!(h.session.state().ui.is_plus);
}

#[tokio::test]
async fn fallback_navigates_and_waits_for_event_channel() {
    let (bridge, tx) = FakeBridge::new(link_only()).with_events();
    let mut h = harness(bridge);

    h.session.request_plus().await;

    assert_eq!(h.bridge.navigations(), vec![LINK.to_string()]);
    assert!(!h.session.state().ui.is_plus);
    assert!(!persisted_plus(&h));
    assert_eq!(
        h.session.state().payment.phase,
        PaymentPhase::InvoiceOpen {
            link: LINK.to_string(),
            channel: InvoiceChannel::External,
        }
    );

    tx.send(InvoiceClosedEvent {
        url: None,
        status: InvoiceStatus::Paid,
    })
    .expect("send");
    assert!(h.session.next_bridge_event().await);

    assert!(h.session.state().ui.is_plus);
    assert!(persisted_plus(&h));
}

#[tokio::test]
async fn telegram_link_is_preferred_over_raw_navigation() {
    let mut h = harness(FakeBridge::new(BridgeCapabilities {
        open_invoice: false,
        open_telegram_link: true,
        open_link: true,
    }));

    h.session.request_plus().await;

    assert_eq!(h.bridge.navigations(), vec![format!("tg:{LINK}")]);
}

#[tokio::test]
async fn invoice_link_failure_notifies_without_retry() {
    let mut h = harness_with(
        FakeBridge::new(modal()),
        ScriptedWebhook::default(),
        None,
        SnapshotStore::new(MemorySlot::new()),
    );

    h.session.request_plus().await;

    assert_eq!(
        h.presenter.notices(),
        vec![PAYMENT_UNAVAILABLE_NOTICE.to_string()]
    );
    assert_eq!(h.session.state().payment.phase, PaymentPhase::Idle);
    assert_eq!(h.invoice_calls.load(Ordering::SeqCst), 1);
    assert!(!h.session.state().ui.is_plus);
}

#[tokio::test]
async fn host_without_any_navigation_reports_unavailable() {
    let mut h = harness(FakeBridge::new(BridgeCapabilities::default()));

    h.session.request_plus().await;

    assert_eq!(
        h.presenter.notices(),
        vec![PAYMENT_UNAVAILABLE_NOTICE.to_string()]
    );
    assert_eq!(h.session.state().payment.phase, PaymentPhase::Idle);
    assert!(h.bridge.navigations().is_empty());
}

#[tokio::test]
async fn auto_pay_start_param_opens_invoice_once() {
    let mut bridge = FakeBridge::new(BridgeCapabilities {
        open_invoice: true,
        ..BridgeCapabilities::default()
    });
    bridge.start_param = Some("PAY_PLUS".to_string());
    bridge.dialog_status = InvoiceStatus::Cancelled;
    let mut h = harness(bridge);

    h.session.start().await;
    h.session.start().await;

    assert_eq!(h.invoice_calls.load(Ordering::SeqCst), 1);
    assert!(!h.session.state().ui.is_plus);
    assert!(h.presenter.notices().is_empty());
}

#[tokio::test]
async fn close_unsubscribes_from_bridge_events() {
    let (bridge, _tx) = FakeBridge::new(modal()).with_events();
    let h = harness(bridge);

    let bridge = h.bridge.clone();
    h.session.close();

    assert!(bridge.unsubscribed.load(Ordering::SeqCst));
}

// ============================================================================
// Chat, plan and restore
// ============================================================================

#[tokio::test]
async fn network_error_appends_notice_and_persists_history() {
    let mut h = harness_with(
        FakeBridge::new(modal()),
        ScriptedWebhook::replying(vec![Err(AuraError::NonOkResponse { status: 502 })]),
        Some(LINK),
        SnapshotStore::new(MemorySlot::new()),
    );

    h.session.send_message("ping").await;

    let texts: Vec<&str> = h
        .session
        .state()
        .chat
        .messages
        .iter()
        .map(|message| message.text.as_str())
        .collect();
    assert_eq!(texts, vec!["ping", NETWORK_ERROR_TEXT]);
    let stored = h.session.store().load("4242").expect("snapshot");
    assert_eq!(stored.messages.len(), 2);
    assert_eq!(*h.sent.lock().expect("lock"), vec!["ping".to_string()]);
}

#[tokio::test]
async fn plan_reply_builds_timeline_and_completion_persists() {
    let plan = r#"{"plan":"Ноги","exercises":[{"name":"Присед","sets":3,"reps":12},{"name":"Выпады"}]}"#;
    let mut h = harness_with(
        FakeBridge::new(modal()),
        ScriptedWebhook::replying(vec![Ok(plan.to_string())]),
        Some(LINK),
        SnapshotStore::new(MemorySlot::new()),
    );

    h.session.reveal_main().await;
    h.session.select_quick_reply(QuickReply::Plan).await;
    assert!(h.sent.lock().expect("lock").is_empty());
    h.session.send_message("Составь план на ноги").await;

    let state = h.session.state();
    assert!(state.has_plan());
    assert!(state.ui.show_timeline);
    assert_eq!(state.plan_timeline.as_ref().map(Vec::len), Some(2));

    h.session.complete_plan_item_on(1, Weekday::Wed).await;
    let stored = h.session.store().load("4242").expect("snapshot");
    assert_eq!(stored.aura, 10);
    assert_eq!(stored.weekly[3], 10);
    assert!(stored.show_timeline);
}

#[tokio::test]
async fn reopened_session_restores_snapshot_without_second_greeting() {
    let mut first = harness(FakeBridge::new(modal()));
    first.session.reveal_main().await;
    first.session.complete_plan_item_on(5, Weekday::Sun).await;
    let store = first.session.close();

    let mut second = harness_with(
        FakeBridge::new(modal()),
        ScriptedWebhook::default(),
        Some(LINK),
        store,
    );
    second.session.reveal_main().await;

    let state = second.session.state();
    assert_eq!(state.chat.messages.len(), 1);
    assert_eq!(state.chat.messages[0].text, GREETING_TEXT);
    assert_eq!(state.gamification.aura, 10);
    assert_eq!(state.chat.quick_replies(), &QuickReply::ALL);
}

#[tokio::test]
async fn missing_user_id_uses_guest_slot() {
    let mut bridge = FakeBridge::new(modal());
    bridge.user_id = None;
    let mut h = harness(bridge);

    h.session.reveal_main().await;

    assert_eq!(h.session.state().user_id, "guest");
    assert!(h.session.store().load("guest").is_some());
    let restored = AppState::restore("guest", h.session.store().load("guest"));
    assert_eq!(restored.chat.messages.len(), 1);
}
