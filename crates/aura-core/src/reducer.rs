#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuraEffect {
    /// Write the current snapshot through to the store now.
    SaveSnapshot,
    ScrollToBottom,
    RequestFrame,
    SubmitWebhook {
        message: String,
    },
    RequestInvoiceLink {
        payload: String,
    },
    OpenInvoice {
        link: String,
    },
    Notify(String),
}

use super::actions::AuraAction;
use super::actions::RuntimeAction;
use super::actions::UserAction;
use super::chat::QuickReply;
use super::chat::EMPTY_REPLY_TEXT;
use super::chat::GREETING_TEXT;
use super::chat::NETWORK_ERROR_TEXT;
use super::chat::PAYMENT_FAILED_NOTICE;
use super::chat::PAYMENT_SUCCESS_NOTICE;
use super::chat::PAYMENT_UNAVAILABLE_NOTICE;
use super::chat::PLAN_PROMPT_TEXT;
use super::chat::PLAN_RECEIVED_TEXT;
use super::payment::invoice_payload;
use super::payment::is_auto_pay_param;
use super::payment::InvoiceChannel;
use super::payment::InvoiceStatus;
use super::payment::PaymentPhase;
use super::payment::PaymentTrigger;
use super::payment::SignalSource;
use super::plan::map_plan_to_timeline;
use super::router::route_webhook_payload;
use super::router::RoutedPayload;
use super::state::AppState;
use super::state::ChatMessage;
use super::state::MessageVariant;
use super::state::NodeStatus;

pub fn reduce(state: &mut AppState, action: AuraAction) -> Vec<AuraEffect> {
    match action {
        AuraAction::User(user) => reduce_user(state, user),
        AuraAction::Runtime(runtime) => reduce_runtime(state, runtime),
    }
}

fn reduce_user(state: &mut AppState, action: UserAction) -> Vec<AuraEffect> {
    match action {
        UserAction::RevealMain => {
            let was_visible = state.ui.main_visible;
            state.ui.main_visible = true;
            if state.chat.is_empty() {
                state.chat.quick_replies_offered = true;
                return append_bot(state, GREETING_TEXT, MessageVariant::Plain);
            }
            if was_visible {
                Vec::new()
            } else {
                vec![AuraEffect::RequestFrame]
            }
        }
        UserAction::SendMessage(text) => {
            if text.trim().is_empty() {
                return Vec::new();
            }
            state.chat.quick_replies_offered = false;
            state.chat.push(ChatMessage::user(text.clone()));
            vec![
                AuraEffect::SaveSnapshot,
                AuraEffect::ScrollToBottom,
                AuraEffect::SubmitWebhook { message: text },
            ]
        }
        UserAction::SelectQuickReply(reply) => select_quick_reply(state, reply),
        UserAction::TogglePlanView => {
            if !state.has_plan() {
                state.ui.show_timeline = false;
                return append_bot(state, PLAN_PROMPT_TEXT, MessageVariant::Plain);
            }
            state.ui.show_timeline = !state.ui.show_timeline;
            vec![AuraEffect::SaveSnapshot, AuraEffect::RequestFrame]
        }
        UserAction::CompletePlanItem { id, weekday } => {
            if !state.gamification.credit(id, weekday) {
                return Vec::new();
            }
            if let Some(node) = state
                .plan_timeline
                .as_mut()
                .and_then(|nodes| nodes.iter_mut().find(|node| node.id == id))
            {
                node.status = NodeStatus::Completed;
            }
            tracing::debug!(id, aura = state.gamification.aura, "plan item credited");
            vec![AuraEffect::SaveSnapshot, AuraEffect::RequestFrame]
        }
        UserAction::RequestPlus => start_payment(state, PaymentTrigger::User),
    }
}

fn reduce_runtime(state: &mut AppState, action: RuntimeAction) -> Vec<AuraEffect> {
    match action {
        RuntimeAction::WebhookResponded(payload) => match route_webhook_payload(&payload) {
            RoutedPayload::Plan(plan) => {
                let nodes = map_plan_to_timeline(&plan);
                tracing::info!(nodes = nodes.len(), "plan received");
                state.plan_timeline = Some(nodes);
                state.ui.show_timeline = true;
                append_bot(state, PLAN_RECEIVED_TEXT, MessageVariant::Bubble)
            }
            RoutedPayload::Text(text) | RoutedPayload::Raw(text) => {
                let text = if text.trim().is_empty() {
                    EMPTY_REPLY_TEXT.to_string()
                } else {
                    text
                };
                append_bot(state, text, MessageVariant::Plain)
            }
        },
        RuntimeAction::WebhookFailed(reason) => {
            tracing::warn!(%reason, "webhook send failed");
            append_bot(state, NETWORK_ERROR_TEXT, MessageVariant::Plain)
        }
        RuntimeAction::AppendBot { text, variant } => append_bot(state, text, variant),
        RuntimeAction::StartParam(param) => {
            if !is_auto_pay_param(&param) || state.payment.auto_pay_consumed {
                return Vec::new();
            }
            state.payment.auto_pay_consumed = true;
            start_payment(state, PaymentTrigger::StartParam)
        }
        RuntimeAction::InvoiceLinkReady(link) => {
            if state.payment.phase != PaymentPhase::LinkRequested {
                tracing::warn!(phase = state.payment.phase.label(), "stale invoice link ignored");
                return Vec::new();
            }
            state.payment.phase = PaymentPhase::InvoiceOpen {
                link: link.clone(),
                channel: InvoiceChannel::Modal,
            };
            state.payment.invoice_opened = true;
            vec![AuraEffect::OpenInvoice { link }]
        }
        RuntimeAction::InvoiceLinkFailed(reason) => {
            if state.payment.phase != PaymentPhase::LinkRequested {
                return Vec::new();
            }
            tracing::warn!(%reason, "invoice link creation failed");
            state.payment.phase = PaymentPhase::Idle;
            vec![AuraEffect::Notify(PAYMENT_UNAVAILABLE_NOTICE.to_string())]
        }
        RuntimeAction::InvoiceOpenedExternally => {
            if let PaymentPhase::InvoiceOpen { channel, .. } = &mut state.payment.phase {
                *channel = InvoiceChannel::External;
                return vec![AuraEffect::RequestFrame];
            }
            Vec::new()
        }
        RuntimeAction::InvoiceOpenFailed(reason) => {
            if !matches!(state.payment.phase, PaymentPhase::InvoiceOpen { .. }) {
                return Vec::new();
            }
            tracing::warn!(%reason, "invoice could not be opened");
            state.payment.phase = PaymentPhase::Idle;
            vec![AuraEffect::Notify(PAYMENT_UNAVAILABLE_NOTICE.to_string())]
        }
        RuntimeAction::InvoiceClosed { status, source } => invoice_closed(state, status, source),
    }
}

fn append_bot(state: &mut AppState, text: impl Into<String>, variant: MessageVariant) -> Vec<AuraEffect> {
    state.chat.push(ChatMessage::bot(text, variant));
    vec![AuraEffect::SaveSnapshot, AuraEffect::ScrollToBottom]
}

fn select_quick_reply(state: &mut AppState, reply: QuickReply) -> Vec<AuraEffect> {
    if !state.chat.quick_replies_offered {
        return Vec::new();
    }
    state.chat.quick_replies_offered = false;
    append_bot(state, reply.reply_text(), MessageVariant::Plain)
}

fn start_payment(state: &mut AppState, trigger: PaymentTrigger) -> Vec<AuraEffect> {
    if state.ui.is_plus {
        return vec![AuraEffect::RequestFrame];
    }
    if !state.payment.can_start() {
        tracing::debug!(?trigger, phase = state.payment.phase.label(), "payment already in flight");
        return Vec::new();
    }
    tracing::info!(?trigger, "requesting plus invoice link");
    state.payment.phase = PaymentPhase::LinkRequested;
    // The invoice may navigate away from the app, so flush before asking for the link.
    vec![
        AuraEffect::SaveSnapshot,
        AuraEffect::RequestInvoiceLink {
            payload: invoice_payload(&state.user_id),
        },
    ]
}

fn invoice_closed(state: &mut AppState, status: InvoiceStatus, source: SignalSource) -> Vec<AuraEffect> {
    let invoice_open = matches!(state.payment.phase, PaymentPhase::InvoiceOpen { .. });
    tracing::info!(status = status.label(), source = source.label(), "invoice closed");
    match status {
        InvoiceStatus::Paid => {
            if !state.payment.invoice_opened {
                tracing::warn!(source = source.label(), "paid signal without an opened invoice ignored");
                return Vec::new();
            }
            state.payment.phase = PaymentPhase::Idle;
            if state.ui.is_plus {
                return Vec::new();
            }
            state.ui.is_plus = true;
            vec![
                AuraEffect::SaveSnapshot,
                AuraEffect::Notify(PAYMENT_SUCCESS_NOTICE.to_string()),
                AuraEffect::RequestFrame,
            ]
        }
        InvoiceStatus::Failed if invoice_open => {
            state.payment.phase = PaymentPhase::Idle;
            vec![AuraEffect::Notify(PAYMENT_FAILED_NOTICE.to_string())]
        }
        InvoiceStatus::Cancelled if invoice_open => {
            state.payment.phase = PaymentPhase::Idle;
            Vec::new()
        }
        InvoiceStatus::Pending if source == SignalSource::Callback => {
            // The dialog closed without a verdict; only the event channel can settle it now.
            let Some(link) = state.payment.open_link().map(str::to_string) else {
                return Vec::new();
            };
            state.payment.phase = PaymentPhase::InvoiceOpen {
                link,
                channel: InvoiceChannel::External,
            };
            vec![AuraEffect::RequestFrame]
        }
        InvoiceStatus::Failed | InvoiceStatus::Cancelled | InvoiceStatus::Pending => Vec::new(),
    }
}

#[cfg(test)]
mod tests;
