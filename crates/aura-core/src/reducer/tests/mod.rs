use pretty_assertions::assert_eq;

pub(super) use super::reduce;
pub(super) use crate::actions::AuraAction;
pub(super) use crate::actions::RuntimeAction;
pub(super) use crate::actions::UserAction;
pub(super) use crate::chat::QuickReply;
pub(super) use crate::chat::GREETING_TEXT;
pub(super) use crate::payment::InvoiceChannel;
pub(super) use crate::payment::InvoiceStatus;
pub(super) use crate::payment::PaymentPhase;
pub(super) use crate::payment::SignalSource;
pub(super) use crate::reducer::AuraEffect;
pub(super) use crate::state::AppState;
pub(super) use crate::state::ChatRole;
pub(super) use crate::state::MessageVariant;
pub(super) use crate::state::NodeStatus;


fn state() -> AppState {
    AppState::new("4242")
}

fn run_user(state: &mut AppState, action: UserAction) -> Vec<AuraEffect> {
    reduce(state, AuraAction::User(action))
}

fn run_runtime(state: &mut AppState, action: RuntimeAction) -> Vec<AuraEffect> {
    reduce(state, AuraAction::Runtime(action))
}

fn texts(state: &AppState) -> Vec<&str> {
    state.chat.messages.iter().map(|m| m.text.as_str()).collect()
}

fn last_message(state: &AppState) -> (ChatRole, &str, MessageVariant) {
    let message = state.chat.messages.last().expect("at least one message");
    (message.role, message.text.as_str(), message.variant)
}

const PLAN_PAYLOAD: &str = r#"{"title":"Ноги","exercises":[
    {"id":1,"name":"Squat","sets":3,"reps":10,"relatedIds":[2]},
    {"id":2,"name":"Lunge","relatedIds":[1,3]},
    {"id":3,"name":"Stretch","category":"Растяжка","relatedIds":[2,9]}
]}"#;

fn with_plan() -> AppState {
    let mut state = state();
    run_runtime(
        &mut state,
        RuntimeAction::WebhookResponded(PLAN_PAYLOAD.to_string()),
    );
    state
}

fn assert_persisted(effects: &[AuraEffect]) {
    assert!(
        effects.contains(&AuraEffect::SaveSnapshot),
        "expected write-through in {effects:?}"
    );
}

#[test]
fn fresh_state_has_no_effects_on_noop_actions() {
    let mut state = state();
    assert_eq!(
        run_user(&mut state, UserAction::SendMessage("   ".to_string())),
        Vec::new()
    );
    assert_eq!(
        run_runtime(&mut state, RuntimeAction::InvoiceLinkReady("l".to_string())),
        Vec::new()
    );
    assert!(state.chat.is_empty());
}
