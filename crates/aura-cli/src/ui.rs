use std::fmt::Write as _;

use aura_core::state::ChatMessage;
use aura_core::state::ChatRole;
use aura_core::state::GamificationState;
use aura_core::state::MessageVariant;
use aura_core::state::PlanTimelineNode;
use aura_core::AppState;
use aura_exec::Presenter;

/// Prints notices to stdout. Scrolling and redraws have no terminal counterpart.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePresenter;

impl Presenter for ConsolePresenter {
    fn scroll_to_bottom(&self) {}

    fn notify(&self, text: &str) {
        println!("! {text}");
    }

    fn refresh(&self) {
        tracing::trace!("frame requested");
    }
}

pub fn render_message(message: &ChatMessage) -> String {
    let speaker = match message.role {
        ChatRole::User => "you",
        ChatRole::Bot => "aura",
    };
    let mut lines = message.text.lines();
    let first = lines.next().unwrap_or_default();
    let marker = match message.variant {
        MessageVariant::Bubble => "»",
        MessageVariant::Plain => " ",
    };
    let mut out = format!("{marker} {speaker:>4}: {first}");
    for line in lines {
        let _ = write!(out, "\n        {line}");
    }
    out
}

pub fn render_messages(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(render_message)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_timeline(nodes: &[PlanTimelineNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        let _ = writeln!(
            out,
            "#{:<3} [{}] {} ({}, {}%)",
            node.id,
            node.status.label(),
            node.title,
            node.category,
            node.energy
        );
        if !node.date.is_empty() {
            let _ = writeln!(out, "      {}", node.date);
        }
        if !node.content.is_empty() {
            let _ = writeln!(out, "      {}", node.content);
        }
        if !node.related_ids.is_empty() {
            let related: Vec<String> = node.related_ids.iter().map(u32::to_string).collect();
            let _ = writeln!(out, "      linked: {}", related.join(", "));
        }
    }
    out
}

pub fn render_activity(gamification: &GamificationState) -> String {
    let mut out = format!("aura {}\n", gamification.aura);
    for (day, value) in gamification.activity_series() {
        let bar = "#".repeat((value / 10) as usize);
        let _ = writeln!(out, "{day} {value:>4} {bar}");
    }
    out
}

pub fn render_state(state: &AppState) -> String {
    let mut out = format!(
        "user {} | aura {} | {}\n",
        state.user_id,
        state.gamification.aura,
        state.plus_label()
    );
    if state.chat.is_empty() {
        out.push_str("(no messages yet, run `aura open`)\n");
    } else {
        out.push_str(&render_messages(&state.chat.messages));
        out.push('\n');
    }
    let replies = state.chat.quick_replies();
    if !replies.is_empty() {
        let labels: Vec<&str> = replies.iter().map(|reply| reply.label()).collect();
        let _ = writeln!(out, "quick replies: {}", labels.join(" | "));
    }
    if state.ui.show_timeline {
        if !state.has_plan() {
            out.push_str("demo timeline:\n");
        }
        out.push_str(&render_timeline(&state.timeline_view()));
    }
    out
}
