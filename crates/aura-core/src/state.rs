use std::collections::BTreeSet;

use chrono::Weekday;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use serde::Serialize;

use crate::chat::QuickReply;
use crate::chat::GREETING_TEXT;
use crate::payment::PaymentState;

pub const GUEST_USER_ID: &str = "guest";
pub const AURA_REWARD: u64 = 10;

/// Falls back to the shared guest slot when the host cannot tell us who the user is.
pub fn resolve_user_id(bridge_user_id: Option<&str>) -> String {
    bridge_user_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| GUEST_USER_ID.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Bot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageVariant {
    /// Unframed text with animated reveal.
    Plain,
    #[default]
    Bubble,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub text: String,
    #[serde(default)]
    pub variant: MessageVariant,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: new_message_id(),
            role: ChatRole::User,
            text: text.into(),
            variant: MessageVariant::Bubble,
        }
    }

    pub fn bot(text: impl Into<String>, variant: MessageVariant) -> Self {
        Self {
            id: new_message_id(),
            role: ChatRole::Bot,
            text: text.into(),
            variant,
        }
    }
}

/// `<epoch-millis>-<8 random chars>`; unique within a session, carries no ordering.
pub fn new_message_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();
    format!("{}-{suffix}", chrono::Utc::now().timestamp_millis())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeStatus {
    Completed,
    InProgress,
    #[default]
    Pending,
}

impl NodeStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::InProgress => "in-progress",
            Self::Pending => "pending",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanTimelineNode {
    pub id: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: String,
    /// Icon reference name resolved by the view layer.
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub related_ids: Vec<u32>,
    #[serde(default)]
    pub status: NodeStatus,
    #[serde(default)]
    pub energy: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamificationState {
    pub aura: u64,
    pub completed_ids: BTreeSet<u32>,
    /// Lifetime totals bucketed by weekday, 0 = Sunday. Never reset.
    pub weekly: [u32; 7],
}

pub const ACTIVITY_DAY_LABELS: [&str; 7] = ["S", "M", "T", "W", "T", "F", "S"];

impl GamificationState {
    /// Returns false when the id was already credited.
    pub fn credit(&mut self, id: u32, weekday: Weekday) -> bool {
        if !self.completed_ids.insert(id) {
            return false;
        }
        self.aura = self.aura.saturating_add(AURA_REWARD);
        let slot = &mut self.weekly[weekday_index(weekday)];
        *slot = slot.saturating_add(AURA_REWARD as u32);
        true
    }

    pub fn is_consistent(&self) -> bool {
        self.aura == AURA_REWARD * self.completed_ids.len() as u64
    }

    pub fn activity_series(&self) -> Vec<(&'static str, u32)> {
        ACTIVITY_DAY_LABELS
            .iter()
            .copied()
            .zip(self.weekly.iter().copied())
            .collect()
    }

    pub fn activity_total(&self) -> u64 {
        self.weekly.iter().map(|value| u64::from(*value)).sum()
    }
}

pub fn weekday_index(weekday: Weekday) -> usize {
    weekday.num_days_from_sunday() as usize
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UiState {
    /// Splash finished, chat visible. Not persisted.
    pub main_visible: bool,
    pub show_timeline: bool,
    /// Only ever set on a paid signal.
    pub is_plus: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatState {
    pub messages: Vec<ChatMessage>,
    pub quick_replies_offered: bool,
}

impl ChatState {
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn quick_replies(&self) -> &'static [QuickReply] {
        if self.quick_replies_offered {
            &QuickReply::ALL
        } else {
            &[]
        }
    }

    /// The offer survives a reload only while the greeting is the whole history.
    pub fn greeting_only(&self) -> bool {
        matches!(self.messages.as_slice(), [only] if only.text == GREETING_TEXT)
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub user_id: String,
    pub chat: ChatState,
    pub plan_timeline: Option<Vec<PlanTimelineNode>>,
    pub ui: UiState,
    pub gamification: GamificationState,
    pub payment: PaymentState,
}

impl AppState {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            chat: ChatState::default(),
            plan_timeline: None,
            ui: UiState::default(),
            gamification: GamificationState::default(),
            payment: PaymentState::default(),
        }
    }

    pub fn has_plan(&self) -> bool {
        self.plan_timeline
            .as_ref()
            .is_some_and(|nodes| !nodes.is_empty())
    }

    /// What the orbital view should draw: the loaded plan or the demo timeline.
    pub fn timeline_view(&self) -> Vec<PlanTimelineNode> {
        match &self.plan_timeline {
            Some(nodes) if !nodes.is_empty() => nodes.clone(),
            _ => placeholder_timeline(),
        }
    }

    pub fn plus_label(&self) -> &'static str {
        if self.ui.is_plus {
            "Plus активен"
        } else {
            "Перейти на Plus"
        }
    }
}

pub fn placeholder_timeline() -> Vec<PlanTimelineNode> {
    #[allow(clippy::too_many_arguments)]
    fn node(
        id: u32,
        title: &str,
        date: &str,
        content: &str,
        icon: &str,
        related_ids: &[u32],
        status: NodeStatus,
        energy: u8,
    ) -> PlanTimelineNode {
        PlanTimelineNode {
            id,
            title: title.to_string(),
            date: date.to_string(),
            content: content.to_string(),
            category: title.to_string(),
            icon: icon.to_string(),
            related_ids: related_ids.to_vec(),
            status,
            energy,
        }
    }

    vec![
        node(
            1,
            "Planning",
            "Jan 2024",
            "Project planning and requirements gathering phase.",
            "Calendar",
            &[2],
            NodeStatus::Completed,
            100,
        ),
        node(
            2,
            "Design",
            "Feb 2024",
            "UI/UX design and system architecture.",
            "FileText",
            &[1, 3],
            NodeStatus::Completed,
            90,
        ),
        node(
            3,
            "Development",
            "Mar 2024",
            "Core features implementation and testing.",
            "Code",
            &[2, 4],
            NodeStatus::InProgress,
            60,
        ),
        node(
            4,
            "Testing",
            "Apr 2024",
            "User testing and bug fixes.",
            "User",
            &[3, 5],
            NodeStatus::Pending,
            30,
        ),
        node(
            5,
            "Release",
            "May 2024",
            "Final deployment and release.",
            "Clock",
            &[4],
            NodeStatus::Pending,
            10,
        ),
    ]
}
