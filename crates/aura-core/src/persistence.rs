use std::collections::BTreeSet;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::error::AuraError;
use crate::state::AppState;
use crate::state::ChatMessage;
use crate::state::ChatState;
use crate::state::GamificationState;
use crate::state::PlanTimelineNode;
use crate::state::UiState;

pub const STORAGE_KEY_PREFIX: &str = "user_state_";

pub fn storage_key(user_id: &str) -> String {
    format!("{STORAGE_KEY_PREFIX}{user_id}")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSnapshot {
    pub messages: Vec<ChatMessage>,
    pub plan_timeline: Option<Vec<PlanTimelineNode>>,
    pub show_timeline: bool,
    pub is_plus: bool,
    pub aura: u64,
    pub completed_ids: BTreeSet<u32>,
    pub weekly: [u32; 7],
    pub saved_at: i64,
}

impl PersistedSnapshot {
    /// Lenient decode: a field with the wrong shape falls back to its default instead of
    /// discarding the whole snapshot.
    pub fn from_json(raw: &str) -> Result<Self, AuraError> {
        let value: Value = serde_json::from_str(raw)?;
        let Value::Object(map) = value else {
            return Err(AuraError::MalformedPayload("snapshot is not an object".to_string()));
        };
        Ok(Self {
            messages: lenient_field(&map, "messages"),
            plan_timeline: lenient_field(&map, "planTimeline"),
            show_timeline: lenient_field(&map, "showTimeline"),
            is_plus: lenient_field(&map, "isPlus"),
            aura: lenient_field(&map, "aura"),
            completed_ids: lenient_field(&map, "completedIds"),
            weekly: lenient_field(&map, "weekly"),
            saved_at: lenient_field(&map, "savedAt"),
        })
    }

    pub fn to_json(&self) -> Result<String, AuraError> {
        Ok(serde_json::to_string(self)?)
    }
}

fn lenient_field<T: DeserializeOwned + Default>(map: &Map<String, Value>, key: &str) -> T {
    match map.get(key) {
        None | Some(Value::Null) => T::default(),
        Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|err| {
            tracing::warn!(field = key, error = %err, "snapshot field ignored");
            T::default()
        }),
    }
}

impl AppState {
    /// Rebuilds state from the stored snapshot; `None` yields all defaults.
    pub fn restore(user_id: impl Into<String>, snapshot: Option<PersistedSnapshot>) -> Self {
        let mut state = AppState::new(user_id);
        let Some(snapshot) = snapshot else {
            return state;
        };
        state.chat = ChatState {
            messages: snapshot.messages,
            quick_replies_offered: false,
        };
        state.chat.quick_replies_offered = state.chat.greeting_only();
        state.plan_timeline = snapshot.plan_timeline;
        state.ui = UiState {
            main_visible: false,
            show_timeline: snapshot.show_timeline,
            is_plus: snapshot.is_plus,
        };
        state.gamification = GamificationState {
            aura: snapshot.aura,
            completed_ids: snapshot.completed_ids,
            weekly: snapshot.weekly,
        };
        if !state.gamification.is_consistent() {
            tracing::warn!(
                aura = state.gamification.aura,
                completed = state.gamification.completed_ids.len(),
                "restored aura does not match completed ids"
            );
        }
        state
    }

    pub fn snapshot(&self, saved_at_ms: i64) -> PersistedSnapshot {
        PersistedSnapshot {
            messages: self.chat.messages.clone(),
            plan_timeline: self.plan_timeline.clone(),
            show_timeline: self.ui.show_timeline,
            is_plus: self.ui.is_plus,
            aura: self.gamification.aura,
            completed_ids: self.gamification.completed_ids.clone(),
            weekly: self.gamification.weekly,
            saved_at: saved_at_ms,
        }
    }
}

/// A persistent string slot addressed by key.
pub trait KeyValueSlot {
    fn read(&self, key: &str) -> Result<Option<String>, AuraError>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), AuraError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemorySlot {
    entries: HashMap<String, String>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueSlot for MemorySlot {
    fn read(&self, key: &str) -> Result<Option<String>, AuraError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), AuraError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One JSON file per key under `dir`.
#[derive(Debug, Clone)]
pub struct FileSlot {
    dir: PathBuf,
}

impl FileSlot {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, AuraError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file_name}.json"))
    }
}

impl KeyValueSlot for FileSlot {
    fn read(&self, key: &str) -> Result<Option<String>, AuraError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(path)?))
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), AuraError> {
        let mut opts = OpenOptions::new();
        opts.create(true).write(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(0o600);
        }
        let mut file = opts.open(self.path_for(key))?;
        file.write_all(value.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

/// Per-user snapshot store. Never surfaces a fault to its caller.
#[derive(Debug)]
pub struct SnapshotStore<S> {
    slot: S,
}

impl<S: KeyValueSlot> SnapshotStore<S> {
    pub fn new(slot: S) -> Self {
        Self { slot }
    }

    pub fn load(&self, user_id: &str) -> Option<PersistedSnapshot> {
        let key = storage_key(user_id);
        let raw = match self.slot.read(&key) {
            Ok(raw) => raw?,
            Err(err) => {
                tracing::warn!(%key, error = %err, "snapshot read failed");
                return None;
            }
        };
        match PersistedSnapshot::from_json(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::warn!(%key, error = %err, "snapshot restore failed");
                None
            }
        }
    }

    pub fn save(&mut self, user_id: &str, snapshot: &PersistedSnapshot) {
        let key = storage_key(user_id);
        let result = snapshot
            .to_json()
            .and_then(|encoded| self.slot.write(&key, &encoded));
        if let Err(err) = result {
            tracing::warn!(%key, error = %err, "snapshot save failed");
        }
    }

    pub fn mutate(&mut self, user_id: &str, f: impl FnOnce(&mut PersistedSnapshot)) {
        let mut snapshot = self.load(user_id).unwrap_or_default();
        f(&mut snapshot);
        self.save(user_id, &snapshot);
    }
}
