use std::collections::BTreeSet;
use std::collections::HashMap;

use serde_json::Map;
use serde_json::Value;

use crate::router::string_field;
use crate::router::PlanPayload;
use crate::router::TITLE_KEYS;
use crate::state::NodeStatus;
use crate::state::PlanTimelineNode;

const DATE_KEYS: &[&str] = &["date", "day", "time", "when"];
const CONTENT_KEYS: &[&str] = &["content", "description", "details", "notes"];
const CATEGORY_KEYS: &[&str] = &["category", "type", "muscleGroup", "focus"];
const RELATED_KEYS: &[&str] = &["relatedIds", "related_ids", "related"];
const DEFAULT_CATEGORY: &str = "Тренировка";
const MAX_ENERGY: u8 = 100;

/// Turns a routed plan into orbital timeline nodes, one per source item.
///
/// Source ids are reused when every item carries a distinct positive integer id;
/// otherwise nodes are numbered from 1 in source order and source relations are
/// translated where the referenced item had an id. Relations that do not resolve to a
/// node in the output are dropped.
pub fn map_plan_to_timeline(plan: &PlanPayload) -> Vec<PlanTimelineNode> {
    let source_ids: Vec<Option<u32>> = plan.items.iter().map(|item| int_field(item, "id")).collect();
    let reuse_source_ids = source_ids.iter().all(Option::is_some)
        && source_ids.iter().flatten().collect::<BTreeSet<_>>().len() == source_ids.len();

    let ids: Vec<u32> = if reuse_source_ids {
        source_ids.iter().flatten().copied().collect()
    } else {
        (1..=plan.items.len() as u32).collect()
    };
    let translate: HashMap<u32, u32> = source_ids
        .iter()
        .zip(ids.iter())
        .filter_map(|(source, assigned)| source.map(|source| (source, *assigned)))
        .collect();
    let known: BTreeSet<u32> = ids.iter().copied().collect();

    plan.items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let id = ids[index];
            let related_ids = match related_field(item) {
                Some(related) => related
                    .into_iter()
                    .filter_map(|source| translate.get(&source).copied())
                    .filter(|related| *related != id && known.contains(related))
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect(),
                None => neighbours(&ids, index),
            };
            let category = string_field(item, CATEGORY_KEYS)
                .or_else(|| plan.title.clone())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
            PlanTimelineNode {
                id,
                title: string_field(item, TITLE_KEYS)
                    .unwrap_or_else(|| format!("Упражнение {}", index + 1)),
                date: string_field(item, DATE_KEYS).unwrap_or_default(),
                content: string_field(item, CONTENT_KEYS).unwrap_or_else(|| workload_summary(item)),
                icon: string_field(item, &["icon"]).unwrap_or_else(|| icon_for(&category).to_string()),
                category,
                related_ids,
                status: item
                    .get("status")
                    .and_then(Value::as_str)
                    .map(parse_status)
                    .unwrap_or_default(),
                energy: energy_field(item),
            }
        })
        .collect()
}

pub fn parse_status(value: &str) -> NodeStatus {
    match value.trim().to_ascii_lowercase().as_str() {
        "completed" | "complete" | "done" => NodeStatus::Completed,
        "in-progress" | "in_progress" | "inprogress" | "active" => NodeStatus::InProgress,
        _ => NodeStatus::Pending,
    }
}

fn neighbours(ids: &[u32], index: usize) -> Vec<u32> {
    let mut related = Vec::with_capacity(2);
    if index > 0 {
        related.push(ids[index - 1]);
    }
    if let Some(next) = ids.get(index + 1) {
        related.push(*next);
    }
    related
}

fn int_field(item: &Map<String, Value>, key: &str) -> Option<u32> {
    as_u32(item.get(key)?)
}

fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
    .filter(|id| *id > 0)
}

fn related_field(item: &Map<String, Value>) -> Option<Vec<u32>> {
    RELATED_KEYS.iter().find_map(|key| {
        item.get(*key)
            .and_then(Value::as_array)
            .map(|values| values.iter().filter_map(as_u32).collect())
    })
}

fn energy_field(item: &Map<String, Value>) -> u8 {
    let Some(value) = item.get("energy") else {
        return 0;
    };
    let energy = match value {
        Value::Number(number) => number.as_f64().unwrap_or(0.0),
        Value::String(text) => text.trim().trim_end_matches('%').parse().unwrap_or(0.0),
        _ => 0.0,
    };
    energy.round().clamp(0.0, f64::from(MAX_ENERGY)) as u8
}

fn workload_summary(item: &Map<String, Value>) -> String {
    let scalar = |key: &str| match item.get(key) {
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::String(text)) if !text.trim().is_empty() => Some(text.trim().to_string()),
        _ => None,
    };
    let mut parts = Vec::new();
    match (scalar("sets"), scalar("reps")) {
        (Some(sets), Some(reps)) => parts.push(format!("{sets} × {reps}")),
        (Some(sets), None) => parts.push(format!("{sets} подх.")),
        (None, Some(reps)) => parts.push(format!("{reps} повт.")),
        (None, None) => {}
    }
    if let Some(duration) = scalar("duration") {
        parts.push(duration);
    }
    parts.join(", ")
}

fn icon_for(category: &str) -> &'static str {
    let category = category.to_lowercase();
    if ["кардио", "cardio", "бег", "run"]
        .iter()
        .any(|needle| category.contains(needle))
    {
        "HeartPulse"
    } else if ["растяж", "stretch", "гибк", "mobility"]
        .iter()
        .any(|needle| category.contains(needle))
    {
        "StretchHorizontal"
    } else if ["отдых", "rest", "recovery"]
        .iter()
        .any(|needle| category.contains(needle))
    {
        "Moon"
    } else {
        "Dumbbell"
    }
}
