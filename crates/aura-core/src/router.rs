use serde_json::Map;
use serde_json::Value;

/// Keys under which the coaching service nests the exercise list.
const PLAN_KEYS: &[&str] = &["plan", "exercises", "items", "timeline", "workouts", "steps"];
/// Any one of these marks a bare array element as an exercise.
pub(crate) const TITLE_KEYS: &[&str] = &["title", "name", "exercise"];
/// Payloads may be JSON text wrapped in a JSON string at most this many times.
const MAX_UNWRAP_DEPTH: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct PlanPayload {
    pub title: Option<String>,
    pub items: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoutedPayload {
    Plan(PlanPayload),
    /// Display text, already extracted from any `[{"output": ...}]` envelope.
    Text(String),
    /// Valid JSON that is neither a plan nor a text envelope, re-serialized.
    Raw(String),
}

impl RoutedPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Plan(_) => "plan",
            Self::Text(_) => "text",
            Self::Raw(_) => "raw",
        }
    }
}

pub fn route_webhook_payload(payload: &str) -> RoutedPayload {
    let routed = route_at_depth(payload, 0);
    tracing::debug!(kind = routed.kind(), bytes = payload.len(), "routed webhook payload");
    routed
}

fn route_at_depth(payload: &str, depth: usize) -> RoutedPayload {
    let value = match serde_json::from_str::<Value>(payload.trim()) {
        Ok(value) => value,
        Err(_) => return RoutedPayload::Text(payload.to_string()),
    };

    if let Some(plan) = detect_plan(&value) {
        return RoutedPayload::Plan(plan);
    }
    if let Some(text) = envelope_output(&value) {
        return RoutedPayload::Text(text.to_string());
    }
    match value {
        Value::String(inner) if depth + 1 < MAX_UNWRAP_DEPTH => route_at_depth(&inner, depth + 1),
        Value::String(inner) => RoutedPayload::Text(inner),
        other => RoutedPayload::Raw(other.to_string()),
    }
}

/// Plan detection runs before text extraction, so an envelope whose `output` carries a
/// plan is routed as a plan.
fn detect_plan(value: &Value) -> Option<PlanPayload> {
    if let Some(plan) = detect_plan_shape(value, 0) {
        return Some(plan);
    }
    match envelope_field(value)? {
        Value::String(text) => {
            let inner = serde_json::from_str::<Value>(text.trim()).ok()?;
            detect_plan_shape(&inner, 0)
        }
        other => detect_plan_shape(other, 0),
    }
}

fn detect_plan_shape(value: &Value, depth: usize) -> Option<PlanPayload> {
    match value {
        Value::Object(map) => {
            let title = string_field(map, &["title", "name"]);
            for key in PLAN_KEYS {
                match map.get(*key) {
                    Some(Value::Array(items)) if keyed_items_look_like_plan(items) => {
                        return Some(PlanPayload {
                            title,
                            items: objects(items),
                        });
                    }
                    Some(nested @ Value::Object(_)) if depth == 0 => {
                        if let Some(mut plan) = detect_plan_shape(nested, depth + 1) {
                            plan.title = plan.title.or(title);
                            return Some(plan);
                        }
                    }
                    _ => {}
                }
            }
            None
        }
        Value::Array(items) if bare_items_look_like_plan(items) => Some(PlanPayload {
            title: None,
            items: objects(items),
        }),
        _ => None,
    }
}

fn keyed_items_look_like_plan(items: &[Value]) -> bool {
    !items.is_empty() && items.iter().all(Value::is_object)
}

fn bare_items_look_like_plan(items: &[Value]) -> bool {
    !items.is_empty()
        && items.iter().all(|item| {
            item.as_object()
                .is_some_and(|map| string_field(map, TITLE_KEYS).is_some())
        })
}

fn objects(items: &[Value]) -> Vec<Map<String, Value>> {
    items
        .iter()
        .filter_map(|item| item.as_object().cloned())
        .collect()
}

fn envelope_field(value: &Value) -> Option<&Value> {
    value.as_array()?.first()?.as_object()?.get("output")
}

fn envelope_output(value: &Value) -> Option<&str> {
    envelope_field(value)?.as_str()
}

pub(crate) fn string_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        map.get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    })
}
