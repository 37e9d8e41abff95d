//! Local stream renderers.

use serde_json::Value;
use std::collections::BTreeMap;

use filestore_core::endpoint::RenderMode;

use crate::event::{EventRecord, TIMESTAMP_KEY};

/// Render one enriched record as a single newline-terminated line.
pub fn render_line(record: &EventRecord, mode: RenderMode) -> String {
    match mode {
        RenderMode::KeyValue => render_key_value(record),
        RenderMode::Json => render_json(record),
    }
}

/// `@timestamp='…' event='…'` first in fixed order, the remaining fields
/// sorted by key. Strings are single-quoted, scalars printed bare.
fn render_key_value(record: &EventRecord) -> String {
    let mut line = String::new();
    if let Some(timestamp) = record.field(TIMESTAMP_KEY) {
        push_pair(&mut line, TIMESTAMP_KEY, timestamp);
    }
    push_pair(&mut line, "event", &Value::String(record.event.clone()));
    for (key, value) in &record.fields {
        if key == TIMESTAMP_KEY {
            continue;
        }
        push_pair(&mut line, key, value);
    }
    line.push('\n');
    line
}

fn push_pair(line: &mut String, key: &str, value: &Value) {
    if !line.is_empty() {
        line.push(' ');
    }
    line.push_str(key);
    line.push('=');
    match value {
        Value::String(text) => {
            line.push('\'');
            line.push_str(text);
            line.push('\'');
        }
        other => line.push_str(&other.to_string()),
    }
}

/// One JSON object per line, keys sorted, event name and timestamp included
/// as ordinary members.
fn render_json(record: &EventRecord) -> String {
    let mut object: BTreeMap<&str, &Value> = record.fields.iter().map(|(k, v)| (k.as_str(), v)).collect();
    let event = Value::String(record.event.clone());
    object.insert("event", &event);
    let mut line = serde_json::to_string(&object).unwrap_or_default();
    line.push('\n');
    line
}
