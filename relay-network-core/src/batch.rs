//! Query batching.
//!
//! A batched call posts a JSON array of operations, each tagged with its
//! request id. Servers answer with an array that is matched back to the
//! requests either by id (`[{"id": .., "payload": {..}}]`) or, when entries
//! carry no id, by position (`[{"data": ..}, ..]`).

use relay_network_http::Response;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::classify::{MalformedReason, Outcome, classify_payload};
use crate::{Operation, RelayRequest};

/// One operation inside a batched body.
#[derive(Debug, Serialize)]
struct BatchEntry<'a> {
    id: &'a str,
    #[serde(flatten)]
    operation: &'a Operation,
}

/// Serialize requests into a batched body.
pub fn encode_batch<'a>(
    requests: impl IntoIterator<Item = &'a RelayRequest>,
) -> serde_json::Result<String> {
    let entries: Vec<BatchEntry<'_>> = requests
        .into_iter()
        .map(|request| BatchEntry {
            id: request.id(),
            operation: request.operation(),
        })
        .collect();
    serde_json::to_string(&entries)
}

/// Classify a response to a batched call, one outcome per id, in order.
pub fn classify_batch(response: &Response, ids: &[String]) -> Vec<Outcome> {
    if !response.is_success() {
        return vec![Outcome::HttpStatus(response.clone()); ids.len()];
    }

    let payload = match response.json::<Value>() {
        Ok(payload) => payload,
        Err(e) => {
            let outcome = Outcome::Malformed {
                reason: MalformedReason::InvalidJson(e.to_string()),
                payload: None,
            };
            return vec![outcome; ids.len()];
        }
    };

    let entries = match payload {
        Value::Array(entries) => entries,
        payload => {
            let outcome = Outcome::Malformed {
                reason: MalformedReason::NotABatch,
                payload: Some(payload),
            };
            return vec![outcome; ids.len()];
        }
    };

    let keyed = !entries.is_empty() && entries.iter().all(|entry| entry.get("id").is_some());

    let mut payloads: Vec<Option<Value>> = if keyed {
        let mut by_id: HashMap<String, Value> = entries
            .into_iter()
            .filter_map(|entry| {
                let id = id_string(entry.get("id")?);
                Some((id, unwrap_entry(entry)))
            })
            .collect();
        ids.iter().map(|id| by_id.remove(id)).collect()
    } else {
        let mut entries = entries.into_iter();
        ids.iter().map(|_| entries.next()).collect()
    };

    ids.iter()
        .zip(payloads.iter_mut())
        .map(|(id, payload)| match payload.take() {
            Some(payload) => classify_payload(payload),
            None => Outcome::Malformed {
                reason: MalformedReason::MissingBatchEntry { id: id.clone() },
                payload: None,
            },
        })
        .collect()
}

fn id_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `{"id", "payload"}` entries yield their payload; other entries are the payload.
fn unwrap_entry(entry: Value) -> Value {
    match entry {
        Value::Object(mut map) if map.contains_key("payload") => {
            map.remove("payload").unwrap_or(Value::Null)
        }
        entry => entry,
    }
}
