//! Soroban RPC client: polls `getEvents` and decodes sale and claim events.
//!
//! ## Resilience
//!
//! * Exponential back-off is applied when the RPC returns an error or rate-limit
//!   response, up to [`MAX_BACKOFF_SECS`] seconds.
//! * Transient network errors (connection reset, timeout) are retried silently.
//!
//! ## Event encoding
//!
//! Requests ask for `xdrFormat: "json"`, so topics and data arrive as
//! `topicJson`/`valueJson` with struct data as `{"map":[{key,val}…]}`. The
//! base64 `topic`/`value` form of older RPC nodes is still accepted, but only
//! symbol topics can be read from it.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::errors::{IndexerError, Result};
use crate::events::{EventKind, SaleEvent};

const MAX_BACKOFF_SECS: u64 = 60;
const INITIAL_BACKOFF_SECS: u64 = 2;

// ─────────────────────────────────────────────────────────
// JSON-RPC response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    pub result: Option<EventsResult>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct EventsResult {
    pub events: Vec<RawEvent>,
    pub cursor: Option<String>,
    #[serde(rename = "latestLedger")]
    pub latest_ledger: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
#[allow(dead_code)]
pub struct RawEvent {
    /// XDR-encoded topic list
    #[serde(default)]
    pub topic: Vec<String>,
    /// XDR-encoded event value / data
    #[serde(default)]
    pub value: Value,
    #[serde(rename = "topicJson")]
    pub topic_json: Option<Vec<Value>>,
    #[serde(rename = "valueJson")]
    pub value_json: Option<Value>,
    #[serde(rename = "contractId")]
    pub contract_id: Option<String>,
    #[serde(rename = "txHash")]
    pub tx_hash: Option<String>,
    pub id: Option<String>,
    pub ledger: Option<u64>,
    #[serde(rename = "ledgerClosedAt")]
    pub ledger_closed_at: Option<String>,
    #[serde(rename = "inSuccessfulContractCall")]
    pub in_successful_contract_call: Option<bool>,
    #[serde(rename = "pagingToken")]
    pub paging_token: Option<String>,
}

// ─────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────

/// Fetch a page of events emitted by any of `contract_ids`.
///
/// * `start_ledger`: the ledger sequence to scan from (inclusive).
/// * `cursor`: optional opaque pagination cursor from a previous response.
/// * `limit`: maximum number of events to return.
///
/// Returns `(events, next_cursor, latest_ledger)`.
pub async fn fetch_events(
    client: &Client,
    rpc_url: &str,
    contract_ids: &[String],
    start_ledger: u32,
    cursor: Option<&str>,
    limit: u32,
) -> Result<(Vec<RawEvent>, Option<String>, Option<u64>)> {
    let mut backoff = INITIAL_BACKOFF_SECS;

    loop {
        let params = build_params(contract_ids, start_ledger, cursor, limit);

        let response = client
            .post(rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "getEvents",
                "params": params,
            }))
            .send()
            .await;

        match response {
            Err(e) => {
                warn!("RPC request failed (will retry in {backoff}s): {e}");
                tokio::time::sleep(Duration::from_secs(backoff)).await;
                backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
                continue;
            }
            Ok(resp) => {
                let status = resp.status();
                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    warn!("Rate-limited by RPC (will retry in {backoff}s)");
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
                    continue;
                }

                let body: RpcResponse = resp.json().await?;

                if let Some(err) = body.error {
                    // Code -32600 / -32601 are hard failures; everything else we retry
                    if err.code == -32600 || err.code == -32601 {
                        return Err(IndexerError::Rpc {
                            code: err.code,
                            message: err.message,
                        });
                    }
                    warn!(
                        "RPC soft error (will retry in {backoff}s): {} {}",
                        err.code, err.message
                    );
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
                    continue;
                }

                let result = body.result.ok_or_else(|| {
                    IndexerError::EventParse("Empty result from getEvents".to_string())
                })?;

                debug!(
                    "Fetched {} events (latest_ledger={:?})",
                    result.events.len(),
                    result.latest_ledger
                );

                return Ok((result.events, result.cursor, result.latest_ledger));
            }
        }
    }
}

fn build_params(
    contract_ids: &[String],
    start_ledger: u32,
    cursor: Option<&str>,
    limit: u32,
) -> Value {
    let mut params = json!({
        "filters": [
            {
                "type": "contract",
                "contractIds": contract_ids
            }
        ],
        "pagination": {
            "limit": limit
        },
        "xdrFormat": "json"
    });

    if let Some(cur) = cursor {
        params["pagination"]["cursor"] = json!(cur);
    } else {
        params["startLedger"] = json!(start_ledger);
    }

    params
}

// ─────────────────────────────────────────────────────────
// Event decoding
// ─────────────────────────────────────────────────────────

/// Decode a list of raw RPC events into [`SaleEvent`] structs.
pub fn decode_events(raw: &[RawEvent], contract_id: &str) -> Vec<SaleEvent> {
    raw.iter()
        .filter_map(|e| decode_single(e, contract_id))
        .collect()
}

fn decode_single(raw: &RawEvent, contract_id: &str) -> Option<SaleEvent> {
    // Extract leading topic symbol to determine event type.
    let topics: Vec<String> = match &raw.topic_json {
        Some(json) => json.iter().map(Value::to_string).collect(),
        None => raw.topic.clone(),
    };
    let first_topic = topics.first()?;
    let kind = EventKind::from_topic(&extract_symbol(first_topic));

    let ledger = raw.ledger.unwrap_or(0) as i64;
    let timestamp = raw
        .ledger_closed_at
        .as_deref()
        .and_then(parse_iso_to_unix)
        .unwrap_or(0);

    // Per-identity events carry the address as their second topic.
    let topic_actor = topics.get(1).map(|t| extract_topic_value(t));

    let mut event = SaleEvent {
        event_id: event_id(raw, kind, ledger),
        event_type: kind.as_str().to_string(),
        ledger,
        timestamp,
        contract_id: raw
            .contract_id
            .clone()
            .unwrap_or_else(|| contract_id.to_string()),
        tx_hash: raw.tx_hash.clone(),
        ..Default::default()
    };
    let data = raw.value_json.as_ref().unwrap_or(&raw.value);
    decode_data(data, kind, topic_actor, &mut event);
    if kind.is_terminal() {
        tracing::info!("Sale closed ({}) at ledger {ledger}", kind.as_str());
    }
    Some(event)
}

/// Pull apart the JSON `value` blob that Soroban returns for event data.
/// The XDR is decoded by the RPC into a `{"type":…, …}` JSON object.
fn decode_data(value: &Value, kind: EventKind, topic_actor: Option<String>, ev: &mut SaleEvent) {
    match kind {
        EventKind::Contributed => {
            ev.actor = topic_actor;
            ev.amount = extract_field(value, &["cost"]);
            ev.units = extract_field(value, &["units"]);
            ev.price = extract_field(value, &["spot_price"]);
            ev.total_raised = extract_field(value, &["total_raised"]);
            ev.total_sold = extract_field(value, &["total_sold"]);
        }
        EventKind::Finalized | EventKind::RefundsEnabled | EventKind::EmergencyRefund => {
            ev.actor = topic_actor;
            ev.total_raised = extract_field(value, &["total_raised"]);
            ev.total_sold = extract_field(value, &["total_sold"]);
        }
        EventKind::Withdrawn | EventKind::Claimed => {
            ev.actor = topic_actor;
            ev.amount = extract_field(value, &["amount"]);
        }
        EventKind::Refunded | EventKind::Recovered => {
            ev.actor = topic_actor;
            ev.amount = extract_scalar(value);
        }
        EventKind::TrancheAdded => {
            ev.units = extract_field(value, &["supply"]);
            ev.price = extract_field(value, &["price"]);
        }
        EventKind::Initialized => {
            ev.actor = extract_field(value, &["operator"]);
        }
        EventKind::ClaimingEnabled => {
            ev.amount = extract_field(value, &["total_allocated"]);
        }
        EventKind::Snapshot => {
            ev.units = extract_scalar(value);
        }
        EventKind::ConfigSet
        | EventKind::TranchesCleared
        | EventKind::CurveSet
        | EventKind::Opened
        | EventKind::TrancheAdvanced
        | EventKind::DeadlineExtended
        | EventKind::Paused
        | EventKind::Unpaused
        | EventKind::Unknown => {}
    }
}

/// Stable identity for idempotent inserts. Prefers the RPC event id.
fn event_id(raw: &RawEvent, kind: EventKind, ledger: i64) -> String {
    raw.id
        .clone()
        .or_else(|| raw.paging_token.clone())
        .unwrap_or_else(|| {
            format!(
                "{ledger}:{}:{}:{}",
                raw.tx_hash.as_deref().unwrap_or("-"),
                kind.as_str(),
                raw.topic.join("|")
            )
        })
}

fn extract_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| field(value, key))
        .find_map(extract_scalar)
}

/// A struct field, either from a plain object or from an XDR-JSON `ScMap`
/// (`{"map":[{"key":{"symbol":…},"val":…}]}`).
fn field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value.get("map").and_then(Value::as_array) {
        Some(entries) => entries
            .iter()
            .find(|e| {
                e.get("key")
                    .and_then(|k| k.get("symbol"))
                    .and_then(Value::as_str)
                    == Some(key)
            })
            .and_then(|e| e.get("val")),
        None => value.get(key),
    }
}

/// A bare number or string, or the `value` of a typed `{"type":…,"value":…}` wrapper.
fn extract_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => match map.get("value") {
            Some(inner) => extract_scalar(inner),
            // single-key typed form, e.g. `{"i128":"6"}` or `{"address":"G…"}`
            None if map.len() == 1 => map.values().next().and_then(extract_scalar),
            None => None,
        },
        _ => None,
    }
}

/// `ScValType::SCV_SYMBOL` discriminant in Stellar XDR.
const SCV_SYMBOL: u32 = 15;

/// Extract a Soroban Symbol from a topic string.
/// The RPC may return `{"type":"symbol","value":"contrib"}`, `{"symbol":"contrib"}`,
/// base64 XDR, or just the raw string.
fn extract_symbol(raw: &str) -> String {
    if let Ok(v) = serde_json::from_str::<Value>(raw) {
        if let Some(s) = v
            .get("value")
            .or_else(|| v.get("symbol"))
            .and_then(|x| x.as_str())
        {
            return s.to_string();
        }
    }
    if let Some(s) = decode_xdr_symbol(raw) {
        return s;
    }
    // Fallback: treat the raw string as the symbol
    raw.to_string()
}

/// Decode a base64 XDR `ScVal::Symbol`: tag, length, then the bytes.
fn decode_xdr_symbol(raw: &str) -> Option<String> {
    use base64::Engine;
    let bytes = base64::engine::general_purpose::STANDARD.decode(raw).ok()?;
    let tag = u32::from_be_bytes(bytes.get(0..4)?.try_into().ok()?);
    if tag != SCV_SYMBOL {
        return None;
    }
    let len = u32::from_be_bytes(bytes.get(4..8)?.try_into().ok()?) as usize;
    let symbol = bytes.get(8..8 + len)?;
    String::from_utf8(symbol.to_vec()).ok()
}

/// Extract an address or number from a topic entry that might be a JSON object or raw value.
fn extract_topic_value(raw: &str) -> String {
    serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|v| extract_scalar(&v))
        .unwrap_or_else(|| raw.to_string())
}

/// Parse an ISO-8601 timestamp string into a Unix epoch (seconds).
fn parse_iso_to_unix(s: &str) -> Option<i64> {
    use chrono::DateTime;
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.timestamp())
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
