//! Push hub client with auto-reconnect.
//!
//! Connects to the backend's monitoring hub over WebSocket, speaks the
//! JSON hub protocol (records terminated by `0x1E`, a handshake record,
//! keep-alive pings) and streams parsed events through a
//! [`tokio::sync::broadcast`] channel. Reconnection uses exponential
//! backoff with jitter; the connection state is observable through a
//! [`tokio::sync::watch`] channel.
//!
//! # Example
//!
//! ```rust,ignore
//! use pumpwatch_api::hub::{HubHandle, ReconnectConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let url = HubHandle::hub_url(client.base_url(), "hubs/monitoring")?;
//! let handle = HubHandle::connect(url, None, ReconnectConfig::default(), CancellationToken::new());
//! let mut rx = handle.subscribe();
//!
//! while let Ok(event) = rx.recv().await {
//!     println!("{event:?}");
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::models::VisualizationDto;

// ── Protocol constants ───────────────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 1024;
const RECORD_SEPARATOR: char = '\u{1e}';
const HANDSHAKE: &str = "{\"protocol\":\"json\",\"version\":1}\u{1e}";
const PING: &str = "{\"type\":6}\u{1e}";
const PING_INTERVAL: Duration = Duration::from_secs(15);

const TYPE_INVOCATION: u64 = 1;
const TYPE_PING: u64 = 6;
const TYPE_CLOSE: u64 = 7;

// ── HubEvent ─────────────────────────────────────────────────────────

/// A server-to-client invocation from the monitoring hub.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum HubEvent {
    /// A nozzle changed hardware state. The full status snapshot should be refetched.
    StatusChanged {
        nozzle_number: u32,
        status: i64,
        description: Option<String>,
    },
    /// One or more nozzles reported a new running total.
    VisualizationUpdated(Vec<VisualizationDto>),
}

// ── HubConnectionState ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HubConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for hub reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── HubHandle ────────────────────────────────────────────────────────

/// Handle to a running hub connection.
///
/// Dropping the handle does not stop the background task; call
/// [`shutdown`](Self::shutdown) or cancel the token passed to `connect`.
pub struct HubHandle {
    event_rx: broadcast::Receiver<Arc<HubEvent>>,
    state_rx: watch::Receiver<HubConnectionState>,
    cancel: CancellationToken,
}

impl HubHandle {
    /// Spawn the reconnection loop for `hub_url`.
    ///
    /// Returns immediately; the first connection attempt happens
    /// asynchronously. `access_token` is passed as the `access_token`
    /// query parameter, the hub convention for WebSocket auth.
    pub fn connect(
        hub_url: Url,
        access_token: Option<String>,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
    ) -> Self {
        let (event_tx, event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(HubConnectionState::Disconnected);

        let mut url = hub_url;
        if let Some(token) = access_token {
            url.query_pairs_mut().append_pair("access_token", &token);
        }

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            hub_loop(url, event_tx, state_tx, reconnect, task_cancel).await;
        });

        Self {
            event_rx,
            state_rx,
            cancel,
        }
    }

    /// Derive the hub WebSocket URL from the REST base URL
    /// (`http` → `ws`, `https` → `wss`).
    pub fn hub_url(base: &Url, path: &str) -> Result<Url, Error> {
        let mut url = base.join(path.trim_start_matches('/'))?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|()| Error::HubConnect(format!("cannot use scheme {scheme} for {base}")))?;
        Ok(url)
    }

    /// Get a new broadcast receiver for the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<HubEvent>> {
        self.event_rx.resubscribe()
    }

    /// Observe connection state changes.
    pub fn state(&self) -> watch::Receiver<HubConnectionState> {
        self.state_rx.clone()
    }

    /// Signal the background task to shut down gracefully.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → handshake → read → on error, backoff → reconnect.
async fn hub_loop(
    url: Url,
    event_tx: broadcast::Sender<Arc<HubEvent>>,
    state_tx: watch::Sender<HubConnectionState>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        state_tx.send_replace(if attempt == 0 {
            HubConnectionState::Connecting
        } else {
            HubConnectionState::Reconnecting { attempt }
        });

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_read(&url, &event_tx, &state_tx, &cancel) => result,
        };

        if cancel.is_cancelled() {
            break;
        }

        match result {
            Ok(()) => {
                tracing::info!("hub disconnected cleanly, reconnecting");
                attempt = 0;
            }
            Err(e) => {
                tracing::warn!(error = %e, attempt, "hub error");

                if let Some(max) = reconnect.max_retries {
                    if attempt >= max {
                        tracing::error!(max_retries = max, "hub reconnection limit reached, giving up");
                        break;
                    }
                }

                attempt = attempt.saturating_add(1);
                state_tx.send_replace(HubConnectionState::Reconnecting { attempt });

                let delay = calculate_backoff(attempt - 1, &reconnect);
                tracing::info!(delay_ms = delay.as_millis(), attempt, "waiting before reconnect");

                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    state_tx.send_replace(HubConnectionState::Disconnected);
    tracing::debug!("hub loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

async fn connect_and_read(
    url: &Url,
    event_tx: &broadcast::Sender<Arc<HubEvent>>,
    state_tx: &watch::Sender<HubConnectionState>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    tracing::info!(url = %redacted(url), "connecting to hub");

    let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| Error::HubConnect(e.to_string()))?;

    let (mut write, mut read) = ws_stream.split();

    write
        .send(tungstenite::Message::text(HANDSHAKE))
        .await
        .map_err(|e| Error::HubConnect(e.to_string()))?;

    let mut ping = tokio::time::interval(PING_INTERVAL);
    ping.tick().await;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            _ = ping.tick() => {
                write
                    .send(tungstenite::Message::text(PING))
                    .await
                    .map_err(|e| Error::HubConnect(e.to_string()))?;
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        for record in split_records(&text) {
                            match parse_record(record) {
                                Record::Handshake(None) => {
                                    tracing::info!("hub handshake complete");
                                    state_tx.send_replace(HubConnectionState::Connected);
                                }
                                Record::Handshake(Some(error)) => {
                                    return Err(Error::HubConnect(format!("handshake rejected: {error}")));
                                }
                                Record::Event(event) => {
                                    // No subscribers is fine.
                                    let _ = event_tx.send(Arc::new(event));
                                }
                                Record::Close(Some(reason)) => {
                                    return Err(Error::HubClosed { reason });
                                }
                                Record::Close(None) => return Ok(()),
                                Record::Ping | Record::Ignored => {}
                            }
                        }
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(code = %cf.code, reason = %cf.reason, "hub close frame received");
                        }
                        return Ok(());
                    }
                    Some(Err(e)) => return Err(Error::HubConnect(e.to_string())),
                    None => {
                        tracing::info!("hub stream ended");
                        return Ok(());
                    }
                    // Binary, Ping, Pong, Frame: tungstenite answers pings itself
                    _ => {}
                }
            }
        }
    }
}

/// Strip the access token before logging a URL.
fn redacted(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}

// ── Record parsing ───────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
enum Record {
    /// Handshake response; `Some` carries the server's error.
    Handshake(Option<String>),
    Ping,
    Close(Option<String>),
    Event(HubEvent),
    Ignored,
}

fn split_records(text: &str) -> impl Iterator<Item = &str> {
    text.split(RECORD_SEPARATOR).filter(|r| !r.trim().is_empty())
}

fn parse_record(raw: &str) -> Record {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, "failed to parse hub record");
            return Record::Ignored;
        }
    };

    let error = value["error"].as_str().map(String::from);
    match value["type"].as_u64() {
        None => Record::Handshake(error),
        Some(TYPE_PING) => Record::Ping,
        Some(TYPE_CLOSE) => Record::Close(error),
        Some(TYPE_INVOCATION) => {
            let target = value["target"].as_str().unwrap_or_default();
            let arguments = value["arguments"].as_array().map_or(&[][..], Vec::as_slice);
            invocation(target, arguments).map_or(Record::Ignored, Record::Event)
        }
        Some(_) => Record::Ignored,
    }
}

fn invocation(target: &str, args: &[serde_json::Value]) -> Option<HubEvent> {
    match target {
        "StatusChanged" => {
            let nozzle_number = args.first().and_then(as_u32)?;
            let status = args.get(1).and_then(serde_json::Value::as_i64)?;
            let description = args.get(2).and_then(|d| d.as_str()).map(String::from);
            Some(HubEvent::StatusChanged {
                nozzle_number,
                status,
                description,
            })
        }
        "VisualizationUpdated" => {
            let updates = visualization_payload(args);
            if updates.is_empty() {
                tracing::debug!("VisualizationUpdated carried no usable readings");
                None
            } else {
                Some(HubEvent::VisualizationUpdated(updates))
            }
        }
        other => {
            tracing::trace!(target = other, "ignoring hub invocation");
            None
        }
    }
}

/// Accepts `(nozzleNumber, currentValue)`, a single reading object, or an
/// array of reading objects.
fn visualization_payload(args: &[serde_json::Value]) -> Vec<VisualizationDto> {
    if let [code, value, ..] = args {
        if let (Some(code), Some(cash)) = (as_u32(code), value.as_f64()) {
            return vec![VisualizationDto {
                nozzle_code: Some(code.to_string()),
                current_cash: Some(cash),
                ..VisualizationDto::default()
            }];
        }
    }

    args.iter()
        .flat_map(|arg| match arg {
            serde_json::Value::Array(items) => items.clone(),
            serde_json::Value::Object(_) => vec![arg.clone()],
            _ => Vec::new(),
        })
        .filter_map(|item| match serde_json::from_value::<VisualizationDto>(item) {
            Ok(dto) => Some(dto),
            Err(e) => {
                tracing::debug!(error = %e, "dropping malformed pushed reading");
                None
            }
        })
        .collect()
}

fn as_u32(value: &serde_json::Value) -> Option<u32> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) * (1 ± 0.25)`
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt.min(30)).unwrap_or(30);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic jitter seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    Duration::from_secs_f64((capped * jitter_factor).max(0.0))
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert!(config.max_retries.is_none());
    }

    #[test]
    fn backoff_increases_exponentially() {
        let config = ReconnectConfig::default();

        let d0 = calculate_backoff(0, &config);
        let d1 = calculate_backoff(1, &config);
        let d2 = calculate_backoff(2, &config);

        assert!(d1 > d0, "d1 ({d1:?}) should be greater than d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should be greater than d1 ({d1:?})");
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: None,
        };

        let d10 = calculate_backoff(10, &config);
        assert!(d10 <= Duration::from_millis(12_500), "got {d10:?}");
    }

    #[test]
    fn hub_url_swaps_scheme() {
        let base = Url::parse("https://station.local:5001/").unwrap();
        let url = HubHandle::hub_url(&base, "/hubs/monitoring").unwrap();
        assert_eq!(url.as_str(), "wss://station.local:5001/hubs/monitoring");

        let base = Url::parse("http://10.0.0.5:5000/").unwrap();
        let url = HubHandle::hub_url(&base, "hubs/monitoring").unwrap();
        assert_eq!(url.as_str(), "ws://10.0.0.5:5000/hubs/monitoring");
    }

    #[test]
    fn records_split_on_separator() {
        let text = "{}\u{1e}{\"type\":6}\u{1e}";
        let records: Vec<_> = split_records(text).collect();
        assert_eq!(records, vec!["{}", "{\"type\":6}"]);
    }

    #[test]
    fn handshake_and_control_records() {
        assert_eq!(parse_record("{}"), Record::Handshake(None));
        assert_eq!(
            parse_record(r#"{"error":"unsupported protocol"}"#),
            Record::Handshake(Some("unsupported protocol".into()))
        );
        assert_eq!(parse_record(r#"{"type":6}"#), Record::Ping);
        assert_eq!(parse_record(r#"{"type":7}"#), Record::Close(None));
        assert_eq!(parse_record("not json"), Record::Ignored);
    }

    #[test]
    fn status_changed_invocation() {
        let raw = json!({
            "type": 1,
            "target": "StatusChanged",
            "arguments": [3, 3, "Abasteciendo"]
        });
        assert_eq!(
            parse_record(&raw.to_string()),
            Record::Event(HubEvent::StatusChanged {
                nozzle_number: 3,
                status: 3,
                description: Some("Abasteciendo".into()),
            })
        );
    }

    #[test]
    fn visualization_positional_arguments() {
        let updates = visualization_payload(&[json!(7), json!(1250.5)]);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].nozzle_code.as_deref(), Some("7"));
        assert_eq!(updates[0].current_cash, Some(1250.5));
        assert!(updates[0].tag_id.is_none());
    }

    #[test]
    fn visualization_object_and_batch_arguments() {
        let single = visualization_payload(&[json!({
            "nozzleCode": "01", "currentCash": 10.0, "tagId": "ABCD"
        })]);
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].tag_id.as_deref(), Some("ABCD"));

        let batch = visualization_payload(&[json!([
            {"nozzleCode": "01", "currentCash": 10.0},
            {"nozzleCode": "02", "currentCash": 0.0},
            "garbage"
        ])]);
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn unknown_target_is_ignored() {
        let raw = json!({"type": 1, "target": "Other", "arguments": []});
        assert_eq!(parse_record(&raw.to_string()), Record::Ignored);
    }

    #[test]
    fn redacted_url_drops_token() {
        let url = Url::parse("ws://host/hubs/monitoring?access_token=secret").unwrap();
        assert_eq!(redacted(&url), "ws://host/hubs/monitoring");
    }
}
