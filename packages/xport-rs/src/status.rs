//! Cross-Chain Status Poller
//!
//! Tracks settlement of a cross-chain message by polling the bridge status
//! API, keyed by the source transaction identifier.
//!
//! ## State machine
//!
//! `Idle -> Polling -> (Polling | Completed | Failed)`, and `stop()` returns a
//! poll in progress to `Idle`.
//!
//! The first request goes out immediately; each later request waits one
//! interval after the previous response. Empty, malformed or failed responses
//! are transient misses and never end the poll.
//!
//! ## Cancellation
//!
//! Every `start` bumps a generation counter. Results are applied inside the
//! watch channel's write lock only if their generation is still current, and
//! `stop` bumps the counter under that same lock before aborting the task. A
//! response that resolves after `stop` returns is therefore always discarded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::BridgeError;

/// Public status service the gateway reports to
pub const DEFAULT_STATUS_URL: &str = "https://bridge-api.wanchain.org";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// The status API is never asked more often than this
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BridgeStatus {
    #[default]
    Unknown,
    Processing,
    Completed,
    Failed,
}

impl BridgeStatus {
    pub fn from_wire(s: &str) -> Self {
        match s {
            "Processing" => BridgeStatus::Processing,
            "Completed" => BridgeStatus::Completed,
            "Failed" => BridgeStatus::Failed,
            _ => BridgeStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BridgeStatus::Unknown => "Unknown",
            BridgeStatus::Processing => "Processing",
            BridgeStatus::Completed => "Completed",
            BridgeStatus::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BridgeStatus::Completed | BridgeStatus::Failed)
    }
}

/// One element of the status API response
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
    #[serde(default)]
    pub send_tx_hash: Option<String>,
    pub status: String,
    #[serde(default)]
    pub from_chain: Option<String>,
    #[serde(default)]
    pub to_chain: Option<String>,
    #[serde(default)]
    pub receive_tx_hash: Option<String>,
    #[serde(default)]
    pub timestamp: Option<Value>,
}

/// Local view of the externally owned status record
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BridgeStatusRecord {
    pub status: BridgeStatus,
    pub source_tx_hash: String,
    pub destination_tx_hash: Option<String>,
    pub source_chain_label: Option<String>,
    pub destination_chain_label: Option<String>,
    pub observed_at_epoch: Option<i64>,
}

impl BridgeStatusRecord {
    fn from_entry(entry: &StatusEntry, source_tx: &str) -> Self {
        let observed_at_epoch = match &entry.timestamp {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.parse().ok(),
            _ => None,
        };
        Self {
            status: BridgeStatus::from_wire(&entry.status),
            source_tx_hash: entry
                .send_tx_hash
                .clone()
                .unwrap_or_else(|| source_tx.to_string()),
            destination_tx_hash: entry.receive_tx_hash.clone().filter(|h| !h.is_empty()),
            source_chain_label: entry.from_chain.clone(),
            destination_chain_label: entry.to_chain.clone(),
            observed_at_epoch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollPhase {
    #[default]
    Idle,
    Polling,
    Completed,
    Failed,
}

impl PollPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PollPhase::Completed | PollPhase::Failed)
    }
}

/// Observable poller state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PollerSnapshot {
    pub phase: PollPhase,
    pub source_tx: Option<String>,
    pub record: Option<BridgeStatusRecord>,
    /// Responses applied for the current poll
    pub responses: u64,
}

/// Where status responses come from
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Entries for `source_tx`; `Err` is always treated as a transient miss
    async fn fetch(&self, source_tx: &str) -> Result<Vec<StatusEntry>, BridgeError>;
}

pub struct HttpStatusSource {
    base_url: String,
    client: Client,
}

impl HttpStatusSource {
    pub fn new(base_url: &str) -> Result<Self, BridgeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| BridgeError::Backend(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn url_for(&self, source_tx: &str) -> String {
        format!("{}/api/testnet/status/msg/{}", self.base_url, source_tx)
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch(&self, source_tx: &str) -> Result<Vec<StatusEntry>, BridgeError> {
        let url = self.url_for(source_tx);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BridgeError::PollingTransient(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BridgeError::PollingTransient(format!(
                "status endpoint returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| BridgeError::PollingTransient(format!("malformed response: {}", e)))
    }
}

pub struct StatusPoller {
    source: Arc<dyn StatusSource>,
    interval: Duration,
    state: Arc<watch::Sender<PollerSnapshot>>,
    generation: Arc<AtomicU64>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl StatusPoller {
    /// Intervals below [`MIN_POLL_INTERVAL`] are raised to it
    pub fn new(source: Arc<dyn StatusSource>, interval: Duration) -> Self {
        let interval = if interval < MIN_POLL_INTERVAL {
            warn!(
                requested_ms = interval.as_millis() as u64,
                "Poll interval below floor, using {}s",
                MIN_POLL_INTERVAL.as_secs()
            );
            MIN_POLL_INTERVAL
        } else {
            interval
        };
        let (state, _) = watch::channel(PollerSnapshot::default());
        Self {
            source,
            interval,
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            task: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn snapshot(&self) -> PollerSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollerSnapshot> {
        self.state.subscribe()
    }

    /// Begin polling for `source_tx`, superseding any poll in progress
    pub fn start(&self, source_tx: &str) {
        self.stop();

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(PollerSnapshot {
            phase: PollPhase::Polling,
            source_tx: Some(source_tx.to_string()),
            record: None,
            responses: 0,
        });
        info!(source_tx = %source_tx, "Started bridge status polling");

        let handle = tokio::spawn(poll_loop(
            self.source.clone(),
            self.state.clone(),
            self.generation.clone(),
            generation,
            source_tx.to_string(),
            self.interval,
        ));

        if let Ok(mut task) = self.task.lock() {
            *task = Some(handle);
        }
    }

    /// Cancel the current poll
    ///
    /// After this returns no scheduled request fires and any response still
    /// in flight is discarded.
    pub fn stop(&self) {
        let generation = &self.generation;
        self.state.send_if_modified(|snap| {
            generation.fetch_add(1, Ordering::SeqCst);
            if snap.phase == PollPhase::Polling {
                snap.phase = PollPhase::Idle;
                true
            } else {
                false
            }
        });

        if let Ok(mut task) = self.task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
                debug!("Stopped bridge status polling");
            }
        }
    }

    /// Resolve once the current poll is no longer `Polling`
    pub async fn wait_for_terminal(&self) -> PollerSnapshot {
        let mut rx = self.subscribe();
        let snap = match rx.wait_for(|snap| snap.phase != PollPhase::Polling).await {
            Ok(snap) => snap.clone(),
            Err(_) => self.snapshot(),
        };
        snap
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop(
    source: Arc<dyn StatusSource>,
    state: Arc<watch::Sender<PollerSnapshot>>,
    current: Arc<AtomicU64>,
    generation: u64,
    source_tx: String,
    interval: Duration,
) {
    loop {
        debug!(source_tx = %source_tx, "Polling bridge status");
        let result = source.fetch(&source_tx).await;

        let mut finished = false;
        let applied = state.send_if_modified(|snap| {
            if current.load(Ordering::SeqCst) != generation {
                return false;
            }
            snap.responses += 1;

            match &result {
                Ok(entries) => match entries.first() {
                    Some(entry) => {
                        let record = BridgeStatusRecord::from_entry(entry, &source_tx);
                        snap.phase = match record.status {
                            BridgeStatus::Completed => PollPhase::Completed,
                            BridgeStatus::Failed => PollPhase::Failed,
                            _ => PollPhase::Polling,
                        };
                        snap.record = Some(record);
                    }
                    None => debug!(source_tx = %source_tx, "No status yet"),
                },
                Err(e) => warn!(source_tx = %source_tx, error = %e, "Transient status poll miss"),
            }

            finished = snap.phase.is_terminal();
            true
        });

        if !applied {
            debug!(source_tx = %source_tx, "Discarded status response after stop");
            return;
        }
        if finished {
            info!(
                source_tx = %source_tx,
                phase = ?state.borrow().phase,
                "Bridge status reached terminal state"
            );
            return;
        }

        tokio::time::sleep(interval).await;
    }
}
