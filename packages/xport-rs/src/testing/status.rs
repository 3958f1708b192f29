//! Scripted bridge status responses

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::BridgeError;
use crate::status::{StatusEntry, StatusSource};

type Scripted = Result<Vec<StatusEntry>, BridgeError>;

/// Plays queued responses in order, repeating the last one once drained
#[derive(Default)]
pub struct MockStatusSource {
    queue: Mutex<VecDeque<Scripted>>,
    last: Mutex<Option<Scripted>>,
    requested: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MockStatusSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every response resolves only after `delay`
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn push(&self, response: Scripted) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(response);
        }
    }

    pub fn requests(&self) -> usize {
        self.requested.lock().map(|r| r.len()).unwrap_or_default()
    }

    /// Source transaction ids in request order
    pub fn requested_for(&self) -> Vec<String> {
        self.requested
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn next(&self) -> Scripted {
        let popped = self.queue.lock().ok().and_then(|mut q| q.pop_front());
        let mut last = match self.last.lock() {
            Ok(last) => last,
            Err(_) => return Ok(vec![]),
        };
        if let Some(response) = popped {
            *last = Some(response);
        }
        last.clone().unwrap_or_else(|| Ok(vec![]))
    }
}

#[async_trait]
impl StatusSource for MockStatusSource {
    async fn fetch(&self, source_tx: &str) -> Result<Vec<StatusEntry>, BridgeError> {
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(source_tx.to_string());
        }
        let response = self.next();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        response
    }
}
