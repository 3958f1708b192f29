//! Scripted contract reads

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;

use crate::error::BridgeError;
use crate::evm::ChainReader;

/// Answers `call(to, data)` by `(to, selector)`; unknown pairs are errors
#[derive(Default)]
pub struct MockChainReader {
    responses: Mutex<HashMap<(Address, [u8; 4]), Vec<u8>>>,
    calls: AtomicUsize,
}

impl MockChainReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `output` for any call to `to` with `selector`
    pub fn respond(&self, to: Address, selector: [u8; 4], output: Vec<u8>) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert((to, selector), output);
        }
    }

    /// Shorthand for a single `uint256` return word
    pub fn respond_u256(&self, to: Address, selector: [u8; 4], value: U256) {
        self.respond(to, selector, value.to_be_bytes::<32>().to_vec());
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainReader for MockChainReader {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, BridgeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if data.len() < 4 {
            return Err(BridgeError::Backend("call data shorter than a selector".to_string()));
        }
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&data[..4]);

        self.responses
            .lock()
            .ok()
            .and_then(|responses| responses.get(&(to, selector)).cloned())
            .map(Bytes::from)
            .ok_or_else(|| {
                BridgeError::Backend(format!(
                    "no mock response for {} selector 0x{}",
                    to,
                    hex::encode(selector)
                ))
            })
    }
}
