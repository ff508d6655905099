//! Audit trail of execution attempts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use super::error::BridgeError;
use super::order::OrderSide;
use crate::ports::ledger_port::LedgerPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Open,
    Close,
    Modify,
}

/// One attempted action and its outcome. Never changed after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub timestamp: DateTime<Utc>,
    pub action_kind: ActionKind,
    pub symbol: String,
    pub side: Option<OrderSide>,
    pub volume: Option<f64>,
    pub price: Option<f64>,
    pub stop_price: Option<f64>,
    pub target_price: Option<f64>,
    pub accepted: bool,
    pub simulated: bool,
    pub retcode: Option<u32>,
    pub error_detail: Option<String>,
    pub ticket: Option<u64>,
}

impl LedgerEntry {
    pub fn new(action_kind: ActionKind, symbol: &str) -> Self {
        LedgerEntry {
            timestamp: Utc::now(),
            action_kind,
            symbol: symbol.to_string(),
            side: None,
            volume: None,
            price: None,
            stop_price: None,
            target_price: None,
            accepted: false,
            simulated: false,
            retcode: None,
            error_detail: None,
            ticket: None,
        }
    }
}

/// Ledger kept in process memory, in append order.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    entries: Mutex<Vec<LedgerEntry>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every entry appended so far.
    pub fn entries(&self) -> Vec<LedgerEntry> {
        match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self.entries.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LedgerPort for InMemoryLedger {
    fn append(&self, entry: &LedgerEntry) -> Result<(), BridgeError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| BridgeError::Io(std::io::Error::other("ledger lock poisoned")))?;
        guard.push(entry.clone());
        Ok(())
    }
}
