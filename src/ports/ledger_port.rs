//! Trade ledger port.

use crate::domain::error::BridgeError;
use crate::domain::ledger::LedgerEntry;

/// Append-only sink for execution attempts. Appends from several threads
/// must keep their relative order.
pub trait LedgerPort: Send + Sync {
    fn append(&self, entry: &LedgerEntry) -> Result<(), BridgeError>;
}
