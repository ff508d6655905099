//! Broker terminal transport port.

use crate::domain::account::{AccountSnapshot, Credentials};
use crate::domain::error::BridgeError;
use crate::domain::position::{Position, PositionFilter};
use crate::domain::request::{WireRequest, WireResponse};
use crate::domain::symbol::SymbolSnapshot;

/// Blocking request/response access to a broker terminal.
///
/// Implementations hold one connection and expect at most one call in
/// flight; callers serialize access.
pub trait TerminalPort {
    fn initialize(&mut self) -> Result<(), BridgeError>;

    fn login(&mut self, credentials: &Credentials) -> Result<(), BridgeError>;

    fn shutdown(&mut self);

    fn account_info(&self) -> Result<AccountSnapshot, BridgeError>;

    /// `None` when the broker has no such symbol.
    fn symbol_info(&self, symbol: &str) -> Result<Option<SymbolSnapshot>, BridgeError>;

    /// Make a symbol tradable. Returns false when the terminal refuses.
    fn select_symbol(&mut self, symbol: &str) -> Result<bool, BridgeError>;

    fn positions(&self, filter: &PositionFilter) -> Result<Vec<Position>, BridgeError>;

    fn send(&mut self, request: &WireRequest) -> Result<WireResponse, BridgeError>;
}
