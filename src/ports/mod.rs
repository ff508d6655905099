//! Port traits for the terminal, the trade ledger and configuration.

pub mod config_port;
pub mod ledger_port;
pub mod terminal_port;
