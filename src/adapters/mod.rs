//! Concrete adapter implementations for ports.

pub mod csv_ledger;
pub mod file_config_adapter;
pub mod paper_terminal;
