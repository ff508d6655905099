//! Core domain types and logic.

pub mod account;
pub mod alert;
pub mod config_validation;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod offset;
pub mod order;
pub mod position;
pub mod request;
pub mod retcode;
pub mod session;
pub mod symbol;
