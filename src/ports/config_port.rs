//! Configuration access port trait.

use crate::domain::error::BridgeError;

pub trait ConfigPort {
    /// Trimmed value; blank values read as missing.
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;
    /// Strict unsigned read: a present but malformed value is an error.
    fn get_u64(&self, section: &str, key: &str) -> Result<Option<u64>, BridgeError>;
}
