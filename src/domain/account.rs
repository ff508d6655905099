//! Account and credential types.

use serde::{Deserialize, Serialize};

/// Balance figures reported by the terminal for the logged-in account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub login: u64,
    pub balance: f64,
    pub equity: f64,
    pub margin: f64,
    pub free_margin: f64,
    pub currency: String,
    pub leverage: u32,
}

/// Terminal login credentials.
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub login: u64,
    pub password: String,
    pub server: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"***")
            .field("server", &self.server)
            .finish()
    }
}
