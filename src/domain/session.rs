//! Terminal session lifecycle.

use tracing::{error, info};

use super::account::{AccountSnapshot, Credentials};
use super::error::BridgeError;
use crate::ports::terminal_port::TerminalPort;

/// Owns the terminal handle and tracks whether it is initialized and
/// logged in. Dropping a connected session shuts the terminal down.
pub struct BrokerSession<T: TerminalPort> {
    terminal: T,
    credentials: Option<Credentials>,
    connected: bool,
}

impl<T: TerminalPort> BrokerSession<T> {
    /// Session that logs in with `credentials` when given, or relies on the
    /// terminal's current account otherwise.
    pub fn new(terminal: T, credentials: Option<Credentials>) -> Self {
        BrokerSession {
            terminal,
            credentials,
            connected: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Initialize and authenticate. A no-op when already connected.
    pub fn connect(&mut self) -> Result<(), BridgeError> {
        if self.connected {
            return Ok(());
        }

        if let Err(e) = self.terminal.initialize() {
            error!(error = %e, "terminal initialization failed");
            return Err(match e {
                BridgeError::Connection { .. } => e,
                other => BridgeError::Connection {
                    reason: other.to_string(),
                },
            });
        }

        if let Some(credentials) = &self.credentials {
            if let Err(e) = self.terminal.login(credentials) {
                // Do not leave a half-initialized terminal behind.
                self.terminal.shutdown();
                error!(login = credentials.login, error = %e, "terminal login failed");
                return Err(match e {
                    BridgeError::Auth { .. } => e,
                    other => BridgeError::Auth {
                        login: credentials.login,
                        reason: other.to_string(),
                    },
                });
            }
            info!(
                login = credentials.login,
                server = %credentials.server,
                "terminal session established"
            );
        } else {
            info!("terminal session established without login");
        }

        self.connected = true;
        Ok(())
    }

    /// Release the terminal. Safe to call when already disconnected.
    pub fn disconnect(&mut self) {
        if self.connected {
            self.terminal.shutdown();
            self.connected = false;
            info!("terminal session closed");
        }
    }

    pub fn account_snapshot(&self) -> Result<AccountSnapshot, BridgeError> {
        if !self.connected {
            return Err(BridgeError::Connection {
                reason: "session is not connected".to_string(),
            });
        }
        self.terminal.account_info().map_err(|e| match e {
            BridgeError::Connection { .. } => e,
            other => BridgeError::Connection {
                reason: other.to_string(),
            },
        })
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    pub(crate) fn terminal_mut(&mut self) -> &mut T {
        &mut self.terminal
    }
}

impl<T: TerminalPort> Drop for BrokerSession<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
