#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use signalbridge::domain::account::{AccountSnapshot, Credentials};
use signalbridge::domain::engine::{EngineConfig, ExecutionEngine};
use signalbridge::domain::error::BridgeError;
use signalbridge::domain::ledger::InMemoryLedger;
use signalbridge::domain::order::OrderSide;
use signalbridge::domain::position::{Position, PositionFilter};
use signalbridge::domain::request::{WireRequest, WireResponse, WIRE_ACTION_SLTP};
use signalbridge::domain::retcode::RETCODE_DONE;
use signalbridge::domain::session::BrokerSession;
use signalbridge::domain::symbol::SymbolSnapshot;
use signalbridge::ports::terminal_port::TerminalPort;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// Scripted terminal behaviour plus a record of every call made.
#[derive(Default)]
pub struct MockState {
    pub symbols: HashMap<String, SymbolSnapshot>,
    pub positions: Vec<Position>,
    /// Symbols that `select_symbol` refuses to enable.
    pub refuse_select: Vec<String>,
    /// Retcode per position ticket, used for close and modify requests.
    pub ticket_retcodes: HashMap<u64, u32>,
    /// Retcodes consumed in order by requests not covered above.
    pub retcode_queue: VecDeque<u32>,
    pub fail_initialize: bool,
    pub fail_login: bool,
    /// Send returns a connection error once this many requests went through.
    pub drop_connection_after: Option<usize>,
    /// This symbol lookup (1-based) reports the symbol as missing.
    pub missing_on_lookup: Option<usize>,
    pub symbol_lookups: usize,
    pub initialize_calls: usize,
    pub login_calls: usize,
    pub shutdown_calls: usize,
    pub select_calls: usize,
    pub sent: Vec<WireRequest>,
    pub next_order: u64,
}

#[derive(Clone)]
pub struct MockTerminal {
    state: Arc<Mutex<MockState>>,
}

impl MockTerminal {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                next_order: 5000,
                ..Default::default()
            })),
        }
    }

    /// Shared view of the state; stays valid after the terminal is moved
    /// into a session.
    pub fn handle(&self) -> Self {
        self.clone()
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn with_symbol(self, snapshot: SymbolSnapshot) -> Self {
        self.state()
            .symbols
            .insert(snapshot.symbol.clone(), snapshot);
        self
    }

    pub fn with_position(self, position: Position) -> Self {
        self.state().positions.push(position);
        self
    }

    pub fn with_ticket_retcode(self, ticket: u64, retcode: u32) -> Self {
        self.state().ticket_retcodes.insert(ticket, retcode);
        self
    }

    pub fn with_retcodes(self, codes: &[u32]) -> Self {
        self.state().retcode_queue.extend(codes.iter().copied());
        self
    }

    pub fn refusing_select(self, symbol: &str) -> Self {
        self.state().refuse_select.push(symbol.to_string());
        self
    }

    pub fn failing_initialize(self) -> Self {
        self.state().fail_initialize = true;
        self
    }

    pub fn failing_login(self) -> Self {
        self.state().fail_login = true;
        self
    }

    pub fn dropping_connection_after(self, sends: usize) -> Self {
        self.state().drop_connection_after = Some(sends);
        self
    }

    pub fn missing_symbol_on_lookup(self, lookup: usize) -> Self {
        self.state().missing_on_lookup = Some(lookup);
        self
    }

    pub fn sent(&self) -> Vec<WireRequest> {
        self.state().sent.clone()
    }
}

impl TerminalPort for MockTerminal {
    fn initialize(&mut self) -> Result<(), BridgeError> {
        let mut state = self.state();
        state.initialize_calls += 1;
        if state.fail_initialize {
            return Err(BridgeError::Connection {
                reason: "terminal not running".into(),
            });
        }
        Ok(())
    }

    fn login(&mut self, credentials: &Credentials) -> Result<(), BridgeError> {
        let mut state = self.state();
        state.login_calls += 1;
        if state.fail_login {
            return Err(BridgeError::Auth {
                login: credentials.login,
                reason: "invalid account".into(),
            });
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        self.state().shutdown_calls += 1;
    }

    fn account_info(&self) -> Result<AccountSnapshot, BridgeError> {
        Ok(AccountSnapshot {
            login: 5012345,
            balance: 10_000.0,
            equity: 10_050.0,
            margin: 110.5,
            free_margin: 9_939.5,
            currency: "USD".into(),
            leverage: 100,
        })
    }

    fn symbol_info(&self, symbol: &str) -> Result<Option<SymbolSnapshot>, BridgeError> {
        let mut state = self.state();
        state.symbol_lookups += 1;
        if state.missing_on_lookup == Some(state.symbol_lookups) {
            return Ok(None);
        }
        Ok(state.symbols.get(symbol).cloned())
    }

    fn select_symbol(&mut self, symbol: &str) -> Result<bool, BridgeError> {
        let mut state = self.state();
        state.select_calls += 1;
        if state.refuse_select.iter().any(|s| s == symbol) {
            return Ok(false);
        }
        match state.symbols.get_mut(symbol) {
            Some(s) => {
                s.visible = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn positions(&self, filter: &PositionFilter) -> Result<Vec<Position>, BridgeError> {
        let state = self.state();
        Ok(state
            .positions
            .iter()
            .filter(|p| match filter {
                PositionFilter::All => true,
                PositionFilter::Ticket(t) => p.ticket == *t,
                PositionFilter::Symbol(s) => &p.symbol == s,
            })
            .cloned()
            .collect())
    }

    fn send(&mut self, request: &WireRequest) -> Result<WireResponse, BridgeError> {
        let mut state = self.state();
        if state
            .drop_connection_after
            .is_some_and(|limit| state.sent.len() >= limit)
        {
            return Err(BridgeError::Connection {
                reason: "connection to trade server lost".into(),
            });
        }
        state.sent.push(request.clone());

        let scripted = if request.position != 0 {
            state.ticket_retcodes.get(&request.position).copied()
        } else {
            None
        };
        let retcode = match scripted {
            Some(code) => code,
            None => state.retcode_queue.pop_front().unwrap_or(RETCODE_DONE),
        };
        let order = if retcode == RETCODE_DONE && request.action != WIRE_ACTION_SLTP {
            state.next_order += 1;
            state.next_order
        } else {
            0
        };
        Ok(WireResponse {
            retcode,
            price: if retcode == RETCODE_DONE { request.price } else { 0.0 },
            order,
            comment: String::new(),
        })
    }
}

pub fn eurusd() -> SymbolSnapshot {
    SymbolSnapshot {
        symbol: "EURUSD".into(),
        bid: 1.1048,
        ask: 1.1050,
        spread: 2,
        point_size: 0.0001,
        visible: true,
    }
}

pub fn usdjpy() -> SymbolSnapshot {
    SymbolSnapshot {
        symbol: "USDJPY".into(),
        bid: 149.50,
        ask: 149.52,
        spread: 2,
        point_size: 0.01,
        visible: true,
    }
}

pub fn hidden(mut snapshot: SymbolSnapshot) -> SymbolSnapshot {
    snapshot.visible = false;
    snapshot
}

pub fn position(ticket: u64, symbol: &str, side: OrderSide, volume: f64) -> Position {
    Position {
        ticket,
        position_id: ticket + 900_000,
        symbol: symbol.into(),
        side,
        volume,
        open_price: 100.0,
        current_price: 101.0,
        stop_price: None,
        target_price: None,
        profit: 0.0,
        comment: String::new(),
        magic_number: 0,
        open_time: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        login: 5012345,
        password: "secret".into(),
        server: "Broker-Demo".into(),
    }
}

pub fn live_config() -> EngineConfig {
    EngineConfig {
        trading_enabled: true,
        ..Default::default()
    }
}

/// Engine over `terminal` with an inspectable in-memory ledger.
pub fn engine_with(
    terminal: MockTerminal,
    config: EngineConfig,
) -> (ExecutionEngine<MockTerminal>, Arc<InMemoryLedger>) {
    let ledger = Arc::new(InMemoryLedger::new());
    let session = BrokerSession::new(terminal, Some(credentials()));
    let engine = ExecutionEngine::new(session, ledger.clone(), config);
    (engine, ledger)
}
