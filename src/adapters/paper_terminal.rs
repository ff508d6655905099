//! In-process paper trading terminal.
//!
//! Fills market deals at the quoted bid/ask, keeps positions in memory and
//! answers with the same return codes a live terminal would. Quotes are
//! static; they only change through [`PaperTerminal::set_quote`].

use crate::domain::account::{AccountSnapshot, Credentials};
use crate::domain::error::BridgeError;
use crate::domain::order::{OrderSide, TradeAction};
use crate::domain::position::{Position, PositionFilter};
use crate::domain::request::{decode_action, decode_side, WireRequest, WireResponse};
use crate::domain::retcode::RETCODE_DONE;
use crate::domain::symbol::SymbolSnapshot;
use crate::ports::terminal_port::TerminalPort;
use chrono::Utc;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

const RETCODE_REQUOTE: u32 = 10004;
const RETCODE_INVALID: u32 = 10013;
const RETCODE_INVALID_VOLUME: u32 = 10014;
const RETCODE_INVALID_PRICE: u32 = 10015;
const RETCODE_INVALID_STOPS: u32 = 10016;
const RETCODE_NO_CHANGES: u32 = 10025;
const RETCODE_INVALID_ORDER: u32 = 10035;
const RETCODE_POSITION_CLOSED: u32 = 10036;
const RETCODE_CLOSE_VOLUME: u32 = 10038;

const VOLUME_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
struct PaperQuote {
    snapshot: SymbolSnapshot,
    contract_size: f64,
}

/// A resting pending order. Paper pending orders never trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOrder {
    pub ticket: u64,
    pub symbol: String,
    pub side: OrderSide,
    pub volume: f64,
    pub price: f64,
    pub stop_price: Option<f64>,
    pub target_price: Option<f64>,
}

pub struct PaperTerminal {
    quotes: HashMap<String, PaperQuote>,
    positions: Vec<Position>,
    pending: Vec<PendingOrder>,
    balance: f64,
    currency: String,
    login: u64,
    initialized: bool,
    next_ticket: u64,
}

impl PaperTerminal {
    pub fn new(balance: f64, currency: &str) -> Self {
        Self {
            quotes: HashMap::new(),
            positions: Vec::new(),
            pending: Vec::new(),
            balance,
            currency: currency.to_string(),
            login: 0,
            initialized: false,
            next_ticket: 1,
        }
    }

    /// Load quotes from a CSV file with columns
    /// `symbol,bid,ask,point_size,visible[,contract_size]`.
    pub fn from_csv<P: AsRef<Path>>(
        path: P,
        balance: f64,
        currency: &str,
    ) -> Result<Self, BridgeError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| BridgeError::ConfigParse {
            file: path.display().to_string(),
            reason: format!("failed to read quotes: {}", e),
        })?;

        let mut terminal = Self::new(balance, currency);
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());
        for result in rdr.records() {
            let record = result.map_err(|e| quote_error(path, format!("CSV parse error: {}", e)))?;

            let symbol = record
                .get(0)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| quote_error(path, "missing symbol column".into()))?;
            let bid = parse_column(&record, 1, "bid", path)?;
            let ask = parse_column(&record, 2, "ask", path)?;
            let point_size = parse_column(&record, 3, "point_size", path)?;
            let visible = match record.get(4).map(|v| v.trim().to_lowercase()) {
                None => true,
                Some(v) => match v.as_str() {
                    "true" | "yes" | "1" | "" => true,
                    "false" | "no" | "0" => false,
                    other => {
                        return Err(quote_error(path, format!("invalid visible value: {}", other)));
                    }
                },
            };
            let contract_size = match record.get(5).map(str::trim) {
                None | Some("") => 1.0,
                Some(_) => parse_column(&record, 5, "contract_size", path)?,
            };

            terminal.insert_quote(
                SymbolSnapshot {
                    symbol: symbol.to_string(),
                    bid,
                    ask,
                    spread: spread_points(bid, ask, point_size),
                    point_size,
                    visible,
                },
                contract_size,
            );
        }
        Ok(terminal)
    }

    pub fn with_quote(mut self, snapshot: SymbolSnapshot) -> Self {
        self.insert_quote(snapshot, 1.0);
        self
    }

    /// Move the market for `symbol`. Returns false for unknown symbols.
    pub fn set_quote(&mut self, symbol: &str, bid: f64, ask: f64) -> bool {
        match self.quotes.get_mut(symbol) {
            Some(q) => {
                q.snapshot.bid = bid;
                q.snapshot.ask = ask;
                q.snapshot.spread = spread_points(bid, ask, q.snapshot.point_size);
                true
            }
            None => false,
        }
    }

    pub fn pending_orders(&self) -> &[PendingOrder] {
        &self.pending
    }

    fn insert_quote(&mut self, snapshot: SymbolSnapshot, contract_size: f64) {
        self.quotes.insert(
            snapshot.symbol.clone(),
            PaperQuote {
                snapshot,
                contract_size,
            },
        );
    }

    fn ensure_initialized(&self) -> Result<(), BridgeError> {
        if self.initialized {
            Ok(())
        } else {
            Err(BridgeError::Connection {
                reason: "paper terminal is not initialized".to_string(),
            })
        }
    }

    fn issue_ticket(&mut self) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        ticket
    }

    fn marked(&self, position: &Position) -> Position {
        let mut marked = position.clone();
        if let Some(q) = self.quotes.get(&position.symbol) {
            marked.current_price = q.snapshot.exit_price(position.is_long());
            let direction = if position.is_long() { 1.0 } else { -1.0 };
            marked.profit = direction
                * (marked.current_price - position.open_price)
                * position.volume
                * q.contract_size;
        }
        marked
    }

    fn handle_deal(&mut self, request: &WireRequest, quote: &PaperQuote) -> WireResponse {
        let Some(side) = decode_side(request.order_type).filter(|s| s.is_market()) else {
            return reply(RETCODE_INVALID_ORDER, 0.0, 0);
        };
        if request.volume <= 0.0 {
            return reply(RETCODE_INVALID_VOLUME, 0.0, 0);
        }

        let market = quote.snapshot.entry_price(side.is_buy());
        let tolerance = f64::from(request.deviation) * quote.snapshot.point_size;
        if request.price > 0.0 && (request.price - market).abs() > tolerance + f64::EPSILON {
            return reply(RETCODE_REQUOTE, market, 0);
        }

        if request.position != 0 {
            return self.close_deal(request, side, market, quote.contract_size);
        }

        let stop = nonzero(request.sl);
        let target = nonzero(request.tp);
        if !stops_valid(side, &quote.snapshot, stop, target) {
            return reply(RETCODE_INVALID_STOPS, 0.0, 0);
        }

        let ticket = self.issue_ticket();
        self.positions.push(Position {
            ticket,
            position_id: ticket,
            symbol: request.symbol.clone(),
            side,
            volume: request.volume,
            open_price: market,
            current_price: market,
            stop_price: stop,
            target_price: target,
            profit: 0.0,
            comment: request.comment.clone(),
            magic_number: request.magic,
            open_time: Utc::now(),
        });
        debug!(ticket, symbol = %request.symbol, %side, volume = request.volume, price = market, "paper position opened");
        reply(RETCODE_DONE, market, ticket)
    }

    fn close_deal(
        &mut self,
        request: &WireRequest,
        side: OrderSide,
        market: f64,
        contract_size: f64,
    ) -> WireResponse {
        let Some(index) = self
            .positions
            .iter()
            .position(|p| p.ticket == request.position)
        else {
            return reply(RETCODE_POSITION_CLOSED, 0.0, 0);
        };
        let position = &self.positions[index];
        if position.symbol != request.symbol || position.side.closing_side() != side {
            return reply(RETCODE_INVALID, 0.0, 0);
        }
        if request.volume > position.volume + VOLUME_EPSILON {
            return reply(RETCODE_CLOSE_VOLUME, 0.0, 0);
        }

        let direction = if position.is_long() { 1.0 } else { -1.0 };
        let realized = direction * (market - position.open_price) * request.volume * contract_size;
        self.balance += realized;

        let remaining = position.volume - request.volume;
        if remaining <= VOLUME_EPSILON {
            self.positions.remove(index);
        } else {
            self.positions[index].volume = remaining;
        }
        let deal = self.issue_ticket();
        debug!(position = request.position, deal, realized, "paper position closed");
        reply(RETCODE_DONE, market, deal)
    }

    fn handle_pending(&mut self, request: &WireRequest) -> WireResponse {
        let Some(side) = decode_side(request.order_type).filter(|s| !s.is_market()) else {
            return reply(RETCODE_INVALID_ORDER, 0.0, 0);
        };
        if request.volume <= 0.0 {
            return reply(RETCODE_INVALID_VOLUME, 0.0, 0);
        }
        if request.price <= 0.0 {
            return reply(RETCODE_INVALID_PRICE, 0.0, 0);
        }
        let ticket = self.issue_ticket();
        self.pending.push(PendingOrder {
            ticket,
            symbol: request.symbol.clone(),
            side,
            volume: request.volume,
            price: request.price,
            stop_price: nonzero(request.sl),
            target_price: nonzero(request.tp),
        });
        reply(RETCODE_DONE, request.price, ticket)
    }

    fn handle_stop_target(&mut self, request: &WireRequest, quote: &PaperQuote) -> WireResponse {
        let Some(index) = self
            .positions
            .iter()
            .position(|p| p.ticket == request.position)
        else {
            return reply(RETCODE_INVALID, 0.0, 0);
        };
        let stop = nonzero(request.sl);
        let target = nonzero(request.tp);
        let position = &self.positions[index];
        if position.stop_price == stop && position.target_price == target {
            return reply(RETCODE_NO_CHANGES, 0.0, 0);
        }
        if !stops_valid(position.side, &quote.snapshot, stop, target) {
            return reply(RETCODE_INVALID_STOPS, 0.0, 0);
        }
        let position = &mut self.positions[index];
        position.stop_price = stop;
        position.target_price = target;
        reply(RETCODE_DONE, 0.0, 0)
    }
}

impl TerminalPort for PaperTerminal {
    fn initialize(&mut self) -> Result<(), BridgeError> {
        self.initialized = true;
        Ok(())
    }

    fn login(&mut self, credentials: &Credentials) -> Result<(), BridgeError> {
        self.ensure_initialized()?;
        if credentials.password.is_empty() {
            return Err(BridgeError::Auth {
                login: credentials.login,
                reason: "empty password".to_string(),
            });
        }
        self.login = credentials.login;
        Ok(())
    }

    fn shutdown(&mut self) {
        self.initialized = false;
    }

    fn account_info(&self) -> Result<AccountSnapshot, BridgeError> {
        self.ensure_initialized()?;
        let floating: f64 = self.positions.iter().map(|p| self.marked(p).profit).sum();
        let equity = self.balance + floating;
        Ok(AccountSnapshot {
            login: self.login,
            balance: self.balance,
            equity,
            margin: 0.0,
            free_margin: equity,
            currency: self.currency.clone(),
            leverage: 100,
        })
    }

    fn symbol_info(&self, symbol: &str) -> Result<Option<SymbolSnapshot>, BridgeError> {
        self.ensure_initialized()?;
        Ok(self.quotes.get(symbol).map(|q| q.snapshot.clone()))
    }

    fn select_symbol(&mut self, symbol: &str) -> Result<bool, BridgeError> {
        self.ensure_initialized()?;
        Ok(match self.quotes.get_mut(symbol) {
            Some(q) => {
                q.snapshot.visible = true;
                true
            }
            None => false,
        })
    }

    fn positions(&self, filter: &PositionFilter) -> Result<Vec<Position>, BridgeError> {
        self.ensure_initialized()?;
        Ok(self
            .positions
            .iter()
            .filter(|p| match filter {
                PositionFilter::All => true,
                PositionFilter::Ticket(t) => p.ticket == *t,
                PositionFilter::Symbol(s) => &p.symbol == s,
            })
            .map(|p| self.marked(p))
            .collect())
    }

    fn send(&mut self, request: &WireRequest) -> Result<WireResponse, BridgeError> {
        self.ensure_initialized()?;
        let Some(quote) = self.quotes.get(&request.symbol).cloned() else {
            return Ok(reply(RETCODE_INVALID, 0.0, 0));
        };
        let response = match decode_action(request.action) {
            Some(TradeAction::Deal) => self.handle_deal(request, &quote),
            Some(TradeAction::Pending) => self.handle_pending(request),
            Some(TradeAction::StopTarget) => self.handle_stop_target(request, &quote),
            None => reply(RETCODE_INVALID, 0.0, 0),
        };
        Ok(response)
    }
}

fn reply(retcode: u32, price: f64, order: u64) -> WireResponse {
    WireResponse {
        retcode,
        price,
        order,
        comment: String::new(),
    }
}

fn nonzero(value: f64) -> Option<f64> {
    (value != 0.0).then_some(value)
}

fn spread_points(bid: f64, ask: f64, point_size: f64) -> u32 {
    if point_size > 0.0 && ask >= bid {
        ((ask - bid) / point_size).round() as u32
    } else {
        0
    }
}

/// Stops must sit on the losing side and targets on the winning side of
/// the price the position would close at.
fn stops_valid(
    side: OrderSide,
    quote: &SymbolSnapshot,
    stop: Option<f64>,
    target: Option<f64>,
) -> bool {
    let close_price = quote.exit_price(side.is_buy());
    if side.is_buy() {
        stop.is_none_or(|s| s < close_price) && target.is_none_or(|t| t > close_price)
    } else {
        stop.is_none_or(|s| s > close_price) && target.is_none_or(|t| t < close_price)
    }
}

fn parse_column(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    path: &Path,
) -> Result<f64, BridgeError> {
    record
        .get(index)
        .ok_or_else(|| quote_error(path, format!("missing {} column", name)))?
        .trim()
        .parse()
        .map_err(|e| quote_error(path, format!("invalid {} value: {}", name, e)))
}

fn quote_error(path: &Path, reason: String) -> BridgeError {
    BridgeError::ConfigParse {
        file: path.display().to_string(),
        reason,
    }
}
