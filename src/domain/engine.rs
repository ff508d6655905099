//! Order intent execution.
//!
//! Turns intents and position criteria into terminal requests, classifies
//! the terminal's reply, and appends one ledger entry per attempt whatever
//! the outcome. Each call submits at most one request per position and
//! never retries.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::account::AccountSnapshot;
use super::error::{BridgeError, ErrorKind};
use super::ledger::{ActionKind, LedgerEntry};
use super::offset::{resolve_protective_price, OffsetRole};
use super::order::TradingIntent;
use super::position::{locate_positions, Position, PositionCriteria, PositionFilter};
use super::request::{TradeRequest, WireResponse, DEFAULT_DEVIATION_POINTS};
use super::retcode::{classify_retcode, describe_retcode, is_success};
use super::session::BrokerSession;
use super::symbol::resolve_symbol;
use crate::ports::ledger_port::LedgerPort;
use crate::ports::terminal_port::TerminalPort;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// When false every operation is simulated and nothing reaches the terminal.
    pub trading_enabled: bool,
    pub deviation_points: u32,
    pub close_comment: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            trading_enabled: false,
            deviation_points: DEFAULT_DEVIATION_POINTS,
            close_comment: "close".to_string(),
        }
    }
}

/// Outcome of one submitted request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub accepted: bool,
    pub ticket: Option<u64>,
    pub filled_price: Option<f64>,
    pub retcode: Option<u32>,
    pub error_kind: Option<ErrorKind>,
    pub error_detail: Option<String>,
    pub simulated: bool,
}

impl ExecutionResult {
    pub fn simulated() -> Self {
        ExecutionResult {
            accepted: true,
            ticket: None,
            filled_price: None,
            retcode: None,
            error_kind: None,
            error_detail: None,
            simulated: true,
        }
    }

    pub fn failed(err: &BridgeError) -> Self {
        ExecutionResult {
            accepted: false,
            ticket: None,
            filled_price: None,
            retcode: None,
            error_kind: Some(err.kind()),
            error_detail: Some(err.to_string()),
            simulated: false,
        }
    }

    pub fn from_response(response: &WireResponse) -> Self {
        if is_success(response.retcode) {
            ExecutionResult {
                accepted: true,
                ticket: (response.order != 0).then_some(response.order),
                filled_price: (response.price > 0.0).then_some(response.price),
                retcode: Some(response.retcode),
                error_kind: None,
                error_detail: None,
                simulated: false,
            }
        } else {
            ExecutionResult {
                accepted: false,
                ticket: None,
                filled_price: None,
                retcode: Some(response.retcode),
                error_kind: Some(ErrorKind::BrokerRejected),
                error_detail: Some(describe_retcode(response.retcode)),
                simulated: false,
            }
        }
    }

    /// Rejections become [`BridgeError::BrokerRejected`].
    pub fn into_result(self) -> Result<Self, BridgeError> {
        match (self.accepted, self.retcode) {
            (false, Some(code)) => Err(BridgeError::BrokerRejected {
                code,
                description: describe_retcode(code),
            }),
            _ => Ok(self),
        }
    }
}

/// Result of closing one located position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseLeg {
    pub ticket: u64,
    pub symbol: String,
    pub result: ExecutionResult,
}

/// Per-position results of a close. Legs are independent: a rejected leg
/// does not undo the ones already closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseOutcome {
    pub legs: Vec<CloseLeg>,
    pub simulated: bool,
}

impl CloseOutcome {
    /// True only if every leg was accepted.
    pub fn accepted(&self) -> bool {
        self.simulated || (!self.legs.is_empty() && self.legs.iter().all(|l| l.result.accepted))
    }

    pub fn rejected_legs(&self) -> impl Iterator<Item = &CloseLeg> {
        self.legs.iter().filter(|l| !l.result.accepted)
    }
}

pub struct ExecutionEngine<T: TerminalPort> {
    session: BrokerSession<T>,
    ledger: Arc<dyn LedgerPort>,
    config: EngineConfig,
}

impl<T: TerminalPort> ExecutionEngine<T> {
    pub fn new(session: BrokerSession<T>, ledger: Arc<dyn LedgerPort>, config: EngineConfig) -> Self {
        ExecutionEngine {
            session,
            ledger,
            config,
        }
    }

    pub fn session_mut(&mut self) -> &mut BrokerSession<T> {
        &mut self.session
    }

    pub fn account_snapshot(&mut self) -> Result<AccountSnapshot, BridgeError> {
        self.session.connect()?;
        self.session.account_snapshot()
    }

    /// Every open position on the account.
    pub fn open_positions(&mut self) -> Result<Vec<Position>, BridgeError> {
        self.session.connect()?;
        self.session.terminal().positions(&PositionFilter::All)
    }

    /// Open exposure for `intent`.
    ///
    /// Local failures (validation, connection, symbol resolution) are
    /// returned as errors; terminal rejections come back as a result with
    /// `accepted == false`. Both are recorded in the ledger.
    pub fn open(&mut self, intent: &TradingIntent) -> Result<ExecutionResult, BridgeError> {
        let mut entry = LedgerEntry::new(ActionKind::Open, &intent.symbol);
        entry.side = Some(intent.side);
        entry.volume = Some(intent.volume);
        entry.price = intent.price;
        entry.stop_price = intent.stop_price;
        entry.target_price = intent.target_price;

        if let Err(e) = intent.validate() {
            return self.fail(entry, e);
        }

        if !self.config.trading_enabled {
            info!(symbol = %intent.symbol, side = %intent.side, volume = intent.volume, "trading disabled, open simulated");
            entry.accepted = true;
            entry.simulated = true;
            self.record(&entry);
            return Ok(ExecutionResult::simulated());
        }

        let request = match self.build_open_request(intent) {
            Ok(r) => r,
            Err(e) => return self.fail(entry, e),
        };
        entry.price = request.price;
        entry.stop_price = request.stop_price;
        entry.target_price = request.target_price;

        match self.submit(&request) {
            Ok(result) => {
                entry.accepted = result.accepted;
                entry.retcode = result.retcode;
                entry.ticket = result.ticket;
                entry.error_detail = result.error_detail.clone();
                self.record(&entry);
                Ok(result)
            }
            Err(e) => self.fail(entry, e),
        }
    }

    fn build_open_request(&mut self, intent: &TradingIntent) -> Result<TradeRequest, BridgeError> {
        self.session.connect()?;
        let snapshot = resolve_symbol(self.session.terminal_mut(), &intent.symbol)?;

        let price = intent
            .price
            .unwrap_or_else(|| snapshot.entry_price(intent.side.is_buy()));
        let stop = resolve_protective_price(
            intent.side,
            price,
            snapshot.point_size,
            OffsetRole::Stop,
            intent.stop_price,
            intent.stop_points,
        )?;
        let target = resolve_protective_price(
            intent.side,
            price,
            snapshot.point_size,
            OffsetRole::Target,
            intent.target_price,
            intent.target_points,
        )?;
        debug!(symbol = %intent.symbol, price, ?stop, ?target, "resolved open prices");

        let request = if intent.side.is_market() {
            TradeRequest::deal(
                &intent.symbol,
                intent.side,
                intent.volume,
                price,
                self.config.deviation_points,
                intent.magic_number,
                &intent.comment,
            )
        } else {
            TradeRequest::pending(
                &intent.symbol,
                intent.side,
                intent.volume,
                price,
                intent.magic_number,
                &intent.comment,
            )
        };
        Ok(request.with_protection(stop, target))
    }

    /// Close the positions matched by `criteria`.
    ///
    /// Ticket and position-id criteria close a single position; symbol
    /// criteria close every position on the symbol, one leg at a time.
    /// Finding nothing is a [`BridgeError::PositionNotFound`]. A connection
    /// or auth failure stops the remaining legs and is returned as an error.
    pub fn close(&mut self, criteria: &PositionCriteria) -> Result<CloseOutcome, BridgeError> {
        let label = criteria.symbol.clone().unwrap_or_default();
        let mut entry = LedgerEntry::new(ActionKind::Close, &label);
        entry.ticket = criteria.ticket;

        if !self.config.trading_enabled {
            info!(%criteria, "trading disabled, close simulated");
            entry.accepted = true;
            entry.simulated = true;
            self.record(&entry);
            return Ok(CloseOutcome {
                legs: Vec::new(),
                simulated: true,
            });
        }

        let mut positions = match self.locate(criteria) {
            Ok(p) => p,
            Err(e) => return self.fail(entry, e),
        };
        if !criteria.is_symbol_wide() && positions.len() > 1 {
            warn!(%criteria, found = positions.len(), "more than one position matched, closing the first");
            positions.truncate(1);
        }

        let mut legs = Vec::with_capacity(positions.len());
        for position in &positions {
            let result = match self.close_position(position) {
                Ok(r) => r,
                Err(e) if e.is_session_failure() => return Err(e),
                Err(e) => ExecutionResult::failed(&e),
            };
            legs.push(CloseLeg {
                ticket: position.ticket,
                symbol: position.symbol.clone(),
                result,
            });
        }

        let outcome = CloseOutcome {
            legs,
            simulated: false,
        };
        if !outcome.accepted() {
            warn!(
                %criteria,
                rejected = outcome.rejected_legs().count(),
                total = outcome.legs.len(),
                "close completed with rejected legs"
            );
        }
        Ok(outcome)
    }

    fn locate(&mut self, criteria: &PositionCriteria) -> Result<Vec<Position>, BridgeError> {
        self.session.connect()?;
        let positions = locate_positions(self.session.terminal(), criteria)?;
        if positions.is_empty() {
            warn!(%criteria, "no matching open position");
            return Err(BridgeError::PositionNotFound {
                criteria: criteria.to_string(),
            });
        }
        Ok(positions)
    }

    /// Opposing market deal for one position at the current exit price.
    fn close_position(&mut self, position: &Position) -> Result<ExecutionResult, BridgeError> {
        let side = position.side.closing_side();
        let mut entry = LedgerEntry::new(ActionKind::Close, &position.symbol);
        entry.side = Some(side);
        entry.volume = Some(position.volume);
        entry.ticket = Some(position.ticket);

        let snapshot = match resolve_symbol(self.session.terminal_mut(), &position.symbol) {
            Ok(s) => s,
            Err(e) => return self.fail(entry, e),
        };
        let price = snapshot.exit_price(position.is_long());
        entry.price = Some(price);

        let request = TradeRequest::deal(
            &position.symbol,
            side,
            position.volume,
            price,
            self.config.deviation_points,
            position.magic_number,
            &self.config.close_comment,
        )
        .closing(position.ticket);

        match self.submit(&request) {
            Ok(result) => {
                entry.accepted = result.accepted;
                entry.retcode = result.retcode;
                entry.error_detail = result.error_detail.clone();
                self.record(&entry);
                Ok(result)
            }
            Err(e) => self.fail(entry, e),
        }
    }

    /// Change stop and/or target of the position with `ticket`.
    ///
    /// An omitted level keeps the position's current value; the request
    /// always carries both.
    pub fn modify(
        &mut self,
        ticket: u64,
        new_stop: Option<f64>,
        new_target: Option<f64>,
    ) -> Result<ExecutionResult, BridgeError> {
        let mut entry = LedgerEntry::new(ActionKind::Modify, "");
        entry.ticket = Some(ticket);
        entry.stop_price = new_stop;
        entry.target_price = new_target;

        for (name, value) in [("stop", new_stop), ("target", new_target)] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    let e = BridgeError::validation(format!(
                        "{name} price must be a non-negative number, got {v}"
                    ));
                    return self.fail(entry, e);
                }
            }
        }

        if !self.config.trading_enabled {
            info!(ticket, ?new_stop, ?new_target, "trading disabled, modify simulated");
            entry.accepted = true;
            entry.simulated = true;
            self.record(&entry);
            return Ok(ExecutionResult::simulated());
        }

        let position = match self.locate(&PositionCriteria::by_ticket(ticket)) {
            Ok(mut p) => p.swap_remove(0),
            Err(e) => return self.fail(entry, e),
        };

        let stop = new_stop.or(position.stop_price);
        let target = new_target.or(position.target_price);
        entry.symbol = position.symbol.clone();
        entry.side = Some(position.side);
        entry.volume = Some(position.volume);
        entry.stop_price = stop;
        entry.target_price = target;

        let request = TradeRequest::stop_target(
            &position.symbol,
            position.ticket,
            stop,
            target,
            position.magic_number,
        );

        match self.submit(&request) {
            Ok(mut result) => {
                if result.accepted && result.ticket.is_none() {
                    result.ticket = Some(position.ticket);
                }
                entry.accepted = result.accepted;
                entry.retcode = result.retcode;
                entry.error_detail = result.error_detail.clone();
                self.record(&entry);
                Ok(result)
            }
            Err(e) => self.fail(entry, e),
        }
    }

    fn submit(&mut self, request: &TradeRequest) -> Result<ExecutionResult, BridgeError> {
        info!(
            action = ?request.action,
            symbol = %request.symbol,
            side = ?request.side,
            volume = ?request.volume,
            price = ?request.price,
            position = ?request.position,
            "submitting trade request"
        );
        let response = self.session.terminal_mut().send(&request.to_wire())?;
        let result = ExecutionResult::from_response(&response);
        if result.accepted {
            info!(
                symbol = %request.symbol,
                ticket = ?result.ticket,
                price = ?result.filled_price,
                "request accepted"
            );
        } else {
            warn!(
                symbol = %request.symbol,
                retcode = response.retcode,
                class = ?classify_retcode(response.retcode),
                detail = %describe_retcode(response.retcode),
                "request rejected"
            );
        }
        Ok(result)
    }

    fn fail<R>(&self, mut entry: LedgerEntry, err: BridgeError) -> Result<R, BridgeError> {
        entry.accepted = false;
        entry.error_detail = Some(err.to_string());
        self.record(&entry);
        Err(err)
    }

    fn record(&self, entry: &LedgerEntry) {
        if let Err(e) = self.ledger.append(entry) {
            error!(error = %e, action = ?entry.action_kind, symbol = %entry.symbol, "failed to append ledger entry");
        }
    }
}
