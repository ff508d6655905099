//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_ledger::CsvLedger;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::paper_terminal::PaperTerminal;
use crate::domain::account::Credentials;
use crate::domain::alert::{process_alert, AlertDefaults, AlertOutcome, DEFAULT_COMMENT};
use crate::domain::config_validation::{validate_bridge_config, validate_paper_config};
use crate::domain::engine::{EngineConfig, ExecutionEngine};
use crate::domain::error::BridgeError;
use crate::domain::ledger::InMemoryLedger;
use crate::domain::request::DEFAULT_DEVIATION_POINTS;
use crate::domain::session::BrokerSession;
use crate::ports::config_port::ConfigPort;
use crate::ports::ledger_port::LedgerPort;

/// Exit code when every alert was processed but at least one failed.
const EXIT_ALERTS_FAILED: u8 = 7;

#[derive(Parser, Debug)]
#[command(name = "signalbridge", about = "Alert to broker terminal execution bridge")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a bridge configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Connect to the terminal and print the account snapshot
    Account {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Dispatch alerts from a JSON-lines file, printing one outcome per line
    Replay {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        alerts: PathBuf,
    },
    /// Replay alerts, then print the open positions
    Positions {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        alerts: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let config_path = match &cli.command {
        Command::Validate { config }
        | Command::Account { config }
        | Command::Replay { config, .. }
        | Command::Positions { config, .. } => config.clone(),
    };
    let adapter = match load_config(&config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    init_logging(&adapter);

    let result = match cli.command {
        Command::Validate { .. } => run_validate(&adapter),
        Command::Account { .. } => run_account(&adapter, &config_path),
        Command::Replay { alerts, .. } => run_replay(&adapter, &config_path, &alerts),
        Command::Positions { alerts, .. } => {
            run_positions(&adapter, &config_path, alerts.as_deref())
        }
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// `RUST_LOG` wins over `[logging] filter`, which wins over `info`.
fn init_logging(config: &dyn ConfigPort) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directive = config
            .get_string("logging", "filter")
            .unwrap_or_else(|| "info".to_string());
        EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"))
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn build_engine_config(config: &dyn ConfigPort) -> Result<EngineConfig, BridgeError> {
    let deviation = config.get_int("trading", "deviation_points", i64::from(DEFAULT_DEVIATION_POINTS));
    let deviation_points = u32::try_from(deviation).map_err(|_| BridgeError::ConfigInvalid {
        section: "trading".into(),
        key: "deviation_points".into(),
        reason: "deviation_points must be a non-negative integer".into(),
    })?;
    Ok(EngineConfig {
        trading_enabled: config.get_bool("trading", "enabled", false),
        deviation_points,
        close_comment: config
            .get_string("trading", "close_comment")
            .unwrap_or_else(|| EngineConfig::default().close_comment),
    })
}

pub fn build_alert_defaults(config: &dyn ConfigPort) -> Result<AlertDefaults, BridgeError> {
    Ok(AlertDefaults {
        volume: config.get_double("trading", "default_volume", AlertDefaults::default().volume),
        comment: config
            .get_string("trading", "default_comment")
            .unwrap_or_else(|| DEFAULT_COMMENT.to_string()),
        magic_number: config.get_u64("trading", "magic_number")?.unwrap_or(0),
    })
}

/// Credentials when `[terminal] login` is set, otherwise none.
pub fn build_credentials(config: &dyn ConfigPort) -> Result<Option<Credentials>, BridgeError> {
    let Some(login) = config.get_u64("terminal", "login")? else {
        return Ok(None);
    };
    let required = |key: &str| {
        config
            .get_string("terminal", key)
            .ok_or_else(|| BridgeError::ConfigMissing {
                section: "terminal".into(),
                key: key.into(),
            })
    };
    Ok(Some(Credentials {
        login,
        password: required("password")?,
        server: required("server")?,
    }))
}

/// CSV ledger at `[ledger] path` (relative to the config file), or an
/// in-memory ledger when no path is configured.
pub fn open_ledger(
    config: &dyn ConfigPort,
    config_path: &Path,
) -> Result<Arc<dyn LedgerPort>, BridgeError> {
    match config.get_string("ledger", "path") {
        Some(path) => {
            let path = resolve_relative(config_path, &path);
            info!(path = %path.display(), "appending trade ledger");
            Ok(Arc::new(CsvLedger::open(path)?))
        }
        None => Ok(Arc::new(InMemoryLedger::new())),
    }
}

pub fn build_paper_terminal(
    config: &dyn ConfigPort,
    config_path: &Path,
) -> Result<PaperTerminal, BridgeError> {
    validate_paper_config(config)?;
    let quotes = config
        .get_string("paper", "quotes")
        .ok_or_else(|| BridgeError::ConfigMissing {
            section: "paper".into(),
            key: "quotes".into(),
        })?;
    PaperTerminal::from_csv(
        resolve_relative(config_path, &quotes),
        config.get_double("paper", "balance", 10_000.0),
        &config
            .get_string("paper", "currency")
            .unwrap_or_else(|| "USD".to_string()),
    )
}

pub fn build_engine(
    config: &dyn ConfigPort,
    config_path: &Path,
) -> Result<ExecutionEngine<PaperTerminal>, BridgeError> {
    validate_bridge_config(config)?;
    let terminal = build_paper_terminal(config, config_path)?;
    let session = BrokerSession::new(terminal, build_credentials(config)?);
    let ledger = open_ledger(config, config_path)?;
    Ok(ExecutionEngine::new(
        session,
        ledger,
        build_engine_config(config)?,
    ))
}

fn resolve_relative(config_path: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        return path;
    }
    match config_path.parent() {
        Some(dir) => dir.join(path),
        None => path,
    }
}

fn run_validate(config: &dyn ConfigPort) -> Result<ExitCode, BridgeError> {
    validate_bridge_config(config)?;
    let engine_config = build_engine_config(config)?;
    let credentials = build_credentials(config)?;
    eprintln!("Config validated successfully");
    eprintln!(
        "  trading: {}",
        if engine_config.trading_enabled {
            "enabled"
        } else {
            "disabled (simulation)"
        }
    );
    eprintln!("  deviation: {} points", engine_config.deviation_points);
    match credentials {
        Some(c) => eprintln!("  terminal: login {} on {}", c.login, c.server),
        None => eprintln!("  terminal: current account, no login"),
    }
    Ok(ExitCode::SUCCESS)
}

fn run_account(config: &dyn ConfigPort, config_path: &Path) -> Result<ExitCode, BridgeError> {
    let mut engine = build_engine(config, config_path)?;
    let account = engine.account_snapshot()?;
    println!("{}", serde_json::to_string_pretty(&account)?);
    engine.session_mut().disconnect();
    Ok(ExitCode::SUCCESS)
}

/// Parse a JSON-lines alert file. Blank lines and `#` comments are skipped.
pub fn read_alerts(path: &Path) -> Result<Vec<Result<Value, BridgeError>>, BridgeError> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| serde_json::from_str::<Value>(l).map_err(BridgeError::from))
        .collect())
}

/// Dispatch every alert in order, returning one outcome per alert.
pub fn replay_alerts(
    engine: &mut ExecutionEngine<PaperTerminal>,
    alerts: Vec<Result<Value, BridgeError>>,
    defaults: &AlertDefaults,
) -> Vec<AlertOutcome> {
    alerts
        .into_iter()
        .map(|alert| match alert {
            Ok(payload) => process_alert(engine, &payload, defaults),
            Err(e) => AlertOutcome {
                success: false,
                action: String::new(),
                symbol: String::new(),
                message: e.to_string(),
                error_kind: Some(e.kind()),
                results: Vec::new(),
            },
        })
        .collect()
}

fn run_replay(
    config: &dyn ConfigPort,
    config_path: &Path,
    alerts_path: &Path,
) -> Result<ExitCode, BridgeError> {
    let mut engine = build_engine(config, config_path)?;
    let defaults = build_alert_defaults(config)?;
    let alerts = read_alerts(alerts_path)?;
    info!(count = alerts.len(), path = %alerts_path.display(), "replaying alerts");

    let outcomes = replay_alerts(&mut engine, alerts, &defaults);
    for outcome in &outcomes {
        println!("{}", serde_json::to_string(outcome)?);
    }
    engine.session_mut().disconnect();

    let failed = outcomes.iter().filter(|o| !o.success).count();
    if failed > 0 {
        eprintln!("{failed} of {} alert(s) failed", outcomes.len());
        return Ok(ExitCode::from(EXIT_ALERTS_FAILED));
    }
    Ok(ExitCode::SUCCESS)
}

fn run_positions(
    config: &dyn ConfigPort,
    config_path: &Path,
    alerts_path: Option<&Path>,
) -> Result<ExitCode, BridgeError> {
    let mut engine = build_engine(config, config_path)?;
    if let Some(path) = alerts_path {
        let defaults = build_alert_defaults(config)?;
        replay_alerts(&mut engine, read_alerts(path)?, &defaults);
    }
    let positions = engine.open_positions()?;
    println!("{}", serde_json::to_string_pretty(&positions)?);
    engine.session_mut().disconnect();
    Ok(ExitCode::SUCCESS)
}
