//! INI file configuration adapter.

use crate::domain::error::BridgeError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BridgeError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| BridgeError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, BridgeError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| BridgeError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }

    fn get_u64(&self, section: &str, key: &str) -> Result<Option<u64>, BridgeError> {
        match self.get_string(section, key) {
            None => Ok(None),
            Some(v) => v.parse().map(Some).map_err(|_| BridgeError::ConfigInvalid {
                section: section.to_string(),
                key: key.to_string(),
                reason: format!("expected a non-negative integer, got '{v}'"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    const BRIDGE_INI: &str = r#"
[terminal]
login = 5012345
password = secret
server = Broker-Demo

[trading]
enabled = yes
deviation_points = 30
magic_number = 2024
default_volume = 0.05

[ledger]
path = /var/lib/signalbridge/trades.csv

[paper]
quotes = quotes.csv
balance = 25000.5
"#;

    #[test]
    fn from_string_parses_all_sections() {
        let adapter = FileConfigAdapter::from_string(BRIDGE_INI).unwrap();
        assert_eq!(
            adapter.get_string("terminal", "server"),
            Some("Broker-Demo".to_string())
        );
        assert_eq!(adapter.get_int("terminal", "login", 0), 5012345);
        assert!(adapter.get_bool("trading", "enabled", false));
        assert_eq!(adapter.get_int("trading", "deviation_points", 20), 30);
        assert_eq!(adapter.get_double("trading", "default_volume", 0.01), 0.05);
        assert_eq!(
            adapter.get_string("ledger", "path"),
            Some("/var/lib/signalbridge/trades.csv".to_string())
        );
        assert_eq!(adapter.get_double("paper", "balance", 0.0), 25000.5);
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[trading]\nenabled = true\n").unwrap();
        assert_eq!(adapter.get_string("trading", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_default_for_missing() {
        let adapter = FileConfigAdapter::from_string("[trading]\n").unwrap();
        assert_eq!(adapter.get_int("trading", "deviation_points", 20), 20);
    }

    #[test]
    fn get_int_returns_default_for_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[trading]\nmagic_number = abc\n").unwrap();
        assert_eq!(adapter.get_int("trading", "magic_number", 42), 42);
    }

    #[test]
    fn get_double_returns_default_for_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[paper]\nbalance = not_a_number\n").unwrap();
        assert_eq!(adapter.get_double("paper", "balance", 99.9), 99.9);
    }

    #[test]
    fn get_bool_returns_true_values() {
        let adapter =
            FileConfigAdapter::from_string("[trading]\na = true\nb = yes\nc = 1\n").unwrap();
        assert!(adapter.get_bool("trading", "a", false));
        assert!(adapter.get_bool("trading", "b", false));
        assert!(adapter.get_bool("trading", "c", false));
    }

    #[test]
    fn get_bool_returns_false_values() {
        let adapter =
            FileConfigAdapter::from_string("[trading]\na = false\nb = no\nc = 0\n").unwrap();
        assert!(!adapter.get_bool("trading", "a", true));
        assert!(!adapter.get_bool("trading", "b", true));
        assert!(!adapter.get_bool("trading", "c", true));
    }

    #[test]
    fn get_bool_returns_default_for_unparseable() {
        let adapter = FileConfigAdapter::from_string("[trading]\nenabled = maybe\n").unwrap();
        assert!(!adapter.get_bool("trading", "enabled", false));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[ledger]\npath = trades.csv\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("ledger", "path"),
            Some("trades.csv".to_string())
        );
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/bridge.ini");
        assert!(matches!(result, Err(BridgeError::ConfigParse { .. })));
    }

    #[test]
    fn get_u64_parses_or_reports_invalid() {
        let adapter =
            FileConfigAdapter::from_string("[terminal]\nlogin = 5012345\nserver = x\n").unwrap();
        assert_eq!(adapter.get_u64("terminal", "login").unwrap(), Some(5012345));
        assert_eq!(adapter.get_u64("terminal", "missing").unwrap(), None);
        assert!(matches!(
            adapter.get_u64("terminal", "server"),
            Err(BridgeError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn blank_values_read_as_missing() {
        let adapter = FileConfigAdapter::from_string("[ledger]\npath =   \n").unwrap();
        assert_eq!(adapter.get_string("ledger", "path"), None);
    }
}
