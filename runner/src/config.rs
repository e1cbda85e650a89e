use crate::database::{TableName, TableNameError, DEFAULT_TABLE_NAME};
use serde::{Deserialize, Serialize};
use std::{fs::File, path::Path, path::PathBuf, str::FromStr};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum ConfigErrors {
    #[error("Failed to read config file")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid table name: {0}")]
    InvalidTableName(#[from] TableNameError),
}

/// Storage the benchmarks write to
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase", deny_unknown_fields)]
pub enum ConnectionConfig {
    SQLite { path: PathBuf },
    DuckDB { path: PathBuf },
    /// keep everything in process memory, measures the harness only
    Memory,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::SQLite {
            path: default_database_path(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BenchConfig {
    #[serde(alias = "db", default, with = "serde_yaml::with::singleton_map")]
    pub database: ConnectionConfig,
    // validated by `preflight_checks`, kept raw to report it together with other problems
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_rows")]
    pub rows: u64,
    #[serde(default = "default_rows_per_multi_insert")]
    pub rows_per_multi_insert: u64,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            database: ConnectionConfig::default(),
            table: default_table(),
            rows: default_rows(),
            rows_per_multi_insert: default_rows_per_multi_insert(),
            repeat: default_repeat(),
        }
    }
}

impl FromStr for BenchConfig {
    type Err = ConfigErrors;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_yaml::from_str(s)?)
    }
}

impl BenchConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigErrors> {
        match File::open(path) {
            Ok(file) => Ok(serde_yaml::from_reader(file)?),
            Err(error) => {
                error!(error = %error, path = ?path, "Failed to open config file");

                Err(error.into())
            }
        }
    }

    pub fn table_name(&self) -> Result<TableName, ConfigErrors> {
        Ok(TableName::new(self.table.as_str())?)
    }

    /// Check every value at once so all problems show up in a single run
    ///
    /// Returns `true` if the configuration contains errors.
    pub fn preflight_checks(&self) -> bool {
        let mut contains_error = false;

        if self.rows == 0 {
            error!("rows must be at least 1");
            contains_error = true;
        }

        if self.rows_per_multi_insert == 0 {
            error!("rows_per_multi_insert must be at least 1");
            contains_error = true;
        } else if self.rows_per_multi_insert > self.rows {
            warn!(
                "rows_per_multi_insert ({}) exceeds rows ({}), the multi insert test will issue a single statement",
                self.rows_per_multi_insert, self.rows
            );
        }

        if self.repeat == 0 {
            error!("repeat must be at least 1");
            contains_error = true;
        }

        if let Err(error) = TableName::new(self.table.as_str()) {
            error!("table '{}' is not usable: {error}", self.table);
            contains_error = true;
        }

        match &self.database {
            ConnectionConfig::SQLite { .. } if cfg!(not(feature = "rusqlite")) => {
                error!("database.sqlite requires the `rusqlite` feature");
                contains_error = true;
            }
            ConnectionConfig::DuckDB { .. } if cfg!(not(feature = "duckdb")) => {
                error!("database.duckdb requires the `duckdb` feature");
                contains_error = true;
            }
            _ => {}
        }

        contains_error
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("dbperf.db")
}

fn default_table() -> String {
    DEFAULT_TABLE_NAME.to_owned()
}

fn default_rows() -> u64 {
    10_000
}

fn default_rows_per_multi_insert() -> u64 {
    1_000
}

fn default_repeat() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_uses_defaults() {
        let config: BenchConfig = "{}".parse().unwrap();

        assert_eq!(config, BenchConfig::default());
        assert_eq!(config.rows, 10_000);
        assert_eq!(config.rows_per_multi_insert, 1_000);
        assert_eq!(config.table, "performance");
        assert!(!config.preflight_checks());
    }

    #[test]
    fn parses_all_adapters() {
        let config: BenchConfig = "db:\n  sqlite:\n    path: /tmp/bench.db\nrows: 5\n"
            .parse()
            .unwrap();
        assert_eq!(
            config.database,
            ConnectionConfig::SQLite {
                path: PathBuf::from("/tmp/bench.db")
            }
        );
        assert_eq!(config.rows, 5);

        let config: BenchConfig = "database:\n  duckdb:\n    path: bench.duckdb\n"
            .parse()
            .unwrap();
        assert_eq!(
            config.database,
            ConnectionConfig::DuckDB {
                path: PathBuf::from("bench.duckdb")
            }
        );

        let config: BenchConfig = "database: memory\ntable: scratch\n".parse().unwrap();
        assert_eq!(config.database, ConnectionConfig::Memory);
        assert_eq!(config.table_name().unwrap().as_str(), "scratch");
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!("rows: 5\nthreads: 4\n".parse::<BenchConfig>().is_err());
    }

    #[test]
    fn preflight_flags_invalid_values() {
        let mut config = BenchConfig {
            database: ConnectionConfig::Memory,
            ..BenchConfig::default()
        };
        assert!(!config.preflight_checks());

        config.rows = 0;
        assert!(config.preflight_checks());

        config.rows = 10;
        config.rows_per_multi_insert = 0;
        assert!(config.preflight_checks());

        config.rows_per_multi_insert = 20;
        assert!(!config.preflight_checks());

        config.repeat = 0;
        assert!(config.preflight_checks());

        config.repeat = 1;
        config.table = "drop table".to_owned();
        assert!(config.preflight_checks());
        assert!(matches!(
            config.table_name(),
            Err(ConfigErrors::InvalidTableName(TableNameError::InvalidCharacter(' ')))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "database: memory\nrows: 42\nrows_per_multi_insert: 7\nrepeat: 3").unwrap();

        let config = BenchConfig::load(file.path()).unwrap();

        assert_eq!(config.rows, 42);
        assert_eq!(config.rows_per_multi_insert, 7);
        assert_eq!(config.repeat, 3);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(matches!(
            BenchConfig::load(Path::new("/nonexistent/dbperf.yaml")),
            Err(ConfigErrors::Io(_))
        ));
    }
}
