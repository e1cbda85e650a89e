pub mod batched;
#[cfg(feature = "duckdb")]
pub mod duckdb;
pub mod memory;
#[cfg(feature = "rusqlite")]
pub mod sqlite;
pub mod util;


use crate::config::ConnectionConfig;
use chrono::{Local, NaiveDateTime, SubsecRound};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::info;

pub type ID = i64;

/// Upper bound for `ScratchRecord::text`, counted in characters
pub const MAX_TEXT_LENGTH: usize = 255;
pub const MAX_TABLE_NAME_LENGTH: usize = 64;
pub const DEFAULT_TABLE_NAME: &str = "performance";
/// Format used to bind timestamps, second precision
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[cfg(feature = "rusqlite")]
    #[error("SQLite error: {}", util::shorten(.0))]
    SQLite(rusqlite::Error),
    #[cfg(feature = "duckdb")]
    #[error("DuckDB error: {}", util::shorten(.0))]
    DuckDB(self::duckdb::DuckDBError),
    #[error("Table {0} does not exist")]
    MissingTable(TableName),
    #[error("Table {0} already exists")]
    TableExists(TableName),
    #[error("Refusing to issue an insert without any rows")]
    EmptyInsert,
    #[error("Storage adapter `{0}` was not compiled in")]
    Unsupported(&'static str),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableNameError {
    #[error("Table name must not be empty")]
    Empty,
    #[error("Table name is {0} characters long, at most 64 are allowed")]
    TooLong(usize),
    #[error("Table name must start with an ASCII letter or '_', found {0:?}")]
    InvalidStart(char),
    #[error("Table name may only contain ASCII alphanumerics and '_', found {0:?}")]
    InvalidCharacter(char),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("Record text is {0} characters long, at most 255 are allowed")]
    TextTooLong(usize),
}

/// Validated identifier of a scratch table
///
/// Identifiers can't be bound as statement parameters, so every name that ends up in SQL has to
/// pass through `TableName::new` and is only ever emitted quoted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName(String);

impl TableName {
    pub fn new(name: impl Into<String>) -> Result<Self, TableNameError> {
        let name = name.into();
        let mut chars = name.chars();

        match chars.next() {
            None => return Err(TableNameError::Empty),
            Some(first) if !(first.is_ascii_alphabetic() || first == '_') => {
                return Err(TableNameError::InvalidStart(first))
            }
            Some(_) => {}
        }

        if let Some(invalid) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
            return Err(TableNameError::InvalidCharacter(invalid));
        }

        // only ASCII is left at this point, bytes == characters
        if name.len() > MAX_TABLE_NAME_LENGTH {
            return Err(TableNameError::TooLong(name.len()));
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// identifier ready to be embedded into a statement
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl Default for TableName {
    fn default() -> Self {
        Self(DEFAULT_TABLE_NAME.to_owned())
    }
}

impl TryFrom<String> for TableName {
    type Error = TableNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TableName> for String {
    fn from(value: TableName) -> Self {
        value.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single row of the scratch table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchRecord {
    /// assigned by the storage, `None` until the record was read back
    pub id: Option<ID>,
    pub timestamp: NaiveDateTime,
    pub text: String,
}

impl ScratchRecord {
    pub fn new(timestamp: NaiveDateTime, text: String) -> Result<Self, RecordError> {
        let length = text.chars().count();

        if length > MAX_TEXT_LENGTH {
            return Err(RecordError::TextTooLong(length));
        }

        Ok(Self {
            id: None,
            timestamp: timestamp.trunc_subsecs(0),
            text,
        })
    }

    /// create a record stamped with the current local time
    pub fn now(text: String) -> Result<Self, RecordError> {
        Self::new(Local::now().naive_local(), text)
    }

    pub fn with_id(mut self, id: ID) -> Self {
        self.id = Some(id);
        self
    }

    pub fn time_string(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Capability the benchmark runner writes through
///
/// Every call maps to exactly one statement against the store.
pub trait StorageAdapter {
    /// drop `table` if it exists
    fn drop_table(&mut self, table: &TableName) -> Result<(), ConnectionError>;

    /// create `table` with the scratch shape `(id, time, text)`
    fn create_table(&mut self, table: &TableName) -> Result<(), ConnectionError>;

    /// insert all `records` with a single statement
    fn insert(&mut self, table: &TableName, records: &[ScratchRecord])
        -> Result<(), ConnectionError>;
}

#[derive(Debug)]
/// All available storage adapters, selected by `ConnectionConfig`
pub enum StorageAdapters {
    #[cfg(feature = "rusqlite")]
    SQLite(sqlite::SQLiteAdapter),
    #[cfg(feature = "duckdb")]
    DuckDB(self::duckdb::DuckDBAdapter),
    Memory(memory::MemoryAdapter),
}

impl StorageAdapters {
    pub fn load(config: &ConnectionConfig) -> Result<Self, ConnectionError> {
        match config {
            #[cfg(feature = "rusqlite")]
            ConnectionConfig::SQLite { path } => {
                sqlite::SQLiteAdapter::load(path).map(Self::SQLite)
            }
            #[cfg(not(feature = "rusqlite"))]
            ConnectionConfig::SQLite { .. } => Err(ConnectionError::Unsupported("sqlite")),
            #[cfg(feature = "duckdb")]
            ConnectionConfig::DuckDB { path } => {
                self::duckdb::DuckDBAdapter::load(path).map(Self::DuckDB)
            }
            #[cfg(not(feature = "duckdb"))]
            ConnectionConfig::DuckDB { .. } => Err(ConnectionError::Unsupported("duckdb")),
            ConnectionConfig::Memory => {
                info!("Using in-memory storage, no statements reach a database");

                Ok(Self::Memory(memory::MemoryAdapter::default()))
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            #[cfg(feature = "rusqlite")]
            Self::SQLite(_) => "sqlite",
            #[cfg(feature = "duckdb")]
            Self::DuckDB(_) => "duckdb",
            Self::Memory(_) => "memory",
        }
    }

    pub fn close(self) -> Result<(), ConnectionError> {
        match self {
            #[cfg(feature = "rusqlite")]
            Self::SQLite(adapter) => adapter.close(),
            #[cfg(feature = "duckdb")]
            Self::DuckDB(adapter) => adapter.close(),
            Self::Memory(_) => Ok(()),
        }
    }
}

impl StorageAdapter for StorageAdapters {
    fn drop_table(&mut self, table: &TableName) -> Result<(), ConnectionError> {
        match self {
            #[cfg(feature = "rusqlite")]
            Self::SQLite(adapter) => adapter.drop_table(table),
            #[cfg(feature = "duckdb")]
            Self::DuckDB(adapter) => adapter.drop_table(table),
            Self::Memory(adapter) => adapter.drop_table(table),
        }
    }

    fn create_table(&mut self, table: &TableName) -> Result<(), ConnectionError> {
        match self {
            #[cfg(feature = "rusqlite")]
            Self::SQLite(adapter) => adapter.create_table(table),
            #[cfg(feature = "duckdb")]
            Self::DuckDB(adapter) => adapter.create_table(table),
            Self::Memory(adapter) => adapter.create_table(table),
        }
    }

    fn insert(
        &mut self,
        table: &TableName,
        records: &[ScratchRecord],
    ) -> Result<(), ConnectionError> {
        match self {
            #[cfg(feature = "rusqlite")]
            Self::SQLite(adapter) => adapter.insert(table, records),
            #[cfg(feature = "duckdb")]
            Self::DuckDB(adapter) => adapter.insert(table, records),
            Self::Memory(adapter) => adapter.insert(table, records),
        }
    }
}
