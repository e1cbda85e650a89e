use super::{
    util::{bind_values, drop_statement, insert_statement, time_strings},
    ConnectionError, ScratchRecord, StorageAdapter, TableName, TIMESTAMP_FORMAT,
};
use chrono::NaiveDateTime;
use rusqlite::{params_from_iter, types::Type, Connection};
use std::path::Path;
use tracing::{debug, error, info};

pub const IN_MEMORY_PATH: &str = ":memory:";

#[derive(Debug)]
pub struct SQLiteAdapter {
    connection: Connection,
}

impl From<rusqlite::Error> for ConnectionError {
    fn from(error: rusqlite::Error) -> Self {
        ConnectionError::SQLite(error)
    }
}

impl SQLiteAdapter {
    /// open the database at `path`, `:memory:` opens a private in-memory database
    pub fn load(path: &Path) -> Result<Self, ConnectionError> {
        let connection = if path.as_os_str() == IN_MEMORY_PATH {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };

        info!(path = ?path, "Opened SQLite connection");

        Ok(Self { connection })
    }

    pub fn in_memory() -> Result<Self, ConnectionError> {
        Ok(Self {
            connection: Connection::open_in_memory()?,
        })
    }

    pub fn close(mut self) -> Result<(), ConnectionError> {
        let mut counter = 0;
        while let Err((connection, error)) = self.connection.close() {
            counter += 1;
            self.connection = connection;
            let error = ConnectionError::SQLite(error);
            error!(error = %error, "Failed to close SQLite connection, trying again {counter}/3");

            if counter == 3 {
                error!("Failed to close SQLite connection, giving up");

                return Err(error);
            }
        }

        info!("Closed SQLite connection");

        Ok(())
    }

    /// read every row of `table` back, ordered by id
    pub fn records(&self, table: &TableName) -> Result<Vec<ScratchRecord>, ConnectionError> {
        self.connection
            .prepare(&format!(
                "select id, time, text from {} order by id",
                table.quoted()
            ))?
            .query_map([], |row| {
                let time: String = row.get(1)?;
                let timestamp = NaiveDateTime::parse_from_str(&time, TIMESTAMP_FORMAT)
                    .map_err(|error| {
                        rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(error))
                    })?;

                Ok(ScratchRecord {
                    id: Some(row.get(0)?),
                    timestamp,
                    text: row.get(2)?,
                })
            })?
            .try_fold(Vec::new(), |mut init, result| {
                init.push(result?);

                Ok::<Vec<ScratchRecord>, ConnectionError>(init)
            })
    }
}

impl StorageAdapter for SQLiteAdapter {
    fn drop_table(&mut self, table: &TableName) -> Result<(), ConnectionError> {
        self.connection.execute(&drop_statement(table), [])?;
        debug!(table = %table, "Dropped table");

        Ok(())
    }

    fn create_table(&mut self, table: &TableName) -> Result<(), ConnectionError> {
        let schema = format!(
            "create table {} (
    id integer primary key autoincrement,
    time datetime not null,
    text varchar(255) not null check (length(text) <= 255)
)",
            table.quoted()
        );

        if let Err(error) = self.connection.execute(&schema, []) {
            let error = ConnectionError::from(error);
            error!(error = %error, table = %table, "Failed to create scratch table");

            return Err(error);
        }

        debug!(table = %table, "Created table");

        Ok(())
    }

    fn insert(
        &mut self,
        table: &TableName,
        records: &[ScratchRecord],
    ) -> Result<(), ConnectionError> {
        if records.is_empty() {
            return Err(ConnectionError::EmptyInsert);
        }

        let times = time_strings(records);

        // batches share their size except for the trailing one, so the cache stays small
        self.connection
            .prepare_cached(&insert_statement(table, records.len()))?
            .execute(params_from_iter(bind_values(&times, records)))?;

        Ok(())
    }
}
