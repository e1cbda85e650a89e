use super::{
    util::{bind_values, drop_statement, insert_statement, time_strings},
    ConnectionError, ScratchRecord, StorageAdapter, TableName,
};
use ::duckdb::{params, params_from_iter, Connection};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug)]
pub struct DuckDBAdapter {
    connection: Connection,
}

#[derive(Error, Debug)]
pub enum DuckDBError {
    #[error("{0}")]
    DuckDB(#[from] ::duckdb::Error),
}

impl From<::duckdb::Error> for ConnectionError {
    fn from(value: ::duckdb::Error) -> Self {
        ConnectionError::DuckDB(DuckDBError::DuckDB(value))
    }
}

/// DuckDB has no autoincrement, ids come from a sequence living next to the table
fn sequence_name(table: &TableName) -> String {
    format!("{}_id_seq", table.as_str())
}

impl DuckDBAdapter {
    pub fn load(path: &Path) -> Result<Self, ConnectionError> {
        let connection = Connection::open(path)?;

        info!(path = ?path, "Opened DuckDB connection");

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
            let error = ConnectionError::from(error);
            error!(error = %error, "Failed to close DuckDB connection, trying again {counter}/3");

            if counter == 3 {
                error!("Failed to close DuckDB connection, giving up");

                return Err(error);
            }
        }

        info!("Closed DuckDB connection");

        Ok(())
    }
}

impl StorageAdapter for DuckDBAdapter {
    fn drop_table(&mut self, table: &TableName) -> Result<(), ConnectionError> {
        self.connection.execute(&drop_statement(table), params![])?;
        self.connection.execute(
            &format!("drop sequence if exists \"{}\"", sequence_name(table)),
            params![],
        )?;
        debug!(table = %table, "Dropped table");

        Ok(())
    }

    fn create_table(&mut self, table: &TableName) -> Result<(), ConnectionError> {
        let sequence = sequence_name(table);
        let schema = format!(
            "create sequence \"{sequence}\" start 1 no cycle;
create table {} (
    id integer primary key default(nextval('{sequence}')),
    time timestamp not null,
    text varchar(255) not null
);",
            table.quoted()
        );

        if let Err(error) = self.connection.execute_batch(&schema) {
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

        self.connection
            .prepare(&insert_statement(table, records.len()))?
            .execute(params_from_iter(bind_values(&times, records)))?;

        Ok(())
    }
}
