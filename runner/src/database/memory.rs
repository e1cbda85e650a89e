use super::{ConnectionError, ScratchRecord, StorageAdapter, TableName, ID};
use std::collections::BTreeMap;
use tracing::trace;

#[derive(Debug, Default)]
struct MemoryTable {
    records: Vec<ScratchRecord>,
    next_id: ID,
}

/// Storage adapter keeping every table in process memory
///
/// Used for dry runs, where only the overhead of the harness itself is measured, and as a
/// fully inspectable store in tests.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    tables: BTreeMap<TableName, MemoryTable>,
    statements: usize,
    batch_sizes: Vec<usize>,
}

impl MemoryAdapter {
    /// rows of `table` in insertion order, with ids assigned
    pub fn records(&self, table: &TableName) -> Result<&[ScratchRecord], ConnectionError> {
        self.tables
            .get(table)
            .map(|table| table.records.as_slice())
            .ok_or_else(|| ConnectionError::MissingTable(table.clone()))
    }

    pub fn contains(&self, table: &TableName) -> bool {
        self.tables.contains_key(table)
    }

    /// number of statements that were accepted
    pub fn statements(&self) -> usize {
        self.statements
    }

    /// row count of every insert accepted since the last drop, oldest first
    pub fn batch_sizes(&self) -> &[usize] {
        &self.batch_sizes
    }
}

impl StorageAdapter for MemoryAdapter {
    fn drop_table(&mut self, table: &TableName) -> Result<(), ConnectionError> {
        if self.tables.remove(table).is_some() {
            trace!(table = %table, "Dropped in-memory table");
        }
        self.batch_sizes.clear();
        self.statements += 1;

        Ok(())
    }

    fn create_table(&mut self, table: &TableName) -> Result<(), ConnectionError> {
        if self.tables.contains_key(table) {
            return Err(ConnectionError::TableExists(table.clone()));
        }

        self.tables.insert(
            table.clone(),
            MemoryTable {
                records: Vec::new(),
                next_id: 1,
            },
        );
        self.statements += 1;

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

        let target = self
            .tables
            .get_mut(table)
            .ok_or_else(|| ConnectionError::MissingTable(table.clone()))?;

        for record in records {
            let id = target.next_id;
            target.next_id += 1;
            target.records.push(record.clone().with_id(id));
        }

        self.statements += 1;
        self.batch_sizes.push(records.len());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_ids_in_order() {
        let table = TableName::default();
        let mut adapter = MemoryAdapter::default();
        adapter.create_table(&table).unwrap();

        let records = ["a", "b", "c"]
            .map(|text| ScratchRecord::now(text.to_owned()).unwrap())
            .to_vec();
        adapter.insert(&table, &records[..2]).unwrap();
        adapter.insert(&table, &records[2..]).unwrap();

        let ids = adapter
            .records(&table)
            .unwrap()
            .iter()
            .map(|record| record.id)
            .collect::<Vec<_>>();

        assert_eq!(ids, [Some(1), Some(2), Some(3)]);
        assert_eq!(adapter.batch_sizes(), [2, 1]);
        assert_eq!(adapter.statements(), 3);
    }

    #[test]
    fn create_twice_is_rejected() {
        let table = TableName::default();
        let mut adapter = MemoryAdapter::default();

        adapter.create_table(&table).unwrap();
        assert!(matches!(
            adapter.create_table(&table),
            Err(ConnectionError::TableExists(_))
        ));
    }

    #[test]
    fn drop_of_missing_table_succeeds() {
        let table = TableName::default();
        let mut adapter = MemoryAdapter::default();

        adapter.drop_table(&table).unwrap();
        assert!(!adapter.contains(&table));
    }

    #[test]
    fn empty_insert_is_rejected() {
        let table = TableName::default();
        let mut adapter = MemoryAdapter::default();
        adapter.create_table(&table).unwrap();

        assert!(matches!(
            adapter.insert(&table, &[]),
            Err(ConnectionError::EmptyInsert)
        ));
        assert!(adapter.records(&table).unwrap().is_empty());
    }

    #[test]
    fn drop_resets_batch_sizes() {
        let table = TableName::default();
        let mut adapter = MemoryAdapter::default();
        let record = ScratchRecord::now("row".to_owned()).unwrap();

        adapter.create_table(&table).unwrap();
        adapter.insert(&table, &[record.clone(), record]).unwrap();
        assert_eq!(adapter.batch_sizes(), [2]);

        adapter.drop_table(&table).unwrap();
        assert!(adapter.batch_sizes().is_empty());
        assert_eq!(adapter.statements(), 3);
    }
}
