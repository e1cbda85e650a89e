use super::{ConnectionError, ScratchRecord, StorageAdapter, TableName};
use std::num::NonZeroUsize;
use tracing::{debug, error};

/// Buffers records for one table and writes them as multi-row inserts once `size` is reached
#[derive(Debug)]
pub struct BatchedWriter<'a, A: StorageAdapter + ?Sized> {
    adapter: &'a mut A,
    table: &'a TableName,
    buffer: Vec<ScratchRecord>,
    size: usize,
    flushes: usize,
}

impl<'a, A: StorageAdapter + ?Sized> BatchedWriter<'a, A> {
    pub fn new(adapter: &'a mut A, table: &'a TableName, size: NonZeroUsize) -> Self {
        Self {
            adapter,
            table,
            buffer: Vec::with_capacity(size.get()),
            size: size.get(),
            flushes: 0,
        }
    }

    /// number of statements issued so far
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// buffer `record`, returns whether this push triggered a flush
    pub fn push(&mut self, record: ScratchRecord) -> Result<bool, ConnectionError> {
        self.buffer.push(record);

        if self.buffer.len() == self.size {
            self.flush()?;

            return Ok(true);
        }

        Ok(false)
    }

    /// flush whatever is left and return the total number of statements issued
    pub fn finish(mut self) -> Result<usize, ConnectionError> {
        if !self.buffer.is_empty() {
            self.flush()?;
        }

        Ok(self.flushes)
    }

    fn flush(&mut self) -> Result<(), ConnectionError> {
        let rows = self.buffer.len();

        if let Err(error) = self.adapter.insert(self.table, &self.buffer) {
            error!(
                error = %error,
                table = %self.table,
                rows = rows,
                "Multi insert {} rejected",
                self.flushes + 1
            );

            return Err(error);
        }

        self.flushes += 1;
        self.buffer.clear();
        debug!(rows = rows, flush = self.flushes, "Flushed batch");

        Ok(())
    }
}
