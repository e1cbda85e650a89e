use crate::{
    database::{
        batched::BatchedWriter, ConnectionError, RecordError, ScratchRecord, StorageAdapter,
        TableName,
    },
    report::RunSummary,
};
use serde::{Deserialize, Serialize};
use serde_repr::*;
use std::{
    fmt,
    num::{NonZeroU64, NonZeroUsize},
    slice, thread,
    time::{Duration, Instant},
};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// Pause before the clock starts, lets the freshly created table settle
pub const SETTLING_DELAY: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum BenchmarkError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("Could not complete benchmark: {0}")]
    Storage(#[from] ConnectionError),
    #[error("Could not build scratch record: {0}")]
    Record(#[from] RecordError),
}

/// Outcome code of a benchmark invocation, as reported to callers
#[derive(Serialize_repr, Deserialize_repr, PartialEq, Eq, Debug, Clone, Copy)]
#[repr(i8)]
pub enum Status {
    StorageError = -2,
    InvalidArgument = -1,
    Success = 0,
}

impl BenchmarkError {
    pub fn status(&self) -> Status {
        match self {
            Self::InvalidArgument(_) => Status::InvalidArgument,
            Self::Storage(_) | Self::Record(_) => Status::StorageError,
        }
    }
}

/// The write strategies that can be measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BenchmarkKind {
    /// one insert statement per row
    Single,
    /// rows grouped into multi-row insert statements
    Multi,
}

impl fmt::Display for BenchmarkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => f.write_str("single inserts for every row"),
            Self::Multi => f.write_str("insert multiple rows in one request"),
        }
    }
}

fn elapsed_millis(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Runs insert benchmarks against an injected storage adapter
///
/// The runner exclusively owns its scratch table while a run is in progress; two runners sharing
/// a table name on the same database produce undefined results.
#[derive(Debug)]
pub struct Runner<A: StorageAdapter> {
    adapter: A,
    table: TableName,
    settling_delay: Duration,
}

impl<A: StorageAdapter> Runner<A> {
    pub fn new(adapter: A, table: TableName) -> Self {
        Self {
            adapter,
            table,
            settling_delay: SETTLING_DELAY,
        }
    }

    pub fn with_settling_delay(mut self, delay: Duration) -> Self {
        self.settling_delay = delay;
        self
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    pub fn into_adapter(self) -> A {
        self.adapter
    }

    /// Drop and recreate `table`, leaving it empty
    pub fn prepare(&mut self, table: &TableName) -> Result<(), ConnectionError> {
        if let Err(error) = self.adapter.drop_table(table) {
            error!(error = %error, table = %table, "Failed to drop scratch table");

            return Err(error);
        }

        self.adapter.create_table(table)?;
        debug!(table = %table, "Prepared scratch table");

        Ok(())
    }

    /// Insert `row_count` rows one statement at a time, returns the elapsed milliseconds
    ///
    /// The first rejected insert aborts the run. Rows written up to that point stay in the table.
    pub fn run_single_inserts(
        &mut self,
        table: &TableName,
        row_count: NonZeroU64,
    ) -> Result<u64, BenchmarkError> {
        thread::sleep(self.settling_delay);
        let start = Instant::now();

        for row in 1..=row_count.get() {
            let record = ScratchRecord::now(format!("single insert, row {row}/{row_count}"))?;

            if let Err(error) = self.adapter.insert(table, slice::from_ref(&record)) {
                error!(
                    error = %error,
                    table = %table,
                    "Single insert rejected at row {row}/{row_count}"
                );

                return Err(error.into());
            }
        }

        Ok(elapsed_millis(start))
    }

    /// Insert `row_count` rows as multi-row statements of `batch_size` rows
    ///
    /// A trailing partial batch is always written. Row numbering is global over all batches.
    pub fn run_batched_inserts(
        &mut self,
        table: &TableName,
        row_count: NonZeroU64,
        batch_size: NonZeroUsize,
    ) -> Result<u64, BenchmarkError> {
        thread::sleep(self.settling_delay);
        let start = Instant::now();

        let mut writer = BatchedWriter::new(&mut self.adapter, table, batch_size);

        for row in 1..=row_count.get() {
            writer.push(ScratchRecord::now(format!(
                "multi insert, row {row}/{row_count}"
            ))?)?;
        }

        let flushes = writer.finish()?;
        let elapsed = elapsed_millis(start);

        debug!(flushes = flushes, "Finished multi inserts");

        Ok(elapsed)
    }

    /// Validate `row_count`, recreate the scratch table and time single inserts
    #[instrument(skip(self), level = "info")]
    pub fn run_single_benchmark(&mut self, row_count: u64) -> Result<u64, BenchmarkError> {
        let row_count =
            NonZeroU64::new(row_count).ok_or(BenchmarkError::InvalidArgument("rows must be >= 1"))?;
        let table = self.table.clone();

        info!("run test: {}", BenchmarkKind::Single);
        self.prepare(&table)?;
        let duration = self.run_single_inserts(&table, row_count)?;
        info!(duration_ms = duration, "Finished single inserts");

        Ok(duration)
    }

    /// Validate both counts, recreate the scratch table and time batched inserts
    #[instrument(skip(self), level = "info")]
    pub fn run_batched_benchmark(
        &mut self,
        row_count: u64,
        batch_size: u64,
    ) -> Result<u64, BenchmarkError> {
        let row_count =
            NonZeroU64::new(row_count).ok_or(BenchmarkError::InvalidArgument("rows must be >= 1"))?;
        let batch_size = usize::try_from(batch_size)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or(BenchmarkError::InvalidArgument(
                "rows per multi insert must be >= 1",
            ))?;
        let table = self.table.clone();

        info!("run test: {}", BenchmarkKind::Multi);
        self.prepare(&table)?;
        let duration = self.run_batched_inserts(&table, row_count, batch_size)?;
        info!(duration_ms = duration, "Finished multi inserts");

        Ok(duration)
    }

    pub fn run(
        &mut self,
        kind: BenchmarkKind,
        row_count: u64,
        batch_size: u64,
    ) -> Result<u64, BenchmarkError> {
        match kind {
            BenchmarkKind::Single => self.run_single_benchmark(row_count),
            BenchmarkKind::Multi => self.run_batched_benchmark(row_count, batch_size),
        }
    }

    /// Run every kind in `kinds` `repeat` times and summarize the timings per kind
    ///
    /// Invalid arguments stop the repetitions of a kind early, since every further attempt would
    /// be rejected the same way.
    pub fn run_suite(
        &mut self,
        kinds: &[BenchmarkKind],
        row_count: u64,
        batch_size: u64,
        repeat: u32,
    ) -> Vec<RunSummary> {
        kinds
            .iter()
            .map(|&kind| {
                let mut summary = RunSummary::new(
                    kind,
                    row_count,
                    (kind == BenchmarkKind::Multi).then_some(batch_size),
                );

                for attempt in 1..=repeat {
                    let result = self.run(kind, row_count, batch_size);

                    if let Err(error) = &result {
                        warn!(attempt = attempt, status = ?error.status(), "Run failed: {error}");
                    }

                    let invalid = matches!(result, Err(BenchmarkError::InvalidArgument(_)));
                    summary.record(&result);

                    if invalid {
                        break;
                    }
                }

                summary
            })
            .collect()
    }
}
