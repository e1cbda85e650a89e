use crate::{
    bench::{BenchmarkError, BenchmarkKind, Status},
    config::BenchConfig,
};
use chrono::{Local, NaiveDateTime, SubsecRound};
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufWriter, path::Path};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize report")]
    Serialize(#[from] serde_yaml::Error),
}

pub fn mean(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    values.iter().map(|&value| value as f64).sum::<f64>() / values.len() as f64
}

pub fn median(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let middle = sorted.len() / 2;

    if sorted.len() % 2 == 1 {
        sorted[middle] as f64
    } else {
        (sorted[middle - 1] as f64 + sorted[middle] as f64) / 2.0
    }
}

/// Timings of all repetitions of one benchmark kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub kind: BenchmarkKind,
    pub rows: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows_per_multi_insert: Option<u64>,
    /// durations of the successful runs in milliseconds
    pub durations: Vec<u64>,
    pub errors: u32,
    /// status of the most recent failure, `Success` if none failed
    pub status: Status,
}

impl RunSummary {
    pub fn new(kind: BenchmarkKind, rows: u64, rows_per_multi_insert: Option<u64>) -> Self {
        Self {
            kind,
            rows,
            rows_per_multi_insert,
            durations: Vec::new(),
            errors: 0,
            status: Status::Success,
        }
    }

    pub fn record(&mut self, result: &Result<u64, BenchmarkError>) {
        match result {
            Ok(duration) => self.durations.push(*duration),
            Err(error) => {
                self.errors += 1;
                self.status = error.status();
            }
        }
    }

    pub fn successful(&self) -> usize {
        self.durations.len()
    }

    pub fn mean(&self) -> f64 {
        mean(&self.durations)
    }

    pub fn median(&self) -> f64 {
        median(&self.durations)
    }

    pub fn line(&self) -> String {
        format!(
            "{} --> successful: {}, errors: {}, mean: {:.2}ms, median: {:.2}ms",
            self.kind,
            self.successful(),
            self.errors,
            self.mean(),
            self.median()
        )
    }

    pub fn show(&self) {
        if self.durations.is_empty() {
            warn!(status = ?self.status, "{}", self.line());
        } else {
            info!("{}", self.line());
        }
    }
}

/// Everything written by `--report`
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub generated: NaiveDateTime,
    pub adapter: &'a str,
    pub config: &'a BenchConfig,
    pub summaries: &'a [RunSummary],
}

impl<'a> Report<'a> {
    pub fn new(adapter: &'a str, config: &'a BenchConfig, summaries: &'a [RunSummary]) -> Self {
        Self {
            generated: Local::now().naive_local().trunc_subsecs(0),
            adapter,
            config,
            summaries,
        }
    }

    pub fn write(&self, path: &Path) -> Result<(), ReportError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        serde_yaml::to_writer(BufWriter::new(File::create(path)?), self)?;
        info!(path = ?path, "Wrote report");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::ConnectionError;

    #[test]
    fn mean_and_median() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(median(&[]), 0.0);

        assert_eq!(mean(&[3, 1, 2]), 2.0);
        assert_eq!(median(&[3, 1, 2]), 2.0);

        assert_eq!(mean(&[4, 1, 3, 10]), 4.5);
        assert_eq!(median(&[4, 1, 3, 10]), 3.5);
    }

    #[test]
    fn summary_counts_errors() {
        let mut summary = RunSummary::new(BenchmarkKind::Multi, 10, Some(4));

        summary.record(&Ok(12));
        summary.record(&Err(BenchmarkError::Storage(ConnectionError::EmptyInsert)));
        summary.record(&Ok(8));

        assert_eq!(summary.successful(), 2);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.status, Status::StorageError);
        assert_eq!(
            summary.line(),
            "insert multiple rows in one request --> successful: 2, errors: 1, mean: 10.00ms, median: 10.00ms"
        );
    }

    #[test]
    fn report_is_written_as_yaml() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("reports").join("run.yaml");
        let config = BenchConfig::default();
        let mut summary = RunSummary::new(BenchmarkKind::Single, 10, None);
        summary.record(&Ok(5));
        let summaries = [summary];

        Report::new("memory", &config, &summaries)
            .write(&path)
            .unwrap();

        let written: serde_yaml::Value =
            serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(written["adapter"].as_str(), Some("memory"));
        assert_eq!(written["summaries"][0]["kind"].as_str(), Some("single"));
        assert_eq!(written["summaries"][0]["durations"][0].as_u64(), Some(5));
        assert_eq!(written["summaries"][0]["status"].as_i64(), Some(0));
        assert_eq!(
            written["config"]["database"]["sqlite"]["path"].as_str(),
            Some("dbperf.db")
        );
        assert_eq!(
            serde_yaml::from_value::<BenchConfig>(written["config"].clone()).unwrap(),
            config
        );
    }
}
