use crate::{
    bench::BenchmarkKind,
    config::{BenchConfig, ConnectionConfig},
    logging::DEFAULT_LOG_FILE,
};
use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Run database performance tests.",
    after_help = "Example: dbperf --database bench.db --rows 1000 --rows-per-multi-insert 100"
)]
pub struct Args {
    /// YAML configuration file, flags take precedence over its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// run test: single inserts for every row
    #[arg(long)]
    pub single: bool,

    /// run test: insert multiple rows in one request
    #[arg(long)]
    pub multi: bool,

    /// run all tests (default)
    #[arg(long, conflicts_with_all = ["single", "multi"])]
    pub all: bool,

    /// number of insert rows
    #[arg(long)]
    pub rows: Option<u64>,

    /// number of rows per multi insert
    #[arg(long, visible_aliases = ["batch-size", "rows_per_multi_insert"])]
    pub rows_per_multi_insert: Option<u64>,

    /// name of the scratch table, dropped and recreated by every run
    #[arg(long)]
    pub table: Option<String>,

    /// SQLite database file, `:memory:` for a private in-memory database
    #[arg(long, conflicts_with = "dry_run")]
    pub database: Option<PathBuf>,

    /// write to process memory instead of a database
    #[arg(long)]
    pub dry_run: bool,

    /// number of runs per test
    #[arg(long)]
    pub repeat: Option<u32>,

    /// write a YAML report of all runs to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// logfile name
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    pub log: PathBuf,

    /// only log to the console
    #[arg(long, conflicts_with = "log")]
    pub no_log_file: bool,

    /// show verbose output, repeat for more
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// tests selected on the command line, all of them if none was picked
    pub fn kinds(&self) -> Vec<BenchmarkKind> {
        if self.all || !(self.single || self.multi) {
            return vec![BenchmarkKind::Single, BenchmarkKind::Multi];
        }

        let mut kinds = Vec::new();

        if self.single {
            kinds.push(BenchmarkKind::Single);
        }

        if self.multi {
            kinds.push(BenchmarkKind::Multi);
        }

        kinds
    }

    /// override `config` with every value given on the command line
    pub fn apply(&self, config: &mut BenchConfig) {
        if let Some(rows) = self.rows {
            config.rows = rows;
        }

        if let Some(rows_per_multi_insert) = self.rows_per_multi_insert {
            config.rows_per_multi_insert = rows_per_multi_insert;
        }

        if let Some(table) = &self.table {
            config.table = table.clone();
        }

        if let Some(repeat) = self.repeat {
            config.repeat = repeat;
        }

        if self.dry_run {
            config.database = ConnectionConfig::Memory;
        } else if let Some(path) = &self.database {
            config.database = ConnectionConfig::SQLite { path: path.clone() };
        }
    }

    pub fn log_file(&self) -> Option<&std::path::Path> {
        (!self.no_log_file).then_some(self.log.as_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("dbperf").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn command_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn runs_everything_by_default() {
        assert_eq!(
            parse(&[]).kinds(),
            [BenchmarkKind::Single, BenchmarkKind::Multi]
        );
        assert_eq!(
            parse(&["--all"]).kinds(),
            [BenchmarkKind::Single, BenchmarkKind::Multi]
        );
    }

    #[test]
    fn selects_single_tests() {
        assert_eq!(parse(&["--single"]).kinds(), [BenchmarkKind::Single]);
        assert_eq!(parse(&["--multi"]).kinds(), [BenchmarkKind::Multi]);
        assert!(Args::try_parse_from(["dbperf", "--all", "--single"]).is_err());
    }

    #[test]
    fn flags_override_config() {
        let mut config = BenchConfig::default();
        parse(&[
            "--rows",
            "100",
            "--batch-size",
            "7",
            "--table",
            "scratch",
            "--repeat",
            "3",
            "--database",
            ":memory:",
        ])
        .apply(&mut config);

        assert_eq!(config.rows, 100);
        assert_eq!(config.rows_per_multi_insert, 7);
        assert_eq!(config.table, "scratch");
        assert_eq!(config.repeat, 3);
        assert_eq!(
            config.database,
            ConnectionConfig::SQLite {
                path: PathBuf::from(":memory:")
            }
        );
    }

    #[test]
    fn rows_per_multi_insert_spellings() {
        for flag in ["--rows-per-multi-insert", "--batch-size", "--rows_per_multi_insert"] {
            assert_eq!(parse(&[flag, "5"]).rows_per_multi_insert, Some(5));
        }
    }

    #[test]
    fn dry_run_uses_memory() {
        let mut config = BenchConfig::default();
        parse(&["--dry-run"]).apply(&mut config);

        assert_eq!(config.database, ConnectionConfig::Memory);
        assert!(Args::try_parse_from(["dbperf", "--dry-run", "--database", "x.db"]).is_err());
    }

    #[test]
    fn log_file_can_be_disabled() {
        assert_eq!(
            parse(&[]).log_file(),
            Some(std::path::Path::new(DEFAULT_LOG_FILE))
        );
        assert_eq!(parse(&["--no-log-file"]).log_file(), None);
    }
}
