use clap::Parser;
use dbperf_runner::{
    bench::Runner,
    cli::Args,
    config::BenchConfig,
    database::StorageAdapters,
    logging,
    report::Report,
};
use std::process::ExitCode;
use tracing::{error, info};

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(error) = logging::init(args.verbose, args.log_file()) {
        eprintln!("Failed to set up logging: {error}");

        return ExitCode::from(1);
    }

    let mut config = match &args.config {
        Some(path) => match BenchConfig::load(path) {
            Ok(config) => config,
            Err(error) => {
                error!("Failed to load config {}: {error}", path.display());

                return ExitCode::from(1);
            }
        },
        None => BenchConfig::default(),
    };
    args.apply(&mut config);

    if config.preflight_checks() {
        error!("Configuration contains errors, not running any test");

        return ExitCode::from(1);
    }

    let table = match config.table_name() {
        Ok(table) => table,
        Err(error) => {
            error!("{error}");

            return ExitCode::from(1);
        }
    };

    let adapter = match StorageAdapters::load(&config.database) {
        Ok(adapter) => adapter,
        Err(error) => {
            error!(error = %error, "Failed to open storage");

            return ExitCode::from(1);
        }
    };
    let adapter_name = adapter.name();

    info!(
        adapter = adapter_name,
        table = %table,
        rows = config.rows,
        rows_per_multi_insert = config.rows_per_multi_insert,
        repeat = config.repeat,
        "Starting database performance tests"
    );

    let mut runner = Runner::new(adapter, table);
    let summaries = runner.run_suite(
        &args.kinds(),
        config.rows,
        config.rows_per_multi_insert,
        config.repeat,
    );

    for summary in summaries.iter() {
        summary.show();
    }

    let mut code = if summaries.iter().any(|summary| summary.durations.is_empty()) {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    };

    if let Some(path) = &args.report {
        if let Err(error) = Report::new(adapter_name, &config, &summaries).write(path) {
            error!(error = %error, "Failed to write report to {}", path.display());
            code = ExitCode::from(1);
        }
    }

    if let Err(error) = runner.into_adapter().close() {
        error!(error = %error, "Failed to close storage");
    }

    code
}
