pub mod bench;
pub mod cli;
pub mod config;
pub mod database;
pub mod logging;
pub mod report;
