//! Library half of the `pajak` binary: argument parsing, config loading,
//! CSV import and command execution.

pub mod app;
pub mod config;
pub mod csv_import;
