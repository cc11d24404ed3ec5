//! DVOL Watch Runner — configuration, pipeline orchestration, output file.
//!
//! This crate builds on `dvolwatch-core` to provide:
//! - TOML configuration with defaults for every section
//! - The fetch -> align -> summarize -> persist pass
//! - Atomic writes of the summary JSON

pub mod config;
pub mod output;
pub mod pipeline;

pub use config::{Config, ConfigError};
pub use output::{read_summary, write_summary, PersistError};
pub use pipeline::{run_pipeline, PipelineError, RunReport, Sources};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_is_send_sync() {
        assert_send::<Config>();
        assert_sync::<Config>();
    }

    #[test]
    fn run_report_is_send_sync() {
        assert_send::<RunReport>();
        assert_sync::<RunReport>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<PipelineError>();
        assert_sync::<PipelineError>();
    }
}
