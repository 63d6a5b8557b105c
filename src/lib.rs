pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::{DelimitedFileSink, DelimitedFileSource};
pub use crate::core::{
    etl::{build_runner, EtlEngine, FileRunner},
    runner::{ChunkRunner, RunOutcome},
    transform::UppercaseNames,
};
pub use domain::model::{CaseMapping, Record, RunStatus, RunSummary};
pub use utils::error::{EtlError, Result};
