#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use toml_config::TomlConfig;

use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_delimiter, validate_distinct_paths, validate_non_empty_string, validate_path,
    validate_positive_number,
};

/// Checks shared by every configuration source; runs before any file is opened.
pub fn validate_provider<C: ConfigProvider + ?Sized>(config: &C) -> Result<()> {
    validate_non_empty_string("job_name", config.job_name())?;
    validate_path("input_path", config.input_path())?;
    validate_path("output_path", config.output_path())?;
    validate_distinct_paths(config.input_path(), config.output_path())?;
    validate_positive_number("chunk_size", config.chunk_size(), 1)?;
    validate_delimiter("field_delimiter", config.field_delimiter())?;
    validate_delimiter("output_delimiter", config.output_delimiter())?;

    if let Some(timeout) = config.io_timeout() {
        validate_positive_number("io_timeout_seconds", timeout.as_secs() as usize, 1)?;
    }

    Ok(())
}
