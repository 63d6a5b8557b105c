use crate::core::runner::{DEFAULT_CHUNK_SIZE, DEFAULT_JOB_NAME};
use crate::core::{CaseMapping, ConfigProvider};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "chunk-etl")]
#[command(about = "Uppercase and reorder person records, one chunk at a time")]
pub struct CliConfig {
    /// Input file with `firstName,lastName` lines
    #[arg(short, long)]
    pub input_path: String,

    /// Output file, created or overwritten at start
    #[arg(short, long)]
    pub output_path: String,

    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    #[arg(long, default_value = ",")]
    pub field_delimiter: char,

    #[arg(long, default_value = ",")]
    pub output_delimiter: char,

    /// Column order of the input file
    #[arg(long, value_delimiter = ',', default_value = "firstName,lastName")]
    pub field_names: Vec<String>,

    /// Leading lines to drop (header)
    #[arg(long, default_value = "0")]
    pub lines_to_skip: usize,

    #[arg(long = "comment-prefix")]
    pub comment_prefixes: Vec<String>,

    /// Line written at the top of the output
    #[arg(long)]
    pub header: Option<String>,

    #[arg(long, help = "Append to the output instead of overwriting it")]
    pub append: bool,

    #[arg(long, help = "Remove the output when no record was written")]
    pub delete_if_empty: bool,

    #[arg(long, value_enum, default_value_t = CaseMapping::Ascii)]
    pub case_mapping: CaseMapping,

    #[arg(long)]
    pub io_timeout_seconds: Option<u64>,

    #[arg(long, default_value = DEFAULT_JOB_NAME)]
    pub job_name: String,

    /// Identifier echoed in logs and the summary
    #[arg(long)]
    pub run_id: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log process memory after each chunk")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[arg(long, help = "Print the run summary as JSON")]
    pub summary_json: bool,
}

impl ConfigProvider for CliConfig {
    fn job_name(&self) -> &str {
        &self.job_name
    }

    fn input_path(&self) -> &str {
        &self.input_path
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn field_delimiter(&self) -> char {
        self.field_delimiter
    }

    fn output_delimiter(&self) -> char {
        self.output_delimiter
    }

    fn field_names(&self) -> &[String] {
        &self.field_names
    }

    fn lines_to_skip(&self) -> usize {
        self.lines_to_skip
    }

    fn comment_prefixes(&self) -> &[String] {
        &self.comment_prefixes
    }

    fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    fn append(&self) -> bool {
        self.append
    }

    fn delete_if_empty(&self) -> bool {
        self.delete_if_empty
    }

    fn case_mapping(&self) -> CaseMapping {
        self.case_mapping
    }

    fn io_timeout(&self) -> Option<Duration> {
        self.io_timeout_seconds.map(Duration::from_secs)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        super::validate_provider(self)
    }
}
