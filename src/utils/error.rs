use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Source unavailable: cannot open '{}': {source}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read input at line {line}: {source}")]
    SourceRead {
        line: u64,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Malformed record at line {line}: expected {expected} fields, found {found} in '{raw}'"
    )]
    MalformedRecord {
        line: u64,
        raw: String,
        expected: usize,
        found: usize,
    },

    #[error("Sink unavailable: cannot create '{}': {source}", .path.display())]
    SinkUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Write failure on '{}': {source}", .path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Field '{value}' contains the output delimiter '{}' or a line break",
        .delimiter.escape_default()
    )]
    UnwritableField { value: String, delimiter: char },

    #[error("Run cancelled before chunk {chunk_index}")]
    Cancelled { chunk_index: usize },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Data,
    Output,
    Configuration,
    Runtime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// 可從邊界重新執行
    Medium,
    /// 資料或設定需要修正
    High,
    /// 檔案系統層級的問題
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::SourceUnavailable { .. } | EtlError::SourceRead { .. } => {
                ErrorCategory::Input
            }
            EtlError::MalformedRecord { .. }
            | EtlError::UnwritableField { .. }
            | EtlError::CsvError(_) => ErrorCategory::Data,
            EtlError::SinkUnavailable { .. } | EtlError::WriteFailure { .. } => {
                ErrorCategory::Output
            }
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            EtlError::Cancelled { .. }
            | EtlError::IoError(_)
            | EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. } => ErrorCategory::Runtime,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EtlError::Cancelled { .. } | EtlError::SourceRead { .. } => ErrorSeverity::Medium,
            EtlError::SourceUnavailable { .. }
            | EtlError::SinkUnavailable { .. }
            | EtlError::WriteFailure { .. }
            | EtlError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    /// 依嚴重程度決定程序結束碼，失敗時永遠不為 0
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::High => 1,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::Critical => 3,
        }
    }

    /// The input line that triggered the error, when there is one.
    pub fn line(&self) -> Option<u64> {
        match self {
            EtlError::MalformedRecord { line, .. } | EtlError::SourceRead { line, .. } => {
                Some(*line)
            }
            _ => None,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::SourceUnavailable { path, .. } => {
                format!("Check that '{}' exists and is readable", path.display())
            }
            EtlError::SourceRead { .. } => {
                "Retry the run; the input could not be read completely".to_string()
            }
            EtlError::MalformedRecord { line, expected, .. } => format!(
                "Fix line {} so it contains exactly {} delimited fields, then rerun",
                line, expected
            ),
            EtlError::SinkUnavailable { path, .. } => format!(
                "Check that the directory of '{}' exists and is writable",
                path.display()
            ),
            EtlError::WriteFailure { .. } => {
                "Check free disk space and permissions; committed chunks are kept".to_string()
            }
            EtlError::UnwritableField { .. } => {
                "Pick an output delimiter that does not occur in the names".to_string()
            }
            EtlError::Cancelled { chunk_index } => {
                format!("Resume from chunk {} when ready", chunk_index)
            }
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. } => {
                "Review the configuration file or command line flags".to_string()
            }
            _ => "Inspect the logs with --verbose for more details".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::MalformedRecord { line, raw, .. } => {
                format!("Input line {} is malformed: '{}'", line, raw)
            }
            EtlError::SourceUnavailable { path, .. } => {
                format!("Cannot open input file '{}'", path.display())
            }
            EtlError::SinkUnavailable { path, .. } => {
                format!("Cannot create output file '{}'", path.display())
            }
            EtlError::WriteFailure { path, .. } => {
                format!("Writing to '{}' failed", path.display())
            }
            EtlError::Cancelled { .. } => "Run was cancelled".to_string(),
            other => other.to_string(),
        }
    }
}
