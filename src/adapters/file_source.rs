use crate::domain::model::Record;
use crate::domain::ports::RecordSource;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

pub const FIRST_NAME: &str = "firstName";
pub const LAST_NAME: &str = "lastName";

/// Declared column order of the input file, mapped to record attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    first_name: usize,
    last_name: usize,
}

impl FieldMapping {
    /// 依欄位名稱建立映射；名稱必須恰好是 firstName 與 lastName 各一次
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        if names.len() != 2 {
            return Err(EtlError::ConfigError {
                message: format!(
                    "field names declare {} columns but a record has 2 ({}, {})",
                    names.len(),
                    FIRST_NAME,
                    LAST_NAME
                ),
            });
        }

        let mut first_name = None;
        let mut last_name = None;
        for (index, name) in names.iter().enumerate() {
            let slot = match name.as_ref() {
                FIRST_NAME => &mut first_name,
                LAST_NAME => &mut last_name,
                other => {
                    return Err(EtlError::ConfigError {
                        message: format!("unknown field name '{}'", other),
                    })
                }
            };
            if slot.replace(index).is_some() {
                return Err(EtlError::ConfigError {
                    message: format!("field name '{}' declared twice", name.as_ref()),
                });
            }
        }

        match (first_name, last_name) {
            (Some(first_name), Some(last_name)) => Ok(Self {
                first_name,
                last_name,
            }),
            _ => Err(EtlError::ConfigError {
                message: format!("field names must include {} and {}", FIRST_NAME, LAST_NAME),
            }),
        }
    }

    pub fn field_count(&self) -> usize {
        2
    }

    fn map(&self, fields: &[&str]) -> Record {
        Record::new(fields[self.first_name], fields[self.last_name])
    }
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            first_name: 0,
            last_name: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceOptions {
    pub delimiter: char,
    pub mapping: FieldMapping,
    pub lines_to_skip: usize,
    pub comment_prefixes: Vec<String>,
    pub read_timeout: Option<Duration>,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            mapping: FieldMapping::default(),
            lines_to_skip: 0,
            comment_prefixes: Vec::new(),
            read_timeout: None,
        }
    }
}

/// Reads one record per line from a delimited text file.
pub struct DelimitedFileSource {
    path: PathBuf,
    lines: Option<Lines<BufReader<File>>>,
    options: SourceOptions,
    line_number: u64,
    lines_skipped: u64,
    header_lines: Vec<String>,
}

impl DelimitedFileSource {
    pub async fn open(path: impl AsRef<Path>, options: SourceOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .await
            .map_err(|source| EtlError::SourceUnavailable {
                path: path.clone(),
                source,
            })?;

        tracing::debug!("Opened input file: {}", path.display());

        Ok(Self {
            path,
            lines: Some(BufReader::new(file).lines()),
            options,
            line_number: 0,
            lines_skipped: 0,
            header_lines: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The leading lines dropped by `lines_to_skip`, in file order.
    pub fn skipped_header_lines(&self) -> &[String] {
        &self.header_lines
    }

    fn is_comment(&self, text: &str) -> bool {
        self.options
            .comment_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && text.starts_with(prefix.as_str()))
    }

    fn parse_line(&self, line: u64, text: &str) -> Result<Record> {
        let fields: Vec<&str> = text.split(self.options.delimiter).collect();
        let expected = self.options.mapping.field_count();

        if fields.len() != expected {
            return Err(EtlError::MalformedRecord {
                line,
                raw: text.to_string(),
                expected,
                found: fields.len(),
            });
        }

        Ok(self.options.mapping.map(&fields))
    }

    async fn next_line(&mut self) -> Result<Option<String>> {
        let Some(lines) = self.lines.as_mut() else {
            return Ok(None);
        };
        let line = self.line_number + 1;

        let read = match self.options.read_timeout {
            Some(timeout) => tokio::time::timeout(timeout, lines.next_line())
                .await
                .unwrap_or_else(|_| {
                    Err(io::Error::new(io::ErrorKind::TimedOut, "read timed out"))
                }),
            None => lines.next_line().await,
        };

        match read.map_err(|source| EtlError::SourceRead { line, source })? {
            Some(text) => {
                self.line_number = line;
                Ok(Some(text))
            }
            None => {
                // 讀完即釋放檔案
                self.lines = None;
                tracing::debug!(
                    "Reached end of {} after {} lines",
                    self.path.display(),
                    self.line_number
                );
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl RecordSource for DelimitedFileSource {
    async fn next_record(&mut self) -> Result<Option<Record>> {
        loop {
            let Some(text) = self.next_line().await? else {
                return Ok(None);
            };
            let line = self.line_number;

            if line <= self.options.lines_to_skip as u64 {
                self.lines_skipped += 1;
                self.header_lines.push(text);
                continue;
            }

            // 只略過真正的空行，空白字元行照常解析
            if text.is_empty() || self.is_comment(&text) {
                tracing::trace!("Skipping line {}", line);
                self.lines_skipped += 1;
                continue;
            }

            return self.parse_line(line, &text).map(Some);
        }
    }

    fn line_number(&self) -> u64 {
        self.line_number
    }

    fn lines_skipped(&self) -> u64 {
        self.lines_skipped
    }

    async fn close(&mut self) -> Result<()> {
        self.lines = None;
        Ok(())
    }
}
