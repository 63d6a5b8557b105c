use crate::domain::model::{CaseMapping, Record, RunState};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Lazy, finite, non-restartable sequence of records.
#[async_trait]
pub trait RecordSource: Send {
    /// `Ok(None)` marks the end of input.
    async fn next_record(&mut self) -> Result<Option<Record>>;

    /// Last physical line consumed, 1-based. Zero before the first read.
    fn line_number(&self) -> u64 {
        0
    }

    /// Lines dropped without parsing (header, blank, comment).
    fn lines_skipped(&self) -> u64 {
        0
    }

    /// 釋放讀取資源
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

pub trait RecordTransformer: Send + Sync {
    fn transform(&self, record: Record) -> Record;
}

impl<F> RecordTransformer for F
where
    F: Fn(Record) -> Record + Send + Sync,
{
    fn transform(&self, record: Record) -> Record {
        self(record)
    }
}

#[async_trait]
pub trait RecordSink: Send {
    /// Formats and commits the whole chunk, or nothing of it.
    async fn write_chunk(&mut self, chunk: &[Record]) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

/// Hooks called by the runner around each chunk.
pub trait ChunkListener: Send + Sync {
    fn before_chunk(&self, _chunk_index: usize) {}

    fn after_chunk(&self, _chunk_index: usize, _state: &RunState) {}

    fn on_chunk_error(&self, _chunk_index: usize, _error: &EtlError) {}
}

pub trait ConfigProvider: Send + Sync {
    fn job_name(&self) -> &str;
    fn input_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn chunk_size(&self) -> usize;
    fn field_delimiter(&self) -> char;
    fn output_delimiter(&self) -> char;
    fn field_names(&self) -> &[String];
    fn lines_to_skip(&self) -> usize;
    fn comment_prefixes(&self) -> &[String];
    fn header(&self) -> Option<&str>;
    fn append(&self) -> bool;
    fn delete_if_empty(&self) -> bool;
    fn case_mapping(&self) -> CaseMapping;
    fn io_timeout(&self) -> Option<Duration>;
}
