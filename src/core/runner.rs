use crate::core::{
    Chunk, ChunkListener, Record, RecordSink, RecordSource, RecordTransformer, RunState,
    RunStatus, RunSummary,
};
use crate::utils::error::{EtlError, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

pub const DEFAULT_CHUNK_SIZE: usize = 5;
pub const DEFAULT_JOB_NAME: &str = "copy-file-to-file";

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunSummary),
    Failed {
        error: EtlError,
        /// Index of the chunk that was being read or written.
        chunk_index: usize,
        summary: RunSummary,
    },
}

impl RunOutcome {
    pub fn summary(&self) -> &RunSummary {
        match self {
            RunOutcome::Completed(summary) | RunOutcome::Failed { summary, .. } => summary,
        }
    }

    pub fn status(&self) -> RunStatus {
        self.summary().status
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }

    pub fn error(&self) -> Option<&EtlError> {
        match self {
            RunOutcome::Completed(_) => None,
            RunOutcome::Failed { error, .. } => Some(error),
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.error().map(EtlError::exit_code).unwrap_or(0)
    }

    pub fn into_result(self) -> Result<RunSummary> {
        match self {
            RunOutcome::Completed(summary) => Ok(summary),
            RunOutcome::Failed { error, .. } => Err(error),
        }
    }
}

/// Drives source → transformer → sink one chunk at a time.
///
/// The runner moves `Idle -> Running -> {Completed, Failed}` exactly once. Each chunk is
/// read in full, transformed in order and handed to the sink as one commit; the first
/// error ends the run. Chunks committed before a failure stay in the output.
/// Cancellation is only observed between chunks.
pub struct ChunkRunner<S, T, W> {
    source: S,
    transformer: T,
    sink: W,
    chunk_size: usize,
    status: RunStatus,
    state: RunState,
    job_name: String,
    run_id: Option<String>,
    cancel: CancellationToken,
    listeners: Vec<Arc<dyn ChunkListener>>,
}

impl<S, T, W> ChunkRunner<S, T, W>
where
    S: RecordSource,
    T: RecordTransformer,
    W: RecordSink,
{
    pub fn new(source: S, transformer: T, sink: W, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(EtlError::InvalidConfigValueError {
                field: "chunk_size".to_string(),
                value: chunk_size.to_string(),
                reason: "Value must be at least 1".to_string(),
            });
        }

        Ok(Self {
            source,
            transformer,
            sink,
            chunk_size,
            status: RunStatus::Idle,
            state: RunState::default(),
            job_name: DEFAULT_JOB_NAME.to_string(),
            run_id: None,
            cancel: CancellationToken::new(),
            listeners: Vec::new(),
        })
    }

    pub fn with_job_name(mut self, job_name: impl Into<String>) -> Self {
        self.job_name = job_name.into();
        self
    }

    /// Run identity is supplied by the caller and only echoed in logs and the summary.
    pub fn with_run_id(mut self, run_id: Option<String>) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn ChunkListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }

    pub async fn run(&mut self) -> RunOutcome {
        let started_at = Utc::now();
        let timer = Instant::now();

        if self.status != RunStatus::Idle {
            let error = EtlError::ProcessingError {
                message: format!(
                    "runner is {:?}; reopen the source to run again",
                    self.status
                ),
            };
            let summary = self.summary(RunStatus::Failed, Some(&error), started_at, timer);
            return RunOutcome::Failed {
                error,
                chunk_index: self.state.chunk_index,
                summary,
            };
        }

        self.status = RunStatus::Running;
        let span = tracing::info_span!(
            "chunk_run",
            job = %self.job_name,
            run_id = self.run_id.as_deref().unwrap_or("-")
        );

        let result = async {
            match self.drive().await {
                Ok(()) => self.close_all().await,
                Err(error) => {
                    self.close_quietly().await;
                    Err(error)
                }
            }
        }
        .instrument(span)
        .await;

        match result {
            Ok(()) => {
                self.status = RunStatus::Completed;
                let summary = self.summary(RunStatus::Completed, None, started_at, timer);
                tracing::info!(
                    "✅ {} completed: {} chunks, {} records read, {} written",
                    self.job_name,
                    summary.chunks_committed,
                    summary.records_read,
                    summary.records_written
                );
                RunOutcome::Completed(summary)
            }
            Err(error) => {
                self.status = RunStatus::Failed;
                let chunk_index = self.state.chunk_index;
                for listener in &self.listeners {
                    listener.on_chunk_error(chunk_index, &error);
                }
                tracing::error!(
                    "❌ {} failed at chunk {}: {} ({} records read, {} written)",
                    self.job_name,
                    chunk_index,
                    error,
                    self.state.records_read,
                    self.state.records_written
                );
                let summary = self.summary(RunStatus::Failed, Some(&error), started_at, timer);
                RunOutcome::Failed {
                    error,
                    chunk_index,
                    summary,
                }
            }
        }
    }

    async fn drive(&mut self) -> Result<()> {
        tracing::info!(
            "🚀 Starting {} with chunk size {}",
            self.job_name,
            self.chunk_size
        );

        loop {
            // chunk 邊界：只在這裡處理取消
            if self.cancel.is_cancelled() {
                tracing::warn!(
                    "🛑 Cancellation requested, stopping before chunk {}",
                    self.state.chunk_index
                );
                return Err(EtlError::Cancelled {
                    chunk_index: self.state.chunk_index,
                });
            }

            let chunk_index = self.state.chunk_index;
            let chunk = self.read_chunk().await?;
            if chunk.is_empty() {
                return Ok(());
            }

            for listener in &self.listeners {
                listener.before_chunk(chunk_index);
            }

            let transformed: Chunk = chunk
                .into_iter()
                .map(|record| self.transformer.transform(record))
                .collect();

            self.sink.write_chunk(&transformed).await?;

            self.state.records_written += transformed.len() as u64;
            self.state.chunks_committed += 1;
            self.state.chunk_index += 1;

            tracing::debug!(
                "Chunk {} committed: {} records ({} written so far)",
                chunk_index,
                transformed.len(),
                self.state.records_written
            );

            for listener in &self.listeners {
                listener.after_chunk(chunk_index, &self.state);
            }
        }
    }

    /// Pulls up to `chunk_size` records; fewer only at end of input.
    async fn read_chunk(&mut self) -> Result<Chunk> {
        let mut chunk: Vec<Record> = Vec::with_capacity(self.chunk_size.min(1024));
        while chunk.len() < self.chunk_size {
            match self.source.next_record().await? {
                Some(record) => {
                    self.state.records_read += 1;
                    chunk.push(record);
                }
                None => break,
            }
        }
        Ok(chunk)
    }

    async fn close_all(&mut self) -> Result<()> {
        self.source.close().await?;
        self.sink.close().await
    }

    async fn close_quietly(&mut self) {
        if let Err(e) = self.source.close().await {
            tracing::warn!("⚠️ Failed to close source: {}", e);
        }
        if let Err(e) = self.sink.close().await {
            tracing::warn!("⚠️ Failed to close sink: {}", e);
        }
    }

    fn summary(
        &self,
        status: RunStatus,
        error: Option<&EtlError>,
        started_at: DateTime<Utc>,
        timer: Instant,
    ) -> RunSummary {
        RunSummary {
            job_name: self.job_name.clone(),
            run_id: self.run_id.clone(),
            status,
            chunk_size: self.chunk_size,
            chunks_committed: self.state.chunks_committed,
            records_read: self.state.records_read,
            records_written: self.state.records_written,
            lines_skipped: self.source.lines_skipped(),
            failed_chunk: error.map(|_| self.state.chunk_index),
            failed_line: error.and_then(EtlError::line),
            error: error.map(ToString::to_string),
            started_at,
            finished_at: Utc::now(),
            duration_ms: timer.elapsed().as_millis() as u64,
        }
    }
}
