use crate::adapters::file_sink::{DelimitedFileSink, SinkOptions};
use crate::adapters::file_source::{DelimitedFileSource, FieldMapping, SourceOptions};
use crate::core::runner::{ChunkRunner, RunOutcome};
use crate::core::transform::UppercaseNames;
use crate::core::{ConfigProvider, RecordSink, RecordSource, RecordTransformer};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use crate::utils::validation::{validate_distinct_files, Validate};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The runner wired from configuration: delimited file in, uppercased names out.
pub type FileRunner = ChunkRunner<DelimitedFileSource, UppercaseNames, DelimitedFileSink>;

pub fn source_options<C: ConfigProvider + ?Sized>(config: &C) -> Result<SourceOptions> {
    Ok(SourceOptions {
        delimiter: config.field_delimiter(),
        mapping: FieldMapping::from_names(config.field_names())?,
        lines_to_skip: config.lines_to_skip(),
        comment_prefixes: config.comment_prefixes().to_vec(),
        read_timeout: config.io_timeout(),
    })
}

pub fn sink_options<C: ConfigProvider + ?Sized>(config: &C) -> SinkOptions {
    SinkOptions {
        // 已在 validate 中確認為 ASCII
        delimiter: config.output_delimiter() as u8,
        header: config.header().map(str::to_string),
        append: config.append(),
        delete_if_empty: config.delete_if_empty(),
        write_timeout: config.io_timeout(),
    }
}

/// Validates the configuration, opens the input then the output, and wires the runner.
///
/// Nothing is opened when validation fails, and the output is never created when the
/// input cannot be opened. An output that resolves to the input file is rejected before
/// it is opened.
pub async fn build_runner<C>(config: &C) -> Result<FileRunner>
where
    C: ConfigProvider + Validate,
{
    config.validate()?;
    let source_options = source_options(config)?;
    let sink_options = sink_options(config);

    let source = DelimitedFileSource::open(config.input_path(), source_options).await?;
    // 輸出以截斷模式開啟，指向輸入檔會在讀取前清空資料
    validate_distinct_files(Path::new(config.input_path()), Path::new(config.output_path()))
        .await?;
    let sink = DelimitedFileSink::open(config.output_path(), sink_options).await?;
    let transformer = UppercaseNames::new(config.case_mapping());

    Ok(ChunkRunner::new(source, transformer, sink, config.chunk_size())?
        .with_job_name(config.job_name()))
}

pub struct EtlEngine<S, T, W> {
    runner: ChunkRunner<S, T, W>,
    monitor: Arc<SystemMonitor>,
}

impl<S, T, W> EtlEngine<S, T, W>
where
    S: RecordSource,
    T: RecordTransformer,
    W: RecordSink,
{
    pub fn new(runner: ChunkRunner<S, T, W>) -> Self {
        Self::new_with_monitoring(runner, false)
    }

    pub fn new_with_monitoring(runner: ChunkRunner<S, T, W>, monitor_enabled: bool) -> Self {
        let monitor = Arc::new(SystemMonitor::new(monitor_enabled));
        let runner = if monitor.is_enabled() {
            runner.with_listener(monitor.clone())
        } else {
            runner
        };
        Self { runner, monitor }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.runner.cancellation_token()
    }

    pub async fn run(mut self) -> RunOutcome {
        self.monitor.log_sample("Start");
        let outcome = self.runner.run().await;
        self.monitor.log_peak();
        outcome
    }
}

/// Logs and prints the outcome of a run; returns the process exit code.
pub fn report_outcome(outcome: &RunOutcome, summary_json: bool) -> Result<i32> {
    let summary = outcome.summary();

    match outcome {
        RunOutcome::Completed(_) => {
            tracing::info!("✅ ETL process completed successfully!");
            tracing::info!("📁 Output saved, {} records written", summary.records_written);
            if !summary_json {
                println!("✅ ETL process completed successfully!");
                println!(
                    "📁 {} records in {} chunks ({} ms)",
                    summary.records_written, summary.chunks_committed, summary.duration_ms
                );
            }
        }
        RunOutcome::Failed {
            error, chunk_index, ..
        } => {
            tracing::error!(
                "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
                error,
                error.category(),
                error.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", error.recovery_suggestion());

            eprintln!("❌ {}", error.user_friendly_message());
            match error.line() {
                Some(line) => eprintln!("   chunk {}, input line {}", chunk_index, line),
                None => eprintln!("   chunk {}", chunk_index),
            }
            eprintln!(
                "   {} records read, {} written in {} committed chunks",
                summary.records_read, summary.records_written, summary.chunks_committed
            );
            eprintln!("💡 {}", error.recovery_suggestion());
        }
    }

    if summary_json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    }

    Ok(outcome.exit_code())
}
