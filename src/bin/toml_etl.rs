use chunk_etl::config::toml_config::TomlConfig;
use chunk_etl::core::etl::{report_outcome, source_options};
use chunk_etl::core::{ConfigProvider, RecordSource};
use chunk_etl::utils::{logger, validation::Validate};
use chunk_etl::{build_runner, DelimitedFileSource, EtlEngine};
use clap::Parser;

#[derive(Parser)]
#[command(name = "toml-etl")]
#[command(about = "Chunked people ETL driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "etl-config.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Override the chunk size from config
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Override the input path from config
    #[arg(long)]
    input: Option<String>,

    /// Override the output path from config
    #[arg(long)]
    output: Option<String>,

    /// Identifier echoed in logs and the summary
    #[arg(long)]
    run_id: Option<String>,

    /// Print the run summary as JSON
    #[arg(long)]
    summary_json: bool,

    /// Dry run - parse the input and report chunks without writing output
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 載入 TOML 配置
    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if config.json_logs() {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting TOML-based chunk ETL");
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    // 應用命令列覆蓋設定
    if let Some(size) = args.chunk_size {
        config.chunk.size = Some(size);
        tracing::info!("🔧 Chunk size overridden to: {}", size);
    }
    if let Some(input) = &args.input {
        config.source.input_path = input.clone();
        tracing::info!("🔧 Input path overridden to: {}", input);
    }
    if let Some(output) = &args.output {
        config.sink.output_path = output.clone();
        tracing::info!("🔧 Output path overridden to: {}", output);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No output will be written");
        if let Err(e) = perform_dry_run(&config).await {
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.exit_code());
        }
        return Ok(());
    }

    // 決定監控設定
    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let runner = match build_runner(&config).await {
        Ok(runner) => runner.with_run_id(args.run_id.clone()),
        Err(e) => {
            tracing::error!("❌ Could not start the run: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    };

    let engine = EtlEngine::new_with_monitoring(runner, monitor_enabled);
    let cancel = engine.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("🛑 Interrupt received, finishing current chunk");
            cancel.cancel();
        }
    });

    let outcome = engine.run().await;
    let exit_code = report_outcome(&outcome, args.summary_json)?;
    if exit_code != 0 {
        std::process::exit(exit_code);
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig) {
    tracing::info!("📋 Job: {}", config.job_name());
    if let Some(description) = &config.job.description {
        tracing::info!("   {}", description);
    }
    tracing::info!("📥 Input: {}", config.input_path());
    tracing::info!("📤 Output: {}", config.output_path());
    tracing::info!(
        "📦 Chunk size: {}, case mapping: {:?}",
        config.chunk_size(),
        config.case_mapping()
    );
}

/// 解析全部輸入但不寫出，回報會產生的 chunk 數
async fn perform_dry_run(config: &TomlConfig) -> chunk_etl::Result<()> {
    let options = source_options(config)?;
    let mut source = DelimitedFileSource::open(config.input_path(), options).await?;

    let mut records = 0usize;
    while source.next_record().await?.is_some() {
        records += 1;
    }

    let chunks = records.div_ceil(config.chunk_size());
    tracing::info!(
        "🔍 {} records over {} lines would be written in {} chunks ({} lines skipped)",
        records,
        source.line_number(),
        chunks,
        source.lines_skipped()
    );
    println!("{} records, {} chunks", records, chunks);
    Ok(())
}
