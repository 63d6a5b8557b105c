use chunk_etl::core::etl::report_outcome;
use chunk_etl::utils::{logger, validation::Validate};
use chunk_etl::{build_runner, CliConfig, EtlEngine};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.json_logs {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting chunk-etl");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    let runner = match build_runner(&config).await {
        Ok(runner) => runner.with_run_id(config.run_id.clone()),
        Err(e) => {
            tracing::error!("❌ Could not start the run: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    };

    if config.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }
    let engine = EtlEngine::new_with_monitoring(runner, config.monitor);

    // Ctrl-C 只在 chunk 邊界生效
    let cancel = engine.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("🛑 Interrupt received, finishing current chunk");
            cancel.cancel();
        }
    });

    let outcome = engine.run().await;
    let exit_code = report_outcome(&outcome, config.summary_json)?;
    if exit_code != 0 {
        std::process::exit(exit_code);
    }

    Ok(())
}
