use article_enricher::core::{ConfigProvider, Storage};
use article_enricher::utils::error::{EnrichError, ErrorSeverity};
use article_enricher::utils::{logger, validation::Validate};
use article_enricher::{
    CliConfig, EnrichmentEngine, EnrichmentPipeline, Enricher, LocalStorage, LookupRepository,
    SqliteSalesSource, TomlConfig,
};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting article-enricher");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 載入並驗證配置
    let config = match cli.resolve().and_then(|config| config.validate().map(|_| config)) {
        Ok(config) => config,
        Err(e) => exit_with(e),
    };
    display_config_summary(&config);

    if cli.dry_run {
        tracing::info!("🔍 DRY RUN MODE - no database query will be issued");
        if let Err(e) = perform_dry_run(&config).await {
            exit_with(e);
        }
        return Ok(());
    }

    let database = config.database_path().unwrap_or_default().to_string();
    let source = SqliteSalesSource::new(database, config.table());
    let lookup = LookupRepository::new(source, config.date_window(), config.match_strategy());
    let pipeline = EnrichmentPipeline::new(LocalStorage::default(), config, lookup);
    let engine = EnrichmentEngine::new(pipeline);

    match engine.run().await {
        Ok(outcome) => {
            tracing::info!("✅ Enrichment completed successfully!");
            println!("✅ Enrichment completed successfully!");
            println!("📁 Output saved to: {}", outcome.output_path);
            println!("{}", serde_json::to_string_pretty(&outcome.summary)?);
        }
        Err(e) => exit_with(e),
    }

    Ok(())
}

fn exit_with(e: EnrichError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ Enrichment failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

fn display_config_summary(config: &TomlConfig) {
    let window = config.date_window();
    tracing::info!("📋 Configuration Summary:");
    tracing::info!("  Input: {}", config.input_path());
    tracing::info!("  Output: {}", config.output_path());
    tracing::info!("  Item column: {}", config.item_column());
    tracing::info!(
        "  Source: {} (table {})",
        config.database_path().unwrap_or("-"),
        config.table()
    );
    tracing::info!("  Window: {} ..= {}", window.start, window.end);
    tracing::info!("  Matching: {:?}", config.match_strategy());
    let rules = config.recipe_rules();
    tracing::info!("  Marker: '{}' ({:?})", rules.marker, rules.policy);
}

async fn perform_dry_run(config: &TomlConfig) -> article_enricher::Result<()> {
    let storage = LocalStorage::default();
    let dataset = storage.read_dataset(config.input_path()).await?;
    let identifiers = Enricher::identifiers(&dataset, config.item_column())?;

    let database = config.database_path().unwrap_or_default();
    if !std::path::Path::new(database).exists() {
        tracing::warn!("⚠️ Database file {} does not exist", database);
    }

    let plan = serde_json::json!({
        "rows": dataset.len(),
        "columns": dataset.headers.len(),
        "identifiers": identifiers.len(),
        "sample": identifiers.iter().take(5).collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}
