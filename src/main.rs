use clap::Parser;
use serial_check::adapters::{sheets, LogNotifier, SmsNotifier};
use serial_check::core::import_job::{DB_CHECK_LOG, IMPORT_LOG};
use serial_check::domain::ports::{Notifier, RangeStore};
use serial_check::utils::error::ErrorSeverity;
use serial_check::utils::{logger, validation, validation::Validate};
use serial_check::{
    AppConfig, CallbackPayload, CliConfig, Command, ImportJob, Resolver, Result, SerialError,
    SqliteRangeStore, Verification, VerificationService,
};
use std::path::PathBuf;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting serial-check");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = run(cli).await {
        // 記錄詳細錯誤信息
        tracing::error!(
            "❌ serial-check failed: {} (Category: {:?}, Severity: {:?})",
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

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

fn load_config(cli: &CliConfig) -> Result<AppConfig> {
    let mut config = if cli.config.exists() {
        tracing::info!("📁 Loading configuration from: {}", cli.config.display());
        AppConfig::from_file(&cli.config)?
    } else {
        tracing::info!(
            "No configuration at {}, using defaults",
            cli.config.display()
        );
        AppConfig::default()
    };

    // 應用命令列覆蓋設定
    if let Some(database) = &cli.database {
        config.database.path = database.clone();
    }

    config.validate()?;
    Ok(config)
}

fn build_notifier(config: &AppConfig) -> Result<Box<dyn Notifier>> {
    if config.notifier.enabled {
        Ok(Box::new(SmsNotifier::new(
            config.notifier.endpoint.clone(),
            config.notifier.sender.clone(),
            Duration::from_secs(config.notifier.timeout_seconds),
        )?))
    } else {
        Ok(Box::new(LogNotifier))
    }
}

async fn blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| SerialError::ProcessingError {
            message: format!("background task failed: {}", e),
        })?
}

async fn run(cli: CliConfig) -> Result<()> {
    let config = load_config(&cli)?;
    let store = SqliteRangeStore::open(&config.database.path)?;

    match cli.command {
        Command::Import {
            ranges,
            invalids,
            monitor,
            remove_after,
        } => run_import(&config, store, ranges, invalids, monitor, remove_after).await,

        Command::DbCheck => {
            let job = ImportJob::new(store, config.import_settings());
            let report = blocking(move || job.check_database()).await?;
            println!("{}", report.to_log_text());
            Ok(())
        }

        Command::Check {
            username,
            password,
            serial,
        } => {
            let service = service(&config, store)?;
            let verification = service.check(&username, &password, &serial).await?;
            print_verification(&verification);
            Ok(())
        }

        Command::RemoteCheck { api_key, serial } => {
            let service = service(&config, store)?;
            let verification = service.remote_check(&api_key, &serial).await?;
            println!("{}", serde_json::to_string_pretty(&verification)?);
            Ok(())
        }

        Command::Callback {
            token,
            from,
            message,
        } => {
            let service = service(&config, store)?;
            let payload = CallbackPayload { from, message };
            let verification = service.handle_callback(&token, &payload).await?;
            print_verification(&verification);
            Ok(())
        }

        Command::Logs { limit } => {
            for name in [IMPORT_LOG, DB_CHECK_LOG] {
                println!("== {}", name);
                println!(
                    "{}",
                    store.read_log(name)?.unwrap_or_else(|| "(empty)".to_string())
                );
            }
            println!("== last {} checks", limit);
            for record in store.recent_verifications(limit)? {
                println!(
                    "{}  {:<9}  {:<15}  {:<30}  {}",
                    record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    record.status,
                    record.sender,
                    record.raw_message,
                    record.answer
                );
            }
            Ok(())
        }
    }
}

fn service(
    config: &AppConfig,
    store: SqliteRangeStore,
) -> Result<VerificationService<SqliteRangeStore, Box<dyn Notifier>>> {
    let resolver = Resolver::new(store, config.normalizer());
    Ok(VerificationService::new(
        resolver,
        build_notifier(config)?,
        config.auth.clone(),
    ))
}

fn print_verification(verification: &Verification) {
    println!("{}: {}", verification.status, verification.answer);
}

async fn run_import(
    config: &AppConfig,
    store: SqliteRangeStore,
    ranges: PathBuf,
    invalids: PathBuf,
    monitor: bool,
    remove_after: bool,
) -> Result<()> {
    let sheet_names = [ranges.to_string_lossy(), invalids.to_string_lossy()];
    validation::validate_file_extensions(
        "import sheets",
        &[sheet_names[0].as_ref(), sheet_names[1].as_ref()],
        &["csv"],
    )?;
    let source_name = format!("{} + {}", sheet_names[0], sheet_names[1]);

    if monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let job = ImportJob::new_with_monitoring(store, config.import_settings(), monitor);
    let (ranges_path, invalids_path) = (ranges.clone(), invalids.clone());
    let outcome = blocking(move || {
        let range_rows = sheets::range_rows(&ranges_path)?;
        let invalid_rows = sheets::invalid_rows(&invalids_path)?;
        job.run(&source_name, range_rows, invalid_rows)
    })
    .await?;

    println!("✅ {}", outcome.report.summary());
    if outcome.report.total_errors > 0 {
        println!("⚠️  {} rows rejected:", outcome.report.total_errors);
        for error in &outcome.report.errors {
            println!("   {}", error);
        }
    }
    println!("🔍 {}", outcome.collisions.to_log_text());

    if remove_after {
        for path in [&ranges, &invalids] {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::warn!("Could not remove {}: {}", path.display(), e);
            }
        }
    }

    Ok(())
}
