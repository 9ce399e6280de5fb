use clap::Parser;
use smart_doorbell::utils::{logger, validation::Validate};
use smart_doorbell::{DoorbellConfig, DoorbellManager, ServiceArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServiceArgs::parse();

    // 初始化日誌
    if args.log_json {
        logger::init_service_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("{}", "=".repeat(60));
    tracing::info!("Smart Video Doorbell");
    tracing::info!("{}", "=".repeat(60));

    // 載入 TOML 配置
    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path.display());
            match DoorbellConfig::from_file(path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("❌ Failed to load config file '{}': {}", path.display(), e);
                    eprintln!("💡 {}", e.recovery_suggestion());
                    std::process::exit(e.exit_code());
                }
            }
        }
        None => DoorbellConfig::default(),
    };

    args.apply_overrides(&mut config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e);
        std::process::exit(e.exit_code());
    }

    let mut doorbell = DoorbellManager::new(config);

    match doorbell.run_until(shutdown_signal()).await {
        Ok(()) => {
            tracing::info!("Doorbell service exited cleanly");
            Ok(())
        }
        Err(e) => {
            tracing::error!("❌ Fatal error: {}", e);
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
