use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use profile_image_service::adapters::memory::{InMemoryOtpRepository, InMemoryProfileRepository};
use profile_image_service::adapters::postgres::{self, PgOtpRepository, PgProfileRepository};
use profile_image_service::core::{OtpRepository, ProfileRepository};
use profile_image_service::utils::{logger, validation::Validate};
use profile_image_service::{
    router, AppState, CliArgs, CloudinaryClient, OtpSweeper, ProfileImageService, ServiceConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 載入配置：有檔案用檔案，否則讀環境變數
    let loaded = match &args.config {
        Some(path) => ServiceConfig::from_file(path),
        None => ServiceConfig::from_env(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    logger::init_logger(config.logging.format(), args.verbose);
    tracing::info!("🚀 Starting profile-image-service");

    // 啟動時驗證一次，設定錯誤就不綁定埠號
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }
    tracing::info!("✅ Configuration loaded and validated successfully");

    if args.check_config {
        println!("✅ Configuration is valid");
        return Ok(());
    }

    let profiles: Arc<dyn ProfileRepository>;
    let otps: Arc<dyn OtpRepository>;
    match config.database.backend() {
        "memory" => {
            tracing::warn!("Using in-memory storage, data is lost on restart");
            profiles = Arc::new(InMemoryProfileRepository::new());
            otps = Arc::new(InMemoryOtpRepository::new());
        }
        _ => {
            let pool = postgres::connect(&config.database)
                .await
                .context("failed to connect to database")?;
            profiles = Arc::new(PgProfileRepository::new(pool.clone()));
            otps = Arc::new(PgOtpRepository::new(pool));
        }
    }

    let media = Arc::new(
        CloudinaryClient::new(&config.media).context("failed to build media host client")?,
    );
    let service = ProfileImageService::with_folder(media, profiles, config.media.folder());

    let sweeper = OtpSweeper::new(
        otps,
        Duration::from_secs(config.otp.sweep_interval_seconds()),
    )
    .spawn();

    let app = router(AppState::new(service), config.server.max_upload_bytes());
    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("📡 Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    sweeper.abort();
    tracing::info!("👋 Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
