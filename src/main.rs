use opra_mailer::app::build_router;
use opra_mailer::config::AppConfig;
use opra_mailer::routes::SUBMIT_PATH;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // A .env file is optional
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export SENDER_EMAIL=... APP_PASSWORD=... GEMINI_API_KEY=...");
        std::process::exit(1);
    });

    eprintln!("📨 OPRA Mailer v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Draft mode: {}", config.mode);
    match &config.llm {
        Some(llm) => eprintln!("   Model: {:?} / {}", llm.backend, llm.model),
        None => eprintln!("   Model: none (template letters)"),
    }
    eprintln!("   Sender: {}", config.sender);
    eprintln!(
        "   Relay: {}:{} (timeout {}s)",
        config.smtp.host,
        config.smtp.port,
        config.smtp.timeout.as_secs()
    );
    eprintln!("   Endpoint: http://0.0.0.0:{}{}\n", config.port, SUBMIT_PATH);

    let app = build_router(&config)?;

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "OPRA mailer listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
