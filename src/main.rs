use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use registration_assist::config::{AppConfig, FlowVariant};
use registration_assist::llm::create_provider;
use registration_assist::server::{ServerState, routes};
use registration_assist::session::{InMemorySessionStore, RegistrationService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export LLM_API_KEY=gsk_...");
        std::process::exit(1);
    });

    // Keep the guard alive so buffered file logs are flushed on exit.
    let _log_guard = init_tracing(config.log_dir.as_deref());

    let cli_mode = std::env::args().nth(1).is_some_and(|arg| arg == "cli");
    let flow = match config.registration.flow {
        FlowVariant::Merged => "merged",
        FlowVariant::Sequential => "sequential",
    };

    eprintln!("📋 Registration Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   Flow: {flow}");

    let llm = create_provider(&config.llm).context("failed to create LLM provider")?;
    let service = Arc::new(RegistrationService::from_provider(
        llm,
        &config.registration,
        Arc::new(InMemorySessionStore::new()),
    ));

    if cli_mode {
        eprintln!("   Type a message and press Enter. /quit to exit.\n");
        registration_assist::repl::run(&service).await?;
        return Ok(());
    }

    eprintln!("   Webhook: http://0.0.0.0:{}/webhook", config.port);
    eprintln!("   Health: http://0.0.0.0:{}/health\n", config.port);

    let app = routes(ServerState { service });
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "Webhook server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await
        .context("server error")?;

    Ok(())
}

/// Stderr logging, plus a daily-rolling file when `log_dir` is set.
fn init_tracing(log_dir: Option<&str>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "registration-assist.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file = tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .with(file)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(stderr).init();
            None
        }
    }
}
