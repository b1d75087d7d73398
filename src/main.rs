use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use minutely::{Dispatcher, HelloRunner, JobRegistry, Matcher, Scheduler};

#[derive(Parser)]
#[command(name = "minutely", about = "Minimal recurring-job scheduler with an HTTP API")]
struct Args {
    /// Address to bind the API server to
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Port for the API server
    #[arg(long, default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let registry = Arc::new(JobRegistry::new());
    let dispatcher = Dispatcher::new(Arc::new(HelloRunner));
    let scheduler = Scheduler::new(Matcher::new(Arc::clone(&registry), dispatcher));

    let shutdown = CancellationToken::new();
    let scheduler_shutdown = shutdown.clone();
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run(scheduler_shutdown).await;
    });

    let app = minutely::router(registry);
    let listener = tokio::net::TcpListener::bind((args.bind.as_str(), args.port)).await?;
    info!("Scheduler API listening on http://{}:{}", args.bind, args.port);

    axum::serve(listener, app)
        .with_graceful_shutdown({
            let shutdown = shutdown.clone();
            async move {
                let _ = tokio::signal::ctrl_c().await;
                info!("Shutting down...");
                shutdown.cancel();
            }
        })
        .await?;

    shutdown.cancel();
    let _ = scheduler_handle.await;
    info!("Shutdown complete");

    Ok(())
}
