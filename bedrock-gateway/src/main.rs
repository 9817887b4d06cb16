#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;

use args::Args;
use clap::Parser;
use gateway_config::Config;
use gateway_server::Server;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // A missing file at the default path means "all defaults"
    let config = if !args.config.exists() && args.config.as_os_str() == args::DEFAULT_CONFIG {
        let config = Config::default();
        config.validate()?;
        config
    } else {
        Config::load(&args.config)?
    };

    let _telemetry_guard = gateway_telemetry::init(config.telemetry.as_ref(), &args.log)?;

    tracing::info!(
        config_path = %args.config.display(),
        region = %config.bedrock.region,
        "starting bedrock-gateway"
    );

    let mut server = Box::pin(Server::new(&config)).await?;
    if let Some(listen) = args.listen {
        server = server.with_listen_address(listen);
    }

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    server.serve(shutdown).await?;

    tracing::info!("bedrock-gateway stopped");
    Ok(())
}

/// Cancel `token` on the first `SIGINT` or `SIGTERM`
async fn cancel_on_signal(token: CancellationToken) {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {}
        () = terminate => {}
    }

    tracing::info!("shutdown signal received, draining connections");
    token.cancel();
}
