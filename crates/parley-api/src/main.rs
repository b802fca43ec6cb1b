//! Parley CLI and HTTP API entry point.
//!
//! Binary name: `parley`
//!
//! Parses CLI arguments, initializes database and services, then dispatches
//! to the appropriate command handler or starts the HTTP server.

mod cli;
mod http;
mod state;
mod turn_runner;

use clap::Parser;
use clap_complete::generate;
use parley_core::turn::registry::TurnRegistry;
use tracing::{error, info};

use cli::{ChatsCommand, Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,parley=debug",
        _ => "trace",
    };
    parley_observe::tracing_setup::init_tracing(filter, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "parley", &mut std::io::stdout());
        return Ok(());
    }

    // Initialize application state (DB, services)
    let state = AppState::init().await?;

    match cli.command {
        Commands::Chats { action } => match action {
            ChatsCommand::List {
                user,
                limit,
                after,
                before,
            } => {
                cli::chats::list_chats(&state, user, limit, after, before, cli.json).await?;
            }
        },

        Commands::Chat { chat, user } => {
            cli::chat::run_chat(&state, chat, user).await?;
        }

        Commands::Serve { port, host } => {
            let purged = state.auth.purge_expired_sessions().await?;
            if purged > 0 {
                info!(purged, "removed expired sessions");
            }

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            if !cli.quiet {
                println!();
                println!(
                    "  {} Parley listening on {}",
                    console::style("⚡").bold(),
                    console::style(format!("http://{addr}")).cyan()
                );
                println!(
                    "  {}  {}",
                    console::style("Turns:").bold(),
                    console::style(state.transport.name()).dim()
                );
                println!("  {}", console::style("Press Ctrl+C to stop").dim());
                println!();
            }

            let turns = state.turns.clone();
            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal(turns))
                .await?;

            if !cli.quiet {
                println!("\n  Server stopped.");
            }
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    parley_observe::tracing_setup::shutdown_tracing();
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM, then stop every running turn so open
/// streams end and the server can drain.
async fn shutdown_signal(turns: TurnRegistry) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
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
                error!(error = %e, "failed to install SIGTERM handler");
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

    info!(running = turns.len(), "shutting down, stopping running turns");
    turns.cancel_all();
}
