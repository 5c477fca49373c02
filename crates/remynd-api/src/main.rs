//! Remynd CLI and webhook server entry point.
//!
//! Binary name: `rmnd`
//!
//! Parses CLI arguments, initializes database and capabilities, then either
//! starts the webhook server with the background scheduler, runs a single
//! scheduler pass, or lists a user's reminders.

mod http;
mod state;

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use remynd_core::repository::ReminderRepository;
use tracing_subscriber::EnvFilter;

use state::AppState;

#[derive(Parser)]
#[command(name = "rmnd", about = "Natural-language reminders over WhatsApp", version)]
struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server and the reminder scheduler
    Serve {
        /// Port to listen on
        #[arg(long, default_value_t = 8080)]
        port: u16,
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
    /// Run a single scheduler pass over the last polling window
    Tick,
    /// List stored reminders for an owner address
    List {
        /// Owner address, e.g. whatsapp:+15550001111
        owner: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,remynd_core=debug,remynd_infra=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    // Initialize application state (DB, capabilities)
    let state = AppState::init().await?;

    match cli.command {
        Commands::Serve { port, host } => {
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            state.scheduler.start().await?;

            println!(
                "  {} Remynd listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}/webhook")).cyan()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let router = http::router::build_router(state.clone());

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            // Let the in-flight tick finish before exiting
            state.scheduler.stop().await;
            println!("\n  Server stopped.");
        }

        Commands::Tick => {
            let now = Utc::now();
            let window_start =
                now - Duration::seconds(state.config.scheduler.poll_interval_secs as i64);
            let summary = state.scheduler.tick(window_start, now).await;
            println!(
                "  {} scanned {}, due {}, delivered {}, failed {}",
                console::style("⏰").bold(),
                summary.scanned,
                summary.due,
                console::style(summary.delivered).green(),
                if summary.failed > 0 {
                    console::style(summary.failed).red()
                } else {
                    console::style(summary.failed).dim()
                },
            );
        }

        Commands::List { owner } => {
            let reminders = state.store.find_by_owner(&owner).await?;
            if reminders.is_empty() {
                println!("  No reminders for {owner}.");
            } else {
                for reminder in reminders {
                    println!(
                        "  {} {} at {} on {} ({}){}",
                        console::style("•").bold(),
                        console::style(&reminder.task).cyan(),
                        reminder.time_of_day.format("%H:%M"),
                        reminder.start_date.format("%Y-%m-%d"),
                        reminder.frequency,
                        match reminder.last_delivered {
                            Some(at) => format!(", last delivered {}", at.format("%Y-%m-%d %H:%M")),
                            None => String::new(),
                        },
                    );
                }
            }
        }
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
