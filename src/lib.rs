pub mod api;
pub mod clients;
pub mod config;
pub mod db;
pub mod entities;
pub mod models;
pub mod scheduler;
pub mod services;

use std::sync::Arc;

use clients::tmdb::TmdbClient;
pub use config::Config;
use db::Store;
use scheduler::Scheduler;
use services::SyncEngine;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    config.validate()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "daemon" | "-d" | "--daemon" => run_daemon(config).await,

        "refresh" | "-r" | "--refresh" => run_single_refresh(config).await,

        "init" | "--init" => {
            Config::create_default_if_missing()?;
            println!("✓ Config file created. Edit config.toml and run again.");
            Ok(())
        }

        "help" | "-h" | "--help" => {
            print_help();
            Ok(())
        }

        _ => {
            println!("Unknown command: {}", args[1]);
            println!();
            print_help();
            Ok(())
        }
    }
}

fn print_help() {
    println!("Showrunner - TV watchlist server");
    println!("Mirrors TMDB metadata for the shows your users track");
    println!();
    println!("USAGE:");
    println!("  showrunner <COMMAND>");
    println!();
    println!("COMMANDS:");
    println!("  daemon            Run the API server with the refresh scheduler");
    println!("  refresh           Run one changed-shows sweep and configuration refresh");
    println!("  init              Create default config file");
    println!("  help              Show this help message");
    println!();
    println!("CONFIG:");
    println!("  Edit config.toml to configure the database, scheduler and server.");
    println!("  The TMDB bearer token is read from the TMDB_API_KEY_V4 environment");
    println!("  variable (or the variable named by tmdb.api_key_env).");
}

async fn run_daemon(config: Config) -> anyhow::Result<()> {
    info!(
        "Showrunner v{} starting in daemon mode...",
        env!("CARGO_PKG_VERSION")
    );

    let state = api::create_app_state(config.clone()).await?;

    // The scheduler's first tick fires immediately, so both refresh jobs
    // also run once at process start.
    let scheduler = Scheduler::new(state.sync.clone(), config.scheduler.clone());
    let scheduler_handle = tokio::spawn(async move {
        if let Err(e) = scheduler.start().await {
            error!("Scheduler error: {}", e);
        }
    });

    let server_handle: Option<tokio::task::JoinHandle<()>> = if config.server.enabled {
        let port = config.server.port;
        let app = api::router(state.clone());
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;

        Some(tokio::spawn(async move {
            info!("Web API running at http://0.0.0.0:{}", port);
            if let Err(e) = axum::serve(listener, app).await {
                error!("Web server error: {}", e);
            }
        }))
    } else {
        None
    };

    info!("Daemon running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    scheduler_handle.abort();
    if let Some(handle) = server_handle {
        handle.abort();
    }
    info!("Daemon stopped");

    Ok(())
}

async fn run_single_refresh(config: Config) -> anyhow::Result<()> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let tmdb = Arc::new(TmdbClient::with_base_url(
        config.tmdb.base_url.clone(),
        config.api_key()?,
    ));

    let engine = SyncEngine::new(store, tmdb);
    let scheduler = Scheduler::new(engine, config.scheduler.clone());

    scheduler.run_once().await?;

    info!("Refresh complete");
    Ok(())
}
