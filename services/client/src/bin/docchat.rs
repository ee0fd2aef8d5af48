//! services/client/src/bin/docchat.rs

use client_lib::{
    adapters::{HttpBackend, SqliteStore},
    app::{ChatApp, Settings},
    cli::{self, Command, Flow},
    config::Config,
    error::ClientError,
    view::PageView,
};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded. Backend at {}", config.api_url);

    // --- 2. Open Local Storage & Run Migrations ---
    info!("Opening local storage at {}", config.db_path.display());
    let store = SqliteStore::connect(&config.db_path).await?;
    store.run_migrations().await?;
    info!("Local storage ready.");

    // --- 3. Build the Controller ---
    let backend = Arc::new(HttpBackend::new(config.api_url.clone()));
    let mut app = ChatApp::restore(Settings::from(&config), backend, Arc::new(store)).await?;
    app.check_health().await;

    // Redraw the progress line while an upload is in flight.
    let mut progress = app.upload_progress_feed();
    tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let value = *progress.borrow_and_update();
            if value > 0 && value < 100 {
                eprint!("\r{}", cli::render_progress(value));
                let _ = std::io::stderr().flush();
            } else if value == 100 {
                eprintln!("\r{}", cli::render_progress(value));
            }
        }
    });

    // --- 4. Input Loop ---
    println!("{}", cli::render(&PageView::from_app(&app)));
    println!("Type /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        app.expire_notices();
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match cli::dispatch(&mut app, command).await {
            Ok(Flow::Render) => println!("{}", cli::render(&PageView::from_app(&app))),
            Ok(Flow::Print(text)) if text.is_empty() => {}
            Ok(Flow::Print(text)) => println!("{}", text),
            Ok(Flow::Quit) => break,
            Err(e) => {
                warn!("Command failed: {}", e);
                println!("{}", e);
            }
        }
    }

    info!("Goodbye.");
    Ok(())
}
