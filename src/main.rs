// Copyright 2026 WebUnlock Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use webunlock::extraction;
use webunlock::renderer::chromium::ChromiumRenderer;
use webunlock::renderer::{NavigationSpec, NoopRenderer, Renderer, SessionConfig};
use webunlock::rest::{self, AppState};
use webunlock::retry;
use webunlock::types::{ScrapeOptions, WaitUntil};

#[derive(Parser)]
#[command(
    name = "webunlock",
    about = "WebUnlock — extract structured data from live web pages",
    version,
    after_help = "Run 'webunlock serve' to start the HTTP service, or \
                  'webunlock scrape <url> <selector>' for a one-shot extraction."
)]
struct Cli {
    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP scraping service
    Serve {
        /// Port to listen on
        #[arg(long, env = "PORT", default_value_t = 3000)]
        port: u16,
    },
    /// One-shot extraction from the terminal
    Scrape {
        /// Page to scrape
        url: String,
        /// One or more CSS selectors
        #[arg(required = true)]
        selectors: Vec<String>,
        /// Navigation timeout in milliseconds
        #[arg(long, default_value_t = 10_000)]
        timeout: u64,
        /// Wait for the full load event instead of DOM readiness
        #[arg(long)]
        wait_for_load: bool,
        /// Extra attempts beyond the first
        #[arg(long, default_value_t = 0)]
        retries: u32,
        /// Print the raw JSON result
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_directive = if cli.verbose {
        "webunlock=debug"
    } else {
        "webunlock=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_directive.parse()?),
        )
        .init();

    match cli.command {
        // No subcommand: run the service, the common deployment mode.
        None => {
            let port = std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000);
            serve(port).await
        }
        Some(Commands::Serve { port }) => serve(port).await,
        Some(Commands::Scrape {
            url,
            selectors,
            timeout,
            wait_for_load,
            retries,
            json,
        }) => scrape(&url, selectors, timeout, wait_for_load, retries, json).await,
    }
}

async fn serve(port: u16) -> Result<()> {
    info!("starting WebUnlock v{}", env!("CARGO_PKG_VERSION"));

    let renderer: Arc<dyn Renderer> = match ChromiumRenderer::discover() {
        Ok(renderer) => {
            info!("Chromium renderer initialized");
            Arc::new(renderer)
        }
        Err(e) => {
            warn!("failed to initialize Chromium: {e}");
            warn!("scrape endpoints will fail until a browser is available");
            Arc::new(NoopRenderer)
        }
    };

    let state = Arc::new(AppState {
        renderer,
        started_at: Instant::now(),
    });
    rest::start(port, state).await
}

async fn scrape(
    url: &str,
    selectors: Vec<String>,
    timeout: u64,
    wait_for_load: bool,
    retries: u32,
    json: bool,
) -> Result<()> {
    let renderer = ChromiumRenderer::discover()?;
    let options = ScrapeOptions {
        timeout,
        wait_until: if wait_for_load {
            WaitUntil::Load
        } else {
            WaitUntil::DomContentLoaded
        },
        retries,
        ..ScrapeOptions::default()
    };
    let nav = NavigationSpec {
        timeout_ms: options.timeout,
        wait_until: options.wait_until,
    };

    let result = retry::run_with_retry(
        &renderer,
        &SessionConfig::default(),
        options.retries,
        |mut session| {
            let url = url.to_string();
            let selectors = selectors.clone();
            let nav = nav.clone();
            async move {
                let outcome =
                    extraction::page::extract(session.as_mut(), &url, &selectors, &nav).await;
                (session, outcome)
            }
        },
    )
    .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for (selector, records) in result.iter() {
            println!("{selector} ({} elements)", records.len());
            for record in records {
                println!("  {}", record.text.as_deref().unwrap_or("<no text>"));
            }
        }
    }
    Ok(())
}
