use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clipscout_common::observability::init_logging;
use clipscout_search::{PublishTime, SearchRequest};
use clipscout_server::routes::SearchResponse;
use std::path::PathBuf;

mod render;
mod wiring;

/// Keyword search over short-form video with a date window and dedup.
#[derive(Parser)]
#[command(name = "clipscout", version, about)]
struct Cli {
    /// YAML configuration file. Defaults to ./clipscout.yaml when present.
    #[arg(short, long, env = "CLIPSCOUT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run one search and print the result.
    Search {
        query: String,
        /// yesterday, this-week, this-month, last-3-months, last-6-months or all-time.
        #[arg(long)]
        publish_time: Option<String>,
        #[arg(long)]
        sort_by: Option<String>,
        /// Print the same JSON body the HTTP API returns.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Load config (env wins)
    let cfg = wiring::load_config(cli.config.as_deref())?;

    // 2) Logging from the same config
    let log_file = init_logging(wiring::log_config(&cfg.logging)?)?;
    tracing::info!(target: "app", log_file = %log_file.display(), "app.start");

    match cli.command {
        Command::Serve { host, port } => {
            let state = wiring::build_state(&cfg)?;
            let host = host.unwrap_or_else(|| cfg.server.host.clone());
            let port = port.unwrap_or(cfg.server.port);
            clipscout_server::bind_and_serve(&host, port, state)
                .await
                .with_context(|| format!("serving on {host}:{port}"))
        }
        Command::Search {
            query,
            publish_time,
            sort_by,
            json,
        } => {
            let orchestrator = wiring::build_orchestrator(&cfg)?;
            let defaults = wiring::search_defaults(&cfg);
            let request = SearchRequest::new(query)
                .with_publish_time(
                    publish_time
                        .map(PublishTime::from)
                        .unwrap_or(defaults.publish_time),
                )
                .with_sort_by(sort_by.unwrap_or(defaults.sort_by));

            let result = orchestrator
                .run(&request)
                .await
                .context("search failed (is TIKTOK_API_KEY set?)")?;

            if json {
                let body = SearchResponse {
                    success: true,
                    result,
                };
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                print!(
                    "{}",
                    render::summary(&request, &result, cfg.search.max_pages)
                );
            }
            Ok(())
        }
    }
}
