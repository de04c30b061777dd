//! TrendTap: topic analysis server for affiliate content research.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;
use trendtap_server::{build_router, AppState};

fn resolve_data_dir() -> PathBuf {
    std::env::var("TRENDTAP_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()));
            if let Some(dir) = exe_dir {
                let parent_data = dir.join("../data");
                if parent_data.exists() {
                    return parent_data;
                }
            }
            PathBuf::from("data")
        })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if let Some(arg) = args.get(1) {
        match arg.as_str() {
            "--help" | "-h" | "help" => {
                println!("TrendTap: topic analysis server");
                println!();
                println!("Usage: trendtap");
                println!();
                println!("Environment:");
                println!("  PORT                          HTTP port (default 3003)");
                println!("  TRENDTAP_DATA_DIR             Data directory (default ./data)");
                println!("  TRENDTAP_MAX_TOPIC_LENGTH     Maximum topic length (default 200)");
                println!("  TRENDTAP_PATTERN_TTL_HOURS    Re-resolve pattern records older than this");
                println!("  TRENDTAP_LLM_TIMEOUT_SECS     LLM request timeout (default 30)");
                println!("  TRENDTAP_LLM_MAX_ATTEMPTS     LLM attempts per request (default 3)");
                println!("  TRENDTAP_LLM_BACKOFF_MS       Initial retry backoff (default 250)");
                println!("  OPENAI_API_KEY, ANTHROPIC_API_KEY, GROQ_API_KEY");
                return Ok(());
            }
            other => {
                eprintln!("Unknown command: {}. Use 'trendtap help' for usage.", other);
                std::process::exit(1);
            }
        }
    }

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = trendtap_core::TrendTapConfig::from_env(&data_dir)?;
    let port = config.port;

    let store = trendtap_store::SqliteStore::open(&config.data_paths.db)
        .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;

    let state = Arc::new(AppState::new(config, store));
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("TrendTap server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
