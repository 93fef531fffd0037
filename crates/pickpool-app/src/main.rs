// Pick pool service entry point.
//
// Startup sequence:
// 1. Load config
// 2. Initialize tracing (log to file; stdout carries responses)
// 3. Open database
// 4. Serve line-delimited JSON requests from stdin until EOF

use std::path::Path;

use pickpool_app::config;
use pickpool_app::server;
use pickpool_core::{Database, PickPool};

use anyhow::Context;
use tokio::io::BufReader;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = config::load_config().context("failed to load configuration")?;

    // 2. Initialize tracing (log to file, not stdout)
    init_tracing(&config.log_dir, &config.log_filter)?;
    info!("Pick pool starting up");

    // 3. Open database
    if let Some(parent) = Path::new(&config.db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let db = Database::open(&config.db_path).context("failed to open database")?;
    info!(
        "Database opened at {} ({} pick submissions)",
        config.db_path,
        db.submission_count().context("failed to count submissions")?
    );
    let pool = PickPool::new(db);

    // 4. Serve stdin -> stdout
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    server::serve(&pool, stdin, stdout).await?;

    info!("Pick pool shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file, leaving stdout for responses.
fn init_tracing(log_dir: &Path, default_filter: &str) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    std::fs::create_dir_all(log_dir)?;
    let log_file = std::fs::File::create(log_dir.join("pickpool.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
