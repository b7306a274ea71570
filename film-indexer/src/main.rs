use dotenv::dotenv;
use tracing::{error, info};

use film_indexer::telemetry::init_tracing;
use film_indexer::{Dependencies, IndexingError, Settings};

#[tokio::main]
async fn main() -> Result<(), IndexingError> {
    dotenv().ok();

    let settings = Settings::from_env()?;
    init_tracing(settings.log_format)?;

    info!("Starting film indexer");

    let Dependencies { mut scheduler } = Dependencies::new(&settings).inspect_err(|e| {
        error!(error = %e, "Failed to initialize dependencies");
    })?;

    tokio::select! {
        _ = scheduler.run() => {}
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Received shutdown signal");
        }
    }

    info!("Film indexer stopped");
    Ok(())
}
