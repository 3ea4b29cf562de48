use std::sync::Arc;

use tracing::{error, info};

use driveshelf::web::WebServer;
use driveshelf::{Config, Database, FileStorage};

#[tokio::main]
async fn main() {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    // Load configuration
    let config = match Config::load_with_env(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = driveshelf::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        driveshelf::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(config).await {
        error!("Server stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> driveshelf::Result<()> {
    let db = Database::open(&config.database.path).await?;
    info!("Database opened at {}", config.database.path);

    let storage = FileStorage::new(&config.files.storage_path)?;
    info!("File storage at {}", config.files.storage_path);

    let server = WebServer::new(&config, Arc::new(db), Arc::new(storage))?;
    info!("driveshelf starting on {}", server.addr());
    server.run().await?;
    Ok(())
}
