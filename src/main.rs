use std::{env, sync::Arc};

use colored::Colorize;
use log::{error, info, warn};
use shams_collab::{Collab, DatabaseError, MemoryDatabase, Notifier, PgDatabase, SharedDatabase};
use shams_core::{Config, ConfigError};
use shams_server::{run_server, StartError};
use thiserror::Error;
use tokio::runtime;

mod logging;

const DATABASE_URL_VAR: &str = "SHAMS_DATABASE_URL";

#[derive(Debug, Error)]
enum ShamsError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Could not initialize database: {0}")]
    Database(#[from] DatabaseError),

    #[error("Could not start the server: {0}")]
    Server(#[from] StartError),

    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl ShamsError {
    fn hint(&self) -> String {
        match self {
            ShamsError::Config(_) => format!(
                "Check {} (advisory or enforced) and {} (between 1 and {} days).",
                Config::MESS_CAPACITY_VAR,
                Config::SESSION_DAYS_VAR,
                Config::MAX_SESSION_DAYS
            ),
            ShamsError::Database(_) => format!(
                "This is a database error. Make sure the PostgreSQL instance in {} is running and reachable, then try again.",
                DATABASE_URL_VAR
            ),
            ShamsError::Server(_) => "Make sure SHAMS_SERVER_PORT is a free port.".to_string(),
            ShamsError::Fatal(_) => "This error is fatal, and should not happen.".to_string(),
        }
    }
}

fn run() -> Result<(), ShamsError> {
    let config = Config::from_env()?;

    info!("Building async runtime...");
    let main_runtime = runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("shams-async")
        .build()
        .map_err(|e| ShamsError::Fatal(e.to_string()))?;

    let database: SharedDatabase = match env::var(DATABASE_URL_VAR) {
        Ok(url) => {
            info!("Connecting to database...");
            Arc::new(main_runtime.block_on(PgDatabase::new(&url))?)
        }
        Err(_) => {
            warn!(
                "{} is not set, data is kept in memory and lost on shutdown",
                DATABASE_URL_VAR
            );
            Arc::new(MemoryDatabase::new())
        }
    };

    info!("Mess capacity is {:?}", config.mess_capacity);

    let (notifier, events) = Notifier::channel();
    let collab = Collab::new(database, config, notifier);

    info!("Initialized successfully.");
    main_runtime.block_on(run_server(collab, events))?;

    Ok(())
}

fn main() {
    if let Err(error) = logging::init_logger() {
        eprintln!("Could not initialize logging: {}", error);
    }

    if let Err(error) = run() {
        error!(
            "{} Read the error below to troubleshoot the issue.",
            "SHAMS failed to start!".bold().red()
        );
        error!("{}", error);
        error!("{}", format!("Hint: {}", error.hint()).dimmed().italic());
    }
}
