use crate::SqlArgs;
use anyhow::{Context, Result};
use common::{DbConfig, StorageMode};
use driver::shell::Shell;
use driver::Driver;
use std::fs;
use std::sync::Arc;
use tracing::{info, instrument};

/// Resolves the database configuration from, in order of preference, a
/// connection string, a configuration file, or the individual flags.
pub fn config_from_args(args: &SqlArgs) -> Result<DbConfig> {
    let mut config = match (args.url(), args.config()) {
        (Some(url), _) => DbConfig::from_connection_string(url)?,
        (None, Some(path)) => {
            let path = path.to_str().context("configuration path is not valid UTF-8")?;
            DbConfig::load_from_file_and_env(path)?
        }
        (None, None) => DbConfig::builder().database(args.database().as_str()).build(),
    };
    if *args.memory() {
        config.set_mode(StorageMode::Memory);
    }
    Ok(config)
}

/// Runs `-c`/`-f` SQL, or starts the interactive shell when neither is given.
/// Returns the process exit code.
#[instrument(skip(args))]
pub fn handle_sql_command(args: &SqlArgs) -> Result<i32> {
    let config = config_from_args(args)?;
    let user = args.user().clone().unwrap_or_else(|| config.user().clone());
    let password = if args.user().is_some() {
        args.password().clone()
    } else {
        config.password().clone()
    };

    let driver = Arc::new(Driver::new(config)?);
    let session = driver.connect(&user, &password)?;

    let script = match (args.command(), args.file()) {
        (Some(command), _) => Some(command.clone()),
        (None, Some(path)) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?,
        ),
        (None, None) => None,
    };

    match script {
        Some(sql) => {
            let rows = driver.execute(&session, &sql)?;
            info!(rows, "SQL command processing completed");
            Ok(0)
        }
        None => Shell::new(driver, session)?.run(),
    }
}
