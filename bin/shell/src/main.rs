use clap::Parser;
use cli::{sql::handle_sql_command, Cli, Commands};
use common::util::trace::initialize_tracing;
use std::process::ExitCode;
use tracing::{error, info};

fn main() -> ExitCode {
    if let Err(error) = initialize_tracing("warn") {
        eprintln!("failed to initialize tracing: {error:#}");
    }

    let args = Cli::parse();
    info!("r2db2 CLI started");

    let result = match args.command() {
        Commands::Sql(args) => handle_sql_command(args),
    };
    match result {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(err) => {
            error!(error = %err, "SQL command failed");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
