use clap::{command, Args, Parser, Subcommand};
use getset::Getters;
use std::path::PathBuf;

pub mod sql;

/// r2db2: A fast OLTP/HTAP DBMS
#[derive(Debug, Parser, Getters)]
#[command(name = "r2db2")]
#[command(about = "r2db2: High-performance OLTP/HTAP DBMS", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    #[getset(get = "pub")]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start an interactive SQL shell or execute SQL commands/scripts
    Sql(SqlArgs),
}

#[derive(Debug, Args, Getters)]
#[getset(get = "pub")]
pub struct SqlArgs {
    /// SQL to execute instead of starting the shell
    #[arg(short, long, conflicts_with = "file")]
    command: Option<String>,
    /// SQL script to execute instead of starting the shell
    #[arg(short, long)]
    file: Option<PathBuf>,
    /// Connection string, e.g. `r2db2://sa@localhost/test?mode=memory`
    #[arg(short, long, conflicts_with = "config")]
    url: Option<String>,
    /// TOML configuration file; `R2DB2__*` environment variables override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Database name when neither a connection string nor a configuration
    /// file is given
    #[arg(short, long, default_value = "test")]
    database: String,
    /// Open the database in memory
    #[arg(long)]
    memory: bool,
    /// User to connect as, defaults to the configured administrator
    #[arg(long)]
    user: Option<String>,
    #[arg(long, default_value = "")]
    password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sql_command() {
        let cli = Cli::parse_from(["r2db2", "sql", "-c", "CREATE TABLE t (a INT)", "--memory"]);
        let Commands::Sql(args) = cli.command();
        assert_eq!(args.command().as_deref(), Some("CREATE TABLE t (a INT)"));
        assert!(*args.memory());
        assert_eq!(args.database(), "test");
    }

    #[test]
    fn test_command_conflicts_with_file() {
        let result = Cli::try_parse_from(["r2db2", "sql", "-c", "SELECT 1", "-f", "script.sql"]);
        assert!(result.is_err());
    }
}
