pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand, ValueEnum};

/// Operator tooling that runs next to the API against the same configuration
#[derive(Parser)]
#[command(name = "medcrm", version)]
#[command(about = "Med CRM operator CLI - migrations, admin accounts, catalog import, health checks")]
pub struct Cli {
    /// How results are printed
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply the embedded database migrations
    Migrate,

    /// Admin account management
    Admin {
        #[command(subcommand)]
        cmd: commands::admin::AdminCommands,
    },

    /// Product catalog maintenance
    Catalog {
        #[command(subcommand)]
        cmd: commands::catalog::CatalogCommands,
    },

    /// Check a running server's /health endpoint
    Health {
        /// Server base URL, defaults to the configured host and port
        #[arg(long)]
        url: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let format = cli.output;
    match cli.command {
        Commands::Migrate => commands::migrate::handle(format).await,
        Commands::Admin { cmd } => commands::admin::handle(cmd, format).await,
        Commands::Catalog { cmd } => commands::catalog::handle(cmd, format).await,
        Commands::Health { url } => commands::health::handle(url, format).await,
    }
}
