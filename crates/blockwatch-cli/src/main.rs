mod commands;

use anyhow::Result;
use blockwatch_core::config::get_data_dir;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "blockwatch")]
#[command(about = "Foreground app blocker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the monitor in the foreground, reading foreground events from stdin
    Run,
    /// Replace the blocklist
    Block {
        /// Entries as `app_id=Display Name` (the name may be empty)
        #[arg(required = true)]
        entries: Vec<String>,
    },
    /// Remove every app from the blocklist
    Clear,
    /// Show the current blocklist
    List,
    /// Check whether the monitor is running
    Status,
    /// Stop a running monitor
    Stop,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let data_dir = get_data_dir()?;

    match cli.command {
        Commands::Run => commands::run::run_monitor(&data_dir).await,
        Commands::Block { entries } => commands::policy::block_apps(&data_dir, &entries).await,
        Commands::Clear => commands::policy::clear_apps(&data_dir).await,
        Commands::List => commands::policy::list_apps(&data_dir).await,
        Commands::Status => commands::status::show_status(&data_dir).await,
        Commands::Stop => commands::status::stop_monitor(&data_dir).await,
    }
}
