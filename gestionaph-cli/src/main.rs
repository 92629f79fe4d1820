//! Gestionaph CLI: run the portal and drive it from a shell.
//!
//! ```bash
//! gestionaph serve --config config.toml
//! gestionaph check
//! gestionaph notify --title "Water cut" --message "Tomorrow 9-12h" --audience all
//! gestionaph tally <project-id>
//! ```

mod commands;

use clap::{Parser, Subcommand};
use gestionaph_core::model::Audience;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gestionaph", about = "Gestionaph community portal", version)]
struct Cli {
    /// Config file; missing files fall back to defaults plus GP_* variables
    #[arg(long, short, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        #[arg(long)]
        port: Option<u16>,

        #[arg(long)]
        host: Option<String>,
    },
    /// Report whether the backend is reachable
    Check,
    /// Send a notification to an audience
    Notify {
        #[arg(long)]
        title: String,

        #[arg(long)]
        message: String,

        /// all, resident, admin or specific
        #[arg(long, default_value = "all")]
        audience: Audience,

        /// Recipient when the audience is `specific`
        #[arg(long)]
        user_id: Option<String>,

        #[arg(long)]
        sent_by: Option<String>,
    },
    /// Print the vote ranking of a project
    Tally {
        project_id: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { port, host } => commands::serve::run(&cli.config, port, host).await,
        Commands::Check => commands::check::run(&cli.config).await,
        Commands::Notify { title, message, audience, user_id, sent_by } => {
            let request = commands::notify::request(title, message, audience, user_id, sent_by);
            commands::notify::run(&cli.config, request).await
        }
        Commands::Tally { project_id, json } => {
            commands::tally::run(&cli.config, &project_id, json).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
