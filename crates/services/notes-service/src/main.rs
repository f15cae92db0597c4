//! Notes Service - command-line entry point for the notes data layer.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notes_service_lib::config::NotesServiceConfig;

#[derive(Parser)]
#[command(name = "notes-service")]
#[command(about = "Per-user notes data access")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted session against an in-memory store
    Demo {
        #[arg(long, default_value = "demo-user")]
        user: String,
    },
    /// Print the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = NotesServiceConfig::from_env();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&config.service.log_level)
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Demo { user } => {
            notes_service_lib::run_demo(&user, &config).await?;
        }
        Commands::Config => {
            println!("{:#?}", config);
        }
    }

    Ok(())
}
