use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use event_logistics::api::{self, SecurityConfig};
use event_logistics::db;

#[derive(Parser)]
#[command(name = "evlog")]
#[command(about = "Event logistics back-office with rule-driven session assignment")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "event_logistics=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve(host: &str, port: u16) -> anyhow::Result<()> {
    let db = db::Database::open_memory()?;
    db.migrate()?;

    let security = SecurityConfig::from_env();
    if security.api_key.is_some() {
        tracing::info!("API key authentication enabled");
    }
    let app = api::create_router_with_config(db, security);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    tracing::info!(
        "Event logistics API listening on http://{}",
        listener.local_addr()?
    );

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Commands::Serve { host, port }) => serve(&host, port).await,
        None => serve("127.0.0.1", 3000).await,
    }
}
