mod banner;
mod routes;
mod state;

use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use zapdash_db::ZapdashDb;
use zapdash_evolution::{EvolutionClient, EvolutionConfig};
use zapdash_sync::SyncEngine;

use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(author, version, about = "Painel de conversas WhatsApp sobre a Evolution API")]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "ZAPDASH_PORT", default_value_t = 3001)]
    port: u16,

    /// SQLite database path (defaults to the platform data dir)
    #[arg(long, env = "ZAPDASH_DB_PATH")]
    db_path: Option<String>,

    /// Evolution API base URL
    #[arg(long, env = "EVOLUTION_API_URL")]
    evolution_url: String,

    /// Evolution API token, sent as the apikey header
    #[arg(long, env = "EVOLUTION_API_TOKEN")]
    evolution_token: String,

    /// Evolution API instance name
    #[arg(long, env = "EVOLUTION_INSTANCE_NAME", default_value = "main")]
    instance: String,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    banner::print_banner();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("zapdash_server=info".parse()?)
                .add_directive("zapdash_sync=info".parse()?)
                .add_directive("zapdash_evolution=info".parse()?)
                .add_directive("zapdash_db=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let db = match cli.db_path.as_deref() {
        Some(path) => ZapdashDb::new_with_path(path).await?,
        None => ZapdashDb::new().await?,
    };
    let db = Arc::new(db);

    let config = EvolutionConfig {
        base_url: cli.evolution_url,
        api_key: cli.evolution_token,
        instance: cli.instance,
    };
    let evolution = Arc::new(EvolutionClient::new(&config)?);
    let engine = Arc::new(SyncEngine::new(db.clone(), evolution.clone()));

    let state = Arc::new(AppState { db, evolution, engine });
    let app = routes::router(state);

    let addr = format!("0.0.0.0:{}", cli.port);
    info!("🚀 Zapdash escutando em http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
