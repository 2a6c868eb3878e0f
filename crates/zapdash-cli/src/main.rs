use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result};

use zapdash_sync::{
    EvolutionClient, EvolutionConfig, SyncEngine, SyncKind, WEBHOOK_EVENTS, ZapdashDb,
};

/// Ferramentas de linha de comando do zapdash.
#[derive(Parser, Debug)]
#[command(name = "zapdash", version, about = "Painel de conversas WhatsApp - CLI")]
struct Cli {
    /// URL base da Evolution API
    #[arg(long, env = "EVOLUTION_API_URL")]
    evolution_url: String,

    /// Token (apikey) da Evolution API
    #[arg(long, env = "EVOLUTION_API_TOKEN")]
    evolution_token: String,

    /// Nome da instância na Evolution API
    #[arg(long, env = "EVOLUTION_INSTANCE_NAME", default_value = "main")]
    instance: String,

    /// Caminho do banco SQLite (padrão: diretório de dados do usuário)
    #[arg(long, env = "ZAPDASH_DB_PATH")]
    db_path: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mostra o estado da conexão com a Evolution API
    Status,
    /// Gerencia o webhook registrado na Evolution API
    Webhook {
        #[command(subcommand)]
        action: WebhookAction,
    },
    /// Executa uma sincronização em lote e grava no banco local
    Sync {
        /// Tipo: messages, contacts, chats ou all
        #[arg(default_value = "all")]
        kind: String,

        /// Limite de registros por lote
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Envia uma mensagem de texto direto pelo gateway
    Send {
        /// Número de destino (apenas dígitos)
        phone: String,
        /// Texto da mensagem
        text: String,
    },
}

#[derive(Subcommand, Debug)]
enum WebhookAction {
    /// Registra a URL de entrega dos eventos
    Set { url: String },
    /// Mostra a configuração atual
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .from_env_lossy()
                .add_directive("zapdash_cli=info".parse().unwrap())
                .add_directive("zapdash_sync=info".parse().unwrap())
                .add_directive("zapdash_evolution=info".parse().unwrap())
                .add_directive("zapdash_db=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let client = Arc::new(
        EvolutionClient::new(&EvolutionConfig {
            base_url: cli.evolution_url.clone(),
            api_key: cli.evolution_token.clone(),
            instance: cli.instance.clone(),
        })
        .wrap_err("Falha ao configurar o cliente da Evolution API")?,
    );

    match cli.command {
        Command::Status => show_status(&client).await,
        Command::Webhook { action } => manage_webhook(&client, action).await,
        Command::Sync { kind, limit } => run_sync(&cli.db_path, client, &kind, limit).await,
        Command::Send { phone, text } => send_text(&client, &phone, &text).await,
    }
}

async fn show_status(client: &EvolutionClient) -> Result<()> {
    let state = client.connection_state().await?;
    let icon = if client.health_check().await { "✅" } else { "❌" };
    println!("{icon} Instância {}: {}", client.instance(), state.state);
    Ok(())
}

async fn manage_webhook(client: &EvolutionClient, action: WebhookAction) -> Result<()> {
    match action {
        WebhookAction::Set { url } => {
            client.set_webhook(&url, &WEBHOOK_EVENTS).await?;
            println!("✅ Webhook registrado em {url}");
        }
        WebhookAction::Show => {}
    }

    let config = client.get_webhook().await?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

async fn run_sync(
    db_path: &Option<String>,
    client: Arc<EvolutionClient>,
    kind: &str,
    limit: Option<u32>,
) -> Result<()> {
    let kind = SyncKind::parse(kind)
        .ok_or_else(|| color_eyre::eyre::eyre!("Tipo de sync inválido: {kind}"))?;

    let db = match db_path {
        Some(path) => ZapdashDb::new_with_path(path).await?,
        None => ZapdashDb::new().await?,
    };
    let engine = SyncEngine::new(Arc::new(db), client);

    let outcome = engine.run_sync(kind, limit).await?;
    println!("✅ Sync {} concluído", kind.as_str());
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

async fn send_text(client: &EvolutionClient, phone: &str, text: &str) -> Result<()> {
    let reply = client.send_text_message(phone, text).await?;
    println!("📤 Mensagem enviada para {phone}");
    if !reply.key.id.is_empty() {
        println!("   id: {}", reply.key.id);
    }
    Ok(())
}
