//! Lockerbox CLI - Command line client for file storage, sharing and messaging.
//!
//! This tool signs in to a Lockerbox service and drives the client
//! controllers from an interactive shell.

mod shell;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use lockerbox_api::{MemoryApi, RemoteApi};
use lockerbox_app::{App, ClientConfig, Completion, NoticeReceiver};
use lockerbox_common::RemotePath;

/// Account the offline service is seeded with.
const DEMO_USER: &str = "demo";
const DEMO_PASSWORD: &str = "Demo-pass1";

#[derive(Parser)]
#[command(name = "lockerbox")]
#[command(about = "Lockerbox - File storage, sharing and messaging client")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (default: <config dir>/lockerbox/config.json).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Server URL, overriding the configuration and LOCKERBOX_SERVER.
    #[arg(short, long, global = true)]
    server: Option<String>,

    /// Use a seeded in-memory service instead of a server.
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive session.
    Shell,

    /// Create an account.
    Register {
        /// Username (lowercase, at least 3 characters).
        #[arg(short, long)]
        username: String,

        /// Display name.
        #[arg(short, long)]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let (app, notices) = connect(&cli).await?;

    match cli.command {
        Commands::Shell => shell::run(app, notices).await,
        Commands::Register { username, name } => cmd_register(app, notices, &username, &name).await,
    }
}

/// Build the client for the configured server, or for the offline service.
async fn connect(cli: &Cli) -> Result<(App, NoticeReceiver)> {
    if cli.offline {
        info!("Using the offline demo service");
        println!(
            "Offline mode: sign in as '{}' with password '{}'.",
            DEMO_USER, DEMO_PASSWORD
        );
        let api = seeded_service().await?;
        return Ok(App::new(api));
    }

    let config = ClientConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?
        .with_env(cli.server.clone());
    App::from_config(&config).context("Failed to set up the client")
}

/// An in-memory service with a demo account, a few files, a share and a
/// conversation.
async fn seeded_service() -> Result<Arc<MemoryApi>> {
    let api = Arc::new(MemoryApi::new());
    api.add_user(DEMO_USER, DEMO_PASSWORD, "Demo User").await;
    api.add_user("friend", DEMO_PASSWORD, "A Friend").await;

    let path = |raw: &str| RemotePath::parse(raw).context("Invalid seed path");
    api.put_file(DEMO_USER, &path("/welcome.txt")?, b"Welcome to Lockerbox!\n")
        .await;
    api.put_file(DEMO_USER, &path("/projects/plan.md")?, b"# Plan\n")
        .await;
    api.put_directory(DEMO_USER, &path("/photos")?).await;

    let trip = path("/photos/trip.jpg")?;
    api.put_file("friend", &trip, b"not really a jpeg").await;

    let friend = api.connect();
    friend
        .login("friend", &DEMO_PASSWORD.into())
        .await
        .context("Failed to seed offline service")?;
    friend
        .create_share(&trip, DEMO_USER)
        .await
        .context("Failed to seed offline service")?;
    friend
        .create_chat(DEMO_USER, "Did you get the photos?")
        .await
        .context("Failed to seed offline service")?;

    Ok(api)
}

/// Create an account.
async fn cmd_register(
    app: App,
    mut notices: NoticeReceiver,
    username: &str,
    name: &str,
) -> Result<()> {
    info!("Registering {}", username);

    let password = shell::prompt_password("Enter password: ")?;
    let confirm = shell::prompt_password("Confirm password: ")?;

    match app
        .session()
        .register(username, &password, &confirm, name)
        .await
    {
        Completion::Applied => {
            println!("Account created: {}", username);
            Ok(())
        }
        Completion::Invalid(reason) => anyhow::bail!(reason),
        _ => {
            let reason = notices
                .try_recv()
                .map(|notice| notice.to_string())
                .unwrap_or_else(|_| "Failed to sign up".to_string());
            anyhow::bail!(reason)
        }
    }
}
