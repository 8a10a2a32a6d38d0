//! `kp`: a thin CLI over the KeePassRPC client, mostly useful for
//! smoke-testing a running KeePass/KeePassRPC instance by hand.

use clap::{Parser, Subcommand};
use tabled::{Table, Tabled};

use keepassrpc::config::Config;
use keepassrpc::error::Result;
use keepassrpc::prompt::TerminalPrompt;
use keepassrpc::store::FileKeyringStore;
use keepassrpc::Session;

#[derive(Parser)]
#[command(name = "kp", about = "Query a running KeePassRPC server")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Override the server URL (defaults to KEEPASSRPC_SERVER_URL or
    /// ws://127.0.0.1:12546/).
    #[arg(long, global = true, env = "KEEPASSRPC_SERVER_URL")]
    server_url: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// List the open databases.
    Ls,
    /// Print the open databases' group tree.
    Tree,
    /// Search entries by URL/title.
    Search { query: String },
    /// Print which database is currently active.
    Db,
    /// Print the server's protocol version.
    Server,
    /// Print this client's version.
    Version,
}

#[derive(Tabled)]
struct DatabaseRow {
    name: String,
    active: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(server_url) = &cli.server_url {
        config.server_url = url::Url::parse(server_url)
            .map_err(|e| keepassrpc::Error::ProtocolViolation(format!("--server-url: {e}")))?;
    }

    if matches!(cli.command, Command::Version) {
        println!("kp {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let store = FileKeyringStore::from_config(&config)?;
    let prompt = TerminalPrompt::new();
    let mut session = Session::open(&config, &store, &prompt).await?;

    match cli.command {
        Command::Ls => {
            // The server's method name for listing databases really is
            // misspelled this way in the wild; we keep it verbatim.
            let result = session.call("GetAllDataases", vec![]).await?;
            let rows: Vec<DatabaseRow> = result
                .as_array()
                .into_iter()
                .flatten()
                .map(|entry| DatabaseRow {
                    name: entry
                        .get("name")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_owned(),
                    active: entry.get("active").and_then(|v| v.as_bool()).unwrap_or(false),
                })
                .collect();
            println!("{}", Table::new(rows));
        }
        Command::Tree => {
            let result = session.call("GetAllDataases", vec![]).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Search { query } => {
            let result = session
                .call("FindLogins", vec![serde_json::json!({ "urls": [], "searchText": query })])
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Db => {
            let result = session.call("GetCurrentKFVersion", vec![]).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Server => {
            println!("protocol version {:#x}", keepassrpc::frame::PROTOCOL_VERSION);
        }
        Command::Version => unreachable!("handled above"),
    }

    session.close().await?;
    Ok(())
}
