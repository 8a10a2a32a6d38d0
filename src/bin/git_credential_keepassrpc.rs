//! `git-credential-keepassrpc`: a git credential helper that resolves
//! `get`/`store`/`erase` requests against entries visible over
//! KeePassRPC, following git's credential-helper line protocol
//! (`key=value` lines on stdin/stdout, terminated by a blank line).

use std::collections::HashMap;
use std::io::{self, Read, Write};

use keepassrpc::config::Config;
use keepassrpc::error::Result;
use keepassrpc::prompt::TerminalPrompt;
use keepassrpc::store::FileKeyringStore;
use keepassrpc::Session;

fn read_request() -> io::Result<HashMap<String, String>> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    let mut fields = HashMap::new();
    for line in input.lines() {
        if line.is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once('=') {
            fields.insert(key.to_owned(), value.to_owned());
        }
    }
    Ok(fields)
}

fn write_field(key: &str, value: &str) {
    println!("{key}={value}");
}

async fn cmd_get(fields: &HashMap<String, String>) -> Result<()> {
    let config = Config::from_env()?;
    let store = FileKeyringStore::from_config(&config)?;
    let prompt = TerminalPrompt::new();
    let mut session = Session::open(&config, &store, &prompt).await?;

    let host = fields.get("host").cloned().unwrap_or_default();
    let protocol = fields.get("protocol").cloned().unwrap_or_else(|| "https".to_owned());
    let target_url = format!("{protocol}://{host}");

    let result = session
        .call("FindLogins", vec![serde_json::json!({ "urls": [target_url], "searchText": "" })])
        .await?;
    session.close().await?;

    if let Some(entry) = result.as_array().and_then(|entries| entries.first()) {
        if let Some(username) = entry.get("userName").and_then(|v| v.as_str()) {
            write_field("username", username);
        }
        if let Some(password) = entry.get("password").and_then(|v| v.as_str()) {
            write_field("password", password);
        }
    }
    Ok(())
}

/// `store`/`erase` are accepted but intentionally no-ops: this client is
/// read-only against the running KeePass instance, matching the way
/// KeePassRPC itself expects entries to be managed from within KeePass.
fn cmd_store_or_erase() {}

#[tokio::main]
async fn main() -> Result<()> {
    let action = std::env::args().nth(1).unwrap_or_default();
    let fields = read_request().unwrap_or_default();

    match action.as_str() {
        "get" => cmd_get(&fields).await?,
        "store" | "erase" => cmd_store_or_erase(),
        other => {
            eprintln!("git-credential-keepassrpc: unknown action '{other}'");
            std::process::exit(1);
        }
    }

    io::stdout().flush().ok();
    Ok(())
}
