use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::env;

use backend_api::{run_server, AppState, JsonFileStore, StaticTokenAuth};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Environment variables with sane defaults
    let store_path = env::var("STORE_PATH").unwrap_or_else(|_| "data/transactions.json".to_string());
    let tokens_path = env::var("TOKENS_PATH").unwrap_or_else(|_| "data/tokens.json".to_string());
    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .unwrap_or(3000);

    println!("Coinfolio API Server");
    println!("====================");
    println!("Store path: {}", store_path);
    println!("Tokens path: {}", tokens_path);
    println!("Listening on: {}:{}", host, port);
    println!();

    // Make sure the store directory exists before the first write.
    if let Some(parent) = PathBuf::from(&store_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // A missing token file is not fatal: requests can still authenticate
    // with the x-user-id override header.
    let auth = match StaticTokenAuth::from_file(&tokens_path) {
        Ok(auth) => auth,
        Err(e) => {
            eprintln!("[WARN] token file not loaded ({}).", e);
            eprintln!("       Bearer tokens will be rejected; x-user-id override still works.");
            StaticTokenAuth::new(HashMap::new())
        }
    };

    let state = AppState {
        store: Arc::new(JsonFileStore::new(&store_path)),
        auth: Arc::new(auth),
    };

    run_server(state, &host, port).await?;

    Ok(())
}
