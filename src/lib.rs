pub mod assistant;
pub mod auth;
pub mod cli;
pub mod coach;
pub mod history;
pub mod models;
pub mod server;
pub mod store;

use log::info;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use assistant::{ AssistantGateway, OpenAIAssistantClient };
use auth::{ MemoryIdentityProvider, SessionContext };
use cli::Args;
use server::{ api::AppState, Server };

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Assistant Id: {}", args.assistant_id);
    info!("Poll Interval: {}ms", args.poll_interval_ms);
    info!("Poll Max Attempts: {}", args.poll_max_attempts);
    info!("History Store Type: {}", args.history_type);
    info!("Document Store Type: {}", args.store_type);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let backend = Arc::new(OpenAIAssistantClient::from_args(&args)?);
    let gateway: Arc<dyn assistant::CoachGateway> = Arc::new(
        AssistantGateway::new(
            backend,
            args.assistant_id.clone(),
            Duration::from_millis(args.poll_interval_ms),
            args.poll_max_attempts
        )
    );

    let history = history::initialize_history_store(&args)?;
    let store = store::initialize_document_store(&args)?;
    let sessions = SessionContext::new(Arc::new(MemoryIdentityProvider::new()));

    let api_key = args.server_api_key.clone().filter(|k| !k.trim().is_empty());
    if api_key.is_some() {
        info!("Server configured with API Key authentication.");
    } else {
        info!("Server configured WITHOUT API Key authentication. Routes are open.");
    }

    let state = AppState {
        gateway,
        history,
        store,
        sessions,
        api_key,
    };

    let server = Server::new(args.server_addr.clone(), state, args);
    server.run().await
}
