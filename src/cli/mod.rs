use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Address the HTTP API binds to
    #[arg(long, env = "SERVER_ADDR", default_value = "0.0.0.0:8080")]
    pub server_addr: String,

    // --- Assistant backend ---
    /// API key for the OpenAI Assistants API
    #[arg(long, env = "OPENAI_API_KEY", default_value = "")]
    pub openai_api_key: String,

    /// Id of the pre-configured coach assistant
    #[arg(long, env = "OPENAI_ASSISTANT_ID", default_value = "asst_5O5kyju5xpi1nhTZGGOSgiJw")]
    pub assistant_id: String,

    /// Base URL for the OpenAI API (override for tests/self-hosted gateways)
    #[arg(long, env = "OPENAI_BASE_URL")]
    pub openai_base_url: Option<String>,

    /// Interval between run status polls, in milliseconds
    #[arg(long, env = "COACH_POLL_INTERVAL_MS", default_value = "1000")]
    pub poll_interval_ms: u64,

    /// Maximum number of run status polls before the request times out
    #[arg(long, env = "COACH_POLL_MAX_ATTEMPTS", default_value = "60")]
    pub poll_max_attempts: u32,

    // --- History store ---
    /// Conversation history store type (memory, redis)
    #[arg(long, env = "HISTORY_TYPE", default_value = "memory")]
    pub history_type: String,

    /// History store host endpoint (e.g., redis://127.0.0.1:6379)
    #[arg(long, env = "HISTORY_HOST", default_value = "redis://127.0.0.1:6379")]
    pub history_host: String,

    /// Prefix for Redis history keys
    #[arg(long, env = "HISTORY_REDIS_PREFIX", default_value = "history:")]
    pub history_redis_prefix: String,

    // --- Document store ---
    /// Document store type for profiles and checklists (memory, redis)
    #[arg(long, env = "STORE_TYPE", default_value = "memory")]
    pub store_type: String,

    /// Document store host endpoint (e.g., redis://127.0.0.1:6379)
    #[arg(long, env = "STORE_HOST", default_value = "redis://127.0.0.1:6379")]
    pub store_host: String,

    /// Prefix for Redis document store keys
    #[arg(long, env = "STORE_REDIS_PREFIX", default_value = "migrabien:")]
    pub store_redis_prefix: String,

    // --- Server hardening ---
    /// Optional static API key required in the X-API-Key header
    #[arg(long, env = "SERVER_API_KEY")]
    pub server_api_key: Option<String>,

    /// Enable TLS for the HTTP API
    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,

    /// Path to the TLS certificate (PEM)
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Path to the TLS private key (PEM)
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,
}

