pub mod openai;
pub mod gateway;

use async_trait::async_trait;
use serde::{ Serialize, Deserialize };
use std::fmt;
use thiserror::Error;

pub use gateway::{ AssistantGateway, CoachGateway };
pub use openai::OpenAIAssistantClient;

/// Lifecycle states of an assistant run as reported by the backend.
/// `Failed` and `Cancelled` are terminal failures, `Completed` is the
/// terminal success; anything else keeps the poll loop going.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    pub fn is_terminal_failure(&self) -> bool {
        matches!(self, RunStatus::Failed | RunStatus::Cancelled)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("el mensaje es requerido")]
    Validation,
    #[error("assistant run ended with status: {0}")]
    UpstreamRun(RunStatus),
    #[error("assistant service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("assistant run did not complete within {attempts} polls")]
    Timeout {
        attempts: u32,
    },
    #[error("request cancelled")]
    Cancelled,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GatewayRequest {
    pub message: String,
    pub thread_id: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct GatewayResponse {
    pub reply_text: String,
    pub thread_id: String,
}

/// A message as returned by the backend's message listing, reduced to
/// what the gateway needs: the author role and the text payload of the
/// first text-typed content block, if any.
#[derive(Clone, Debug)]
pub struct AssistantMessage {
    pub role: String,
    pub text: Option<String>,
}

/// Wire-level operations the external assistant service exposes. The
/// gateway only ever talks to this trait, so tests can script run
/// lifecycles without a network.
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    async fn create_thread(&self) -> Result<String, GatewayError>;

    async fn post_message(
        &self,
        thread_id: &str,
        role: &str,
        content: &str
    ) -> Result<(), GatewayError>;

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str
    ) -> Result<String, GatewayError>;

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<RunStatus, GatewayError>;

    /// Messages for the thread, newest first.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<AssistantMessage>, GatewayError>;
}
