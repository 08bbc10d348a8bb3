use async_trait::async_trait;
use log::{ debug, warn };
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::{ AssistantBackend, GatewayError, GatewayRequest, GatewayResponse };

/// Reply used when the run completes but the thread holds no assistant
/// message with a text payload. A soft failure on purpose, so the UI
/// always has something to show.
pub const NO_REPLY_FALLBACK: &str = "Lo siento, no pude generar una respuesta.";

/// Seam the chat orchestrator consumes. One exchange in, one reply and
/// continuation token out.
#[async_trait]
pub trait CoachGateway: Send + Sync {
    async fn send_message(
        &self,
        message: &str,
        thread_id: Option<&str>
    ) -> Result<GatewayResponse, GatewayError>;
}

/// Request/response bridge to the external assistant: resolves the
/// thread, posts the user message, starts a run and polls it to a
/// terminal state within a bounded attempt budget.
pub struct AssistantGateway {
    backend: Arc<dyn AssistantBackend>,
    assistant_id: String,
    poll_interval: Duration,
    poll_max_attempts: u32,
}

impl AssistantGateway {
    pub fn new(
        backend: Arc<dyn AssistantBackend>,
        assistant_id: String,
        poll_interval: Duration,
        poll_max_attempts: u32
    ) -> Self {
        Self {
            backend,
            assistant_id,
            poll_interval,
            poll_max_attempts,
        }
    }

    pub async fn send(
        &self,
        request: &GatewayRequest,
        cancel: &CancellationToken
    ) -> Result<GatewayResponse, GatewayError> {
        if request.message.trim().is_empty() {
            return Err(GatewayError::Validation);
        }

        let thread_id = match &request.thread_id {
            Some(id) => id.clone(),
            None => {
                let id = self.backend.create_thread().await?;
                debug!("Created new assistant thread: {}", id);
                id
            }
        };

        self.backend.post_message(&thread_id, "user", &request.message).await?;
        let run_id = self.backend.create_run(&thread_id, &self.assistant_id).await?;
        debug!("Run {} started on thread {}", run_id, thread_id);

        self.wait_for_run(&thread_id, &run_id, cancel).await?;

        let messages = self.backend.list_messages(&thread_id).await?;
        let reply_text = messages
            .into_iter()
            .find(|msg| msg.role == "assistant")
            .and_then(|msg| msg.text)
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| {
                warn!("Run {} completed without an assistant reply", run_id);
                NO_REPLY_FALLBACK.to_string()
            });

        Ok(GatewayResponse { reply_text, thread_id })
    }

    /// Polls the run at a fixed interval until it completes, ends
    /// abnormally, exhausts the attempt budget or gets cancelled. The
    /// budget keeps an abandoned run from pinning a task forever.
    async fn wait_for_run(
        &self,
        thread_id: &str,
        run_id: &str,
        cancel: &CancellationToken
    ) -> Result<(), GatewayError> {
        for attempt in 0..self.poll_max_attempts {
            let status = self.backend.get_run(thread_id, run_id).await?;

            if status == super::RunStatus::Completed {
                debug!("Run {} completed after {} polls", run_id, attempt + 1);
                return Ok(());
            }
            if status.is_terminal_failure() {
                return Err(GatewayError::UpstreamRun(status));
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    warn!("Run {} abandoned: caller cancelled", run_id);
                    return Err(GatewayError::Cancelled);
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        Err(GatewayError::Timeout { attempts: self.poll_max_attempts })
    }
}

#[async_trait]
impl CoachGateway for AssistantGateway {
    async fn send_message(
        &self,
        message: &str,
        thread_id: Option<&str>
    ) -> Result<GatewayResponse, GatewayError> {
        let request = GatewayRequest {
            message: message.to_string(),
            thread_id: thread_id.map(str::to_owned),
        };
        self.send(&request, &CancellationToken::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::{ AssistantMessage, RunStatus };
    use std::sync::Mutex;

    struct ScriptedBackend {
        statuses: Mutex<Vec<RunStatus>>,
        messages: Vec<AssistantMessage>,
        posted: Mutex<Vec<(String, String)>>,
        created_threads: Mutex<u32>,
    }

    impl ScriptedBackend {
        fn new(statuses: Vec<RunStatus>, messages: Vec<AssistantMessage>) -> Self {
            Self {
                statuses: Mutex::new(statuses),
                messages,
                posted: Mutex::new(Vec::new()),
                created_threads: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl AssistantBackend for ScriptedBackend {
        async fn create_thread(&self) -> Result<String, GatewayError> {
            let mut count = self.created_threads.lock().unwrap();
            *count += 1;
            Ok(format!("thread_{}", count))
        }

        async fn post_message(
            &self,
            thread_id: &str,
            _role: &str,
            content: &str
        ) -> Result<(), GatewayError> {
            self.posted.lock().unwrap().push((thread_id.to_string(), content.to_string()));
            Ok(())
        }

        async fn create_run(
            &self,
            _thread_id: &str,
            _assistant_id: &str
        ) -> Result<String, GatewayError> {
            Ok("run_1".to_string())
        }

        async fn get_run(&self, _thread_id: &str, _run_id: &str) -> Result<RunStatus, GatewayError> {
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.len() > 1 {
                Ok(statuses.remove(0))
            } else {
                Ok(statuses[0].clone())
            }
        }

        async fn list_messages(&self, _thread_id: &str) -> Result<Vec<AssistantMessage>, GatewayError> {
            Ok(self.messages.clone())
        }
    }

    fn gateway(backend: ScriptedBackend) -> AssistantGateway {
        AssistantGateway::new(
            Arc::new(backend),
            "asst_test".to_string(),
            Duration::from_millis(1),
            5
        )
    }

    fn assistant_reply(text: &str) -> Vec<AssistantMessage> {
        vec![
            AssistantMessage { role: "assistant".into(), text: Some(text.into()) },
            AssistantMessage { role: "user".into(), text: Some("hola".into()) }
        ]
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let gw = gateway(ScriptedBackend::new(vec![RunStatus::Completed], Vec::new()));
        let req = GatewayRequest { message: "   ".into(), thread_id: None };
        let err = gw.send(&req, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Validation));
    }

    #[tokio::test]
    async fn polls_through_intermediate_states_to_reply() {
        let backend = ScriptedBackend::new(
            vec![RunStatus::Queued, RunStatus::InProgress, RunStatus::Completed],
            assistant_reply("Claro, te ayudo con eso.")
        );
        let gw = gateway(backend);
        let req = GatewayRequest { message: "hola".into(), thread_id: None };
        let resp = gw.send(&req, &CancellationToken::new()).await.unwrap();
        assert_eq!(resp.reply_text, "Claro, te ayudo con eso.");
        assert_eq!(resp.thread_id, "thread_1");
    }

    #[tokio::test]
    async fn failed_run_surfaces_upstream_error() {
        let backend = ScriptedBackend::new(
            vec![RunStatus::Queued, RunStatus::Failed],
            Vec::new()
        );
        let gw = gateway(backend);
        let req = GatewayRequest { message: "hola".into(), thread_id: None };
        let err = gw.send(&req, &CancellationToken::new()).await.unwrap_err();
        match err {
            GatewayError::UpstreamRun(status) => assert_eq!(status, RunStatus::Failed),
            other => panic!("expected UpstreamRun, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn supplied_thread_id_is_reused() {
        let backend = ScriptedBackend::new(
            vec![RunStatus::Completed],
            assistant_reply("ok")
        );
        let gw = gateway(backend);
        let req = GatewayRequest {
            message: "sigo aquí".into(),
            thread_id: Some("thread_existing".into()),
        };
        let resp = gw.send(&req, &CancellationToken::new()).await.unwrap();
        assert_eq!(resp.thread_id, "thread_existing");
    }

    #[tokio::test]
    async fn missing_assistant_reply_soft_fails() {
        let backend = ScriptedBackend::new(
            vec![RunStatus::Completed],
            vec![AssistantMessage { role: "user".into(), text: Some("hola".into()) }]
        );
        let gw = gateway(backend);
        let req = GatewayRequest { message: "hola".into(), thread_id: None };
        let resp = gw.send(&req, &CancellationToken::new()).await.unwrap();
        assert_eq!(resp.reply_text, NO_REPLY_FALLBACK);
    }

    #[tokio::test]
    async fn poll_budget_exhaustion_times_out() {
        let backend = ScriptedBackend::new(vec![RunStatus::InProgress], Vec::new());
        let gw = gateway(backend);
        let req = GatewayRequest { message: "hola".into(), thread_id: None };
        let err = gw.send(&req, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Timeout { attempts: 5 }));
    }

    #[tokio::test]
    async fn cancellation_abandons_pending_run() {
        let backend = ScriptedBackend::new(vec![RunStatus::InProgress], Vec::new());
        let gw = AssistantGateway::new(
            Arc::new(backend),
            "asst_test".to_string(),
            Duration::from_secs(60),
            5
        );
        let cancel = CancellationToken::new();
        cancel.cancel();
        let req = GatewayRequest { message: "hola".into(), thread_id: None };
        let err = gw.send(&req, &cancel).await.unwrap_err();
        assert!(matches!(err, GatewayError::Cancelled));
    }
}
