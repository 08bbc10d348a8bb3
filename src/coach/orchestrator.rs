use log::warn;
use std::sync::Arc;

use crate::assistant::CoachGateway;
use crate::coach::fallback_response;
use crate::models::chat::{ ChatMessage, Role };

const GREETING_INTRO: &str =
    "¡Hola! Soy tu Coach de Viaje en MigraBien. Estoy aquí para ayudarte a planificar tu proceso \
     migratorio de Latinoamérica a Europa. ¿En qué puedo ayudarte hoy?";

const GREETING_HINTS: &str =
    "Puedes preguntarme sobre requisitos de visado, documentación necesaria, pasos para migrar a \
     un país específico, o cualquier duda que tengas sobre tu proceso migratorio.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TurnState {
    Idle,
    AwaitingReply,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The assistant answered through the gateway.
    Replied,
    /// The gateway failed; a canned fallback reply was appended instead.
    FellBack,
    /// Blank input or a submission while a reply was already pending.
    Rejected,
}

/// Drives one conversation's turn-taking: appends the user message,
/// calls the gateway, and appends either the assistant reply or a
/// fallback. The log is append-only; nothing is ever mutated or removed.
pub struct ChatOrchestrator {
    gateway: Arc<dyn CoachGateway>,
    messages: Vec<ChatMessage>,
    thread_id: Option<String>,
    state: TurnState,
}

impl ChatOrchestrator {
    pub fn new(gateway: Arc<dyn CoachGateway>) -> Self {
        let messages = vec![
            ChatMessage::new(Role::Assistant, GREETING_INTRO),
            ChatMessage::new(Role::Assistant, GREETING_HINTS)
        ];
        Self {
            gateway,
            messages,
            thread_id: None,
            state: TurnState::Idle,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    pub fn is_idle(&self) -> bool {
        self.state == TurnState::Idle
    }

    /// One submit cycle. Rejects blank input and re-entrant submissions
    /// outright so the log stays linear: exactly one user and one
    /// assistant message per accepted cycle.
    pub async fn submit(&mut self, text: &str) -> SubmitOutcome {
        if self.state != TurnState::Idle {
            return SubmitOutcome::Rejected;
        }
        if text.trim().is_empty() {
            return SubmitOutcome::Rejected;
        }

        self.messages.push(ChatMessage::new(Role::User, text));
        self.state = TurnState::AwaitingReply;

        let outcome = match self.gateway.send_message(text, self.thread_id.as_deref()).await {
            Ok(resp) => {
                self.thread_id = Some(resp.thread_id);
                self.messages.push(ChatMessage::new(Role::Assistant, resp.reply_text));
                SubmitOutcome::Replied
            }
            Err(e) => {
                // Any gateway failure degrades to a canned reply; the
                // stored thread id is kept for the next attempt.
                warn!("Coach gateway failed, using fallback reply: {}", e);
                self.messages.push(ChatMessage::new(Role::Assistant, fallback_response(text)));
                SubmitOutcome::FellBack
            }
        };

        self.state = TurnState::Idle;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::{ GatewayError, GatewayResponse, RunStatus };
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockGateway {
        fail: bool,
        seen_thread_ids: Mutex<Vec<Option<String>>>,
    }

    impl MockGateway {
        fn ok() -> Self {
            Self { fail: false, seen_thread_ids: Mutex::new(Vec::new()) }
        }

        fn failing() -> Self {
            Self { fail: true, seen_thread_ids: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl CoachGateway for MockGateway {
        async fn send_message(
            &self,
            message: &str,
            thread_id: Option<&str>
        ) -> Result<GatewayResponse, GatewayError> {
            self.seen_thread_ids.lock().unwrap().push(thread_id.map(str::to_owned));
            if self.fail {
                return Err(GatewayError::UpstreamRun(RunStatus::Failed));
            }
            Ok(GatewayResponse {
                reply_text: format!("respuesta a: {}", message),
                thread_id: "thread_T1".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn blank_submit_is_a_no_op() {
        let mut orch = ChatOrchestrator::new(Arc::new(MockGateway::ok()));
        let before = orch.messages().len();
        assert_eq!(orch.submit("").await, SubmitOutcome::Rejected);
        assert_eq!(orch.submit("   \n\t").await, SubmitOutcome::Rejected);
        assert_eq!(orch.messages().len(), before);
        assert!(orch.is_idle());
    }

    #[tokio::test]
    async fn successful_cycle_appends_paired_messages() {
        let mut orch = ChatOrchestrator::new(Arc::new(MockGateway::ok()));
        let greeting_count = orch.messages().len();

        assert_eq!(orch.submit("hola").await, SubmitOutcome::Replied);
        assert_eq!(orch.submit("¿y ahora?").await, SubmitOutcome::Replied);

        // one user + one assistant message per completed cycle
        assert_eq!(orch.messages().len(), greeting_count + 4);
        let cycle = &orch.messages()[greeting_count..];
        assert_eq!(cycle[0].role, Role::User);
        assert_eq!(cycle[1].role, Role::Assistant);
        assert_eq!(cycle[2].role, Role::User);
        assert_eq!(cycle[3].role, Role::Assistant);
        assert!(orch.is_idle());
    }

    #[tokio::test]
    async fn continuation_token_carried_to_next_exchange() {
        let gateway = Arc::new(MockGateway::ok());
        let mut orch = ChatOrchestrator::new(gateway.clone());

        orch.submit("primera").await;
        assert_eq!(orch.thread_id(), Some("thread_T1"));
        orch.submit("segunda").await;

        let seen = gateway.seen_thread_ids.lock().unwrap();
        assert_eq!(seen[0], None);
        assert_eq!(seen[1].as_deref(), Some("thread_T1"));
    }

    #[tokio::test]
    async fn gateway_failure_appends_keyword_fallback() {
        let mut orch = ChatOrchestrator::new(Arc::new(MockGateway::failing()));
        let greeting_count = orch.messages().len();

        let outcome = orch.submit(
            "Hola, quiero migrar a España. ¿Qué documentos necesito?"
        ).await;

        assert_eq!(outcome, SubmitOutcome::FellBack);
        assert_eq!(orch.messages().len(), greeting_count + 2);
        let reply = orch.messages().last().unwrap();
        assert_eq!(reply.role, Role::Assistant);
        assert!(reply.content.contains("Para migrar a España"));
        assert!(orch.is_idle());
    }

    #[tokio::test]
    async fn failure_leaves_thread_id_unchanged() {
        let ok_gateway = Arc::new(MockGateway::ok());
        let mut orch = ChatOrchestrator::new(ok_gateway);
        orch.submit("primera").await;
        assert_eq!(orch.thread_id(), Some("thread_T1"));

        orch.gateway = Arc::new(MockGateway::failing());
        orch.submit("segunda").await;
        assert_eq!(orch.thread_id(), Some("thread_T1"));
    }
}
