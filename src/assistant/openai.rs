use async_trait::async_trait;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };

use super::{ AssistantBackend, AssistantMessage, GatewayError, RunStatus };
use crate::cli::Args;

const ASSISTANTS_BETA_HEADER: &str = "assistants=v2";

/// reqwest client for the OpenAI Assistants v2 REST surface. Network and
/// non-2xx failures surface as `GatewayError::Transport`.
pub struct OpenAIAssistantClient {
    http: HttpClient,
    base_url: String,
}

#[derive(Serialize)]
struct CreateMessageRequest<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct CreateRunRequest<'a> {
    assistant_id: &'a str,
}

#[derive(Deserialize)]
struct ObjectWithId {
    id: String,
}

#[derive(Deserialize)]
struct RunObject {
    status: RunStatus,
}

#[derive(Deserialize)]
struct MessageList {
    data: Vec<MessageObject>,
}

#[derive(Deserialize)]
struct MessageObject {
    role: String,
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<TextPayload>,
}

#[derive(Deserialize)]
struct TextPayload {
    value: String,
}

impl OpenAIAssistantClient {
    pub fn new(api_key: &str, base_url: Option<String>) -> Result<Self, String> {
        let api_url = base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("OpenAI-Beta", HeaderValue::from_static(ASSISTANTS_BETA_HEADER));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e|
                format!("Invalid API key format: {}", e)
            )?
        );

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            http,
            base_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_args(args: &Args) -> Result<Self, String> {
        if args.openai_api_key.trim().is_empty() {
            return Err("OpenAI API key is required".to_string());
        }
        Self::new(&args.openai_api_key, args.openai_base_url.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl AssistantBackend for OpenAIAssistantClient {
    async fn create_thread(&self) -> Result<String, GatewayError> {
        let resp = self.http
            .post(self.url("/threads"))
            .json(&serde_json::json!({}))
            .send().await?
            .error_for_status()?
            .json::<ObjectWithId>().await?;
        Ok(resp.id)
    }

    async fn post_message(
        &self,
        thread_id: &str,
        role: &str,
        content: &str
    ) -> Result<(), GatewayError> {
        self.http
            .post(self.url(&format!("/threads/{}/messages", thread_id)))
            .json(&(CreateMessageRequest { role, content }))
            .send().await?
            .error_for_status()?;
        Ok(())
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str
    ) -> Result<String, GatewayError> {
        let resp = self.http
            .post(self.url(&format!("/threads/{}/runs", thread_id)))
            .json(&(CreateRunRequest { assistant_id }))
            .send().await?
            .error_for_status()?
            .json::<ObjectWithId>().await?;
        Ok(resp.id)
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<RunStatus, GatewayError> {
        let resp = self.http
            .get(self.url(&format!("/threads/{}/runs/{}", thread_id, run_id)))
            .send().await?
            .error_for_status()?
            .json::<RunObject>().await?;
        Ok(resp.status)
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<AssistantMessage>, GatewayError> {
        let resp = self.http
            .get(self.url(&format!("/threads/{}/messages", thread_id)))
            .send().await?
            .error_for_status()?
            .json::<MessageList>().await?;

        let messages = resp.data
            .into_iter()
            .map(|msg| {
                let text = msg.content
                    .into_iter()
                    .find(|block| block.block_type == "text")
                    .and_then(|block| block.text)
                    .map(|payload| payload.value);
                AssistantMessage { role: msg.role, text }
            })
            .collect();
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_list_extracts_first_text_block() {
        let raw = serde_json::json!({
            "data": [
                {
                    "role": "assistant",
                    "content": [
                        { "type": "image_file", "text": null },
                        { "type": "text", "text": { "value": "hola" } }
                    ]
                },
                { "role": "user", "content": [] }
            ]
        });
        let list: MessageList = serde_json::from_value(raw).unwrap();
        assert_eq!(list.data.len(), 2);
        let text = list.data[0].content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_ref())
            .map(|p| p.value.clone());
        assert_eq!(text.as_deref(), Some("hola"));
    }

    #[test]
    fn run_status_parses_wire_names() {
        let run: RunObject = serde_json::from_str(r#"{"status":"in_progress"}"#).unwrap();
        assert_eq!(run.status, RunStatus::InProgress);
        let run: RunObject = serde_json::from_str(r#"{"status":"requires_action"}"#).unwrap();
        assert_eq!(run.status, RunStatus::Unknown);
    }
}
