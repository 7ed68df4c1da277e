//! HTTP client for the reasoning service.
//!
//! Sends one chat-completions request with a forced function call and
//! decodes the call's arguments. Retrying is the caller's business.

use super::schema::{FunctionDefinition, InsightRequest};
use super::InsightError;
use crate::config::ServiceConfig;
use crate::models::InsightResponse;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Message in the chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct FunctionCallName<'a> {
    name: &'a str,
}

/// Chat-completions request body.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    functions: Vec<FunctionDefinition>,
    function_call: FunctionCallName<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Chat-completions response body.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    arguments: Value,
}

/// Client for the reasoning service.
pub struct InsightClient {
    config: ServiceConfig,
    http_client: reqwest::Client,
}

impl InsightClient {
    /// Build a client whose requests time out after `config.timeout_seconds`.
    pub fn new(config: ServiceConfig) -> Result<Self, InsightError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                InsightError::ServiceUnavailable(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send a single request and decode the reply for the request's kind.
    pub async fn request(&self, request: &InsightRequest) -> Result<InsightResponse, InsightError> {
        let function_name = request.kind.function_name();

        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.instructions.clone(),
                },
                ChatMessage {
                    role: "system".to_string(),
                    content: request.data.to_string(),
                },
            ],
            functions: vec![request.kind.definition()],
            function_call: FunctionCallName {
                name: function_name,
            },
            temperature: self.config.temperature,
        };

        debug!(
            "Sending {} request to {}",
            request.kind.operation(),
            self.config.endpoint
        );

        let mut builder = self.http_client.post(&self.config.endpoint).json(&body);
        if let Some(token) = &self.config.api_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                InsightError::ServiceUnavailable(format!(
                    "Request timed out after {}s",
                    self.config.timeout_seconds
                ))
            } else if e.is_connect() {
                InsightError::ServiceUnavailable(format!(
                    "Cannot connect to reasoning service at {}",
                    self.config.endpoint
                ))
            } else {
                InsightError::ServiceUnavailable(format!("Failed to send request: {}", e))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(InsightError::ServiceUnavailable(format!(
                "API error {}: {}",
                status, body
            )));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            InsightError::MalformedResponse(format!("Failed to parse response body: {}", e))
        })?;

        let call = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.function_call)
            .ok_or_else(|| {
                InsightError::MalformedResponse(format!(
                    "Reply did not call function {}",
                    function_name
                ))
            })?;

        if call.name != function_name {
            return Err(InsightError::MalformedResponse(format!(
                "Reply called {} instead of {}",
                call.name, function_name
            )));
        }

        request.kind.decode(&call.arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insight::schema::RequestKind;
    use crate::models::CorrelationJudgment;
    use httpmock::prelude::*;
    use serde_json::json;

    fn config(endpoint: String) -> ServiceConfig {
        ServiceConfig {
            endpoint,
            api_token: Some("test-token".to_string()),
            timeout_seconds: 5,
            ..ServiceConfig::default()
        }
    }

    fn judgment_request() -> InsightRequest {
        InsightRequest {
            kind: RequestKind::CorrelationJudgment,
            instructions: "Judge these columns".to_string(),
            data: json!({"price": {"count": 3}}),
        }
    }

    fn function_reply(name: &str, arguments: &str) -> Value {
        json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "function_call": {"name": name, "arguments": arguments}
                }
            }]
        })
    }

    #[tokio::test]
    async fn test_request_sends_forced_function_call() {
        let server = MockServer::start_async().await;

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer test-token")
                    .json_body_includes(r#"{"function_call": {"name": "judge_column_correlation"}}"#)
                    .json_body_includes(r#"{"model": "gpt-4o-mini"}"#);
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(function_reply(
                        "judge_column_correlation",
                        r#"{"is_columns_common": true, "reason": "derived"}"#,
                    ));
            })
            .await;

        let client = InsightClient::new(config(server.url("/v1/chat/completions"))).unwrap();
        let response = client.request(&judgment_request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            response,
            InsightResponse::Correlation(CorrelationJudgment {
                is_columns_common: true,
                reason: "derived".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_server_error_is_service_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(503).body("overloaded");
            })
            .await;

        let client = InsightClient::new(config(server.url("/v1/chat/completions"))).unwrap();
        let err = client.request(&judgment_request()).await.unwrap_err();

        assert!(matches!(err, InsightError::ServiceUnavailable(ref m) if m.contains("503")));
    }

    #[tokio::test]
    async fn test_missing_function_call_is_malformed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).json_body(json!({
                    "choices": [{"message": {"role": "assistant", "content": "hello"}}]
                }));
            })
            .await;

        let client = InsightClient::new(config(server.url("/v1/chat/completions"))).unwrap();
        let err = client.request(&judgment_request()).await.unwrap_err();

        assert!(matches!(err, InsightError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_wrong_function_is_malformed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).json_body(function_reply(
                    "draft_report_narrative",
                    r#"{"is_columns_common": true, "reason": "x"}"#,
                ));
            })
            .await;

        let client = InsightClient::new(config(server.url("/v1/chat/completions"))).unwrap();
        let err = client.request(&judgment_request()).await.unwrap_err();

        assert!(matches!(err, InsightError::MalformedResponse(ref m) if m.contains("instead of")));
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).body("<html>gateway</html>");
            })
            .await;

        let client = InsightClient::new(config(server.url("/v1/chat/completions"))).unwrap();
        let err = client.request(&judgment_request()).await.unwrap_err();

        assert!(matches!(err, InsightError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_service_unavailable() {
        let client = InsightClient::new(config("http://127.0.0.1:9/v1/chat/completions".to_string()))
            .unwrap();
        let err = client.request(&judgment_request()).await.unwrap_err();

        assert!(matches!(err, InsightError::ServiceUnavailable(_)));
    }
}
