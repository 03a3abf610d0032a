//! Remote code execution client
//!
//! The controller only needs "send the code, get back output or errors", so
//! the service sits behind [`ExecutionService`]. [`HttpExecutionService`] is the
//! real client (feature `runtime`); tests plug in a fake.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Placeholder shown in the output area before anything has run
pub const IDLE_OUTPUT: &str = "Ready to execute your code...";

/// Output shown while a run is in flight
pub const COMPILING_OUTPUT: &str = "Compiling...\n";

/// Output shown when a run is attempted without being logged in
pub const MISSING_AUTH_OUTPUT: &str = "Missing Authorization Header. Please log in again.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    pub code: String,
    pub request_id: String,
}

impl ExecutionRequest {
    /// Request with a fresh random request id
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// One compiler diagnostic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileError {
    pub message: String,
    #[serde(default)]
    pub line: Option<u32>,
}

/// Response body of the execution endpoint. The service answers in
/// snake_case; camelCase is accepted too.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionResponse {
    pub success: bool,
    #[serde(default)]
    pub output: Option<String>,
    /// Seconds
    #[serde(default, alias = "executionTime")]
    pub execution_time: Option<f64>,
    #[serde(default)]
    pub errors: Option<Vec<CompileError>>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, alias = "requestId")]
    pub request_id: Option<String>,
}

/// Status of the output area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStatus {
    #[default]
    Idle,
    Success,
    Error,
}

/// Text and status to show after a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub status: ExecutionStatus,
    pub output: String,
}

impl ExecutionResponse {
    /// Render this response the way the output area shows it
    pub fn to_outcome(&self) -> RunOutcome {
        if self.success {
            let output = self
                .output
                .as_deref()
                .filter(|o| !o.is_empty())
                .unwrap_or("Program executed successfully (no output)");
            let output = match self.execution_time {
                Some(secs) if secs > 0.0 => {
                    format!("{output}\n\nProgram executed successfully in {secs:.3} seconds.")
                }
                _ => output.to_string(),
            };
            return RunOutcome {
                status: ExecutionStatus::Success,
                output,
            };
        }

        let mut message = match (&self.errors, &self.error) {
            (Some(errors), _) => errors
                .iter()
                .map(|e| match e.line {
                    Some(line) => format!("{} (line {})", e.message, line),
                    None => e.message.clone(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
            (None, Some(error)) if !error.is_empty() => error.clone(),
            _ => "Compilation failed".to_string(),
        };
        if let Some(id) = self.request_id.as_deref().filter(|id| !id.is_empty()) {
            message.push_str(&format!("\n\nRequest ID: {id}"));
        }
        RunOutcome {
            status: ExecutionStatus::Error,
            output: message,
        }
    }
}

/// Errors talking to the execution service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// Connection, DNS, TLS or timeout failure
    Transport(String),
    /// The service answered with something that isn't an execution response
    Protocol(String),
    /// Non-success HTTP status without a usable body
    Http { status: u16, body: String },
}

impl std::fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionError::Transport(msg) => write!(f, "{msg}"),
            ExecutionError::Protocol(msg) => write!(f, "invalid response: {msg}"),
            ExecutionError::Http { status, body } if body.is_empty() => {
                write!(f, "HTTP {status}")
            }
            ExecutionError::Http { status, body } => write!(f, "HTTP {status}: {body}"),
        }
    }
}

impl std::error::Error for ExecutionError {}

impl ExecutionError {
    /// Output-area text for a run that never produced a response
    pub fn to_outcome(&self) -> RunOutcome {
        RunOutcome {
            status: ExecutionStatus::Error,
            output: format!("Execution error: {self}"),
        }
    }
}

/// Something that can compile and run code
#[async_trait]
pub trait ExecutionService: Send + Sync {
    /// Execute once. No retries; the caller surfaces failures.
    async fn execute(
        &self,
        request: ExecutionRequest,
        auth_token: &str,
    ) -> Result<ExecutionResponse, ExecutionError>;
}

#[cfg(feature = "runtime")]
pub use http::HttpExecutionService;

#[cfg(feature = "runtime")]
mod http {
    use super::*;
    use crate::config::ExecutionConfig;
    use std::time::Duration;

    /// Blocking `ureq` client run on the tokio blocking pool
    #[derive(Debug, Clone)]
    pub struct HttpExecutionService {
        endpoint: String,
        timeout: Duration,
    }

    impl HttpExecutionService {
        pub fn new(config: &ExecutionConfig) -> Self {
            Self {
                endpoint: config.endpoint.clone(),
                timeout: Duration::from_secs(config.timeout_secs),
            }
        }

        fn post(&self, body: &str, auth_token: &str) -> Result<ExecutionResponse, ExecutionError> {
            let result = ureq::post(&self.endpoint)
                .set("Content-Type", "application/json")
                .set("Authorization", &format!("Bearer {auth_token}"))
                .timeout(self.timeout)
                .send_string(body);

            match result {
                Ok(response) => {
                    let text = response
                        .into_string()
                        .map_err(|e| ExecutionError::Transport(e.to_string()))?;
                    serde_json::from_str(&text).map_err(|e| ExecutionError::Protocol(e.to_string()))
                }
                // Compile errors come back as 4xx with a regular response body
                Err(ureq::Error::Status(status, response)) => {
                    let text = response.into_string().unwrap_or_default();
                    match serde_json::from_str::<ExecutionResponse>(&text) {
                        Ok(parsed) => Ok(parsed),
                        Err(_) => Err(ExecutionError::Http { status, body: text }),
                    }
                }
                Err(ureq::Error::Transport(e)) => Err(ExecutionError::Transport(e.to_string())),
            }
        }
    }

    #[async_trait]
    impl ExecutionService for HttpExecutionService {
        async fn execute(
            &self,
            request: ExecutionRequest,
            auth_token: &str,
        ) -> Result<ExecutionResponse, ExecutionError> {
            let body = serde_json::to_string(&request)
                .map_err(|e| ExecutionError::Protocol(e.to_string()))?;
            let client = self.clone();
            let token = auth_token.to_string();

            tracing::debug!(
                "Executing request {} against {}",
                request.request_id,
                self.endpoint
            );
            tokio::task::spawn_blocking(move || client.post(&body, &token))
                .await
                .map_err(|e| ExecutionError::Transport(e.to_string()))?
        }
    }
}
