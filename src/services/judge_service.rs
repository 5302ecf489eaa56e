use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;

/// Languages accepted for coding submissions, with their Judge0 ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    C,
    Cpp,
    Java,
    Python,
    Javascript,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::C,
        Language::Cpp,
        Language::Java,
        Language::Python,
        Language::Javascript,
    ];

    pub fn judge_id(&self) -> i32 {
        match self {
            Language::C => 50,
            Language::Cpp => 54,
            Language::Java => 62,
            Language::Python => 71,
            Language::Javascript => 63,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Java => "java",
            Language::Python => "python",
            Language::Javascript => "javascript",
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        let normalized = name.trim().to_ascii_lowercase();
        Language::ALL
            .into_iter()
            .find(|l| l.as_str() == normalized)
            .ok_or_else(|| {
                Error::BadRequest(format!(
                    "Unsupported language '{}'. Supported: c, cpp, java, python, javascript",
                    name
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    Accepted,
    WrongAnswer,
    RuntimeError,
    CompileError,
    TimeLimit,
    MemoryLimit,
    InternalError,
}

impl VerdictStatus {
    /// Maps a Judge0 status id (and its description) onto the verdict taxonomy.
    pub fn from_judge(id: i64, description: &str) -> Self {
        match id {
            3 => VerdictStatus::Accepted,
            4 => VerdictStatus::WrongAnswer,
            5 => VerdictStatus::TimeLimit,
            6 => VerdictStatus::CompileError,
            7..=12 if description.to_ascii_lowercase().contains("memory") => {
                VerdictStatus::MemoryLimit
            }
            7..=12 => VerdictStatus::RuntimeError,
            _ => VerdictStatus::InternalError,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VerdictStatus::Accepted => "Accepted",
            VerdictStatus::WrongAnswer => "Wrong Answer",
            VerdictStatus::RuntimeError => "Runtime Error",
            VerdictStatus::CompileError => "Compilation Error",
            VerdictStatus::TimeLimit => "Time Limit Exceeded",
            VerdictStatus::MemoryLimit => "Memory Limit Exceeded",
            VerdictStatus::InternalError => "Internal Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub description: String,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub message: Option<String>,
    /// Seconds.
    pub execution_time: Option<f64>,
    /// Kilobytes.
    pub memory: Option<i64>,
}

impl Verdict {
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            status: VerdictStatus::InternalError,
            description: VerdictStatus::InternalError.label().to_string(),
            stdout: None,
            stderr: None,
            compile_output: None,
            message: Some(message.into()),
            execution_time: None,
            memory: None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == VerdictStatus::Accepted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLimits {
    pub cpu_time_limit: f64,
    pub memory_limit_kb: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRequest {
    pub source_code: String,
    pub language: Language,
    pub stdin: String,
    pub expected_output: String,
    pub limits: ExecutionLimits,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Judge: Send + Sync {
    async fn execute(&self, request: &ExecutionRequest) -> Result<Verdict>;
}

#[derive(Serialize)]
struct JudgeSubmission<'a> {
    source_code: &'a str,
    language_id: i32,
    stdin: &'a str,
    expected_output: &'a str,
    cpu_time_limit: f64,
    memory_limit: i32,
}

#[derive(Debug, Deserialize)]
struct JudgeStatus {
    id: i64,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct JudgeResponse {
    status: JudgeStatus,
    stdout: Option<String>,
    stderr: Option<String>,
    compile_output: Option<String>,
    message: Option<String>,
    time: Option<JsonValue>,
    memory: Option<JsonValue>,
}

impl From<JudgeResponse> for Verdict {
    fn from(resp: JudgeResponse) -> Self {
        let status = VerdictStatus::from_judge(resp.status.id, &resp.status.description);
        let description = if resp.status.description.is_empty() {
            status.label().to_string()
        } else {
            resp.status.description
        };
        Verdict {
            status,
            description,
            stdout: resp.stdout,
            stderr: resp.stderr,
            compile_output: resp.compile_output,
            message: resp.message,
            execution_time: resp.time.as_ref().and_then(parse_number),
            memory: resp
                .memory
                .as_ref()
                .and_then(parse_number)
                .map(|kb| kb.round() as i64),
        }
    }
}

/// Judge0 reports `time` as a string ("0.012") and `memory` as a number.
fn parse_number(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// HTTP client for a Judge0-compatible execution service.
#[derive(Clone)]
pub struct Judge0Client {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    api_host: Option<String>,
}

impl Judge0Client {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        api_host: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            api_host,
        })
    }

    pub fn from_config(config: &crate::config::Config) -> Result<Self> {
        Self::new(
            config.judge_api_url.clone(),
            config.judge_api_key.clone(),
            config.judge_api_host.clone(),
            Duration::from_secs(config.judge_request_timeout_secs),
        )
    }
}

#[async_trait]
impl Judge for Judge0Client {
    async fn execute(&self, request: &ExecutionRequest) -> Result<Verdict> {
        let body = JudgeSubmission {
            source_code: &request.source_code,
            language_id: request.language.judge_id(),
            stdin: &request.stdin,
            expected_output: &request.expected_output,
            cpu_time_limit: request.limits.cpu_time_limit,
            memory_limit: request.limits.memory_limit_kb,
        };

        let mut builder = self
            .client
            .post(format!(
                "{}/submissions?base64_encoded=false&wait=true",
                self.base_url
            ))
            .json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.header("X-RapidAPI-Key", key);
        }
        if let Some(host) = &self.api_host {
            builder = builder.header("X-RapidAPI-Host", host);
        }

        let resp = match builder.send().await {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => {
                tracing::warn!(language = request.language.as_str(), "Judge request timed out");
                return Ok(Verdict::internal_error(format!("Judge request timed out: {}", e)));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Judge request failed");
                return Ok(Verdict::internal_error(format!("Judge request failed: {}", e)));
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            tracing::warn!(%status, body = %text, "Judge responded with an error status");
            return Ok(Verdict::internal_error(format!(
                "Judge service responded with {}",
                status
            )));
        }

        match resp.json::<JudgeResponse>().await {
            Ok(parsed) => Ok(parsed.into()),
            Err(e) if e.is_timeout() => Ok(Verdict::internal_error(format!(
                "Judge request timed out: {}",
                e
            ))),
            Err(e) => {
                tracing::warn!(error = %e, "Judge response could not be decoded");
                Ok(Verdict::internal_error(format!(
                    "Invalid judge response: {}",
                    e
                )))
            }
        }
    }
}
