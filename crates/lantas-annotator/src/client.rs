//! # Annotation Client
//!
//! One request/response cycle against an OpenAI-compatible chat completion
//! endpoint, and the fixed retry policy wrapped around it.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::Result;

/// Outcome of annotating one row after retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaggedResult {
    /// Trimmed tagged text returned by the service.
    Success(String),
    /// Every attempt failed.
    Failure { attempts: u32 },
}

/// Why a single attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// The service answered with a non-success status.
    Status { status: u16, body: String },
    /// Timeout, connection error or an interrupted body.
    Transport(String),
    /// The body was not `{choices: [{message: {content}}]}` with usable content.
    MalformedBody(String),
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Status { status, body } => write!(f, "HTTP {status}: {body}"),
            AttemptFailure::Transport(detail) => write!(f, "request failed: {detail}"),
            AttemptFailure::MalformedBody(detail) => write!(f, "malformed response: {detail}"),
        }
    }
}

/// Raw result of a single attempt, before the retry policy looks at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Completed(String),
    Failed(AttemptFailure),
}

/// Classification of an attempt against the retry budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    Success(String),
    /// Try again after `delay`.
    RetryableFailure {
        failure: AttemptFailure,
        delay: Duration,
    },
    /// The failed attempt was the last one allowed.
    ExhaustedFailure(AttemptFailure),
}

/// Fixed retry policy: a bounded number of attempts, no delay after a
/// status failure and a constant pause after any other failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per row, including the first.
    pub max_attempts: u32,
    /// Pause after a transport failure or malformed body.
    pub transport_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            transport_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the attempt budget; at least one attempt is always made.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_transport_backoff(mut self, backoff: Duration) -> Self {
        self.transport_backoff = backoff;
        self
    }

    /// Classify the outcome of attempt number `attempt` (1-based).
    pub fn classify(&self, attempt: u32, outcome: AttemptOutcome) -> AttemptResult {
        let failure = match outcome {
            AttemptOutcome::Completed(text) => return AttemptResult::Success(text),
            AttemptOutcome::Failed(failure) => failure,
        };

        if attempt >= self.max_attempts {
            return AttemptResult::ExhaustedFailure(failure);
        }

        let delay = match failure {
            AttemptFailure::Status { .. } => Duration::ZERO,
            AttemptFailure::Transport(_) | AttemptFailure::MalformedBody(_) => {
                self.transport_backoff
            }
        };
        AttemptResult::RetryableFailure { failure, delay }
    }
}

/// A single annotation attempt against some tagging service.
pub trait Annotator {
    /// Send `source_text` once and report what happened.
    fn attempt(&self, source_text: &str) -> impl Future<Output = AttemptOutcome>;
}

/// Annotate one row, retrying according to `policy`.
///
/// Every attempt's outcome is logged. Failures never propagate: exhaustion
/// is reported as [`TaggedResult::Failure`].
pub async fn annotate<A: Annotator>(
    annotator: &A,
    policy: &RetryPolicy,
    row_id: i64,
    source_text: &str,
) -> TaggedResult {
    let mut attempt = 1;
    loop {
        let outcome = annotator.attempt(source_text).await;
        match policy.classify(attempt, outcome) {
            AttemptResult::Success(text) => {
                info!(row_id, attempt, "generated: {text}");
                return TaggedResult::Success(text);
            }
            AttemptResult::RetryableFailure { failure, delay } => {
                warn!(row_id, attempt, "annotation attempt failed: {failure}");
                if !delay.is_zero() {
                    debug!(row_id, ?delay, "waiting before retry");
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
            AttemptResult::ExhaustedFailure(failure) => {
                warn!(
                    row_id,
                    attempt, "annotation attempt failed: {failure}; no attempts left, marking row as ERROR"
                );
                return TaggedResult::Failure { attempts: attempt };
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Extract the trimmed completion text from a response body.
///
/// # Errors
///
/// Returns `AttemptFailure::MalformedBody` when the JSON does not match the
/// expected shape, has no choices, or carries only whitespace.
pub fn parse_completion(body: &str) -> std::result::Result<String, AttemptFailure> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| AttemptFailure::MalformedBody(e.to_string()))?;

    let content = response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| AttemptFailure::MalformedBody("response has no choices".into()))?;

    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AttemptFailure::MalformedBody("completion is empty".into()));
    }
    Ok(trimmed.to_string())
}

/// [`Annotator`] backed by an OpenAI-compatible chat completion endpoint.
pub struct ChatCompletionClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ChatCompletionClient {
    /// Build a client whose requests time out after `config.timeout`.
    ///
    /// # Errors
    ///
    /// Returns `AnnotatorError::Http` if the TLS backend cannot be initialized.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Annotator for ChatCompletionClient {
    async fn attempt(&self, source_text: &str) -> AttemptOutcome {
        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &self.config.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: source_text,
                },
            ],
        };

        let response = match self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return AttemptOutcome::Failed(AttemptFailure::Transport(e.to_string())),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return AttemptOutcome::Failed(AttemptFailure::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return AttemptOutcome::Failed(AttemptFailure::Transport(e.to_string())),
        };

        match parse_completion(&body) {
            Ok(content) => AttemptOutcome::Completed(content),
            Err(failure) => AttemptOutcome::Failed(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Collects formatted log output for assertions.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
            let logs = self.clone();
            tracing_subscriber::fmt()
                .with_writer(move || logs.clone())
                .with_ansi(false)
                .with_max_level(tracing::Level::DEBUG)
                .finish()
        }

        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    struct Scripted {
        outcomes: RefCell<VecDeque<AttemptOutcome>>,
        calls: RefCell<u32>,
    }

    impl Scripted {
        fn new(outcomes: Vec<AttemptOutcome>) -> Self {
            Self {
                outcomes: RefCell::new(outcomes.into()),
                calls: RefCell::new(0),
            }
        }
    }

    impl Annotator for Scripted {
        async fn attempt(&self, _source_text: &str) -> AttemptOutcome {
            *self.calls.borrow_mut() += 1;
            self.outcomes
                .borrow_mut()
                .pop_front()
                .unwrap_or(AttemptOutcome::Failed(AttemptFailure::Transport("script ended".into())))
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new().with_transport_backoff(Duration::ZERO)
    }

    fn transport() -> AttemptOutcome {
        AttemptOutcome::Failed(AttemptFailure::Transport("connection reset".into()))
    }

    #[test]
    fn test_classify_status_failure_has_no_delay() {
        let policy = RetryPolicy::new();
        let outcome = AttemptOutcome::Failed(AttemptFailure::Status {
            status: 502,
            body: "bad gateway".into(),
        });
        match policy.classify(1, outcome) {
            AttemptResult::RetryableFailure { delay, .. } => assert_eq!(delay, Duration::ZERO),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_classify_transport_failure_backs_off() {
        let policy = RetryPolicy::new();
        match policy.classify(2, transport()) {
            AttemptResult::RetryableFailure { delay, .. } => {
                assert_eq!(delay, Duration::from_secs(2))
            }
            other => panic!("unexpected {other:?}"),
        }
        let malformed = AttemptOutcome::Failed(AttemptFailure::MalformedBody("eof".into()));
        assert!(matches!(
            policy.classify(1, malformed),
            AttemptResult::RetryableFailure { .. }
        ));
    }

    #[test]
    fn test_classify_exhaustion_by_attempt_count() {
        let policy = RetryPolicy::new();
        assert!(matches!(
            policy.classify(3, transport()),
            AttemptResult::ExhaustedFailure(AttemptFailure::Transport(_))
        ));
        assert_eq!(
            policy.classify(3, AttemptOutcome::Completed("ok".into())),
            AttemptResult::Success("ok".into())
        );
    }

    #[test]
    fn test_max_attempts_is_at_least_one() {
        assert_eq!(RetryPolicy::new().with_max_attempts(0).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_annotate_exhausts_after_three_attempts() {
        let annotator = Scripted::new(vec![transport(), transport(), transport(), transport()]);
        let result = annotate(&annotator, &fast_policy(), 1, "macet").await;

        assert_eq!(result, TaggedResult::Failure { attempts: 3 });
        assert_eq!(*annotator.calls.borrow(), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_logs_each_failed_attempt_once() {
        let logs = CapturedLogs::default();
        let _guard = tracing::subscriber::set_default(logs.subscriber());

        let annotator = Scripted::new(vec![transport(), transport(), transport(), transport()]);
        let result = annotate(&annotator, &fast_policy(), 11, "macet").await;

        assert_eq!(result, TaggedResult::Failure { attempts: 3 });
        let output = logs.contents();
        assert_eq!(output.matches("annotation attempt failed").count(), 3, "{output}");
        assert_eq!(output.matches("no attempts left").count(), 1);
        assert_eq!(output.matches("WARN").count(), 3);
    }

    #[tokio::test]
    async fn test_annotate_recovers_on_last_attempt() {
        let status = AttemptOutcome::Failed(AttemptFailure::Status {
            status: 429,
            body: "rate limited".into(),
        });
        let annotator = Scripted::new(vec![
            status,
            transport(),
            AttemptOutcome::Completed("<COND>macet</COND>".into()),
        ]);
        let result = annotate(&annotator, &fast_policy(), 1, "macet").await;

        assert_eq!(result, TaggedResult::Success("<COND>macet</COND>".into()));
        assert_eq!(*annotator.calls.borrow(), 3);
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"  <PLOC>Monas</PLOC> macet\n"}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "<PLOC>Monas</PLOC> macet");
    }

    #[test]
    fn test_parse_completion_rejects_unexpected_shapes() {
        for body in [
            "not json",
            r#"{"error":{"message":"quota"}}"#,
            r#"{"choices":[]}"#,
            r#"{"choices":[{"message":{}}]}"#,
            r#"{"choices":[{"message":{"content":null}}]}"#,
            r#"{"choices":[{"message":{"content":"   "}}]}"#,
        ] {
            assert!(
                matches!(parse_completion(body), Err(AttemptFailure::MalformedBody(_))),
                "accepted {body}"
            );
        }
    }

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "m",
            messages: [
                ChatMessage {
                    role: "system",
                    content: "instruction",
                },
                ChatMessage {
                    role: "user",
                    content: "post",
                },
            ],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "m");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "post");
    }
}
