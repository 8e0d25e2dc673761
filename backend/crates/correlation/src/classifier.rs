//! Semantic classifier adapter.
//!
//! Wraps one call to an external generative model behind a strict output
//! contract. `classify` always yields a [`Verdict`]; every failure on the way
//! resolves to `NotInfluenced`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ctxwatch_db::anomaly::models::Severity;
use ctxwatch_db::context::models::ContextSignal;

use crate::prompt::build_prompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Influenced,
    NotInfluenced,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    pub parts: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationResponse {
    pub candidates: Vec<Candidate>,
}

impl GenerationResponse {
    /// Convenience for a single-candidate, single-part response.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                parts: vec![text.into()],
            }],
        }
    }

    /// Text of the first part of the first candidate, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|c| c.parts.first())
            .map(String::as_str)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("request failed: {0}")]
    Request(String),

    #[error("max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },
}

/// The single outbound call to the hosted model. Retry policy, if any,
/// lives in the implementation.
#[async_trait]
pub trait ModelTransport: Send + Sync {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, TransportError>;
}

/// Anything that can turn an anomaly plus its day's context into a verdict.
/// Implementations must not fail; uncertainty is `NotInfluenced`.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        event_name: &str,
        deviation_pct: f64,
        severity: Severity,
        campaigns: &[ContextSignal],
        news: &[ContextSignal],
    ) -> Verdict;
}

/// Why a classification fell back to `NotInfluenced`. Only used for logs.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierFailure {
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    #[error("response had no candidate output")]
    NoCandidate,

    #[error("output is not the expected JSON object: {0}")]
    Malformed(String),

    #[error("unrecognized decision value: {0}")]
    UnrecognizedDecision(String),
}

impl ClassifierFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifierFailure::Transport(_) => "transport",
            ClassifierFailure::NoCandidate => "no_candidate",
            ClassifierFailure::Malformed(_) => "malformed",
            ClassifierFailure::UnrecognizedDecision(_) => "unrecognized_decision",
        }
    }
}

#[derive(Deserialize)]
struct DecisionPayload {
    decision: String,
}

/// Parse raw model text against the `{"decision": ...}` contract.
pub fn parse_verdict(raw: &str) -> Result<Verdict, ClassifierFailure> {
    let payload: DecisionPayload = serde_json::from_str(raw.trim())
        .map_err(|e| ClassifierFailure::Malformed(e.to_string()))?;

    match payload.decision.as_str() {
        "INFLUENCED" => Ok(Verdict::Influenced),
        "NOT_INFLUENCED" => Ok(Verdict::NotInfluenced),
        other => Err(ClassifierFailure::UnrecognizedDecision(other.to_string())),
    }
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub timeout: Duration,
    pub max_output_tokens: u32,
    pub context_char_budget: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_output_tokens: 100,
            context_char_budget: 200,
        }
    }
}

pub struct SemanticClassifier<T> {
    transport: T,
    config: ClassifierConfig,
}

impl<T: ModelTransport> SemanticClassifier<T> {
    pub fn new(transport: T, config: ClassifierConfig) -> Self {
        Self { transport, config }
    }

    async fn try_classify(&self, request: &GenerationRequest) -> Result<Verdict, ClassifierFailure> {
        let response = tokio::time::timeout(self.config.timeout, self.transport.generate(request))
            .await
            .map_err(|_| TransportError::Timeout)??;

        let raw = response.first_text().ok_or(ClassifierFailure::NoCandidate)?;
        tracing::debug!(raw = %raw, "classifier raw output");

        parse_verdict(raw)
    }
}

#[async_trait]
impl<T: ModelTransport> Classifier for SemanticClassifier<T> {
    async fn classify(
        &self,
        event_name: &str,
        deviation_pct: f64,
        severity: Severity,
        campaigns: &[ContextSignal],
        news: &[ContextSignal],
    ) -> Verdict {
        let request = GenerationRequest {
            prompt: build_prompt(
                event_name,
                deviation_pct,
                severity,
                campaigns,
                news,
                self.config.context_char_budget,
            ),
            max_output_tokens: self.config.max_output_tokens,
            temperature: 0.0,
        };

        match self.try_classify(&request).await {
            Ok(verdict) => {
                tracing::debug!(event_name, ?verdict, "classified");
                verdict
            }
            Err(failure) => {
                tracing::warn!(
                    event_name,
                    failure = failure.kind(),
                    error = %failure,
                    "classifier degraded, defaulting to NOT_INFLUENCED"
                );
                Verdict::NotInfluenced
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    enum Reply {
        Ok(GenerationResponse),
        Err(fn() -> TransportError),
        Hang,
    }

    struct MockTransport {
        reply: Reply,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    impl MockTransport {
        fn new(reply: Reply) -> Self {
            Self {
                reply,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn text(text: &str) -> Self {
            Self::new(Reply::Ok(GenerationResponse::text(text)))
        }
    }

    #[async_trait]
    impl ModelTransport for MockTransport {
        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<GenerationResponse, TransportError> {
            self.requests.lock().unwrap().push(request.clone());
            match &self.reply {
                Reply::Ok(response) => Ok(response.clone()),
                Reply::Err(make) => Err(make()),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(GenerationResponse::text(r#"{"decision":"INFLUENCED"}"#))
                }
            }
        }
    }

    fn config() -> ClassifierConfig {
        ClassifierConfig {
            timeout: Duration::from_millis(50),
            max_output_tokens: 100,
            context_char_budget: 200,
        }
    }

    async fn run(transport: MockTransport) -> Verdict {
        let classifier = SemanticClassifier::new(transport, config());
        classifier
            .classify(
                "purchase",
                12.0,
                Severity::High,
                &[ContextSignal::campaign("Sale", None)],
                &[],
            )
            .await
    }

    #[tokio::test]
    async fn influenced_output_is_influenced() {
        let verdict = run(MockTransport::text(r#"{"decision":"INFLUENCED"}"#)).await;
        assert_eq!(verdict, Verdict::Influenced);
    }

    #[tokio::test]
    async fn not_influenced_output_is_not_influenced() {
        let verdict = run(MockTransport::text(r#"{"decision":"NOT_INFLUENCED"}"#)).await;
        assert_eq!(verdict, Verdict::NotInfluenced);
    }

    #[tokio::test]
    async fn surrounding_whitespace_is_tolerated() {
        let verdict = run(MockTransport::text("\n  {\"decision\": \"INFLUENCED\"}  \n")).await;
        assert_eq!(verdict, Verdict::Influenced);
    }

    #[tokio::test]
    async fn transport_timeout_error_resolves_not_influenced() {
        let verdict = run(MockTransport::new(Reply::Err(|| TransportError::Timeout))).await;
        assert_eq!(verdict, Verdict::NotInfluenced);
    }

    #[tokio::test]
    async fn slow_transport_is_cut_off_by_timeout() {
        let started = std::time::Instant::now();
        let verdict = run(MockTransport::new(Reply::Hang)).await;
        assert_eq!(verdict, Verdict::NotInfluenced);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn retries_exhausted_resolves_not_influenced() {
        let verdict = run(MockTransport::new(Reply::Err(|| {
            TransportError::MaxRetriesExceeded {
                attempts: 3,
                last_error: "503".to_string(),
            }
        })))
        .await;
        assert_eq!(verdict, Verdict::NotInfluenced);
    }

    #[tokio::test]
    async fn empty_candidate_list_resolves_not_influenced() {
        let verdict = run(MockTransport::new(Reply::Ok(GenerationResponse::default()))).await;
        assert_eq!(verdict, Verdict::NotInfluenced);
    }

    #[tokio::test]
    async fn candidate_without_parts_resolves_not_influenced() {
        let response = GenerationResponse {
            candidates: vec![Candidate::default()],
        };
        let verdict = run(MockTransport::new(Reply::Ok(response))).await;
        assert_eq!(verdict, Verdict::NotInfluenced);
    }

    #[tokio::test]
    async fn non_json_text_resolves_not_influenced() {
        let verdict = run(MockTransport::text("Yes, INFLUENCED by the sale.")).await;
        assert_eq!(verdict, Verdict::NotInfluenced);
    }

    #[tokio::test]
    async fn markdown_fenced_json_resolves_not_influenced() {
        let verdict =
            run(MockTransport::text("```json\n{\"decision\":\"INFLUENCED\"}\n```")).await;
        assert_eq!(verdict, Verdict::NotInfluenced);
    }

    #[tokio::test]
    async fn json_missing_decision_key_resolves_not_influenced() {
        let verdict = run(MockTransport::text(r#"{"verdict":"INFLUENCED"}"#)).await;
        assert_eq!(verdict, Verdict::NotInfluenced);
    }

    #[tokio::test]
    async fn unknown_decision_value_resolves_not_influenced() {
        let verdict = run(MockTransport::text(r#"{"decision":"MAYBE"}"#)).await;
        assert_eq!(verdict, Verdict::NotInfluenced);
    }

    #[tokio::test]
    async fn request_is_deterministic_and_bounded() {
        let transport = MockTransport::text(r#"{"decision":"INFLUENCED"}"#);
        let classifier = SemanticClassifier::new(transport, config());
        classifier
            .classify(
                "purchase",
                12.0,
                Severity::High,
                &[ContextSignal::campaign("Sale", Some("d".repeat(1000)))],
                &[],
            )
            .await;

        let requests = classifier.transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].temperature, 0.0);
        assert_eq!(requests[0].max_output_tokens, 100);
        assert!(requests[0].prompt.contains("Event: purchase"));
        assert!(!requests[0].prompt.contains(&"d".repeat(201)));
    }

    #[test]
    fn parse_verdict_classifies_failures() {
        assert!(matches!(
            parse_verdict("not json"),
            Err(ClassifierFailure::Malformed(_))
        ));
        assert!(matches!(
            parse_verdict(r#"{"other":1}"#),
            Err(ClassifierFailure::Malformed(_))
        ));
        assert!(matches!(
            parse_verdict(r#"{"decision":1}"#),
            Err(ClassifierFailure::Malformed(_))
        ));
        assert!(matches!(
            parse_verdict(r#""INFLUENCED""#),
            Err(ClassifierFailure::Malformed(_))
        ));
        assert!(matches!(
            parse_verdict(r#"{"decision":"influenced"}"#),
            Err(ClassifierFailure::UnrecognizedDecision(_))
        ));
        assert_eq!(
            parse_verdict(r#"{"decision":"NOT_INFLUENCED"}"#).unwrap(),
            Verdict::NotInfluenced
        );
    }

    #[test]
    fn failure_kinds_are_distinct() {
        assert_eq!(ClassifierFailure::NoCandidate.kind(), "no_candidate");
        assert_eq!(
            ClassifierFailure::Malformed(String::new()).kind(),
            "malformed"
        );
        assert_eq!(
            ClassifierFailure::from(TransportError::Timeout).kind(),
            "transport"
        );
    }
}
