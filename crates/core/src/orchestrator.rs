use crate::domain::lead::{GenerationRequest, GenerationResult};
use crate::llm::error::{LlmDiagnosticsError, STAGE_PARSE};
use crate::llm::{GenerateInput, LlmClient};
use crate::pricing;
use crate::session::SessionStore;
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Failure surfaced to the user. Diagnostics ride along in the wrapped
/// `anyhow::Error` for logging and crash reporting.
#[derive(Debug)]
pub enum GenerationError {
    Validation(String),
    Network(anyhow::Error),
    Parse(anyhow::Error),
}

impl GenerationError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Network(_) => "network",
            Self::Parse(_) => "parse",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Network(_) => {
                "The request could not reach the completion API. Check your connection and try again.".to_string()
            }
            Self::Parse(_) => {
                "The completion API did not return a usable lead list. Try generating again.".to_string()
            }
        }
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "validation error: {msg}"),
            Self::Network(err) => write!(f, "network error: {err:#}"),
            Self::Parse(err) => write!(f, "parse error: {err:#}"),
        }
    }
}

impl std::error::Error for GenerationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Validation(_) => None,
            Self::Network(err) | Self::Parse(err) => Some(err.as_ref()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub result: GenerationResult,
    pub cached: bool,
}

pub struct Orchestrator {
    llm: Arc<dyn LlmClient>,
    sessions: Arc<SessionStore>,
    usd_to_qar: f64,
}

impl Orchestrator {
    pub fn new(llm: Arc<dyn LlmClient>, sessions: Arc<SessionStore>) -> Self {
        Self {
            llm,
            sessions,
            usd_to_qar: pricing::usd_to_qar_rate(),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// One submission end to end: validate, consult the session cache, issue
    /// the single completion call, validate the output, price it, store it.
    /// A failed call leaves the session's previous result untouched.
    pub async fn generate(
        &self,
        session_id: Uuid,
        request: GenerationRequest,
    ) -> Result<GenerationOutcome, GenerationError> {
        let request = request.normalized();
        validate(&request)?;

        let session = self.sessions.get_or_create(session_id);
        // Holds the per-session lock across the call: at most one generation
        // in flight per session.
        let mut session = session.lock().await;

        if let Some(result) = session.cached_result_for(&request) {
            tracing::info!(%session_id, "identical request; returning held result");
            return Ok(GenerationOutcome {
                result,
                cached: true,
            });
        }

        tracing::info!(
            %session_id,
            description = %truncate(&request.description, 60),
            tiers = request.tiers.len(),
            "generating lead list"
        );

        let generated = self
            .llm
            .generate_leads(GenerateInput {
                request: request.clone(),
            })
            .await
            .map_err(classify_llm_error)?;

        let cost = pricing::estimate(&generated.model, generated.usage, self.usd_to_qar);
        tracing::info!(
            %session_id,
            leads = generated.leads.len(),
            tokens = cost.total_tokens,
            usd = cost.usd,
            qar = cost.qar,
            "lead list generated"
        );

        let result = GenerationResult {
            generated_at: Utc::now(),
            qatar_focus: request.qatar_focus(),
            leads: generated.leads,
            cost,
        };
        session.store_success(request, result.clone());

        Ok(GenerationOutcome {
            result,
            cached: false,
        })
    }
}

fn validate(request: &GenerationRequest) -> Result<(), GenerationError> {
    if request.description.is_empty() {
        return Err(GenerationError::Validation(
            "Business description cannot be empty. Please describe your business.".to_string(),
        ));
    }
    if request.tiers.is_empty() {
        return Err(GenerationError::Validation(
            "Select at least one target tier.".to_string(),
        ));
    }
    Ok(())
}

fn classify_llm_error(err: anyhow::Error) -> GenerationError {
    match err.downcast_ref::<LlmDiagnosticsError>() {
        Some(diag) if diag.stage == STAGE_PARSE => GenerationError::Parse(err),
        // HTTP-stage failures and transport errors both read as network
        // problems to the user.
        _ => GenerationError::Network(err),
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lead::{LeadRecord, Tier};
    use crate::llm::error::STAGE_HTTP;
    use crate::llm::{GeneratedLeads, Provider};
    use crate::pricing::TokenUsage;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum StubBehavior {
        Leads(usize),
        HttpFailure,
        ParseFailure,
    }

    struct StubClient {
        behavior: StubBehavior,
        calls: AtomicUsize,
    }

    impl StubClient {
        fn new(behavior: StubBehavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for StubClient {
        fn provider(&self) -> Provider {
            Provider::OpenAi
        }

        async fn generate_leads(&self, _input: GenerateInput) -> anyhow::Result<GeneratedLeads> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                StubBehavior::Leads(n) => Ok(GeneratedLeads {
                    leads: (1..=n as i32)
                        .map(|rank| LeadRecord {
                            rank,
                            name: format!("Company {rank}"),
                            tier: Tier::Tier1,
                            rationale: "active innovation program".to_string(),
                            outreach_subject: None,
                            message_hook: None,
                        })
                        .collect(),
                    usage: TokenUsage {
                        prompt_tokens: 400,
                        completion_tokens: 600,
                        total_tokens: 1000,
                    },
                    model: "gpt-4o-mini".to_string(),
                }),
                StubBehavior::HttpFailure => Err(LlmDiagnosticsError {
                    provider: Provider::OpenAi,
                    stage: STAGE_HTTP,
                    detail: "status=429 Too Many Requests".to_string(),
                    raw_output: None,
                    raw_response_json: None,
                }
                .into()),
                StubBehavior::ParseFailure => Err(LlmDiagnosticsError {
                    provider: Provider::OpenAi,
                    stage: STAGE_PARSE,
                    detail: "LLM output contains no lead entries".to_string(),
                    raw_output: Some("Sorry, here is an essay instead.".to_string()),
                    raw_response_json: None,
                }
                .into()),
            }
        }
    }

    fn orchestrator(client: Arc<StubClient>) -> Orchestrator {
        Orchestrator::new(client, Arc::new(SessionStore::new()))
    }

    fn request(desc: &str) -> GenerationRequest {
        GenerationRequest {
            description: desc.to_string(),
            tiers: BTreeSet::from([Tier::Tier1]),
            extra_specs: None,
            align_qnv2030: true,
        }
    }

    #[tokio::test]
    async fn empty_description_fails_without_a_call() {
        let client = StubClient::new(StubBehavior::Leads(10));
        let orch = orchestrator(client.clone());

        let err = orch
            .generate(Uuid::new_v4(), request("   "))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn empty_tier_selection_fails_without_a_call() {
        let client = StubClient::new(StubBehavior::Leads(10));
        let orch = orchestrator(client.clone());

        let mut req = request("boutique hotel booking platform");
        req.tiers.clear();
        let err = orch.generate(Uuid::new_v4(), req).await.unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn canned_ten_line_response_yields_ten_leads_and_cost() {
        let client = StubClient::new(StubBehavior::Leads(10));
        let orch = orchestrator(client.clone());

        let outcome = orch
            .generate(Uuid::new_v4(), request("boutique hotel booking platform"))
            .await
            .unwrap();
        assert!(!outcome.cached);
        assert_eq!(outcome.result.leads.len(), 10);
        assert!(outcome.result.cost.usd >= 0.0);
        assert_eq!(outcome.result.cost.total_tokens, 1000);
    }

    #[tokio::test]
    async fn identical_resubmission_hits_the_cache() {
        let client = StubClient::new(StubBehavior::Leads(10));
        let orch = orchestrator(client.clone());
        let session_id = Uuid::new_v4();

        let first = orch
            .generate(session_id, request("boutique hotel booking platform"))
            .await
            .unwrap();
        // Same request, different surrounding whitespace.
        let second = orch
            .generate(session_id, request("  boutique hotel booking platform "))
            .await
            .unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn changed_request_triggers_a_new_call() {
        let client = StubClient::new(StubBehavior::Leads(10));
        let orch = orchestrator(client.clone());
        let session_id = Uuid::new_v4();

        orch.generate(session_id, request("platform a")).await.unwrap();
        orch.generate(session_id, request("platform b")).await.unwrap();
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn cache_is_per_session() {
        let client = StubClient::new(StubBehavior::Leads(10));
        let orch = orchestrator(client.clone());

        orch.generate(Uuid::new_v4(), request("platform")).await.unwrap();
        orch.generate(Uuid::new_v4(), request("platform")).await.unwrap();
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn http_failure_classifies_as_network() {
        let client = StubClient::new(StubBehavior::HttpFailure);
        let orch = orchestrator(client);

        let err = orch
            .generate(Uuid::new_v4(), request("platform"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "network");
    }

    #[tokio::test]
    async fn parse_failure_classifies_as_parse_and_preserves_prior_result() {
        let ok_client = StubClient::new(StubBehavior::Leads(7));
        let sessions = Arc::new(SessionStore::new());
        let session_id = Uuid::new_v4();

        let orch = Orchestrator::new(ok_client, sessions.clone());
        orch.generate(session_id, request("platform")).await.unwrap();

        let failing = StubClient::new(StubBehavior::ParseFailure);
        let orch = Orchestrator::new(failing, sessions.clone());
        let err = orch
            .generate(session_id, request("another platform"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "parse");

        // Prior result survives the failed generation.
        let session = sessions.get(session_id).unwrap();
        let session = session.lock().await;
        assert_eq!(session.result().unwrap().leads.len(), 7);
        assert_eq!(session.request_count(), 1);
    }
}
