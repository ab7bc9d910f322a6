use crate::domain::lead::{GenerationRequest, LeadRecord};
use crate::pricing::TokenUsage;

pub mod error;
pub mod json;
pub mod openai;

#[derive(Debug, Clone)]
pub struct GenerateInput {
    pub request: GenerationRequest,
}

/// Validated leads plus the usage metadata needed for cost accounting.
#[derive(Debug, Clone)]
pub struct GeneratedLeads {
    pub leads: Vec<LeadRecord>,
    pub usage: TokenUsage,
    pub model: String,
}

#[derive(Debug, Clone, Copy)]
pub enum Provider {
    OpenAi,
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    async fn generate_leads(&self, input: GenerateInput) -> anyhow::Result<GeneratedLeads>;
}
