use crate::domain::lead::{LeadRecord, Tier};
use anyhow::{bail, ensure};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const MAX_LEADS: usize = 10;

/// Loose shape the model is allowed to emit. Promotion into domain
/// `LeadRecord`s happens only through validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmLeadList {
    pub leads: Vec<LlmLeadItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmLeadItem {
    pub rank: i32,
    pub name: String,
    pub tier: i64,
    pub rationale: String,
    #[serde(default)]
    pub outreach_subject: Option<String>,
    #[serde(default)]
    pub message_hook: Option<String>,
}

impl LlmLeadList {
    pub fn validate_and_into_leads(self) -> anyhow::Result<Vec<LeadRecord>> {
        ensure!(!self.leads.is_empty(), "LLM output contains no lead entries");
        ensure!(
            self.leads.len() <= MAX_LEADS,
            "LLM output must contain at most {MAX_LEADS} leads (got {})",
            self.leads.len()
        );

        let count = self.leads.len() as i32;
        let mut seen_ranks = BTreeSet::<i32>::new();
        let mut leads = Vec::with_capacity(self.leads.len());
        for item in self.leads {
            leads.push(item.validate_and_into_lead(count, &mut seen_ranks)?);
        }

        // Ensure ranks are contiguous 1..=count.
        for rank in 1..=count {
            if !seen_ranks.contains(&rank) {
                bail!("missing rank {rank} in LLM output");
            }
        }

        leads.sort_by_key(|lead| lead.rank);
        Ok(leads)
    }
}

impl LlmLeadItem {
    fn validate_and_into_lead(
        self,
        count: i32,
        seen_ranks: &mut BTreeSet<i32>,
    ) -> anyhow::Result<LeadRecord> {
        ensure!(
            (1..=count).contains(&self.rank),
            "rank out of range: {} (expected 1..={count})",
            self.rank
        );
        ensure!(
            seen_ranks.insert(self.rank),
            "duplicate rank: {}",
            self.rank
        );

        let name = self.name.trim().to_string();
        ensure!(!name.is_empty(), "lead name must be non-empty");

        let Some(tier) = Tier::from_number(self.tier) else {
            bail!("tier must be 1, 2 or 3 (got {})", self.tier);
        };

        let rationale = self.rationale.trim().to_string();
        ensure!(!rationale.is_empty(), "rationale must be non-empty");

        let outreach_subject = self
            .outreach_subject
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let message_hook = self
            .message_hook
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(LeadRecord {
            rank: self.rank,
            name,
            tier,
            rationale,
            outreach_subject,
            message_hook,
        })
    }
}
