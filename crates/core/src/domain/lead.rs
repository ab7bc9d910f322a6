use crate::pricing::CostEstimate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Tier1,
    Tier2,
    Tier3,
}

impl Tier {
    pub fn number(self) -> u8 {
        match self {
            Self::Tier1 => 1,
            Self::Tier2 => 2,
            Self::Tier3 => 3,
        }
    }

    pub fn from_number(n: i64) -> Option<Self> {
        match n {
            1 => Some(Self::Tier1),
            2 => Some(Self::Tier2),
            3 => Some(Self::Tier3),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Tier1 => "Tier 1: Strategic Corporate Venture Arms",
            Self::Tier2 => "Tier 2: Value-Add Corporations",
            Self::Tier3 => "Tier 3: Angel Syndicates & Investors",
        }
    }

    pub fn focus(self) -> &'static str {
        match self {
            Self::Tier1 => "legacy-building strategic investments",
            Self::Tier2 => "commercial synergies beyond capital",
            Self::Tier3 => "growth-stage backing and market access",
        }
    }
}

/// One user submission. Normalized before fingerprinting so that whitespace
/// and tier ordering do not defeat duplicate-call suppression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub description: String,
    pub tiers: BTreeSet<Tier>,
    #[serde(default)]
    pub extra_specs: Option<String>,
    #[serde(default = "default_align_qnv2030")]
    pub align_qnv2030: bool,
}

fn default_align_qnv2030() -> bool {
    true
}

impl GenerationRequest {
    pub fn normalized(&self) -> Self {
        Self {
            description: self.description.trim().to_string(),
            tiers: self.tiers.clone(),
            extra_specs: self
                .extra_specs
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            align_qnv2030: self.align_qnv2030,
        }
    }

    pub fn qatar_focus(&self) -> bool {
        if self.align_qnv2030 {
            return true;
        }
        let desc = self.description.to_lowercase();
        desc.contains("qatar") || desc.contains("doha")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadRecord {
    pub rank: i32,
    pub name: String,
    pub tier: Tier,
    pub rationale: String,
    pub outreach_subject: Option<String>,
    pub message_hook: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub generated_at: DateTime<Utc>,
    pub qatar_focus: bool,
    pub leads: Vec<LeadRecord>,
    pub cost: CostEstimate,
}
