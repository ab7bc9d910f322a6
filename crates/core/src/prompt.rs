use crate::domain::contract::MAX_LEADS;
use crate::domain::lead::{GenerationRequest, Tier};

pub fn system_prompt() -> String {
    [
        "You are a market validation expert specializing in corporate partnerships and startup ecosystems.",
        "Return ONLY valid JSON. Do not wrap in markdown. Do not include any extra keys.",
        "No trailing commas. No comments. Use double quotes for all JSON strings.",
        "Output schema:",
        "{",
        "  \"leads\": [",
        "    {",
        "      \"rank\": 1,",
        "      \"name\": \"Qatar Development Bank\",",
        "      \"tier\": 1,",
        "      \"rationale\": \"why this entity would be interested\",",
        "      \"outreach_subject\": \"optional subject line\",",
        "      \"message_hook\": \"optional opening sentence\"",
        "    }",
        "  ]",
        "}",
        "Rules:",
        "- leads must have exactly 10 entries, ranks 1..10 unique and contiguous",
        "- name must be a real company, corporate venture arm, or investment entity",
        "- tier must be 1, 2 or 3 and must match one of the requested tiers",
        "- rationale must name a specific reason for interest, not a platitude",
        "- outreach_subject and message_hook keys MUST be present (use null if none)",
        "- Prioritize entities with active innovation programs or startup engagement history",
    ]
    .join("\n")
}

pub fn user_prompt(request: &GenerationRequest) -> String {
    let mut out = format!(
        "The user has a business: '{}'\n\n\
Generate a list of {MAX_LEADS} potential corporate customers, partners, or investors for market validation.\n\n\
Target tiers:\n{}",
        request.description,
        tier_summary(request),
    );

    if let Some(specs) = request.extra_specs.as_deref() {
        out.push_str("\n\nRelevant specifications: ");
        out.push_str(specs);
    }

    out.push_str("\n\nOutreach principles:\n");
    out.push_str(OUTREACH_PRINCIPLES);

    if request.qatar_focus() {
        out.push_str(&qatar_context(request.align_qnv2030));
    }

    out
}

const OUTREACH_PRINCIPLES: &str = "\
- Lead with the prospect's own strategic agenda, not the product pitch
- Reference a concrete program, portfolio company, or public initiative
- Keep the first message to two sentences and one clear ask";

fn tier_summary(request: &GenerationRequest) -> String {
    let mut lines = Vec::with_capacity(request.tiers.len());
    for tier in &request.tiers {
        lines.push(format!("- {}: {}", tier.label(), tier.focus()));
    }
    lines.join("\n")
}

fn qatar_context(align_qnv2030: bool) -> String {
    let mut out = String::from("\n\nQatar Market Context:\n");

    if align_qnv2030 {
        out.push_str(
            "- Qatar National Vision 2030 alignment required\n\
- Focus on entities contributing to Qatar's economic diversification\n\
- Prioritize organizations in Qatar's knowledge economy development\n\
- Consider participants in Qatar Foundation, QSTP, or Msheireb initiatives\n\n",
        );
    }

    out.push_str(
        "- Market specifics: Doha-based or active in the Qatar market\n\
- Business culture: relationship-focused, formal initial contact preferred\n\
- Key sectors: energy, finance, real estate, tourism, technology, logistics\n\
- Regulatory: consider QFC, QFZA, or Ministry of Commerce requirements\n\
- Timing: business week is Sunday-Thursday; consider Ramadan timing",
    );

    out
}
