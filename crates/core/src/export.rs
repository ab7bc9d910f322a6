use crate::domain::lead::GenerationResult;
use crate::time::doha;
use chrono::{DateTime, FixedOffset};

/// Render the current result as a standalone markdown document.
pub fn render_markdown(result: &GenerationResult, offset: FixedOffset) -> String {
    let mut out = String::new();

    out.push_str("# CustomerFinder Results\n");
    out.push_str(&format!(
        "## Generated: {} (UTC{})\n",
        doha::format_timestamp(result.generated_at, offset),
        offset_label(offset),
    ));
    out.push_str(&format!(
        "## Market Focus: {}\n\n",
        if result.qatar_focus { "Qatar" } else { "Global" }
    ));

    out.push_str("| # | Name | Tier | Fit | Outreach Subject | Message Hook |\n");
    out.push_str("|---|------|------|-----|------------------|-------------|\n");
    for lead in &result.leads {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            lead.rank,
            cell(&lead.name),
            cell(lead.tier.label()),
            cell(&lead.rationale),
            cell(lead.outreach_subject.as_deref().unwrap_or("-")),
            cell(lead.message_hook.as_deref().unwrap_or("-")),
        ));
    }

    out.push_str(&format!(
        "\n---\nEstimated cost: {} tokens, ${:.4} USD ({:.2} QAR), model {}\n",
        result.cost.total_tokens, result.cost.usd, result.cost.qar, result.cost.model,
    ));

    out
}

pub fn export_filename(generated_at_local: DateTime<FixedOffset>) -> String {
    format!(
        "qatar_customers_{}.md",
        generated_at_local.format("%Y%m%d_%H%M%S")
    )
}

// Markdown table cells cannot hold pipes or newlines.
fn cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\n', '\r'], " ")
}

fn offset_label(offset: FixedOffset) -> String {
    let secs = offset.local_minus_utc();
    let sign = if secs < 0 { '-' } else { '+' };
    let hours = secs.abs() / 3600;
    let minutes = (secs.abs() % 3600) / 60;
    if minutes == 0 {
        format!("{sign}{hours}")
    } else {
        format!("{sign}{hours}:{minutes:02}")
    }
}
