use serde::{Deserialize, Serialize};

/// Static exchange rate used for the QAR display amount.
pub const USD_TO_QAR: f64 = 3.64;

// Blended USD price per 1k total tokens. Models missing from the table fall
// back to the default model's row.
const PRICE_PER_1K_TOKENS_USD: &[(&str, f64)] = &[("gpt-4o-mini", 0.015), ("gpt-4o", 2.50)];
const DEFAULT_PRICE_PER_1K_TOKENS_USD: f64 = 0.015;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostEstimate {
    pub model: String,
    pub total_tokens: u32,
    pub usd: f64,
    pub qar: f64,
}

pub fn usd_to_qar_rate() -> f64 {
    std::env::var("USD_TO_QAR")
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|rate| rate.is_finite() && *rate > 0.0)
        .unwrap_or(USD_TO_QAR)
}

pub fn price_per_1k_tokens_usd(model: &str) -> f64 {
    PRICE_PER_1K_TOKENS_USD
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, price)| *price)
        .unwrap_or(DEFAULT_PRICE_PER_1K_TOKENS_USD)
}

pub fn estimate(model: &str, usage: TokenUsage, usd_to_qar: f64) -> CostEstimate {
    let usd = (f64::from(usage.total_tokens) / 1000.0) * price_per_1k_tokens_usd(model);
    let qar = usd * usd_to_qar;
    CostEstimate {
        model: model.to_string(),
        total_tokens: usage.total_tokens,
        usd: round_to(usd, 4),
        qar: round_to(qar, 2),
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(total: u32) -> TokenUsage {
        TokenUsage {
            prompt_tokens: total / 2,
            completion_tokens: total - total / 2,
            total_tokens: total,
        }
    }

    #[test]
    fn zero_usage_costs_nothing() {
        let cost = estimate("gpt-4o-mini", TokenUsage::default(), USD_TO_QAR);
        assert_eq!(cost.usd, 0.0);
        assert_eq!(cost.qar, 0.0);
        assert_eq!(cost.total_tokens, 0);
    }

    #[test]
    fn cost_scales_linearly_with_tokens() {
        let one = estimate("gpt-4o-mini", usage(1000), USD_TO_QAR);
        let three = estimate("gpt-4o-mini", usage(3000), USD_TO_QAR);
        assert!((three.usd - 3.0 * one.usd).abs() < 1e-9);
    }

    #[test]
    fn thousand_tokens_of_mini_costs_the_table_price() {
        let cost = estimate("gpt-4o-mini", usage(1000), USD_TO_QAR);
        assert!((cost.usd - 0.015).abs() < 1e-9);
        assert!((cost.qar - 0.05).abs() < 1e-9);
    }

    #[test]
    fn unknown_model_falls_back_to_default_price() {
        let known = estimate("gpt-4o-mini", usage(2000), USD_TO_QAR);
        let unknown = estimate("some-future-model", usage(2000), USD_TO_QAR);
        assert_eq!(known.usd, unknown.usd);
    }

    #[test]
    fn qar_amount_uses_given_rate() {
        let cost = estimate("gpt-4o", usage(1000), 4.0);
        assert!((cost.qar - cost.usd * 4.0).abs() < 0.01);
    }
}
