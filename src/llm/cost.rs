//! Per-model token pricing.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::domain::{TicketEvaluation, TokenUsage};

const TOKENS_PER_UNIT: f64 = 1_000_000.0;

/// USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelRates {
    pub input: f64,
    pub cached_input: f64,
    pub output: f64,
}

impl ModelRates {
    pub const fn new(input: f64, cached_input: f64, output: f64) -> Self {
        Self {
            input,
            cached_input,
            output,
        }
    }

    pub fn cost(&self, usage: &TokenUsage) -> f64 {
        (usage.regular_prompt_tokens() as f64 * self.input
            + usage.cached_prompt_tokens as f64 * self.cached_input
            + usage.completion_tokens as f64 * self.output)
            / TOKENS_PER_UNIT
    }
}

const GPT_4O: ModelRates = ModelRates::new(2.50, 1.25, 10.00);

const BUILTIN_RATES: &[(&str, ModelRates)] = &[
    ("gpt-4o", GPT_4O),
    ("gpt-4o-mini", ModelRates::new(0.15, 0.075, 0.60)),
    ("gpt-4.1", ModelRates::new(2.00, 0.50, 8.00)),
    ("gpt-4.1-mini", ModelRates::new(0.40, 0.10, 1.60)),
    ("gpt-4.1-nano", ModelRates::new(0.10, 0.025, 0.40)),
    ("o4-mini", ModelRates::new(1.10, 0.275, 4.40)),
];

/// Rate lookup by model name.
///
/// Dated or provider-prefixed names (`openai/gpt-4o-mini-2024-07-18`) resolve to the
/// longest known base name they contain; unknown models bill at `gpt-4o` rates.
#[derive(Debug, Clone)]
pub struct RateTable {
    rates: HashMap<String, ModelRates>,
    fallback: ModelRates,
}

impl Default for RateTable {
    fn default() -> Self {
        Self {
            rates: BUILTIN_RATES
                .iter()
                .map(|(name, rates)| (name.to_string(), *rates))
                .collect(),
            fallback: GPT_4O,
        }
    }
}

impl RateTable {
    pub fn with_rates(mut self, model: impl Into<String>, rates: ModelRates) -> Self {
        self.rates.insert(model.into(), rates);
        self
    }

    pub fn rates_for(&self, model: &str) -> ModelRates {
        let model = model.trim().to_lowercase();
        let base = model.rsplit('/').next().unwrap_or(&model);
        if let Some(rates) = self.rates.get(base) {
            return *rates;
        }

        self.rates
            .iter()
            .filter(|(name, _)| base.starts_with(name.as_str()))
            .max_by_key(|(name, _)| name.len())
            .map(|(_, rates)| *rates)
            .unwrap_or(self.fallback)
    }

    pub fn cost(&self, model: &str, usage: &TokenUsage) -> f64 {
        self.rates_for(model).cost(usage)
    }

    /// Each model's share priced at that model's rates.
    pub fn cost_by_model(&self, usage: &BTreeMap<String, TokenUsage>) -> f64 {
        usage
            .iter()
            .map(|(model, usage)| self.cost(model, usage))
            .sum()
    }

    /// Reprices a stored record. Records without a per-model split bill
    /// everything at `model`.
    pub fn cost_of(&self, evaluation: &TicketEvaluation) -> f64 {
        if evaluation.usage_by_model.is_empty() {
            self.cost(&evaluation.model, &evaluation.usage)
        } else {
            self.cost_by_model(&evaluation.usage_by_model)
        }
    }
}
