use super::*;
use crate::domain::TokenUsage;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_cost_splits_cached_prompt_tokens() {
    let table = RateTable::default();
    let usage = TokenUsage::new(1_000_000, 400_000, 100_000);

    // 600k regular at 0.15, 400k cached at 0.075, 100k output at 0.60
    let expected = 0.09 + 0.03 + 0.06;
    assert!(approx_eq(table.cost("gpt-4o-mini", &usage), expected));
}

#[test]
fn test_cost_is_additive_across_calls() {
    let table = RateTable::default();
    let a = TokenUsage::new(12_345, 2_000, 678);
    let b = TokenUsage::new(9_876, 0, 1_234);

    let separate = table.cost("gpt-4.1", &a) + table.cost("gpt-4.1", &b);
    let mut both = a;
    both.accumulate(&b);
    let combined = table.cost("gpt-4.1", &both);
    assert!(approx_eq(separate, combined));
}

#[test]
fn test_rates_resolve_dated_and_prefixed_names() {
    let table = RateTable::default();

    assert_eq!(
        table.rates_for("openai/gpt-4o-mini-2024-07-18"),
        table.rates_for("gpt-4o-mini")
    );
    assert_eq!(table.rates_for("gpt-4.1-nano"), ModelRates::new(0.10, 0.025, 0.40));
    assert_eq!(table.rates_for("GPT-4O"), table.rates_for("gpt-4o"));
}

#[test]
fn test_unknown_model_bills_at_gpt_4o_rates() {
    let table = RateTable::default();
    assert_eq!(table.rates_for("claude-unknown"), table.rates_for("gpt-4o"));
}

#[test]
fn test_custom_rates_override() {
    let table = RateTable::default().with_rates("local-model", ModelRates::new(0.0, 0.0, 0.0));
    assert_eq!(table.cost("local-model", &TokenUsage::new(1_000, 0, 1_000)), 0.0);
}

#[tokio::test]
async fn test_mock_model_counts_calls_and_records_requests() {
    let model = MockLanguageModel::from_fn(|_, index| {
        if index == 0 {
            Err(LlmError::Timeout {
                model: "mock".to_string(),
                timeout_secs: 1,
            })
        } else {
            Ok(format!("answer {index}"))
        }
    });

    assert!(model.complete(CompletionRequest::new("sys", "one")).await.is_err());
    let completion = model.complete(CompletionRequest::new("sys", "two")).await.unwrap();

    assert_eq!(completion.text, "answer 1");
    assert_eq!(model.call_count(), 2);
    assert_eq!(model.requests()[1].user, "two");
}
