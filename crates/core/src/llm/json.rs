use crate::domain::contract::{self, ContractError};
use crate::domain::recommendation::RecommendationSet;
use crate::llm::error::{ExtractStage, PipelineError};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Best-effort candidate: first '{' to last '}', inclusive. Not nesting-aware.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

fn trailing_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*\}").expect("trailing comma pattern is valid"))
}

/// The only repair applied: drop a comma sitting right before a closing brace.
pub fn strip_trailing_commas(candidate: &str) -> String {
    trailing_comma_re().replace_all(candidate, "}").into_owned()
}

/// Strict parse, then one repair pass. On failure the first parse error is returned.
fn parse_candidate(candidate: &str) -> Result<Value, serde_json::Error> {
    let first_err = match serde_json::from_str::<Value>(candidate) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };

    let repaired = strip_trailing_commas(candidate);
    match serde_json::from_str::<Value>(&repaired) {
        Ok(value) => {
            tracing::debug!(error = %first_err, "oracle JSON parsed after trailing-comma repair");
            Ok(value)
        }
        Err(_) => Err(first_err),
    }
}

/// Recovers a [`RecommendationSet`] from raw oracle text.
pub fn extract(raw_text: &str) -> Result<RecommendationSet, PipelineError> {
    let candidate = extract_json(raw_text).ok_or_else(|| {
        PipelineError::malformed(ExtractStage::DelimiterScan, "no object found", raw_text)
    })?;

    let value = parse_candidate(candidate).map_err(|e| {
        PipelineError::malformed(
            ExtractStage::Repair,
            format!("oracle did not return valid JSON: {e}"),
            raw_text,
        )
    })?;

    contract::validate_and_into_set(value).map_err(|e| {
        let stage = match e {
            ContractError::Item { .. } => ExtractStage::ItemProjection,
            _ => ExtractStage::SchemaProjection,
        };
        PipelineError::malformed(stage, e.to_string(), raw_text)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recommendation::Action;
    use serde_json::json;

    fn valid_response() -> Value {
        json!({
            "current_portfolio_modifications": [
                {
                    "stock_name": "Infosys",
                    "stock_symbol": "INFY",
                    "action": "Hold",
                    "units": 12,
                    "reason": "Steady IT exporter, \"fair\" valuation."
                },
                {
                    "stock_name": "Yes Bank",
                    "stock_symbol": "YESBANK",
                    "action": "Sell",
                    "units": null,
                    "reason": "Weak asset quality."
                }
            ],
            "outside_portfolio_buyables": [
                {
                    "stock_name": "Nippon India ETF Nifty 50 BeES",
                    "stock_symbol": "NIFTYBEES",
                    "action": "Buy",
                    "units": 30,
                    "reason": "Broad market exposure."
                }
            ]
        })
    }

    fn assert_stage(res: Result<RecommendationSet, PipelineError>, expected: ExtractStage) {
        match res {
            Err(PipelineError::MalformedResponse { stage, .. }) => assert_eq!(stage, expected),
            other => panic!("expected malformed response at {expected}, got {other:?}"),
        }
    }

    #[test]
    fn extract_json_falls_back_to_braces() {
        let s = "prefix {\"a\":1} suffix";
        assert_eq!(extract_json(s), Some("{\"a\":1}"));
    }

    #[test]
    fn extract_json_is_greedy() {
        let s = "{\"a\":1} and {\"b\":2}";
        assert_eq!(extract_json(s), Some(s));
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn well_formed_response_round_trips() {
        let body = valid_response();
        let set = extract(&body.to_string()).unwrap();

        assert_eq!(set.modifications.len(), 2);
        assert_eq!(set.diversifiers.len(), 1);

        let infy = &set.modifications[0];
        assert_eq!(infy.stock_name, "Infosys");
        assert_eq!(infy.stock_symbol, "INFY");
        assert_eq!(infy.action, Action::Hold);
        assert_eq!(infy.units, Some(12));
        assert_eq!(infy.reason, "Steady IT exporter, \"fair\" valuation.");
        assert_eq!(set.modifications[1].units, None);
        assert_eq!(set.diversifiers[0].stock_symbol, "NIFTYBEES");
    }

    #[test]
    fn prose_and_fences_around_the_object_are_ignored() {
        let body = serde_json::to_string_pretty(&valid_response()).unwrap();
        let bare = extract(&body).unwrap();

        let chatty = format!("Here is my analysis:\n{body}\nLet me know if you need more.");
        assert_eq!(extract(&chatty).unwrap(), bare);

        let fenced = format!("```json\n{body}\n```\n");
        assert_eq!(extract(&fenced).unwrap(), bare);
    }

    #[test]
    fn trailing_comma_before_brace_is_repaired() {
        let text = r#"{
  "current_portfolio_modifications": [
    {"stock_name": "ITC", "stock_symbol": "ITC", "action": "Hold", "units": 50, "reason": "Dividend yield",}
  ],
  "outside_portfolio_buyables": [],
}"#;
        let set = extract(text).unwrap();
        assert_eq!(set.modifications.len(), 1);
        assert_eq!(set.modifications[0].reason, "Dividend yield");
        assert!(set.diversifiers.is_empty());
    }

    #[test]
    fn trailing_comma_before_bracket_is_not_repaired() {
        let text = r#"{"current_portfolio_modifications": [
            {"stock_symbol": "ITC", "action": "Hold", "units": 1, "reason": "x"},
        ], "outside_portfolio_buyables": []}"#;
        assert_stage(extract(text), ExtractStage::Repair);
    }

    #[test]
    fn unrepairable_text_keeps_the_raw_response() {
        let text = "Sure! {'current_portfolio_modifications': []}";
        match extract(text) {
            Err(PipelineError::MalformedResponse {
                stage, raw_output, ..
            }) => {
                assert_eq!(stage, ExtractStage::Repair);
                assert_eq!(raw_output, text);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn text_without_braces_fails_at_delimiter_scan() {
        assert_stage(
            extract("I cannot help with that request."),
            ExtractStage::DelimiterScan,
        );
        assert_stage(extract(""), ExtractStage::DelimiterScan);
    }

    #[test]
    fn missing_buyables_key_is_not_defaulted() {
        let text = json!({ "current_portfolio_modifications": [] }).to_string();
        assert_stage(extract(&text), ExtractStage::SchemaProjection);
    }

    #[test]
    fn item_without_symbol_aborts_the_whole_set() {
        let mut body = valid_response();
        body["outside_portfolio_buyables"][0]
            .as_object_mut()
            .unwrap()
            .remove("stock_symbol");
        assert_stage(extract(&body.to_string()), ExtractStage::ItemProjection);
    }

    #[test]
    fn empty_arrays_are_a_valid_set() {
        let text = json!({
            "current_portfolio_modifications": [],
            "outside_portfolio_buyables": [],
        })
        .to_string();
        assert!(extract(&text).unwrap().is_empty());
    }
}
