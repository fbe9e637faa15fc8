use crate::domain::portfolio::PlanningRequest;
use crate::domain::recommendation::RecommendationSet;
use crate::domain::report::{merge, MergedReport};
use crate::llm::error::PipelineError;
use crate::llm::{json, prompt, OracleClient};
use std::future::Future;

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub recommendations: RecommendationSet,
    pub report: MergedReport,
}

pub async fn run(
    oracle: &dyn OracleClient,
    request: &PlanningRequest,
) -> Result<RunOutput, PipelineError> {
    run_with_cancel(oracle, request, std::future::pending::<()>()).await
}

/// One sequential run. `cancel` only races the oracle call; once text is back, extraction
/// and merging always finish.
pub async fn run_with_cancel<C>(
    oracle: &dyn OracleClient,
    request: &PlanningRequest,
    cancel: C,
) -> Result<RunOutput, PipelineError>
where
    C: Future<Output = ()>,
{
    let prompt = prompt::compose(request);
    tracing::debug!(
        holdings = request.snapshot.len(),
        prompt_chars = prompt.len(),
        "composed prompt"
    );

    // Polled in order: a response that is already in beats a pending cancel.
    let raw = tokio::select! {
        biased;
        res = oracle.invoke(&prompt) => res?,
        _ = cancel => {
            tracing::warn!(provider = %oracle.provider(), "run cancelled while awaiting oracle");
            return Err(PipelineError::Cancelled);
        }
    };

    let recommendations = json::extract(&raw)?;
    let report = merge(&recommendations);
    tracing::info!(
        modifications = recommendations.modifications.len(),
        diversifiers = recommendations.diversifiers.len(),
        "reconciled oracle response"
    );

    Ok(RunOutput {
        recommendations,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::portfolio::{Holding, PortfolioSnapshot, Scalar};
    use crate::domain::report::Section;
    use crate::llm::error::ExtractStage;
    use crate::llm::Provider;
    use std::sync::Mutex;

    struct ScriptedOracle {
        response: Result<String, ()>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedOracle {
        fn answering(text: &str) -> Self {
            Self {
                response: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                response: Err(()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl OracleClient for ScriptedOracle {
        fn provider(&self) -> Provider {
            Provider::Gemini
        }

        async fn invoke(&self, prompt: &str) -> Result<String, PipelineError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.response.clone().map_err(|_| PipelineError::Oracle {
                provider: Provider::Gemini,
                stage: "http",
                detail: "status=500".to_string(),
                raw_output: None,
            })
        }
    }

    struct HangingOracle;

    #[async_trait::async_trait]
    impl OracleClient for HangingOracle {
        fn provider(&self) -> Provider {
            Provider::Anthropic
        }

        async fn invoke(&self, _prompt: &str) -> Result<String, PipelineError> {
            std::future::pending().await
        }
    }

    fn request() -> PlanningRequest {
        let snapshot = PortfolioSnapshot::new(vec![Holding::new(vec![
            ("Stock Name".to_string(), Scalar::Text("Infosys".to_string())),
            ("Quantity".to_string(), Scalar::Int(12)),
        ])]);
        PlanningRequest::try_new("Create wealth", 5, "HIGH", snapshot).unwrap()
    }

    const RESPONSE: &str = r#"Here is my analysis:
```json
{
  "current_portfolio_modifications": [
    {"stock_name": "Infosys", "stock_symbol": "INFY", "action": "Hold", "units": 12, "reason": "Core IT holding"},
    {"stock_name": "Infosys", "stock_symbol": "INFY", "action": "Buy", "units": 3, "reason": "Average down"}
  ],
  "outside_portfolio_buyables": [
    {"stock_name": "HDFC Bank", "stock_symbol": "HDFCBANK", "action": "Buy", "units": 5, "reason": "Financials exposure",}
  ]
}
```
Let me know if you need more."#;

    #[tokio::test]
    async fn runs_end_to_end() {
        let oracle = ScriptedOracle::answering(RESPONSE);
        let out = run(&oracle, &request()).await.unwrap();

        let prompts = oracle.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("\"Stock Name\":\"Infosys\""));

        assert_eq!(out.report.len(), 3);
        assert_eq!(out.report.rows[0].section, Section::CurrentPortfolio);
        assert_eq!(out.report.rows[1].reason, "Average down");
        assert_eq!(out.report.rows[2].section, Section::OutsidePortfolio);
        assert_eq!(out.report.rows[2].stock_symbol, "HDFCBANK");
    }

    #[tokio::test]
    async fn oracle_failure_surfaces_unchanged() {
        let err = run(&ScriptedOracle::failing(), &request()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Oracle { stage: "http", .. }));
    }

    #[tokio::test]
    async fn malformed_response_yields_no_report() {
        let oracle = ScriptedOracle::answering("I'd suggest buying index funds.");
        let err = run(&oracle, &request()).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MalformedResponse {
                stage: ExtractStage::DelimiterScan,
                ..
            }
        ));
        assert_eq!(err.raw_output(), Some("I'd suggest buying index funds."));
    }

    #[tokio::test]
    async fn cancel_while_waiting_on_oracle() {
        let err = run_with_cancel(&HangingOracle, &request(), async {})
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));
    }

    #[tokio::test]
    async fn late_cancel_does_not_discard_a_finished_response() {
        // Both branches are ready on the first poll.
        let oracle = ScriptedOracle::answering(RESPONSE);
        let out = run_with_cancel(&oracle, &request(), async {})
            .await
            .unwrap();
        assert_eq!(out.recommendations.len(), 3);
        assert_eq!(out.report.len(), 3);
    }
}
