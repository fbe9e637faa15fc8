use crate::domain::contract::{DIVERSIFIERS_KEY, MODIFICATIONS_KEY};
use crate::domain::portfolio::PlanningRequest;

const PERSONA: &str = "You are a Chief Financial Planner. Your expertise lies in creating and \
managing investment portfolios to achieve specific financial goals.";

fn output_example() -> String {
    [
        "{",
        &format!("  \"{MODIFICATIONS_KEY}\": ["),
        "    {",
        "      \"stock_name\": \"Microsoft\",",
        "      \"stock_symbol\": \"MSFT\",",
        "      \"action\": \"Hold\",",
        "      \"units\": 100,",
        "      \"reason\": \"Strong long-term outlook and stable growth.\"",
        "    }",
        "  ],",
        &format!("  \"{DIVERSIFIERS_KEY}\": ["),
        "    {",
        "      \"stock_name\": \"Vanguard S&P 500 ETF\",",
        "      \"stock_symbol\": \"VOO\",",
        "      \"action\": \"Buy\",",
        "      \"units\": 50,",
        "      \"reason\": \"Provides broad market exposure for diversification.\"",
        "    }",
        "  ]",
        "}",
    ]
    .join("\n")
}

/// Renders the single prompt sent to the oracle. Pure; an empty portfolio still gets its own
/// section so the model sees it explicitly.
pub fn compose(request: &PlanningRequest) -> String {
    let portfolio = request.snapshot.records_json();
    let example = output_example();

    format!(
        r#"{PERSONA}

**User Profile & Context:**
- **Primary Goal:** {goal}
- **Investment Horizon:** {horizon} years or more.
- **Risk Tolerance:** {risk}.

- **Current Portfolio:**
{portfolio}

**Task:**
Analyze the user's current portfolio and financial goal. Provide two separate sets of recommendations.

1.  **Portfolio Modification Recommendations:**
    -   Suggest changes to the existing portfolio holdings.
    -   The output must be a JSON array of objects.
    -   Each object should have the following keys:
        -   `stock_name`: (string)
        -   `stock_symbol`: (string)
        -   `action`: (string - "Buy", "Sell", or "Hold")
        -   `units`: (integer - The number of units to buy/sell/hold. Use 'null' if not applicable)
        -   `reason`: (string - A concise explanation for the recommendation)

2.  **New Diversification Recommendations:**
    -   Suggest new stocks or ETFs to buy that are not currently in the portfolio.
    -   These should be chosen to improve diversification and align with the user's goal and risk tolerance.
    -   The output must be a JSON array of objects.
    -   Each object should have the following keys:
        -   `stock_name`: (string)
        -   `stock_symbol`: (string)
        -   `action`: (string - "Buy")
        -   `units`: (integer - The number of units to buy)
        -   `reason`: (string - A concise explanation for the recommendation)

**Output Format:**
-   **Strictly** output a single JSON object and nothing else.
-   The object must contain two keys:
    -   `{MODIFICATIONS_KEY}`: A JSON array corresponding to Task 1.
    -   `{DIVERSIFIERS_KEY}`: A JSON array corresponding to Task 2.
-   Use double quotes for all JSON strings. No trailing commas. No comments.
-   Example JSON structure:
{example}
"#,
        goal = request.goal,
        horizon = request.horizon_years,
        risk = request.risk_tolerance,
    )
}
