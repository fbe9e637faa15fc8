use crate::domain::recommendation::{Action, RecommendationItem, RecommendationSet};
use serde::Deserialize;
use serde_json::Value;

pub const MODIFICATIONS_KEY: &str = "current_portfolio_modifications";
pub const DIVERSIFIERS_KEY: &str = "outside_portfolio_buyables";

/// Wire shape of one recommendation as the model emits it. Unknown keys are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmRecommendationItem {
    #[serde(default)]
    pub stock_name: Option<String>,
    pub stock_symbol: String,
    pub action: String,
    #[serde(default)]
    pub units: Option<u64>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
    #[error("response is not a JSON object")]
    NotAnObject,

    #[error("missing key `{0}`")]
    MissingKey(&'static str),

    #[error("`{0}` is not an array")]
    NotAnArray(&'static str),

    #[error("{section}[{index}]: {detail}")]
    Item {
        section: &'static str,
        index: usize,
        detail: String,
    },
}

/// Projects a parsed response onto the two-array contract. Any violation rejects the whole
/// set; nothing is defaulted or dropped.
pub fn validate_and_into_set(value: Value) -> Result<RecommendationSet, ContractError> {
    let Value::Object(mut obj) = value else {
        return Err(ContractError::NotAnObject);
    };

    let modifications = take_array(&mut obj, MODIFICATIONS_KEY)?;
    let diversifiers = take_array(&mut obj, DIVERSIFIERS_KEY)?;

    Ok(RecommendationSet {
        modifications: project_items(modifications, MODIFICATIONS_KEY, false)?,
        diversifiers: project_items(diversifiers, DIVERSIFIERS_KEY, true)?,
    })
}

fn take_array(
    obj: &mut serde_json::Map<String, Value>,
    key: &'static str,
) -> Result<Vec<Value>, ContractError> {
    match obj.remove(key) {
        None => Err(ContractError::MissingKey(key)),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(ContractError::NotAnArray(key)),
    }
}

fn project_items(
    items: Vec<Value>,
    section: &'static str,
    buy_only: bool,
) -> Result<Vec<RecommendationItem>, ContractError> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, raw)| {
            let item_err = |detail: String| ContractError::Item {
                section,
                index,
                detail,
            };
            let item = serde_json::from_value::<LlmRecommendationItem>(raw)
                .map_err(|e| item_err(e.to_string()))?;
            item.validate_and_into_item(buy_only).map_err(item_err)
        })
        .collect()
}

impl LlmRecommendationItem {
    fn validate_and_into_item(self, buy_only: bool) -> Result<RecommendationItem, String> {
        if self.stock_symbol.trim().is_empty() {
            return Err("stock_symbol must be non-empty".to_string());
        }

        let action = self.action.parse::<Action>()?;
        if buy_only && action != Action::Buy {
            return Err(format!("diversifier action must be Buy (got {action})"));
        }

        Ok(RecommendationItem {
            stock_name: self.stock_name.unwrap_or_default(),
            stock_symbol: self.stock_symbol,
            action,
            units: self.units,
            reason: self.reason,
        })
    }
}
