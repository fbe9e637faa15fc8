use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Buy => "Buy",
            Action::Sell => "Sell",
            Action::Hold => "Hold",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        [Action::Buy, Action::Sell, Action::Hold]
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("action must be Buy, Sell or Hold (got {s:?})"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub stock_name: String,
    pub stock_symbol: String,
    pub action: Action,
    /// `None` means the oracle gave no unit count, which is not the same as zero.
    pub units: Option<u64>,
    pub reason: String,
}

/// The two recommendation streams recovered from one oracle response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecommendationSet {
    pub modifications: Vec<RecommendationItem>,
    pub diversifiers: Vec<RecommendationItem>,
}

impl RecommendationSet {
    pub fn len(&self) -> usize {
        self.modifications.len() + self.diversifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
