use crate::domain::recommendation::{Action, RecommendationItem, RecommendationSet};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Section {
    #[serde(rename = "Current Portfolio")]
    CurrentPortfolio,
    #[serde(rename = "Outside Portfolio")]
    OutsidePortfolio,
}

impl Section {
    pub fn as_str(self) -> &'static str {
        match self {
            Section::CurrentPortfolio => "Current Portfolio",
            Section::OutsidePortfolio => "Outside Portfolio",
        }
    }
}

/// Flat so it serializes as one CSV record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub stock_name: String,
    pub stock_symbol: String,
    pub action: Action,
    pub units: Option<u64>,
    pub reason: String,
    pub section: Section,
}

impl ReportRow {
    fn tagged(item: &RecommendationItem, section: Section) -> Self {
        Self {
            stock_name: item.stock_name.clone(),
            stock_symbol: item.stock_symbol.clone(),
            action: item.action,
            units: item.units,
            reason: item.reason.clone(),
            section,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MergedReport {
    pub rows: Vec<ReportRow>,
}

impl MergedReport {
    pub const COLUMNS: [&'static str; 6] = [
        "stock_name",
        "stock_symbol",
        "action",
        "units",
        "reason",
        "section",
    ];

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Modifications first, then diversifiers, each in the order the oracle gave them.
pub fn merge(set: &RecommendationSet) -> MergedReport {
    let modifications = set
        .modifications
        .iter()
        .map(|item| ReportRow::tagged(item, Section::CurrentPortfolio));
    let diversifiers = set
        .diversifiers
        .iter()
        .map(|item| ReportRow::tagged(item, Section::OutsidePortfolio));

    MergedReport {
        rows: modifications.chain(diversifiers).collect(),
    }
}
