//! Receipt data model shared by the extraction pipeline.

use serde::{Deserialize, Serialize};

/// Plain text recognized from one raster, split into trimmed non-empty lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecognition {
    pub full_text: String,
    pub lines: Vec<String>,
}

impl RawRecognition {
    pub fn from_text(text: &str) -> Self {
        let lines = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            full_text: text.to_string(),
            lines,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Which total-amount tier produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyTier {
    Keyword,
    Frequency,
    Fallback,
}

impl StrategyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyTier::Keyword => "keyword",
            StrategyTier::Frequency => "frequency",
            StrategyTier::Fallback => "fallback",
        }
    }
}

/// A total-amount candidate and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountCandidate {
    pub value: u64,
    pub origin_line: String,
    pub tier: StrategyTier,
}

/// A product line recovered from receipt text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLineItem {
    pub name: String,
    pub price: u64,
    /// Price was replaced by the receipt total because it deviated too far
    pub correction_applied: bool,
}

/// Outcome of extracting one recognition; a zero total means none was found
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptExtractionResult {
    pub total_amount: u64,
    pub items: Vec<ReceiptLineItem>,
}

impl ReceiptExtractionResult {
    pub fn has_total(&self) -> bool {
        self.total_amount > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_recognition_drops_blank_lines() {
        let raw = RawRecognition::from_text("  아메리카노 4,500 \n\n   \n합계 4,500\n");
        assert_eq!(raw.lines, vec!["아메리카노 4,500", "합계 4,500"]);
        assert!(!raw.is_empty());
        assert!(RawRecognition::from_text(" \n ").is_empty());
    }

    #[test]
    fn test_extraction_result_default_has_no_total() {
        let result = ReceiptExtractionResult::default();
        assert!(!result.has_total());
        assert!(result.items.is_empty());
    }
}
