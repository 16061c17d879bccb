//! # Line Item Extraction
//!
//! Turns recognized receipt lines into `(name, price)` pairs. A line becomes an
//! item when it carries an amount, matches none of the exclusion patterns and
//! looks like a product description. Prices far from the receipt total are
//! replaced by the total.

use std::sync::Arc;
use tracing::{debug, trace};

use crate::amount::{AmountBounds, AmountGrammar};
use crate::patterns::ReceiptPatterns;
use crate::receipt::ReceiptLineItem;

/// Tunables for line item extraction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineItemConfig {
    pub bounds: AmountBounds,
    pub min_line_chars: usize,
    pub max_line_chars: usize,
    pub min_name_chars: usize,
    pub max_name_chars: usize,
    /// Relative deviation from the total above which a price is corrected
    pub price_correction_ratio: f64,
}

impl Default for LineItemConfig {
    fn default() -> Self {
        Self {
            bounds: AmountBounds::default(),
            min_line_chars: 5,
            max_line_chars: 100,
            min_name_chars: 2,
            max_name_chars: 50,
            price_correction_ratio: 0.5,
        }
    }
}

/// Why a line did not become an item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRejection {
    NoAmount,
    Excluded(String),
    NotProductLike,
    InvalidName,
}

pub struct LineItemExtractor {
    patterns: Arc<ReceiptPatterns>,
    config: LineItemConfig,
}

impl LineItemExtractor {
    pub fn new(patterns: Arc<ReceiptPatterns>, config: LineItemConfig) -> Self {
        Self { patterns, config }
    }

    fn grammar(&self) -> AmountGrammar<'_> {
        AmountGrammar::new(&self.patterns, self.config.bounds)
    }

    /// Items in input line order. `reference_total` of 0 disables price correction.
    pub fn extract(&self, lines: &[String], reference_total: u64) -> Vec<ReceiptLineItem> {
        let mut items = Vec::new();
        for line in lines {
            match self.classify_line(line, reference_total) {
                Ok(item) => {
                    trace!(name = %item.name, price = item.price, "Line item accepted");
                    items.push(item);
                }
                Err(reason) => trace!(line = %line, reason = ?reason, "Line rejected"),
            }
        }
        debug!(
            lines = lines.len(),
            items = items.len(),
            "Line item extraction finished"
        );
        items
    }

    /// Run a single line through candidate selection, exclusion and naming
    pub fn classify_line(
        &self,
        line: &str,
        reference_total: u64,
    ) -> Result<ReceiptLineItem, LineRejection> {
        let line = line.trim();
        let price = self
            .grammar()
            .first_amount(line)
            .ok_or(LineRejection::NoAmount)?;

        if let Some(category) = self.patterns.exclusion_category(line) {
            return Err(LineRejection::Excluded(category.to_string()));
        }
        if !self.is_product_like(line) {
            return Err(LineRejection::NotProductLike);
        }

        let name = self.derive_name(line).ok_or(LineRejection::InvalidName)?;
        let (price, correction_applied) = self.correct_price(price, reference_total);
        Ok(ReceiptLineItem {
            name,
            price,
            correction_applied,
        })
    }

    /// Length, alphabet and fragment-shape checks on the whole line
    pub fn is_product_like(&self, line: &str) -> bool {
        let length = line.chars().count();
        if length < self.config.min_line_chars || length > self.config.max_line_chars {
            return false;
        }
        if !self.patterns.has_product_alphabet(line) {
            return false;
        }
        if !line.chars().any(char::is_alphabetic) {
            return false;
        }
        !self.patterns.is_structural_fragment(line)
    }

    /// Replace a price by the total when it deviates by more than the ratio
    pub fn correct_price(&self, price: u64, total: u64) -> (u64, bool) {
        if total == 0 {
            return (price, false);
        }
        let deviation = (price as f64 - total as f64).abs() / total as f64;
        if deviation > self.config.price_correction_ratio {
            (total, true)
        } else {
            (price, false)
        }
    }

    /// Item name with amounts, currency tokens and special characters removed
    pub fn derive_name(&self, line: &str) -> Option<String> {
        let without_amounts = self.grammar().strip_amounts(line);
        let cleaned = self.patterns.strip_decorations(&without_amounts);
        let name = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

        let length = name.chars().count();
        if length < self.config.min_name_chars || length > self.config.max_name_chars {
            return None;
        }
        if name
            .chars()
            .all(|c| c.is_ascii_punctuation() || c.is_whitespace())
        {
            return None;
        }
        Some(name)
    }
}

impl Default for LineItemExtractor {
    fn default() -> Self {
        Self::new(ReceiptPatterns::default_bank(), LineItemConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_simple_item() {
        let extractor = LineItemExtractor::default();
        let items = extractor.extract(&lines("아메리카노 4,500\n합계 4,500"), 4500);
        assert_eq!(
            items,
            vec![ReceiptLineItem {
                name: "아메리카노".to_string(),
                price: 4500,
                correction_applied: false,
            }]
        );
    }

    #[test]
    fn test_price_correction() {
        let extractor = LineItemExtractor::default();
        let item = extractor.classify_line("불고기 정식 3,100", 31000).unwrap();
        assert_eq!(item.price, 31000);
        assert!(item.correction_applied);

        let item = extractor.classify_line("불고기 정식 20,000", 31000).unwrap();
        assert_eq!(item.price, 20000);
        assert!(!item.correction_applied);
    }

    #[test]
    fn test_no_correction_without_total() {
        let extractor = LineItemExtractor::default();
        assert_eq!(extractor.correct_price(3100, 0), (3100, false));
    }

    #[test]
    fn test_rejections() {
        let extractor = LineItemExtractor::default();
        assert_eq!(
            extractor.classify_line("감사합니다", 0),
            Err(LineRejection::NoAmount)
        );
        assert!(matches!(
            extractor.classify_line("부가세 1,000", 0),
            Err(LineRejection::Excluded(_))
        ));
        assert_eq!(
            extractor.classify_line("Latte Large 5,000", 0),
            Err(LineRejection::NotProductLike)
        );
    }

    #[test]
    fn test_price_outside_bounds_is_not_an_item() {
        let extractor = LineItemExtractor::default();
        assert_eq!(
            extractor.classify_line("냉장고 1400000", 1_000_000),
            Err(LineRejection::NoAmount)
        );
        let item = extractor.classify_line("냉장고 1,000,000", 1_000_000).unwrap();
        assert_eq!(item.price, 1_000_000);
    }

    #[test]
    fn test_short_korean_names_survive() {
        let extractor = LineItemExtractor::default();
        let item = extractor.classify_line("커피 3,000원", 0).unwrap();
        assert_eq!(item.name, "커피");
        assert_eq!(item.price, 3000);
    }

    #[test]
    fn test_name_cleanup() {
        let extractor = LineItemExtractor::default();
        assert_eq!(
            extractor.derive_name("*냉면  세트*   ₩12,000").as_deref(),
            Some("냉면 세트")
        );
        assert_eq!(extractor.derive_name("# 12,000"), None);
    }
}
