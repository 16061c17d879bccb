//! # Total Amount Extraction
//!
//! Picks the receipt total from recognized lines using an ordered list of
//! tiers. The first tier that yields a candidate wins:
//!
//! 1. [`KeywordTier`]: the first line carrying a total keyword, its largest amount
//! 2. [`FrequencyTier`]: the most frequent in-bounds comma-grouped amount, ties
//!    go to the larger value
//! 3. [`FallbackTier`]: the largest amount anywhere in the text

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::amount::{isolated_values, AmountBounds, AmountGrammar};
use crate::patterns::ReceiptPatterns;
use crate::receipt::{AmountCandidate, StrategyTier};

/// Shared inputs for every tier
pub struct TierContext<'a> {
    pub patterns: &'a ReceiptPatterns,
    pub bounds: AmountBounds,
}

impl<'a> TierContext<'a> {
    fn grammar(&self) -> AmountGrammar<'a> {
        AmountGrammar::new(self.patterns, self.bounds)
    }
}

/// One strategy for finding the receipt total
pub trait AmountTier: Send + Sync {
    fn tier(&self) -> StrategyTier;

    fn find(&self, lines: &[String], ctx: &TierContext<'_>) -> Option<AmountCandidate>;
}

/// Total taken from the first keyword line.
///
/// A keyword line without an amount ends this tier; later keyword lines are not
/// consulted.
pub struct KeywordTier;

impl AmountTier for KeywordTier {
    fn tier(&self) -> StrategyTier {
        StrategyTier::Keyword
    }

    fn find(&self, lines: &[String], ctx: &TierContext<'_>) -> Option<AmountCandidate> {
        let line = lines
            .iter()
            .find(|line| ctx.patterns.is_total_keyword_line(line))?;
        let value = ctx.grammar().max_amount(line);
        if value.is_none() {
            debug!(line = %line, "Total keyword line carries no amount");
        }
        Some(AmountCandidate {
            value: value?,
            origin_line: line.clone(),
            tier: self.tier(),
        })
    }
}

/// Frequency vote over comma-grouped amounts
pub struct FrequencyTier;

impl AmountTier for FrequencyTier {
    fn tier(&self) -> StrategyTier {
        StrategyTier::Frequency
    }

    fn find(&self, lines: &[String], ctx: &TierContext<'_>) -> Option<AmountCandidate> {
        let mut counts: HashMap<u64, usize> = HashMap::new();
        let mut first_seen: HashMap<u64, &String> = HashMap::new();

        for line in lines {
            for value in isolated_values(ctx.patterns.frequency_pattern(), line) {
                if !ctx.bounds.contains(value) {
                    continue;
                }
                *counts.entry(value).or_insert(0) += 1;
                first_seen.entry(value).or_insert(line);
            }
        }

        let (value, count) = counts
            .iter()
            .max_by(|(va, ca), (vb, cb)| ca.cmp(cb).then(va.cmp(vb)))
            .map(|(v, c)| (*v, *c))?;
        trace!(value, count, "Frequency vote winner");

        Some(AmountCandidate {
            value,
            origin_line: first_seen.get(&value).map(|l| l.to_string()).unwrap_or_default(),
            tier: self.tier(),
        })
    }
}

/// Largest amount anywhere in the text
pub struct FallbackTier;

impl AmountTier for FallbackTier {
    fn tier(&self) -> StrategyTier {
        StrategyTier::Fallback
    }

    fn find(&self, lines: &[String], ctx: &TierContext<'_>) -> Option<AmountCandidate> {
        let grammar = ctx.grammar();
        lines
            .iter()
            .filter_map(|line| grammar.max_amount(line).map(|value| (value, line)))
            .fold(None, |best: Option<(u64, &String)>, (value, line)| match best {
                Some((best_value, _)) if best_value >= value => best,
                _ => Some((value, line)),
            })
            .map(|(value, line)| AmountCandidate {
                value,
                origin_line: line.clone(),
                tier: self.tier(),
            })
    }
}

/// Runs the tiers in order over a set of lines
pub struct TotalAmountExtractor {
    patterns: Arc<ReceiptPatterns>,
    bounds: AmountBounds,
    tiers: Vec<Box<dyn AmountTier>>,
}

impl TotalAmountExtractor {
    pub fn new(patterns: Arc<ReceiptPatterns>, bounds: AmountBounds) -> Self {
        Self::with_tiers(
            patterns,
            bounds,
            vec![
                Box::new(KeywordTier),
                Box::new(FrequencyTier),
                Box::new(FallbackTier),
            ],
        )
    }

    pub fn with_tiers(
        patterns: Arc<ReceiptPatterns>,
        bounds: AmountBounds,
        tiers: Vec<Box<dyn AmountTier>>,
    ) -> Self {
        Self {
            patterns,
            bounds,
            tiers,
        }
    }

    /// Winning candidate, if any tier found one
    pub fn extract(&self, lines: &[String]) -> Option<AmountCandidate> {
        let ctx = TierContext {
            patterns: &self.patterns,
            bounds: self.bounds,
        };
        for tier in &self.tiers {
            if let Some(candidate) = tier.find(lines, &ctx) {
                debug!(
                    tier = candidate.tier.as_str(),
                    total = candidate.value,
                    line = %candidate.origin_line,
                    "Total amount selected"
                );
                return Some(candidate);
            }
            trace!(tier = tier.tier().as_str(), "Tier produced no candidate");
        }
        None
    }

    /// Total for free text, 0 when nothing qualifies
    pub fn extract_total(&self, text: &str) -> u64 {
        let lines: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        self.extract(&lines).map(|c| c.value).unwrap_or(0)
    }
}

impl Default for TotalAmountExtractor {
    fn default() -> Self {
        Self::new(ReceiptPatterns::default_bank(), AmountBounds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_keyword_tier_takes_max_on_first_keyword_line() {
        let extractor = TotalAmountExtractor::default();
        let candidate = extractor
            .extract(&lines("김밥 3,000\n합계 3,000 31,000\n총액 40,000"))
            .unwrap();
        assert_eq!(candidate.value, 31000);
        assert_eq!(candidate.tier, StrategyTier::Keyword);
    }

    #[test]
    fn test_keyword_line_without_amount_falls_through() {
        let extractor = TotalAmountExtractor::default();
        let candidate = extractor
            .extract(&lines("합계\n라면 4,000\n김밥 4,000\n생수 1,500"))
            .unwrap();
        assert_eq!(candidate.tier, StrategyTier::Frequency);
        assert_eq!(candidate.value, 4000);
    }

    #[test]
    fn test_frequency_tie_goes_to_larger_value() {
        let extractor = TotalAmountExtractor::default();
        let total = extractor.extract_total("12,000\n15,000\n12,000\n15,000");
        assert_eq!(total, 15000);
    }

    #[test]
    fn test_frequency_skips_out_of_bounds_values() {
        let extractor = TotalAmountExtractor::default();
        let total = extractor.extract_total("2,000,000\n2,000,000\n라면 4,000");
        assert_eq!(total, 4000);
    }

    #[test]
    fn test_fallback_uses_global_max() {
        let extractor = TotalAmountExtractor::default();
        let candidate = extractor.extract(&lines("라면 4500\n김밥 3500")).unwrap();
        assert_eq!(candidate.tier, StrategyTier::Fallback);
        assert_eq!(candidate.value, 4500);
    }

    #[test]
    fn test_no_amount_yields_zero() {
        let extractor = TotalAmountExtractor::default();
        assert_eq!(extractor.extract_total("감사합니다\nTEL 010-1234-5678"), 0);
        assert_eq!(extractor.extract_total(""), 0);
    }

    #[test]
    fn test_custom_tier_order() {
        let extractor = TotalAmountExtractor::with_tiers(
            ReceiptPatterns::default_bank(),
            AmountBounds::default(),
            vec![Box::new(FallbackTier)],
        );
        assert_eq!(extractor.extract_total("합계 5,000\n기타 9,000"), 9000);
    }
}
