//! # Amount Grammar
//!
//! Recognizes monetary amounts in a single line of receipt text. Shapes are
//! tried in precedence order (comma-grouped, dot-grouped, space-grouped, bare
//! digits), each optionally followed by a currency token. Fully grouped forms
//! such as `1,000,000` come first so the millions are not cut at the first
//! group. A match glued to another number, directly or through `.`, `,`, `-`,
//! `/` or `:`, is rejected, so phone numbers, dates and times do not turn into
//! amounts.

use regex::{Match, Regex};

use crate::patterns::ReceiptPatterns;

pub const DEFAULT_MIN_AMOUNT: u64 = 1_000;
pub const DEFAULT_MAX_AMOUNT: u64 = 1_000_000;

/// Inclusive plausibility range for a single amount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountBounds {
    pub min: u64,
    pub max: u64,
}

impl Default for AmountBounds {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_AMOUNT,
            max: DEFAULT_MAX_AMOUNT,
        }
    }
}

impl AmountBounds {
    pub fn contains(&self, value: u64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Amount grammar bound to a compiled pattern bank
#[derive(Debug, Clone, Copy)]
pub struct AmountGrammar<'a> {
    patterns: &'a [Regex],
    bounds: AmountBounds,
}

impl<'a> AmountGrammar<'a> {
    pub fn new(patterns: &'a ReceiptPatterns, bounds: AmountBounds) -> Self {
        Self {
            patterns: patterns.amount_patterns(),
            bounds,
        }
    }

    pub fn bounds(&self) -> AmountBounds {
        self.bounds
    }

    /// In-bounds amounts on a line, ordered by pattern precedence then position,
    /// without duplicates.
    pub fn amounts_in(&self, line: &str) -> Vec<u64> {
        let mut amounts = Vec::new();
        for pattern in self.patterns {
            for value in isolated_values(pattern, line) {
                if self.bounds.contains(value) && !amounts.contains(&value) {
                    amounts.push(value);
                }
            }
        }
        amounts
    }

    /// First in-bounds amount on a line by precedence
    pub fn first_amount(&self, line: &str) -> Option<u64> {
        self.amounts_in(line).into_iter().next()
    }

    /// Largest in-bounds amount on a line
    pub fn max_amount(&self, line: &str) -> Option<u64> {
        self.amounts_in(line).into_iter().max()
    }

    /// Remove every amount-shaped span (including its currency suffix)
    pub fn strip_amounts(&self, line: &str) -> String {
        let mut stripped = line.to_string();
        for pattern in self.patterns {
            stripped = pattern.replace_all(&stripped, " ").into_owned();
        }
        stripped
    }
}

/// Numeric values of the isolated matches of `pattern` in `line`.
///
/// Uses capture group 1 when present, otherwise the whole match. Values are
/// not bounded here.
pub fn isolated_values<'l>(pattern: &'l Regex, line: &'l str) -> impl Iterator<Item = u64> + 'l {
    pattern.captures_iter(line).filter_map(move |caps| {
        let whole = caps.get(0)?;
        if !is_isolated(line, &whole) {
            return None;
        }
        let number = caps.get(1).unwrap_or(whole);
        parse_digits(number.as_str())
    })
}

/// Concatenate the digits of a token, dropping separators
pub fn parse_digits(token: &str) -> Option<u64> {
    let digits: String = token.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

fn is_isolated(line: &str, m: &Match) -> bool {
    let before: Vec<char> = line[..m.start()].chars().rev().take(2).collect();
    let after: Vec<char> = line[m.end()..].chars().take(2).collect();
    !touches_number(&before) && !touches_number(&after)
}

// `neighbours[0]` is adjacent to the match, `neighbours[1]` one step further out.
// A separator only glues the match to a number when a digit (or a card-mask
// `*`) sits beyond it, so `합계:31,000` is read while `13:45`, `010-1234` and
// `****-1234` are not.
fn touches_number(neighbours: &[char]) -> bool {
    let is_number_char = |c: &char| c.is_ascii_digit() || *c == '*';
    match neighbours.first() {
        Some(c) if is_number_char(c) => true,
        Some('.' | ',' | '-' | '/' | ':') => neighbours.get(1).is_some_and(is_number_char),
        _ => false,
    }
}
