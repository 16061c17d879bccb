//! # Receipt Pattern Banks
//!
//! Keyword, amount and exclusion pattern banks used by the total-amount and
//! line-item extractors. The banks are plain data (`PatternBankConfig`) that can
//! be loaded from JSON and are compiled once into an immutable
//! [`ReceiptPatterns`] which is passed explicitly to the extractors.
//!
//! The built-in bank targets Korean receipts recognized with `kor+eng` hints.
//! Several exclusion patterns overlap on purpose; the bank is judged by the
//! union of what it rejects, not by any single entry.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::errors::{AppError, AppResult};

/// Environment variable naming a JSON pattern bank file
pub const PATTERNS_CONFIG_ENV: &str = "RECEIPT_PATTERNS_CONFIG_PATH";

/// A named group of exclusion regexes (e.g. "phone", "date")
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExclusionGroup {
    pub category: String,
    pub patterns: Vec<String>,
}

impl ExclusionGroup {
    fn new(category: &str, patterns: &[&str]) -> Self {
        Self {
            category: category.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Uncompiled pattern banks
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PatternBankConfig {
    /// Total/subtotal keywords, including known OCR misrecognitions, matched
    /// verbatim against whitespace-free lowercase lines
    pub total_keywords: Vec<String>,
    /// Amount grammar in precedence order; capture group 1 holds the number
    pub amount_patterns: Vec<String>,
    /// Comma-grouped shape counted by frequency voting
    pub frequency_pattern: String,
    /// Lines matching any of these never become line items
    pub exclusion_groups: Vec<ExclusionGroup>,
    /// At least one character of this class must appear in a product line
    pub product_alphabet: String,
    /// Whole-line shapes that are receipt formatting artifacts, not products
    pub structural_fragments: Vec<String>,
    /// Currency tokens removed when deriving an item name
    pub currency_tokens: Vec<String>,
    /// Special characters removed when deriving an item name
    pub special_characters: String,
}

impl Default for PatternBankConfig {
    fn default() -> Self {
        let total_keywords = [
            // canonical
            "합계", "총합계", "합계금액", "총액", "총금액", "총결제금액", "결제금액",
            "결제액", "받을금액", "받은금액", "판매금액", "판매총액", "청구금액", "소계",
            // recognition variants
            "함계", "힙계", "합게", "합겨", "헙계", "합꼐", "흡계", "할계", "종액", "총엑",
            "총금엑", "종금액", "결재금액", "걸제금액", "결제금엑", "받을금엑", "소게",
            // latin
            "total", "subtotal", "grandtotal", "t0tal", "tota1", "totai",
        ];

        let exclusion_groups = vec![
            ExclusionGroup::new(
                "summary",
                &[
                    r"합\s*계|총\s*합\s*계|총\s*액|총\s*금\s*액|소\s*계|결\s*제\s*금\s*액|결\s*제\s*액",
                    r"받\s*을\s*금\s*액|받\s*은\s*금\s*액|판\s*매\s*금\s*액|청\s*구\s*금\s*액",
                    r"함\s*계|힙\s*계|합\s*게|합\s*겨|헙\s*계|종\s*액|총\s*엑|결\s*재\s*금\s*액",
                    r"부\s*가\s*세|부가가치세|과세|면세|세\s*액|공\s*급\s*가\s*액|거\s*스\s*름|잔\s*돈|할\s*인\s*금\s*액",
                    r"(?i:\b(?:sub\s*total|total|tax|vat|amount|change)\b)",
                ],
            ),
            ExclusionGroup::new(
                "phone",
                &[
                    r"\d{2,4}\s*-\s*\d{3,4}\s*-\s*\d{4}",
                    r"\(\d{2,4}\)\s*\d{3,4}\s*-\s*\d{4}",
                    r"(?i:\b(?:tel|fax|phone)\b)|전\s*화|연\s*락\s*처",
                ],
            ),
            ExclusionGroup::new(
                "contact",
                &[
                    r"고\s*객\s*센\s*터|문\s*의|상\s*담|콜\s*센\s*터|대\s*표\s*번\s*호",
                    r"(?i:help\s*desk|customer\s*service)",
                ],
            ),
            ExclusionGroup::new(
                "date",
                &[
                    r"\d{4}\s*[-./년]\s*\d{1,2}\s*[-./월]\s*\d{1,2}",
                    r"\b\d{2}[-./]\d{1,2}[-./]\d{1,2}\b",
                    r"\d{1,2}\s*월\s*\d{1,2}\s*일",
                ],
            ),
            ExclusionGroup::new(
                "time",
                &[
                    r"\b\d{1,2}:\d{2}(?::\d{2})?\b",
                    r"(?:오전|오후|(?i:am|pm))\s*\d{1,2}\s*[:시]",
                ],
            ),
            ExclusionGroup::new("long_digits", &[r"\d{8,}"]),
            ExclusionGroup::new(
                "card",
                &[
                    r"\d{4}[-\s*]+[\d*]{2,4}[-\s*]+[\d*]{4}[-\s*]+[\d*]{3,4}",
                    r"\*{3,}",
                    r"카\s*드\s*번\s*호|승\s*인\s*번\s*호|거\s*래\s*번\s*호|(?i:card\s*no)",
                ],
            ),
            ExclusionGroup::new(
                "merchant",
                &[
                    r"가\s*맹\s*점|카\s*드\s*사|매\s*입\s*사|발\s*급\s*사|승\s*인|신\s*용\s*카\s*드|체\s*크\s*카\s*드|단\s*말\s*기",
                    r"국민카드|KB국민|신한카드|삼성카드|현대카드|롯데카드|BC카드|비씨카드|하나카드|우리카드|농협카드|NH카드|씨티카드",
                    r"카카오\s*페이|네이버\s*페이|페이코|(?i:payco)|삼성\s*페이|토스\s*페이|제로\s*페이",
                    r"(?i:\b(?:van|kicc|ksnet|nice|kis|kcp|smartro|jtnet)\b)",
                    r"영\s*수\s*증|매\s*출\s*전\s*표|거\s*래\s*명\s*세|주\s*문\s*번\s*호|담\s*당\s*자|계\s*산\s*원|(?i:\bpos\b)",
                ],
            ),
            ExclusionGroup::new(
                "address",
                &[
                    r"(?:서울|부산|대구|인천|광주|대전|울산)(?:특별시|광역시)",
                    r"세종특별자치시|경기도|강원도|강원특별자치도|충청[남북]도|전라[남북]도|전북특별자치도|경상[남북]도|제주(?:특별자치)?도",
                    r"\d+\s*번\s*[길지]|\d+\s*층\b|주\s*소\s*:",
                ],
            ),
            ExclusionGroup::new(
                "business_registration",
                &[
                    r"사\s*업\s*자|등\s*록\s*번\s*호|대\s*표\s*자|대\s*표\s*:|상\s*호\s*:|법\s*인",
                    r"\b\d{3}-\d{2}-\d{5}\b",
                ],
            ),
            ExclusionGroup::new(
                "installment_loyalty",
                &[
                    r"할\s*부|일\s*시\s*불|포\s*인\s*트|적\s*립|마\s*일\s*리\s*지|멤\s*버\s*십|쿠\s*폰",
                    r"(?i:\bpoints?\b)",
                ],
            ),
            ExclusionGroup::new(
                "structural",
                &[
                    r"^[A-Za-z0-9]{1,3}[\s:.#-]*[\d,.\s]*$",
                    r"^[^\p{L}]*$",
                ],
            ),
        ];

        Self {
            total_keywords: total_keywords.iter().map(|k| k.to_string()).collect(),
            amount_patterns: vec![
                r"(\d{1,3}(?:,\d{3}){2,})\s*(?:원|₩)?".to_string(),
                r"(\d{1,3},\d{3,})\s*(?:원|₩)?".to_string(),
                r"(\d{1,3}(?:\.\d{3}){2,})\s*(?:원|₩)?".to_string(),
                r"(\d{1,3}\.\d{3,})\s*(?:원|₩)?".to_string(),
                r"(\d{1,3}\s+\d{3,})\s*(?:원|₩)?".to_string(),
                r"(\d{4,7})\s*(?:원|₩)?".to_string(),
            ],
            frequency_pattern: r"\d{1,3}(?:,\s*\d{3,})+".to_string(),
            exclusion_groups,
            product_alphabet: r"[가-힣]".to_string(),
            structural_fragments: vec![
                r"^[A-Za-z0-9가-힣]{1,4}$".to_string(),
                r"^[가-힣A-Za-z]+\s*님$".to_string(),
            ],
            currency_tokens: vec![
                r"₩".to_string(),
                r"\\".to_string(),
                r"(?i:\bkrw\b)".to_string(),
                r"(?:^|\s)원(?:\s|$)".to_string(),
            ],
            special_characters: r#"[*#@$%^&()\[\]{}<>|~`'"!?;:=+_]"#.to_string(),
        }
    }
}

impl PatternBankConfig {
    /// Validate pattern bank contents without compiling into a `ReceiptPatterns`
    pub fn validate(&self) -> AppResult<()> {
        if self.total_keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(AppError::Config(
                "total_keywords must contain at least one keyword".to_string(),
            ));
        }
        if self.amount_patterns.is_empty() {
            return Err(AppError::Config(
                "amount_patterns cannot be empty".to_string(),
            ));
        }
        for group in &self.exclusion_groups {
            if group.category.trim().is_empty() {
                return Err(AppError::Config(
                    "exclusion group category cannot be empty".to_string(),
                ));
            }
            if group.patterns.iter().any(|p| p.trim().is_empty()) {
                return Err(AppError::Config(format!(
                    "exclusion group '{}' contains an empty pattern",
                    group.category
                )));
            }
        }
        ReceiptPatterns::compile(self).map(|_| ())
    }
}

/// Load the pattern bank from `RECEIPT_PATTERNS_CONFIG_PATH` or
/// `config/receipt_patterns.json`, falling back to the built-in bank.
pub fn load_pattern_bank_config() -> PatternBankConfig {
    let mut candidates: Vec<String> = Vec::new();
    if let Ok(path) = std::env::var(PATTERNS_CONFIG_ENV) {
        candidates.push(path);
    }
    candidates.push("config/receipt_patterns.json".to_string());

    for path in &candidates {
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<PatternBankConfig>(&content) {
                Ok(config) => {
                    info!(path = %path, "Loaded receipt pattern bank");
                    return config;
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "Failed to parse receipt pattern bank, trying next location");
                }
            },
            Err(e) => debug!(path = %path, error = %e, "Receipt pattern bank not readable"),
        }
    }

    debug!("Using built-in receipt pattern bank");
    PatternBankConfig::default()
}

/// Compiled, immutable pattern banks
#[derive(Debug)]
pub struct ReceiptPatterns {
    total_keywords: Vec<String>,
    amount_patterns: Vec<Regex>,
    frequency_pattern: Regex,
    exclusions: Vec<(String, Regex)>,
    product_alphabet: Regex,
    structural_fragments: Vec<Regex>,
    currency_tokens: Vec<Regex>,
    special_characters: Regex,
}

lazy_static! {
    static ref DEFAULT_PATTERNS: Arc<ReceiptPatterns> = Arc::new(
        ReceiptPatterns::compile(&PatternBankConfig::default())
            .expect("Built-in receipt pattern bank should compile")
    );
}

impl ReceiptPatterns {
    /// Compile a pattern bank
    pub fn compile(config: &PatternBankConfig) -> AppResult<Self> {
        let compile_all = |patterns: &[String]| -> AppResult<Vec<Regex>> {
            patterns
                .iter()
                .map(|p| Regex::new(p).map_err(AppError::from))
                .collect()
        };

        let mut exclusions = Vec::new();
        for group in &config.exclusion_groups {
            for pattern in &group.patterns {
                exclusions.push((group.category.clone(), Regex::new(pattern)?));
            }
        }

        Ok(Self {
            total_keywords: config
                .total_keywords
                .iter()
                .map(|k| normalize_keyword_text(k))
                .filter(|k| !k.is_empty())
                .collect(),
            amount_patterns: compile_all(&config.amount_patterns)?,
            frequency_pattern: Regex::new(&config.frequency_pattern)?,
            exclusions,
            product_alphabet: Regex::new(&config.product_alphabet)?,
            structural_fragments: compile_all(&config.structural_fragments)?,
            currency_tokens: compile_all(&config.currency_tokens)?,
            special_characters: Regex::new(&config.special_characters)?,
        })
    }

    /// Shared instance compiled from the built-in bank
    pub fn default_bank() -> Arc<ReceiptPatterns> {
        Arc::clone(&DEFAULT_PATTERNS)
    }

    /// Whether the line carries a total/subtotal keyword
    pub fn is_total_keyword_line(&self, line: &str) -> bool {
        let normalized = normalize_keyword_text(line);
        self.total_keywords
            .iter()
            .any(|keyword| normalized.contains(keyword.as_str()))
    }

    /// Category of the first exclusion pattern the line matches
    pub fn exclusion_category(&self, line: &str) -> Option<&str> {
        self.exclusions
            .iter()
            .find(|(_, regex)| regex.is_match(line))
            .map(|(category, _)| category.as_str())
    }

    pub fn amount_patterns(&self) -> &[Regex] {
        &self.amount_patterns
    }

    pub fn frequency_pattern(&self) -> &Regex {
        &self.frequency_pattern
    }

    pub fn has_product_alphabet(&self, line: &str) -> bool {
        self.product_alphabet.is_match(line)
    }

    pub fn is_structural_fragment(&self, line: &str) -> bool {
        self.structural_fragments.iter().any(|r| r.is_match(line))
    }

    /// Remove currency tokens and special characters
    pub fn strip_decorations(&self, text: &str) -> String {
        let mut cleaned = text.to_string();
        for token in &self.currency_tokens {
            cleaned = token.replace_all(&cleaned, " ").into_owned();
        }
        self.special_characters.replace_all(&cleaned, " ").into_owned()
    }
}

/// Lowercase and drop all whitespace, so "합 계" and "TOTAL" match "합계"/"total"
pub fn normalize_keyword_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns() -> Arc<ReceiptPatterns> {
        ReceiptPatterns::default_bank()
    }

    #[test]
    fn test_default_bank_is_valid() {
        assert!(PatternBankConfig::default().validate().is_ok());
    }

    #[test]
    fn test_keyword_lines_tolerate_spacing_and_case() {
        let p = patterns();
        assert!(p.is_total_keyword_line("합 계   31,000"));
        assert!(p.is_total_keyword_line("TOTAL 12,000"));
        assert!(p.is_total_keyword_line("힙계 5,000"));
        assert!(!p.is_total_keyword_line("아메리카노 4,500"));
    }

    #[test]
    fn test_exclusion_categories() {
        let p = patterns();
        assert_eq!(p.exclusion_category("TEL 010-1234-5678"), Some("phone"));
        assert_eq!(p.exclusion_category("2024-01-15 13:45"), Some("date"));
        assert_eq!(p.exclusion_category("승인번호 87654"), Some("card"));
        assert_eq!(p.exclusion_category("승인번호 12345678"), Some("long_digits"));
        assert_eq!(p.exclusion_category("사업자 123-45-67890"), Some("business_registration"));
        assert_eq!(p.exclusion_category("포인트 적립 1,200"), Some("installment_loyalty"));
        assert_eq!(p.exclusion_category("*** 1,000 ***"), Some("card"));
        assert_eq!(p.exclusion_category("12,000 ="), Some("structural"));
        assert_eq!(p.exclusion_category("아메리카노 4,500"), None);
        assert_eq!(p.exclusion_category("스시 우동 세트 12,000"), None);
    }

    #[test]
    fn test_structural_fragments() {
        let p = patterns();
        assert!(p.is_structural_fragment("A12"));
        assert!(p.is_structural_fragment("홍길동 님"));
        assert!(!p.is_structural_fragment("아메리카노 4,500"));
    }

    #[test]
    fn test_strip_decorations_keeps_currency_inside_words() {
        let p = patterns();
        let cleaned = p.strip_decorations("*원두커피* 원 ₩");
        assert!(cleaned.contains("원두커피"));
        assert!(!cleaned.contains('*'));
        assert!(!cleaned.contains('₩'));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let config = PatternBankConfig {
            frequency_pattern: "[unclosed".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ReceiptPatterns::compile(&config),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_pattern_bank_round_trips_through_json() {
        let config = PatternBankConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: PatternBankConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
