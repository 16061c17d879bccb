//! # Total Amount Extraction Tests
//!
//! Tier precedence and amount grammar behaviour on realistic receipt text.

#[cfg(test)]
mod tests {
    use receipt_scanner::receipt::StrategyTier;
    use receipt_scanner::total_amount::TotalAmountExtractor;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_separator_variants_read_the_same_amount() {
        let extractor = TotalAmountExtractor::default();
        for text in [
            "합계 31,000",
            "합계 31.000",
            "합계 31 000",
            "합계 31000",
            "합계 31,000원",
            "합계 31000 ₩",
        ] {
            assert_eq!(extractor.extract_total(text), 31000, "input: {text}");
        }
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let extractor = TotalAmountExtractor::default();
        let text = "라면 4,000\n김밥 3,500\n합계 7,500";
        assert_eq!(extractor.extract_total(text), extractor.extract_total(text));
        assert_eq!(extractor.extract_total(text), 7500);
    }

    #[test]
    fn test_keyword_beats_frequency() {
        let extractor = TotalAmountExtractor::default();
        let mut text = String::from("합계 50,000\n");
        for _ in 0..10 {
            text.push_str("김밥 10,000\n");
        }

        let candidate = extractor.extract(&lines(&text)).unwrap();
        assert_eq!(candidate.value, 50000);
        assert_eq!(candidate.tier, StrategyTier::Keyword);
        assert_eq!(candidate.origin_line, "합계 50,000");
    }

    #[test]
    fn test_frequency_tie_prefers_larger_amount() {
        let extractor = TotalAmountExtractor::default();
        let text = "라면 12,000\n우동 15,000\n라면 12,000\n우동 15,000\n라면 12,000\n우동 15,000";

        let candidate = extractor.extract(&lines(text)).unwrap();
        assert_eq!(candidate.tier, StrategyTier::Frequency);
        assert_eq!(candidate.value, 15000);
    }

    #[test]
    fn test_frequency_ignores_bare_numbers() {
        let extractor = TotalAmountExtractor::default();
        let candidate = extractor
            .extract(&lines("라면 4,000\n김밥 4,000\n특선 9000"))
            .unwrap();
        assert_eq!(candidate.tier, StrategyTier::Frequency);
        assert_eq!(candidate.value, 4000);
    }

    #[test]
    fn test_small_amounts_and_phone_numbers_are_never_totals() {
        let extractor = TotalAmountExtractor::default();
        assert_eq!(extractor.extract_total("봉투 500\nTEL 010-1234-5678"), 0);
        assert_eq!(extractor.extract_total("합계 500"), 0);
    }

    #[test]
    fn test_date_digits_are_not_amounts() {
        let extractor = TotalAmountExtractor::default();
        assert_eq!(extractor.extract_total("2024.03.15\n라면 4,500"), 4500);
        assert_eq!(extractor.extract_total("2024-03-15 12:30"), 0);
    }

    #[test]
    fn test_keyword_variants_from_recognition_noise() {
        let extractor = TotalAmountExtractor::default();
        let candidate = extractor
            .extract(&lines("라면 4,000\n함 계 8,000\n라면 4,000"))
            .unwrap();
        assert_eq!(candidate.tier, StrategyTier::Keyword);
        assert_eq!(candidate.value, 8000);
    }

    #[test]
    fn test_label_colon_amount_is_read() {
        let extractor = TotalAmountExtractor::default();
        assert_eq!(extractor.extract_total("합계:31,000"), 31000);
        assert_eq!(extractor.extract_total("TOTAL:31,000"), 31000);
        assert_eq!(extractor.extract_total("합계:31000원"), 31000);
        assert_eq!(extractor.extract_total("결제금액: 31,000"), 31000);
    }

    #[test]
    fn test_times_and_masked_cards_stay_unread() {
        let extractor = TotalAmountExtractor::default();
        assert_eq!(extractor.extract_total("13:45:2024"), 0);
        assert_eq!(extractor.extract_total("****-****-****-1234"), 0);
    }

    #[test]
    fn test_upper_bound_amount_is_readable() {
        let extractor = TotalAmountExtractor::default();
        let candidate = extractor.extract(&lines("합계 1,000,000")).unwrap();
        assert_eq!(candidate.value, 1_000_000);
        assert_eq!(candidate.tier, StrategyTier::Keyword);

        assert_eq!(extractor.extract_total("1,000,000\n라면 4,000"), 1_000_000);
        assert_eq!(extractor.extract_total("합계 2,000,000"), 0);
    }
}
