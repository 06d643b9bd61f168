//! Locale text normalisation for listing fields
//!
//! Prices arrive as `1 234 567 ₽` with regular and non-breaking spaces as
//! thousands separators. Dates arrive as `DD.MM.YYYY`.

use chrono::NaiveDate;

pub const POSTED_AT_FORMAT: &str = "%d.%m.%Y";

const RUBLE_SIGN: char = '₽';
const NO_BREAK_SPACE: char = '\u{00a0}';

/// Strip the currency sign and thousands separators and parse the rest
pub fn parse_price(text: &str) -> Option<f32> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(*c, RUBLE_SIGN | NO_BREAK_SPACE | ' '))
        .collect();

    cleaned.parse::<f32>().ok()
}

pub fn parse_posted_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), POSTED_AT_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1 234 567\u{a0}₽", 1_234_567.0)]
    #[case("  150\u{a0}000 ₽ ", 150_000.0)]
    #[case("0 ₽", 0.0)]
    #[case("99999", 99_999.0)]
    fn normalises_ruble_prices(#[case] text: &str, #[case] expected: f32) {
        assert_eq!(parse_price(text), Some(expected));
    }

    #[rstest]
    #[case("—")]
    #[case("")]
    #[case("Договорная")]
    #[case("1,5 млн ₽")]
    fn rejects_non_numeric_prices(#[case] text: &str) {
        assert_eq!(parse_price(text), None);
    }

    #[test]
    fn parses_day_first_dates() {
        assert_eq!(
            parse_posted_date("05.03.2024"),
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
        assert_eq!(
            parse_posted_date(" 31.12.2023\n"),
            NaiveDate::from_ymd_opt(2023, 12, 31)
        );
    }

    #[rstest]
    #[case("2024-03-05")]
    #[case("31.02.2024")]
    #[case("вчера")]
    #[case("")]
    fn rejects_malformed_dates(#[case] text: &str) {
        assert_eq!(parse_posted_date(text), None);
    }
}
