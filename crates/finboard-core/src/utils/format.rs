use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

/// Format a money amount with two decimals and thousands separators,
/// e.g. `-1,234.50`.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.2}", rounded.abs());
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{}{}.{}", sign, grouped, frac)
}

/// Format a percentage with one decimal, e.g. `42.5%`
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Format a date as `Mar 01, 2024`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %d, %Y").to_string()
}

pub fn format_optional_date(date: Option<NaiveDate>, default: &str) -> String {
    date.map(format_date).unwrap_or_else(|| default.to_string())
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(Decimal::from_str("0").unwrap()), "0.00");
        assert_eq!(format_amount(Decimal::from_str("12.5").unwrap()), "12.50");
        assert_eq!(format_amount(Decimal::from_str("1234.567").unwrap()), "1,234.57");
        assert_eq!(format_amount(Decimal::from_str("-1000000").unwrap()), "-1,000,000.00");
        assert_eq!(format_amount(Decimal::from_str("999.999").unwrap()), "1,000.00");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(33.333), "33.3%");
        assert_eq!(format_percent(0.0), "0.0%");
    }

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(format_date(date), "Mar 01, 2024");
        assert_eq!(format_optional_date(None, "-"), "-");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("Café au lait", 6), "Caf...");
    }
}
