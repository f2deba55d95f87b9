//! Display formatting for checkout inputs.
//!
//! Every formatter strips non-digits, truncates to the field's maximum length
//! and re-inserts separators at fixed offsets, so partial input formats
//! progressively while the user types.

fn digits(raw: &str, max: usize) -> String {
    raw.chars().filter(char::is_ascii_digit).take(max).collect()
}

/// "4532015112830366" -> "4532 0151 1283 0366"
pub fn format_card_number(raw: &str) -> String {
    let digits = digits(raw, 19);
    digits
        .as_bytes()
        .chunks(4)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// "1225" -> "12/25"
pub fn format_expiry(raw: &str) -> String {
    let digits = digits(raw, 4);
    if digits.len() > 2 {
        format!("{}/{}", &digits[..2], &digits[2..])
    } else {
        digits
    }
}

/// "5125550123" -> "(512) 555-0123"
pub fn format_phone(raw: &str) -> String {
    let digits = digits(raw, 10);
    match digits.len() {
        0 => String::new(),
        1..=3 => format!("({}", digits),
        4..=6 => format!("({}) {}", &digits[..3], &digits[3..]),
        _ => format!("({}) {}-{}", &digits[..3], &digits[3..6], &digits[6..]),
    }
}

/// "787011234" -> "78701-1234"
pub fn format_zip(raw: &str) -> String {
    let digits = digits(raw, 9);
    if digits.len() > 5 {
        format!("{}-{}", &digits[..5], &digits[5..])
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_format_card_number() {
        assert_eq!(format_card_number("4532015112830366"), "4532 0151 1283 0366");
        assert_eq!(format_card_number("4532-0151-12"), "4532 0151 12");
        assert_eq!(format_card_number(""), "");
    }

    #[test]
    fn test_format_card_number_truncates() {
        assert_eq!(
            format_card_number("12345678901234567890123"),
            "1234 5678 9012 3456 789"
        );
    }

    #[test]
    fn test_format_expiry() {
        assert_eq!(format_expiry("1225"), "12/25");
        assert_eq!(format_expiry("12/25"), "12/25");
        assert_eq!(format_expiry("12"), "12");
        assert_eq!(format_expiry("122"), "12/2");
        assert_eq!(format_expiry("122599"), "12/25");
    }

    #[test]
    fn test_format_phone() {
        assert_eq!(format_phone("5125550123"), "(512) 555-0123");
        assert_eq!(format_phone("+1 512"), "(151) 2");
        assert_eq!(format_phone("51"), "(51");
        assert_eq!(format_phone("512555"), "(512) 555");
        assert_eq!(format_phone("abc"), "");
    }

    #[test]
    fn test_format_zip() {
        assert_eq!(format_zip("78701"), "78701");
        assert_eq!(format_zip("787011234"), "78701-1234");
        assert_eq!(format_zip("78701-1234"), "78701-1234");
    }

    proptest! {
        #[test]
        fn prop_formatters_are_idempotent(raw in "[0-9 ()/-]{0,30}") {
            let card = format_card_number(&raw);
            prop_assert_eq!(format_card_number(&card), card);
            let expiry = format_expiry(&raw);
            prop_assert_eq!(format_expiry(&expiry), expiry);
            let phone = format_phone(&raw);
            prop_assert_eq!(format_phone(&phone), phone);
            let zip = format_zip(&raw);
            prop_assert_eq!(format_zip(&zip), zip);
        }
    }
}
