//! Card-number checks used for display and client-side validation.

use serde::Serialize;

/// Card brand inferred from the number prefix. Display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    Visa,
    Mastercard,
    Amex,
    Discover,
    Unknown,
}

impl CardType {
    pub fn code(&self) -> &'static str {
        match self {
            CardType::Visa => "visa",
            CardType::Mastercard => "mastercard",
            CardType::Amex => "amex",
            CardType::Discover => "discover",
            CardType::Unknown => "unknown",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CardType::Visa => "Visa",
            CardType::Mastercard => "Mastercard",
            CardType::Amex => "American Express",
            CardType::Discover => "Discover",
            CardType::Unknown => "Card",
        }
    }
}

fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Luhn checksum over a card number with whitespace removed.
///
/// Numbers outside 13-19 digits, or containing anything other than digits
/// and whitespace, fail.
pub fn luhn_check(number: &str) -> bool {
    let cleaned: String = number.chars().filter(|c| !c.is_whitespace()).collect();
    if !(13..=19).contains(&cleaned.len()) || !cleaned.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }

    let sum: u32 = cleaned
        .chars()
        .rev()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, digit)| {
            if i % 2 == 1 {
                let doubled = digit * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                digit
            }
        })
        .sum();

    sum % 10 == 0
}

/// Classify a card by its leading digits.
pub fn card_type(number: &str) -> CardType {
    let digits = digits_only(number);
    let prefix = |len: usize| -> Option<u32> { digits.get(..len).and_then(|p| p.parse().ok()) };

    if digits.starts_with('4') {
        CardType::Visa
    } else if matches!(prefix(2), Some(51..=55) | Some(22..=27)) {
        CardType::Mastercard
    } else if matches!(prefix(2), Some(34) | Some(37)) {
        CardType::Amex
    } else if prefix(4) == Some(6011) || prefix(2) == Some(65) {
        CardType::Discover
    } else {
        CardType::Unknown
    }
}

/// Last four digits, for receipts and payment-method references.
pub fn last_four(number: &str) -> String {
    let digits = digits_only(number);
    let start = digits.len().saturating_sub(4);
    digits[start..].to_string()
}
