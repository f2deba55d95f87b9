//! Field-level validation rules for the checkout form.
//!
//! Rules are declared per field as data ([`Rule`]) and evaluated synchronously.
//! The flow controller only sees pass/fail plus a message, through the
//! [`RuleSet`] trait, so alternative rule sets can be plugged in.

use crate::checkout::card::luhn_check;
use crate::checkout::{CheckoutDraft, CheckoutStep, DeliveryMethod, PaymentMethod};
use chrono::{Datelike, NaiveDate, Utc};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// A single checkout form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    FullName,
    Email,
    Phone,
    Address,
    City,
    ZipCode,
    Country,
    DeliveryMethod,
    CardNumber,
    ExpiryDate,
    Cvv,
    CardholderName,
    SelectedMethod,
}

impl Field {
    pub const ALL: [Field; 13] = [
        Field::FullName,
        Field::Email,
        Field::Phone,
        Field::Address,
        Field::City,
        Field::ZipCode,
        Field::Country,
        Field::DeliveryMethod,
        Field::CardNumber,
        Field::ExpiryDate,
        Field::Cvv,
        Field::CardholderName,
        Field::SelectedMethod,
    ];

    /// Look a field up by its form name (`"zipCode"`, `"city"`, ...).
    pub fn from_name(name: &str) -> Option<Field> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }

    /// Form field name as used by the storefront UI and stored drafts.
    pub fn name(&self) -> &'static str {
        match self {
            Field::FullName => "fullName",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::Address => "address",
            Field::City => "city",
            Field::ZipCode => "zipCode",
            Field::Country => "country",
            Field::DeliveryMethod => "deliveryMethod",
            Field::CardNumber => "cardNumber",
            Field::ExpiryDate => "expiryDate",
            Field::Cvv => "cvv",
            Field::CardholderName => "cardholderName",
            Field::SelectedMethod => "selectedMethod",
        }
    }

    /// Human-readable label used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Field::FullName => "Full name",
            Field::Email => "Email",
            Field::Phone => "Phone number",
            Field::Address => "Address",
            Field::City => "City",
            Field::ZipCode => "ZIP code",
            Field::Country => "Country",
            Field::DeliveryMethod => "Delivery method",
            Field::CardNumber => "Card number",
            Field::ExpiryDate => "Expiry date",
            Field::Cvv => "CVV",
            Field::CardholderName => "Cardholder name",
            Field::SelectedMethod => "Payment method",
        }
    }
}

/// Regex-checked formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Email,
    Phone,
    Zip,
    Expiry,
    Cvv,
}

impl Format {
    fn regex(&self) -> &'static Regex {
        static EMAIL: OnceLock<Regex> = OnceLock::new();
        static PHONE: OnceLock<Regex> = OnceLock::new();
        static ZIP: OnceLock<Regex> = OnceLock::new();
        static EXPIRY: OnceLock<Regex> = OnceLock::new();
        static CVV: OnceLock<Regex> = OnceLock::new();

        let (cell, pattern) = match self {
            Format::Email => (&EMAIL, r"^[^\s@]+@[^\s@]+\.[^\s@]+$"),
            Format::Phone => (&PHONE, r"^(\(\d{3}\) \d{3}-\d{4}|\d{10})$"),
            Format::Zip => (&ZIP, r"^\d{5}(-\d{4})?$"),
            Format::Expiry => (&EXPIRY, r"^(0[1-9]|1[0-2])/\d{2}$"),
            Format::Cvv => (&CVV, r"^\d{3,4}$"),
        };
        // Patterns are constants covered by tests
        cell.get_or_init(|| Regex::new(pattern).expect("validation pattern should compile"))
    }

    fn message(&self, field: Field) -> String {
        match self {
            Format::Email => "Invalid email address".to_string(),
            Format::Phone => "Phone number must be 10 digits, e.g. (512) 555-0123".to_string(),
            Format::Zip => "ZIP code must be 12345 or 12345-6789".to_string(),
            Format::Expiry => "Expiry date must be MM/YY".to_string(),
            Format::Cvv => format!("{} must be 3 or 4 digits", field.label()),
        }
    }
}

/// One declarative check on a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Required,
    MinLength(usize),
    Format(Format),
    /// 13-19 digits passing the Luhn checksum
    CardNumber,
    /// Expiry month not before the current month
    NotExpired,
    PaymentMethod,
    DeliveryMethod,
}

/// Source of pass/fail verdicts for individual fields.
pub trait RuleSet: Send + Sync {
    /// `Ok(())` when the field's current value passes, otherwise the message to show.
    fn check(&self, field: Field, draft: &CheckoutDraft) -> Result<(), String>;
}

/// Field-scoped validation errors, keyed by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub errors: BTreeMap<Field, String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&self, field: Field) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }
}

/// Validate exactly the fields `step` owns for the draft's current payment method.
pub fn validate_step(rules: &dyn RuleSet, step: CheckoutStep, draft: &CheckoutDraft) -> ValidationResult {
    let errors = step
        .fields(draft.payment_method())
        .iter()
        .filter_map(|&field| rules.check(field, draft).err().map(|msg| (field, msg)))
        .collect();
    ValidationResult { errors }
}

/// The storefront's rules.
#[derive(Debug, Clone, Default)]
pub struct DefaultRuleSet {
    /// Date used for expiry checks; `None` means today (UTC)
    reference_date: Option<NaiveDate>,
}

impl DefaultRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the date expiry checks compare against.
    pub fn with_reference_date(date: NaiveDate) -> Self {
        Self {
            reference_date: Some(date),
        }
    }

    /// Rules applied to a field, in evaluation order. The first failure wins.
    pub fn rules_for(field: Field) -> &'static [Rule] {
        match field {
            Field::FullName | Field::CardholderName => &[Rule::Required, Rule::MinLength(2)],
            Field::Email => &[Rule::Required, Rule::Format(Format::Email)],
            Field::Phone => &[Rule::Required, Rule::Format(Format::Phone)],
            Field::Address => &[Rule::Required, Rule::MinLength(5)],
            Field::City => &[Rule::Required, Rule::MinLength(2)],
            Field::ZipCode => &[Rule::Required, Rule::Format(Format::Zip)],
            Field::Country => &[Rule::Required],
            Field::DeliveryMethod => &[Rule::Required, Rule::DeliveryMethod],
            Field::CardNumber => &[Rule::Required, Rule::CardNumber],
            Field::ExpiryDate => &[
                Rule::Required,
                Rule::Format(Format::Expiry),
                Rule::NotExpired,
            ],
            Field::Cvv => &[Rule::Required, Rule::Format(Format::Cvv)],
            Field::SelectedMethod => &[Rule::Required, Rule::PaymentMethod],
        }
    }

    fn today(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| Utc::now().date_naive())
    }

    fn apply(&self, rule: Rule, field: Field, value: &str) -> Result<(), String> {
        let value = value.trim();
        match rule {
            Rule::Required if value.is_empty() => Err(format!("{} is required", field.label())),
            Rule::MinLength(min) if value.chars().count() < min => Err(format!(
                "{} must be at least {} characters",
                field.label(),
                min
            )),
            Rule::Format(format) if !format.regex().is_match(value) => Err(format.message(field)),
            Rule::CardNumber if !luhn_check(value) => Err("Invalid card number".to_string()),
            Rule::NotExpired if !self.expiry_is_current(value) => {
                Err("Card has expired".to_string())
            }
            Rule::PaymentMethod if PaymentMethod::from_code(value).is_none() => {
                Err("Select a payment method".to_string())
            }
            Rule::DeliveryMethod if DeliveryMethod::from_code(value).is_none() => {
                Err("Select a delivery method".to_string())
            }
            _ => Ok(()),
        }
    }

    /// `MM/YY` not before the reference month. Malformed input counts as expired.
    fn expiry_is_current(&self, value: &str) -> bool {
        let Some((month, year)) = value.split_once('/') else {
            return false;
        };
        let (Ok(month), Ok(year)) = (month.parse::<u32>(), year.parse::<i32>()) else {
            return false;
        };

        let today = self.today();
        (2000 + year, month) >= (today.year(), today.month())
    }
}

impl RuleSet for DefaultRuleSet {
    fn check(&self, field: Field, draft: &CheckoutDraft) -> Result<(), String> {
        let value = draft.get(field);
        Self::rules_for(field)
            .iter()
            .try_for_each(|&rule| self.apply(rule, field, value))
    }
}
