//! In-progress checkout form state and derived totals.

use crate::checkout::Field;
use crate::config::PricingConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Card,
    Ewallet,
    CashOnDelivery,
}

impl PaymentMethod {
    pub fn code(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Ewallet => "ewallet",
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
        }
    }

    pub fn from_code(code: &str) -> Option<PaymentMethod> {
        match code {
            "card" => Some(PaymentMethod::Card),
            "ewallet" => Some(PaymentMethod::Ewallet),
            "cash_on_delivery" | "cod" => Some(PaymentMethod::CashOnDelivery),
            _ => None,
        }
    }

    /// Only card payments go through the payment gateway.
    pub fn is_card(&self) -> bool {
        *self == PaymentMethod::Card
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    Standard,
    Express,
}

impl DeliveryMethod {
    pub fn code(&self) -> &'static str {
        match self {
            DeliveryMethod::Standard => "standard",
            DeliveryMethod::Express => "express",
        }
    }

    pub fn from_code(code: &str) -> Option<DeliveryMethod> {
        match code {
            "standard" => Some(DeliveryMethod::Standard),
            "express" => Some(DeliveryMethod::Express),
            _ => None,
        }
    }
}

/// Contact, address and delivery fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingInfo {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub zip_code: String,
    pub country: String,
    pub delivery_method: String,
}

/// Payment fields. The CVV is never written to storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentInfo {
    pub card_number: String,
    pub expiry_date: String,
    #[serde(skip_serializing)]
    pub cvv: String,
    pub cardholder_name: String,
    pub selected_method: String,
}

impl PaymentInfo {
    pub fn method(&self) -> Option<PaymentMethod> {
        PaymentMethod::from_code(&self.selected_method)
    }
}

/// Everything the checkout form has collected so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckoutDraft {
    pub shipping: ShippingInfo,
    pub payment: PaymentInfo,
}

impl CheckoutDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::FullName => &self.shipping.full_name,
            Field::Email => &self.shipping.email,
            Field::Phone => &self.shipping.phone,
            Field::Address => &self.shipping.address,
            Field::City => &self.shipping.city,
            Field::ZipCode => &self.shipping.zip_code,
            Field::Country => &self.shipping.country,
            Field::DeliveryMethod => &self.shipping.delivery_method,
            Field::CardNumber => &self.payment.card_number,
            Field::ExpiryDate => &self.payment.expiry_date,
            Field::Cvv => &self.payment.cvv,
            Field::CardholderName => &self.payment.cardholder_name,
            Field::SelectedMethod => &self.payment.selected_method,
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let slot = match field {
            Field::FullName => &mut self.shipping.full_name,
            Field::Email => &mut self.shipping.email,
            Field::Phone => &mut self.shipping.phone,
            Field::Address => &mut self.shipping.address,
            Field::City => &mut self.shipping.city,
            Field::ZipCode => &mut self.shipping.zip_code,
            Field::Country => &mut self.shipping.country,
            Field::DeliveryMethod => &mut self.shipping.delivery_method,
            Field::CardNumber => &mut self.payment.card_number,
            Field::ExpiryDate => &mut self.payment.expiry_date,
            Field::Cvv => &mut self.payment.cvv,
            Field::CardholderName => &mut self.payment.cardholder_name,
            Field::SelectedMethod => &mut self.payment.selected_method,
        };
        *slot = value.into();
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment.method()
    }
}

/// Order totals derived from the cart subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Totals {
    pub subtotal: f64,
    pub shipping: f64,
    pub tax: f64,
    pub total: f64,
}

impl Totals {
    /// Grand total in the currency's minor unit (cents).
    pub fn total_minor_units(&self) -> i64 {
        (self.total * 100.0).round() as i64
    }
}

/// Derive shipping, tax and grand total.
///
/// Shipping is free when the subtotal is strictly above the threshold.
/// Negative or non-finite inputs (subtotal, fee, rate) count as zero, so the
/// total is never negative.
pub fn compute_totals(subtotal: f64, pricing: &PricingConfig) -> Totals {
    let subtotal = non_negative(subtotal);
    let shipping = if subtotal > pricing.free_shipping_threshold {
        0.0
    } else {
        non_negative(pricing.flat_shipping_fee)
    };
    let tax = subtotal * non_negative(pricing.tax_rate);

    Totals {
        subtotal,
        shipping,
        tax,
        total: subtotal + shipping + tax,
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}
