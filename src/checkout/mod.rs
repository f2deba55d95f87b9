//! Multi-step checkout: draft state, field validation, step progression,
//! debounced draft persistence and payment handoff.

pub mod card;
mod draft;
pub mod flow;
pub mod format;
pub mod payment;
pub mod persistence;
pub mod validation;

pub use card::{card_type, luhn_check, CardType};
pub use draft::{
    compute_totals, CheckoutDraft, DeliveryMethod, PaymentInfo, PaymentMethod, ShippingInfo,
    Totals,
};
pub use flow::{AdvanceOutcome, CheckoutFlow, CheckoutStep};
pub use format::{format_card_number, format_expiry, format_phone, format_zip};
pub use payment::{
    HttpPaymentGateway, PaymentError, PaymentEvent, PaymentEventKind, PaymentGateway,
    PaymentSubmitter, Receipt, SubmissionState,
};
pub use persistence::{load_draft, DraftPersister};
pub use validation::{validate_step, DefaultRuleSet, Field, RuleSet, ValidationResult};
