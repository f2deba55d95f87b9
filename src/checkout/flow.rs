//! Checkout step state machine.
//!
//! Steps run `PersonalInfo -> Address -> Delivery -> Payment -> Confirmation`.
//! Moving forward requires the current step's fields to validate; moving back
//! never does. `Confirmation` is reached only through a successful payment.

use crate::checkout::payment::{PaymentError, PaymentGateway, PaymentSubmitter, Receipt};
use crate::checkout::persistence::DraftPersister;
use crate::checkout::validation::{validate_step, RuleSet, ValidationResult};
use crate::checkout::{compute_totals, CheckoutDraft, Field, PaymentMethod, Totals};
use crate::config::PricingConfig;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    PersonalInfo,
    Address,
    Delivery,
    Payment,
    Confirmation,
}

impl CheckoutStep {
    /// All steps in order.
    pub const ORDER: [CheckoutStep; 5] = [
        CheckoutStep::PersonalInfo,
        CheckoutStep::Address,
        CheckoutStep::Delivery,
        CheckoutStep::Payment,
        CheckoutStep::Confirmation,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn next(&self) -> Option<CheckoutStep> {
        Self::ORDER.get(self.index() + 1).copied()
    }

    pub fn previous(&self) -> Option<CheckoutStep> {
        self.index().checked_sub(1).map(|i| Self::ORDER[i])
    }

    pub fn title(&self) -> &'static str {
        match self {
            CheckoutStep::PersonalInfo => "Personal Information",
            CheckoutStep::Address => "Address",
            CheckoutStep::Delivery => "Delivery",
            CheckoutStep::Payment => "Payment",
            CheckoutStep::Confirmation => "Confirmation",
        }
    }

    /// Fields this step validates. The payment step only asks for card
    /// details when paying by card.
    pub fn fields(&self, method: Option<PaymentMethod>) -> &'static [Field] {
        match self {
            CheckoutStep::PersonalInfo => &[Field::FullName, Field::Email, Field::Phone],
            CheckoutStep::Address => &[Field::Address, Field::City, Field::ZipCode, Field::Country],
            CheckoutStep::Delivery => &[Field::DeliveryMethod],
            CheckoutStep::Payment => match method {
                Some(PaymentMethod::Card) => &[
                    Field::SelectedMethod,
                    Field::CardNumber,
                    Field::ExpiryDate,
                    Field::Cvv,
                    Field::CardholderName,
                ],
                _ => &[Field::SelectedMethod],
            },
            CheckoutStep::Confirmation => &[],
        }
    }
}

/// Result of asking the flow to move forward.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    /// Validation passed and the flow moved to this step
    Moved(CheckoutStep),
    /// Validation failed; the step is unchanged
    Blocked(ValidationResult),
    /// The payment step validated; submit payment with [`CheckoutFlow::place_order`]
    ReadyForPayment,
    /// Already at confirmation
    Complete,
}

/// Drives one checkout session.
pub struct CheckoutFlow {
    step: CheckoutStep,
    draft: CheckoutDraft,
    errors: ValidationResult,
    subtotal: f64,
    pricing: PricingConfig,
    rules: Arc<dyn RuleSet>,
    persister: Option<Arc<DraftPersister>>,
}

impl std::fmt::Debug for CheckoutFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutFlow")
            .field("step", &self.step)
            .field("draft", &self.draft)
            .field("errors", &self.errors)
            .field("subtotal", &self.subtotal)
            .finish_non_exhaustive()
    }
}

impl CheckoutFlow {
    pub fn new(rules: Arc<dyn RuleSet>, pricing: PricingConfig, subtotal: f64) -> Self {
        Self {
            step: CheckoutStep::PersonalInfo,
            draft: CheckoutDraft::new(),
            errors: ValidationResult::default(),
            subtotal,
            pricing,
            rules,
            persister: None,
        }
    }

    /// Persist edits through `persister` and restore its stored draft.
    ///
    /// Inside a Tokio runtime edits are written after the debounce window;
    /// outside one each edit is written immediately.
    pub fn with_persister(mut self, persister: Arc<DraftPersister>) -> Self {
        self.draft = persister.load();
        self.persister = Some(persister);
        self
    }

    pub fn current_step(&self) -> CheckoutStep {
        self.step
    }

    pub fn draft(&self) -> &CheckoutDraft {
        &self.draft
    }

    /// Errors from the most recent blocked advance, minus fields edited since.
    pub fn errors(&self) -> &ValidationResult {
        &self.errors
    }

    pub fn totals(&self) -> Totals {
        compute_totals(self.subtotal, &self.pricing)
    }

    /// Record an edit. Clears that field's stale error and schedules a
    /// debounced draft write.
    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        self.draft.set(field, value);
        self.errors.errors.remove(&field);
        if let Some(persister) = &self.persister {
            persister.schedule(&self.draft);
        }
    }

    /// Validate any step against the current draft without moving.
    pub fn validate_step(&self, step: CheckoutStep) -> ValidationResult {
        validate_step(self.rules.as_ref(), step, &self.draft)
    }

    /// Whether the current step would pass validation right now.
    pub fn can_advance(&self) -> bool {
        self.step != CheckoutStep::Confirmation && self.validate_step(self.step).is_valid()
    }

    /// Validate the current step and move forward one step if it passes.
    pub fn advance(&mut self) -> AdvanceOutcome {
        if self.step == CheckoutStep::Confirmation {
            return AdvanceOutcome::Complete;
        }

        let result = self.validate_step(self.step);
        if !result.is_valid() {
            debug!(
                "Checkout step {:?} blocked by {} invalid field(s)",
                self.step,
                result.errors.len()
            );
            self.errors = result.clone();
            return AdvanceOutcome::Blocked(result);
        }
        self.errors = ValidationResult::default();

        if self.step == CheckoutStep::Payment {
            return AdvanceOutcome::ReadyForPayment;
        }

        // Confirmation is after Payment, so every earlier step has a successor
        let next = self.step.next().unwrap_or(self.step);
        info!("Checkout advanced {:?} -> {:?}", self.step, next);
        self.step = next;
        AdvanceOutcome::Moved(next)
    }

    /// Step back once without validating, never below the first step.
    ///
    /// Confirmation is terminal: the order is already paid and its draft
    /// cleared, so stepping back from it is a no-op.
    pub fn retreat(&mut self) -> CheckoutStep {
        if self.step != CheckoutStep::Confirmation {
            if let Some(previous) = self.step.previous() {
                self.step = previous;
                self.errors = ValidationResult::default();
            }
        }
        self.step
    }

    /// Submit payment from the payment step.
    ///
    /// On success the flow moves to confirmation and the stored draft is
    /// cleared. On failure everything entered is kept so the user can retry.
    pub async fn place_order<G: PaymentGateway>(
        &mut self,
        submitter: &PaymentSubmitter<G>,
        order_id: &str,
    ) -> Result<Receipt, PaymentError> {
        if self.step != CheckoutStep::Payment {
            return Err(PaymentError::NotAtPaymentStep(self.step));
        }
        match self.advance() {
            AdvanceOutcome::ReadyForPayment => {}
            AdvanceOutcome::Blocked(result) => return Err(PaymentError::InvalidDraft(result)),
            _ => return Err(PaymentError::NotAtPaymentStep(self.step)),
        }

        let totals = self.totals();
        let receipt = submitter.submit(&self.draft, &totals, order_id).await?;

        self.step = CheckoutStep::Confirmation;
        if let Some(persister) = &self.persister {
            persister.clear();
        }
        info!("Order {} confirmed", order_id);
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::validation::DefaultRuleSet;
    use chrono::NaiveDate;

    fn flow() -> CheckoutFlow {
        let rules = DefaultRuleSet::with_reference_date(NaiveDate::from_ymd_opt(2026, 10, 17).unwrap());
        CheckoutFlow::new(Arc::new(rules), PricingConfig::default(), 120.0)
    }

    fn fill_personal(flow: &mut CheckoutFlow) {
        flow.set_field(Field::FullName, "Jane Doe");
        flow.set_field(Field::Email, "jane@example.com");
        flow.set_field(Field::Phone, "(512) 555-0123");
    }

    fn fill_address(flow: &mut CheckoutFlow) {
        flow.set_field(Field::Address, "500 Congress Ave");
        flow.set_field(Field::City, "Austin");
        flow.set_field(Field::ZipCode, "78701");
        flow.set_field(Field::Country, "US");
    }

    #[test]
    fn test_step_order() {
        assert_eq!(CheckoutStep::PersonalInfo.next(), Some(CheckoutStep::Address));
        assert_eq!(CheckoutStep::Confirmation.next(), None);
        assert_eq!(CheckoutStep::PersonalInfo.previous(), None);
        assert_eq!(CheckoutStep::Payment.previous(), Some(CheckoutStep::Delivery));
    }

    #[test]
    fn test_step_fields_are_disjoint() {
        let mut seen = std::collections::BTreeSet::new();
        for step in CheckoutStep::ORDER {
            for field in step.fields(Some(PaymentMethod::Card)) {
                assert!(seen.insert(*field), "{:?} owned by two steps", field);
            }
        }
    }

    #[test]
    fn test_advance_blocked_on_empty_email() {
        let mut flow = flow();
        flow.set_field(Field::FullName, "Jane Doe");
        flow.set_field(Field::Phone, "(512) 555-0123");

        match flow.advance() {
            AdvanceOutcome::Blocked(result) => {
                assert_eq!(result.error(Field::Email), Some("Email is required"));
            }
            other => panic!("expected Blocked, got {:?}", other),
        }
        assert_eq!(flow.current_step(), CheckoutStep::PersonalInfo);
        assert!(flow.errors().error(Field::Email).is_some());
    }

    #[test]
    fn test_editing_field_clears_its_error() {
        let mut flow = flow();
        flow.advance();
        assert!(flow.errors().error(Field::Email).is_some());

        flow.set_field(Field::Email, "jane@example.com");
        assert!(flow.errors().error(Field::Email).is_none());
        assert!(flow.errors().error(Field::Phone).is_some());
    }

    #[test]
    fn test_advance_through_steps() {
        let mut flow = flow();
        fill_personal(&mut flow);
        assert!(flow.can_advance());
        assert_eq!(flow.advance(), AdvanceOutcome::Moved(CheckoutStep::Address));

        fill_address(&mut flow);
        assert_eq!(flow.advance(), AdvanceOutcome::Moved(CheckoutStep::Delivery));

        flow.set_field(Field::DeliveryMethod, "standard");
        assert_eq!(flow.advance(), AdvanceOutcome::Moved(CheckoutStep::Payment));

        flow.set_field(Field::SelectedMethod, "ewallet");
        assert_eq!(flow.advance(), AdvanceOutcome::ReadyForPayment);
        assert_eq!(flow.current_step(), CheckoutStep::Payment);
    }

    #[test]
    fn test_retreat_is_unconditional_and_floored() {
        let mut flow = flow();
        assert_eq!(flow.retreat(), CheckoutStep::PersonalInfo);

        fill_personal(&mut flow);
        flow.advance();
        assert_eq!(flow.current_step(), CheckoutStep::Address);

        // Address fields are empty but going back is always allowed
        assert_eq!(flow.retreat(), CheckoutStep::PersonalInfo);
    }

    #[tokio::test]
    async fn test_retreat_from_confirmation_is_noop() {
        use crate::checkout::payment::HttpPaymentGateway;
        use std::time::Duration;

        let mut flow = flow();
        fill_personal(&mut flow);
        flow.advance();
        fill_address(&mut flow);
        flow.advance();
        flow.set_field(Field::DeliveryMethod, "standard");
        flow.advance();
        flow.set_field(Field::SelectedMethod, "cash_on_delivery");

        // Simulated methods never reach the gateway
        let gateway = HttpPaymentGateway::new(reqwest::Client::new(), "http://127.0.0.1:9", None);
        let submitter = PaymentSubmitter::new(gateway, "usd", Duration::ZERO);
        flow.place_order(&submitter, "order-7").await.unwrap();

        assert_eq!(flow.current_step(), CheckoutStep::Confirmation);
        assert_eq!(flow.retreat(), CheckoutStep::Confirmation);
    }

    #[test]
    fn test_totals_use_subtotal() {
        let totals = flow().totals();
        assert_eq!(totals.shipping, 0.0);
        assert_eq!(totals.tax, 120.0 * 0.08);
    }
}
