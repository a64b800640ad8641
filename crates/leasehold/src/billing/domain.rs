use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::{Lifecycle, PaymentMethodType, PaymentStatus, SubscriptionStatus};
use crate::values::{DomainError, Money};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

entity_id!(
    /// Owner of payments, subscriptions and payment methods.
    UserId
);
entity_id!(PaymentId);
entity_id!(SubscriptionId);
entity_id!(PaymentMethodId);

/// Processing result reported by the payment gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentOutcome {
    Processing,
    Succeeded {
        #[serde(default)]
        gateway_reference: Option<String>,
    },
    Failed {
        reason: String,
    },
    Cancelled,
    Refunded {
        amount: Money,
    },
}

/// Append-only record of a charge against a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payment {
    id: PaymentId,
    user_id: UserId,
    amount: Money,
    refunded_amount: Money,
    status: PaymentStatus,
    method_type: PaymentMethodType,
    description: Option<String>,
    failure_reason: Option<String>,
    gateway_reference: Option<String>,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
}

impl Payment {
    pub fn initiate(
        user_id: UserId,
        amount: Money,
        method_type: PaymentMethodType,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if amount.is_zero() {
            return Err(DomainError::validation(
                "amount",
                "payments must be greater than zero",
            ));
        }
        let refunded_amount = Money::zero(amount.currency())?;

        Ok(Self {
            id: PaymentId::generate(),
            user_id,
            amount,
            refunded_amount,
            status: PaymentStatus::Pending,
            method_type,
            description: description
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty()),
            failure_reason: None,
            gateway_reference: None,
            created_at: now,
            processed_at: None,
        })
    }

    pub fn id(&self) -> PaymentId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn amount(&self) -> &Money {
        &self.amount
    }

    pub fn refunded_amount(&self) -> &Money {
        &self.refunded_amount
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn method_type(&self) -> PaymentMethodType {
        self.method_type
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn gateway_reference(&self) -> Option<&str> {
        self.gateway_reference.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    /// Amount still available to refund.
    pub fn refundable_amount(&self) -> Result<Money, DomainError> {
        if !self.status.is_settled() {
            return Money::zero(self.amount.currency());
        }
        self.amount.checked_sub(&self.refunded_amount)
    }

    pub fn begin_processing(&mut self) -> Result<(), DomainError> {
        self.status = self.status.transition_to(PaymentStatus::Processing)?;
        Ok(())
    }

    pub fn succeed(
        &mut self,
        gateway_reference: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let previous = self.status;
        self.status = self.status.transition_to(PaymentStatus::Succeeded)?;
        if previous != PaymentStatus::Succeeded {
            self.processed_at = Some(now);
        }
        if gateway_reference.is_some() {
            self.gateway_reference = gateway_reference;
        }
        Ok(())
    }

    pub fn fail(&mut self, reason: &str, now: DateTime<Utc>) -> Result<(), DomainError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(DomainError::validation(
                "failure_reason",
                "a failed payment needs a reason",
            ));
        }
        let previous = self.status;
        self.status = self.status.transition_to(PaymentStatus::Failed)?;
        if previous != PaymentStatus::Failed {
            self.failure_reason = Some(reason.to_string());
            self.processed_at = Some(now);
        }
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        let previous = self.status;
        self.status = self.status.transition_to(PaymentStatus::Cancelled)?;
        if previous != PaymentStatus::Cancelled {
            self.processed_at = Some(now);
        }
        Ok(())
    }

    /// Refund part or all of a settled payment.
    pub fn refund(&mut self, amount: &Money) -> Result<(), DomainError> {
        if amount.is_zero() {
            return Err(DomainError::validation(
                "refund",
                "refund amount must be greater than zero",
            ));
        }
        let refunded = self.refunded_amount.checked_add(amount)?;
        if refunded.amount() > self.amount.amount() {
            return Err(DomainError::InvalidOperation(format!(
                "refund of {amount} exceeds remaining {}",
                self.refundable_amount()?
            )));
        }

        let target = if refunded.amount() == self.amount.amount() {
            PaymentStatus::Refunded
        } else {
            PaymentStatus::PartiallyRefunded
        };
        self.status = self.status.transition_to(target)?;
        self.refunded_amount = refunded;
        Ok(())
    }

    pub fn apply(&mut self, outcome: PaymentOutcome, now: DateTime<Utc>) -> Result<(), DomainError> {
        match outcome {
            PaymentOutcome::Processing => self.begin_processing(),
            PaymentOutcome::Succeeded { gateway_reference } => self.succeed(gateway_reference, now),
            PaymentOutcome::Failed { reason } => self.fail(&reason, now),
            PaymentOutcome::Cancelled => self.cancel(now),
            PaymentOutcome::Refunded { amount } => self.refund(&amount),
        }
    }
}

/// Lifecycle change delivered by the payment gateway for a subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubscriptionEvent {
    TrialStarted {
        trial_end: DateTime<Utc>,
    },
    Activated {
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    },
    Renewed {
        period_end: DateTime<Utc>,
    },
    PaymentFailed,
    MarkedUnpaid,
    Paused,
    Resumed,
    PlanChanged {
        plan_id: String,
        amount: Money,
    },
    Canceled,
    IncompleteExpired,
}

/// Recurring plan billed to a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subscription {
    id: SubscriptionId,
    user_id: UserId,
    plan_id: String,
    amount: Money,
    status: SubscriptionStatus,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    trial_start: Option<DateTime<Utc>>,
    trial_end: Option<DateTime<Utc>>,
    canceled_at: Option<DateTime<Utc>>,
    gateway_reference: Option<String>,
    created_at: DateTime<Utc>,
}

impl Subscription {
    pub fn new(
        user_id: UserId,
        plan_id: &str,
        amount: Money,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            id: SubscriptionId::generate(),
            user_id,
            plan_id: validate_plan_id(plan_id)?,
            amount,
            status: SubscriptionStatus::Incomplete,
            current_period_start: None,
            current_period_end: None,
            trial_start: None,
            trial_end: None,
            canceled_at: None,
            gateway_reference: None,
            created_at: now,
        })
    }

    pub fn with_gateway_reference(mut self, reference: impl Into<String>) -> Self {
        self.gateway_reference = Some(reference.into());
        self
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn plan_id(&self) -> &str {
        &self.plan_id
    }

    pub fn amount(&self) -> &Money {
        &self.amount
    }

    pub fn status(&self) -> SubscriptionStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn current_period_start(&self) -> Option<DateTime<Utc>> {
        self.current_period_start
    }

    pub fn current_period_end(&self) -> Option<DateTime<Utc>> {
        self.current_period_end
    }

    pub fn trial_start(&self) -> Option<DateTime<Utc>> {
        self.trial_start
    }

    pub fn trial_end(&self) -> Option<DateTime<Utc>> {
        self.trial_end
    }

    pub fn canceled_at(&self) -> Option<DateTime<Utc>> {
        self.canceled_at
    }

    pub fn gateway_reference(&self) -> Option<&str> {
        self.gateway_reference.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn start_trial(
        &mut self,
        trial_end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.status == SubscriptionStatus::Trialing {
            return Ok(());
        }
        ensure_window("trial", now, trial_end)?;
        self.status = self.status.transition_to(SubscriptionStatus::Trialing)?;
        self.trial_start = Some(now);
        self.trial_end = Some(trial_end);
        Ok(())
    }

    pub fn activate(
        &mut self,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.status == SubscriptionStatus::Active {
            return Ok(());
        }
        ensure_window("billing period", period_start, period_end)?;
        self.status = self.status.transition_to(SubscriptionStatus::Active)?;
        self.current_period_start = Some(period_start);
        self.current_period_end = Some(period_end);
        Ok(())
    }

    /// Roll the billing period forward after a successful renewal charge.
    pub fn renew(&mut self, period_end: DateTime<Utc>) -> Result<(), DomainError> {
        if !matches!(
            self.status,
            SubscriptionStatus::Active | SubscriptionStatus::PastDue
        ) {
            return Err(DomainError::InvalidOperation(format!(
                "cannot renew a {} subscription",
                self.status.label()
            )));
        }
        let period_start = self.current_period_end.unwrap_or(self.created_at);
        ensure_window("billing period", period_start, period_end)?;
        self.status = self.status.transition_to(SubscriptionStatus::Active)?;
        self.current_period_start = Some(period_start);
        self.current_period_end = Some(period_end);
        Ok(())
    }

    pub fn mark_past_due(&mut self) -> Result<(), DomainError> {
        self.status = self.status.transition_to(SubscriptionStatus::PastDue)?;
        Ok(())
    }

    pub fn mark_unpaid(&mut self) -> Result<(), DomainError> {
        self.status = self.status.transition_to(SubscriptionStatus::Unpaid)?;
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), DomainError> {
        self.status = self.status.transition_to(SubscriptionStatus::Paused)?;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), DomainError> {
        if self.status != SubscriptionStatus::Paused {
            return Err(DomainError::InvalidOperation(format!(
                "only paused subscriptions can resume (currently {})",
                self.status.label()
            )));
        }
        self.status = self.status.transition_to(SubscriptionStatus::Active)?;
        Ok(())
    }

    pub fn change_plan(&mut self, plan_id: &str, amount: Money) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::InvalidOperation(format!(
                "cannot change the plan of a {} subscription",
                self.status.label()
            )));
        }
        if amount.currency() != self.amount.currency() {
            return Err(DomainError::InvalidOperation(format!(
                "plan price in {} does not match subscription currency {}",
                amount.currency(),
                self.amount.currency()
            )));
        }
        self.plan_id = validate_plan_id(plan_id)?;
        self.amount = amount;
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        let previous = self.status;
        self.status = self.status.transition_to(SubscriptionStatus::Canceled)?;
        if previous != SubscriptionStatus::Canceled {
            self.canceled_at = Some(now);
        }
        Ok(())
    }

    pub fn expire_incomplete(&mut self) -> Result<(), DomainError> {
        self.status = self
            .status
            .transition_to(SubscriptionStatus::IncompleteExpired)?;
        Ok(())
    }

    pub fn apply(
        &mut self,
        event: SubscriptionEvent,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        match event {
            SubscriptionEvent::TrialStarted { trial_end } => self.start_trial(trial_end, now),
            SubscriptionEvent::Activated {
                period_start,
                period_end,
            } => self.activate(period_start, period_end),
            SubscriptionEvent::Renewed { period_end } => self.renew(period_end),
            SubscriptionEvent::PaymentFailed => self.mark_past_due(),
            SubscriptionEvent::MarkedUnpaid => self.mark_unpaid(),
            SubscriptionEvent::Paused => self.pause(),
            SubscriptionEvent::Resumed => self.resume(),
            SubscriptionEvent::PlanChanged { plan_id, amount } => {
                self.change_plan(&plan_id, amount)
            }
            SubscriptionEvent::Canceled => self.cancel(now),
            SubscriptionEvent::IncompleteExpired => self.expire_incomplete(),
        }
    }
}

fn validate_plan_id(plan_id: &str) -> Result<String, DomainError> {
    let plan_id = plan_id.trim();
    if plan_id.is_empty() {
        return Err(DomainError::validation("plan_id", "must not be empty"));
    }
    if !plan_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(DomainError::validation(
            "plan_id",
            "only letters, digits, '-' and '_' are allowed",
        ));
    }
    Ok(plan_id.to_string())
}

fn ensure_window(
    field: &'static str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<(), DomainError> {
    if end <= start {
        return Err(DomainError::validation(
            field,
            format!("end {end} must be after start {start}"),
        ));
    }
    Ok(())
}

/// Card expiry month/year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardExpiry {
    pub month: u8,
    pub year: u16,
}

impl CardExpiry {
    pub fn new(month: u8, year: u16) -> Result<Self, DomainError> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::validation(
                "expiry_month",
                format!("{month} is not between 1 and 12"),
            ));
        }
        Ok(Self { month, year })
    }
}

/// Stored instrument a user can pay with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentMethod {
    id: PaymentMethodId,
    user_id: UserId,
    method_type: PaymentMethodType,
    last_four: String,
    brand: Option<String>,
    expiry: Option<CardExpiry>,
    is_default: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PaymentMethod {
    pub fn new(
        user_id: UserId,
        method_type: PaymentMethodType,
        last_four: &str,
        brand: Option<String>,
        expiry: Option<CardExpiry>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let last_four = last_four.trim();
        if last_four.len() != 4 || !last_four.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::validation(
                "last_four",
                "must be exactly four digits",
            ));
        }

        Ok(Self {
            id: PaymentMethodId::generate(),
            user_id,
            method_type,
            last_four: last_four.to_string(),
            brand: brand
                .map(|brand| brand.trim().to_string())
                .filter(|brand| !brand.is_empty()),
            expiry,
            is_default: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> PaymentMethodId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn method_type(&self) -> PaymentMethodType {
        self.method_type
    }

    pub fn last_four(&self) -> &str {
        &self.last_four
    }

    pub fn brand(&self) -> Option<&str> {
        self.brand.as_deref()
    }

    pub fn expiry(&self) -> Option<CardExpiry> {
        self.expiry
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Human readable label such as "Visa ending in 4242".
    pub fn display_name(&self) -> String {
        let label = self.brand.as_deref().unwrap_or(self.method_type.label());
        format!("{label} ending in {}", self.last_four)
    }

    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        if self.is_active || self.is_default {
            self.is_active = false;
            self.is_default = false;
            self.updated_at = now;
        }
    }

    pub(crate) fn mark_default(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.is_active {
            return Err(DomainError::InvalidOperation(
                "an inactive payment method cannot be the default".to_string(),
            ));
        }
        if !self.is_default {
            self.is_default = true;
            self.updated_at = now;
        }
        Ok(())
    }

    pub(crate) fn clear_default(&mut self, now: DateTime<Utc>) {
        if self.is_default {
            self.is_default = false;
            self.updated_at = now;
        }
    }
}
