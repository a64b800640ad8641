use serde::{Deserialize, Serialize};

use crate::values::DomainError;

/// Transition guard shared by the payment and subscription status enums.
pub trait Lifecycle: Copy + PartialEq + Sized {
    /// Entity name used in transition errors.
    const ENTITY: &'static str;

    fn label(self) -> &'static str;

    /// Whether `target` is a legal next state. Staying put is handled by
    /// [`Lifecycle::transition_to`] and is not listed here.
    fn can_transition_to(self, target: Self) -> bool;

    fn is_terminal(self) -> bool;

    /// Move to `target`, treating a repeat of the current state as a no-op.
    fn transition_to(self, target: Self) -> Result<Self, DomainError> {
        if self == target || self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(DomainError::InvalidTransition {
                entity: Self::ENTITY,
                from: self.label(),
                to: target.label(),
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Succeeded,
    Failed,
    Cancelled,
    Refunded,
    PartiallyRefunded,
}

impl Lifecycle for PaymentStatus {
    const ENTITY: &'static str = "payment";

    fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
            Self::PartiallyRefunded => "partially_refunded",
        }
    }

    fn can_transition_to(self, target: Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            (Pending, Processing)
                | (Pending, Failed)
                | (Pending, Cancelled)
                | (Processing, Succeeded)
                | (Processing, Failed)
                | (Processing, Cancelled)
                | (Succeeded, Refunded)
                | (Succeeded, PartiallyRefunded)
                | (PartiallyRefunded, Refunded)
        )
    }

    fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Cancelled | Self::Refunded)
    }
}

impl PaymentStatus {
    /// Money has actually moved for this payment.
    pub const fn is_settled(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::PartiallyRefunded | Self::Refunded
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Incomplete,
    IncompleteExpired,
    Trialing,
    Active,
    PastDue,
    Canceled,
    Unpaid,
    Paused,
}

impl Lifecycle for SubscriptionStatus {
    const ENTITY: &'static str = "subscription";

    fn label(self) -> &'static str {
        match self {
            Self::Incomplete => "incomplete",
            Self::IncompleteExpired => "incomplete_expired",
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Unpaid => "unpaid",
            Self::Paused => "paused",
        }
    }

    fn can_transition_to(self, target: Self) -> bool {
        use SubscriptionStatus::*;
        if target == Canceled {
            return !self.is_terminal();
        }
        matches!(
            (self, target),
            (Incomplete, IncompleteExpired)
                | (Incomplete, Trialing)
                | (Incomplete, Active)
                | (Trialing, Active)
                | (Trialing, PastDue)
                | (Trialing, Paused)
                | (Active, PastDue)
                | (Active, Paused)
                | (PastDue, Active)
                | (PastDue, Unpaid)
                | (Unpaid, Active)
                | (Paused, Active)
        )
    }

    fn is_terminal(self) -> bool {
        matches!(self, Self::Canceled | Self::IncompleteExpired)
    }
}

impl SubscriptionStatus {
    /// Subscriber currently has access to the plan.
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodType {
    Card,
    BankAccount,
    DigitalWallet,
}

impl PaymentMethodType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Card => "Card",
            Self::BankAccount => "Bank account",
            Self::DigitalWallet => "Digital wallet",
        }
    }
}
