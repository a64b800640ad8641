//! Transport shapes returned across the service boundary.
//!
//! Every projection is a plain `From<&Entity>` so mapping the same entity state
//! twice always yields the same DTO.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::domain::{
    CardExpiry, Payment, PaymentId, PaymentMethod, PaymentMethodId, Subscription,
    SubscriptionId, UserId,
};
use super::status::{PaymentMethodType, PaymentStatus, SubscriptionStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDto {
    pub id: PaymentId,
    pub user_id: UserId,
    pub amount: Decimal,
    pub currency: String,
    pub refunded_amount: Decimal,
    pub status: PaymentStatus,
    pub method_type: PaymentMethodType,
    pub description: Option<String>,
    pub failure_reason: Option<String>,
    pub gateway_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl From<&Payment> for PaymentDto {
    fn from(payment: &Payment) -> Self {
        Self {
            id: payment.id(),
            user_id: payment.user_id(),
            amount: payment.amount().amount(),
            currency: payment.amount().currency().to_string(),
            refunded_amount: payment.refunded_amount().amount(),
            status: payment.status(),
            method_type: payment.method_type(),
            description: payment.description().map(str::to_string),
            failure_reason: payment.failure_reason().map(str::to_string),
            gateway_reference: payment.gateway_reference().map(str::to_string),
            created_at: payment.created_at(),
            processed_at: payment.processed_at(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionDto {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub plan_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: SubscriptionStatus,
    pub is_active: bool,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub trial_start: Option<DateTime<Utc>>,
    pub trial_end: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Subscription> for SubscriptionDto {
    fn from(subscription: &Subscription) -> Self {
        Self {
            id: subscription.id(),
            user_id: subscription.user_id(),
            plan_id: subscription.plan_id().to_string(),
            amount: subscription.amount().amount(),
            currency: subscription.amount().currency().to_string(),
            status: subscription.status(),
            is_active: subscription.is_active(),
            current_period_start: subscription.current_period_start(),
            current_period_end: subscription.current_period_end(),
            trial_start: subscription.trial_start(),
            trial_end: subscription.trial_end(),
            canceled_at: subscription.canceled_at(),
            created_at: subscription.created_at(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethodDto {
    pub id: PaymentMethodId,
    pub user_id: UserId,
    pub method_type: PaymentMethodType,
    pub last_four: String,
    pub brand: Option<String>,
    pub display_name: String,
    pub expiry: Option<CardExpiry>,
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&PaymentMethod> for PaymentMethodDto {
    fn from(method: &PaymentMethod) -> Self {
        Self {
            id: method.id(),
            user_id: method.user_id(),
            method_type: method.method_type(),
            last_four: method.last_four().to_string(),
            brand: method.brand().map(str::to_string),
            display_name: method.display_name(),
            expiry: method.expiry(),
            is_default: method.is_default(),
            is_active: method.is_active(),
            created_at: method.created_at(),
            updated_at: method.updated_at(),
        }
    }
}

/// Body of `POST /api/v1/payments`. A missing currency falls back to the configured default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
    pub user_id: UserId,
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    pub method_type: PaymentMethodType,
    #[serde(default)]
    pub description: Option<String>,
}

/// Body of `POST /api/v1/subscriptions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub user_id: UserId,
    pub plan_id: String,
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub trial_days: Option<u32>,
    #[serde(default)]
    pub gateway_reference: Option<String>,
}

/// Body of `POST /api/v1/payment-methods`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddPaymentMethodRequest {
    pub user_id: UserId,
    pub method_type: PaymentMethodType,
    pub last_four: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub expiry_month: Option<u8>,
    #[serde(default)]
    pub expiry_year: Option<u16>,
    #[serde(default)]
    pub make_default: bool,
}
