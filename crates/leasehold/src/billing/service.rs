use std::cmp::Reverse;
use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{debug, info, warn};

use super::domain::{
    CardExpiry, Payment, PaymentId, PaymentMethod, PaymentMethodId, PaymentOutcome,
    Subscription, SubscriptionEvent, SubscriptionId, UserId,
};
use super::dto::{
    AddPaymentMethodRequest, CreatePaymentRequest, CreateSubscriptionRequest, PaymentDto,
    PaymentMethodDto, SubscriptionDto,
};
use super::repository::{BillingRepository, RepositoryError};
use super::status::{Lifecycle, PaymentStatus, SubscriptionStatus};
use crate::config::{BillingConfig, PaginationConfig};
use crate::jobs::{QueueError, TaskKind, TaskQueue};
use crate::pagination::{PageParams, PageRequest, PaginatedResult};
use crate::values::{DomainError, Money};

/// Service composing the billing repository, the task queue, and billing defaults.
pub struct BillingService<R, Q> {
    repository: Arc<R>,
    queue: Arc<Q>,
    billing: BillingConfig,
    pagination: PaginationConfig,
}

impl<R, Q> BillingService<R, Q>
where
    R: BillingRepository + 'static,
    Q: TaskQueue + 'static,
{
    pub fn new(
        repository: Arc<R>,
        queue: Arc<Q>,
        billing: BillingConfig,
        pagination: PaginationConfig,
    ) -> Self {
        Self {
            repository,
            queue,
            billing,
            pagination,
        }
    }

    fn money(&self, amount: Decimal, currency: Option<&str>) -> Result<Money, DomainError> {
        Money::new(amount, currency.unwrap_or(self.billing.default_currency()))
    }

    /// Record a new pending payment for the requesting user.
    pub fn initiate_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<PaymentDto, BillingServiceError> {
        let amount = self.money(request.amount, request.currency.as_deref())?;
        let payment = Payment::initiate(
            request.user_id,
            amount,
            request.method_type,
            request.description,
            Utc::now(),
        )?;

        let stored = self.repository.insert_payment(payment)?;
        info!(
            payment_id = %stored.id(),
            user_id = %stored.user_id(),
            amount = %stored.amount(),
            "payment initiated"
        );
        Ok(PaymentDto::from(&stored))
    }

    /// Apply a processing outcome reported by the payment gateway.
    pub fn record_payment_outcome(
        &self,
        payment_id: PaymentId,
        outcome: PaymentOutcome,
    ) -> Result<PaymentDto, BillingServiceError> {
        let mut payment = self.load_payment(payment_id)?;
        let previous = payment.status();
        let refund = match &outcome {
            PaymentOutcome::Refunded { amount } => Some(amount.clone()),
            _ => None,
        };

        payment.apply(outcome, Utc::now())?;
        self.repository.update_payment(payment.clone())?;

        let status = payment.status();
        if previous != status {
            info!(
                %payment_id,
                from = previous.label(),
                to = status.label(),
                "payment status changed"
            );
        } else {
            debug!(%payment_id, status = status.label(), "payment outcome already applied");
        }

        if let Some(amount) = refund {
            self.queue.enqueue(
                TaskKind::SendRefundNotice,
                json!({
                    "payment_id": payment.id(),
                    "user_id": payment.user_id(),
                    "amount": amount.amount(),
                    "currency": amount.currency(),
                    "status": status,
                }),
            )?;
        } else if previous != status {
            match status {
                PaymentStatus::Succeeded => {
                    self.queue.enqueue(
                        TaskKind::SendPaymentReceipt,
                        json!({
                            "payment_id": payment.id(),
                            "user_id": payment.user_id(),
                            "amount": payment.amount().amount(),
                            "currency": payment.amount().currency(),
                        }),
                    )?;
                }
                PaymentStatus::Failed => {
                    warn!(%payment_id, reason = ?payment.failure_reason(), "payment failed");
                    self.queue.enqueue(
                        TaskKind::NotifyPaymentFailure,
                        json!({
                            "payment_id": payment.id(),
                            "user_id": payment.user_id(),
                            "reason": payment.failure_reason(),
                        }),
                    )?;
                }
                _ => {}
            }
        }

        Ok(PaymentDto::from(&payment))
    }

    pub fn payment(&self, payment_id: PaymentId) -> Result<PaymentDto, BillingServiceError> {
        let payment = self.load_payment(payment_id)?;
        Ok(PaymentDto::from(&payment))
    }

    /// Newest payments first.
    pub fn list_payments(
        &self,
        user_id: UserId,
        params: PageParams,
    ) -> Result<PaginatedResult<PaymentDto>, BillingServiceError> {
        let mut payments = self.repository.payments_for_user(user_id)?;
        payments.sort_by_key(|payment| (Reverse(payment.created_at()), payment.id()));

        let request = PageRequest::from_params(params, &self.pagination);
        Ok(PaginatedResult::from_vec(payments, request).map(|payment| PaymentDto::from(&payment)))
    }

    pub fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<SubscriptionDto, BillingServiceError> {
        let amount = self.money(request.amount, request.currency.as_deref())?;
        let now = Utc::now();
        let mut subscription = Subscription::new(request.user_id, &request.plan_id, amount, now)?;
        if let Some(reference) = request.gateway_reference {
            subscription = subscription.with_gateway_reference(reference);
        }
        if let Some(days) = request.trial_days.filter(|days| *days > 0) {
            let trial_end = Duration::try_days(i64::from(days))
                .and_then(|length| now.checked_add_signed(length))
                .ok_or_else(|| {
                    DomainError::validation("trial_days", format!("{days} days is out of range"))
                })?;
            subscription.start_trial(trial_end, now)?;
        }

        let stored = self.repository.insert_subscription(subscription)?;
        info!(
            subscription_id = %stored.id(),
            plan_id = stored.plan_id(),
            status = stored.status().label(),
            "subscription created"
        );
        self.enqueue_subscription_sync(&stored)?;
        Ok(SubscriptionDto::from(&stored))
    }

    /// Apply a lifecycle event delivered by the payment gateway.
    pub fn apply_subscription_event(
        &self,
        subscription_id: SubscriptionId,
        event: SubscriptionEvent,
    ) -> Result<SubscriptionDto, BillingServiceError> {
        let mut subscription = self.load_subscription(subscription_id)?;
        let previous = subscription.status();

        subscription.apply(event, Utc::now())?;
        self.repository.update_subscription(subscription.clone())?;

        let status = subscription.status();
        info!(
            %subscription_id,
            from = previous.label(),
            to = status.label(),
            "subscription event applied"
        );
        self.enqueue_subscription_sync(&subscription)?;
        if status == SubscriptionStatus::Canceled && previous != status {
            self.queue.enqueue(
                TaskKind::SendCancellationNotice,
                json!({
                    "subscription_id": subscription.id(),
                    "user_id": subscription.user_id(),
                    "plan_id": subscription.plan_id(),
                    "canceled_at": subscription.canceled_at(),
                }),
            )?;
        }

        Ok(SubscriptionDto::from(&subscription))
    }

    pub fn subscription(
        &self,
        subscription_id: SubscriptionId,
    ) -> Result<SubscriptionDto, BillingServiceError> {
        let subscription = self.load_subscription(subscription_id)?;
        Ok(SubscriptionDto::from(&subscription))
    }

    pub fn list_subscriptions(
        &self,
        user_id: UserId,
        params: PageParams,
    ) -> Result<PaginatedResult<SubscriptionDto>, BillingServiceError> {
        let mut subscriptions = self.repository.subscriptions_for_user(user_id)?;
        subscriptions.sort_by_key(|subscription| {
            (Reverse(subscription.created_at()), subscription.id())
        });

        let request = PageRequest::from_params(params, &self.pagination);
        Ok(PaginatedResult::from_vec(subscriptions, request)
            .map(|subscription| SubscriptionDto::from(&subscription)))
    }

    /// Store a payment method. The user's first active method becomes the default.
    pub fn add_payment_method(
        &self,
        request: AddPaymentMethodRequest,
    ) -> Result<PaymentMethodDto, BillingServiceError> {
        let expiry = match (request.expiry_month, request.expiry_year) {
            (Some(month), Some(year)) => Some(CardExpiry::new(month, year)?),
            (None, None) => None,
            _ => {
                return Err(DomainError::validation(
                    "expiry",
                    "month and year must be provided together",
                )
                .into())
            }
        };

        let now = Utc::now();
        let mut method = PaymentMethod::new(
            request.user_id,
            request.method_type,
            &request.last_four,
            request.brand,
            expiry,
            now,
        )?;

        let current_defaults: Vec<PaymentMethod> = self
            .repository
            .payment_methods_for_user(request.user_id)?
            .into_iter()
            .filter(|existing| existing.is_active() && existing.is_default())
            .collect();
        let becomes_default = request.make_default || current_defaults.is_empty();
        if becomes_default {
            method.mark_default(now)?;
            // Clear before inserting so a failed write leaves at most one default.
            for mut previous in current_defaults {
                previous.clear_default(now);
                self.repository.update_payment_method(previous)?;
            }
        }

        let stored = self.repository.insert_payment_method(method)?;

        info!(
            payment_method_id = %stored.id(),
            user_id = %stored.user_id(),
            is_default = stored.is_default(),
            "payment method added"
        );
        Ok(PaymentMethodDto::from(&stored))
    }

    /// Make `method_id` the user's only default payment method.
    pub fn set_default_payment_method(
        &self,
        user_id: UserId,
        method_id: PaymentMethodId,
    ) -> Result<PaymentMethodDto, BillingServiceError> {
        let mut target = self.owned_payment_method(user_id, method_id)?;
        let now = Utc::now();
        target.mark_default(now)?;

        for mut other in self.repository.payment_methods_for_user(user_id)? {
            if other.id() != method_id && other.is_default() {
                other.clear_default(now);
                self.repository.update_payment_method(other)?;
            }
        }
        self.repository.update_payment_method(target.clone())?;

        info!(payment_method_id = %method_id, %user_id, "default payment method changed");
        Ok(PaymentMethodDto::from(&target))
    }

    /// Deactivate a payment method, promoting the newest remaining one if it was the default.
    pub fn remove_payment_method(
        &self,
        user_id: UserId,
        method_id: PaymentMethodId,
    ) -> Result<PaymentMethodDto, BillingServiceError> {
        let mut target = self.owned_payment_method(user_id, method_id)?;
        let was_default = target.is_default();
        let now = Utc::now();
        target.deactivate(now);
        self.repository.update_payment_method(target.clone())?;

        if was_default {
            let replacement = self
                .repository
                .payment_methods_for_user(user_id)?
                .into_iter()
                .filter(|method| method.is_active() && method.id() != method_id)
                .max_by_key(|method| (method.created_at(), method.id()));
            if let Some(mut replacement) = replacement {
                replacement.mark_default(now)?;
                info!(
                    payment_method_id = %replacement.id(),
                    %user_id,
                    "promoted payment method to default"
                );
                self.repository.update_payment_method(replacement)?;
            }
        }

        info!(payment_method_id = %method_id, %user_id, "payment method removed");
        Ok(PaymentMethodDto::from(&target))
    }

    /// Active payment methods with the default first, then newest first.
    pub fn list_payment_methods(
        &self,
        user_id: UserId,
    ) -> Result<Vec<PaymentMethodDto>, BillingServiceError> {
        let mut methods: Vec<PaymentMethod> = self
            .repository
            .payment_methods_for_user(user_id)?
            .into_iter()
            .filter(PaymentMethod::is_active)
            .collect();
        methods.sort_by_key(|method| {
            (
                Reverse(method.is_default()),
                Reverse(method.created_at()),
                method.id(),
            )
        });
        Ok(methods.iter().map(PaymentMethodDto::from).collect())
    }

    fn load_payment(&self, payment_id: PaymentId) -> Result<Payment, BillingServiceError> {
        Ok(self
            .repository
            .fetch_payment(payment_id)?
            .ok_or(RepositoryError::NotFound)?)
    }

    fn load_subscription(
        &self,
        subscription_id: SubscriptionId,
    ) -> Result<Subscription, BillingServiceError> {
        Ok(self
            .repository
            .fetch_subscription(subscription_id)?
            .ok_or(RepositoryError::NotFound)?)
    }

    fn owned_payment_method(
        &self,
        user_id: UserId,
        method_id: PaymentMethodId,
    ) -> Result<PaymentMethod, BillingServiceError> {
        let method = self
            .repository
            .fetch_payment_method(method_id)?
            .ok_or(RepositoryError::NotFound)?;
        if method.user_id() != user_id {
            return Err(BillingServiceError::Ownership { user_id, method_id });
        }
        Ok(method)
    }

    fn enqueue_subscription_sync(
        &self,
        subscription: &Subscription,
    ) -> Result<(), BillingServiceError> {
        self.queue.enqueue(
            TaskKind::SyncSubscription,
            json!({
                "subscription_id": subscription.id(),
                "user_id": subscription.user_id(),
                "status": subscription.status(),
                "gateway_reference": subscription.gateway_reference(),
            }),
        )?;
        Ok(())
    }
}

/// Error raised by the billing service.
#[derive(Debug, thiserror::Error)]
pub enum BillingServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error("payment method {method_id} does not belong to user {user_id}")]
    Ownership {
        user_id: UserId,
        method_id: PaymentMethodId,
    },
}
