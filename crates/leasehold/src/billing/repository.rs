use super::domain::{
    Payment, PaymentId, PaymentMethod, PaymentMethodId, Subscription, SubscriptionId, UserId,
};

/// Persistence boundary for billing records so the service can be exercised in isolation.
///
/// `update_*` must fail with [`RepositoryError::NotFound`] when the record does not exist.
/// Payments are never deleted.
pub trait BillingRepository: Send + Sync {
    fn insert_payment(&self, payment: Payment) -> Result<Payment, RepositoryError>;
    fn update_payment(&self, payment: Payment) -> Result<(), RepositoryError>;
    fn fetch_payment(&self, id: PaymentId) -> Result<Option<Payment>, RepositoryError>;
    fn payments_for_user(&self, user_id: UserId) -> Result<Vec<Payment>, RepositoryError>;

    fn insert_subscription(
        &self,
        subscription: Subscription,
    ) -> Result<Subscription, RepositoryError>;
    fn update_subscription(&self, subscription: Subscription) -> Result<(), RepositoryError>;
    fn fetch_subscription(
        &self,
        id: SubscriptionId,
    ) -> Result<Option<Subscription>, RepositoryError>;
    fn subscriptions_for_user(&self, user_id: UserId)
        -> Result<Vec<Subscription>, RepositoryError>;

    fn insert_payment_method(
        &self,
        method: PaymentMethod,
    ) -> Result<PaymentMethod, RepositoryError>;
    fn update_payment_method(&self, method: PaymentMethod) -> Result<(), RepositoryError>;
    fn fetch_payment_method(
        &self,
        id: PaymentMethodId,
    ) -> Result<Option<PaymentMethod>, RepositoryError>;
    fn payment_methods_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<PaymentMethod>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
