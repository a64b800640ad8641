//! Payments, subscriptions, and stored payment methods.
//!
//! Entities own their status lifecycles; the service composes them with the
//! repository and task queue collaborators, and the router exposes the service
//! over HTTP.

pub mod domain;
pub mod dto;
pub mod repository;
pub mod router;
pub mod service;
pub mod status;

#[cfg(test)]
mod tests;

pub use domain::{
    CardExpiry, Payment, PaymentId, PaymentMethod, PaymentMethodId, PaymentOutcome,
    Subscription, SubscriptionEvent, SubscriptionId, UserId,
};
pub use dto::{
    AddPaymentMethodRequest, CreatePaymentRequest, CreateSubscriptionRequest, PaymentDto,
    PaymentMethodDto, SubscriptionDto,
};
pub use repository::{BillingRepository, RepositoryError};
pub use router::billing_router;
pub use service::{BillingService, BillingServiceError};
pub use status::{Lifecycle, PaymentMethodType, PaymentStatus, SubscriptionStatus};
