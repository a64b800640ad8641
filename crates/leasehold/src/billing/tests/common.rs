use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::billing::domain::{
    Payment, PaymentId, PaymentMethod, PaymentMethodId, Subscription, SubscriptionId, UserId,
};
use crate::billing::dto::{AddPaymentMethodRequest, CreatePaymentRequest, CreateSubscriptionRequest};
use crate::billing::repository::{BillingRepository, RepositoryError};
use crate::billing::status::PaymentMethodType;
use crate::billing::{billing_router, BillingService};
use crate::config::{BillingConfig, PaginationConfig};
use crate::jobs::{QueueError, QueuedTask, TaskId, TaskKind, TaskQueue};

pub(super) fn dec(raw: &str) -> Decimal {
    Decimal::from_str(raw).expect("valid decimal")
}

pub(super) fn billing_config() -> BillingConfig {
    BillingConfig::new("usd").expect("valid currency")
}

pub(super) fn pagination_config() -> PaginationConfig {
    PaginationConfig::new(20, 50).expect("valid bounds")
}

pub(super) fn payment_request(user_id: UserId, amount: &str) -> CreatePaymentRequest {
    CreatePaymentRequest {
        user_id,
        amount: dec(amount),
        currency: None,
        method_type: PaymentMethodType::Card,
        description: Some("Unit A-201 rent".to_string()),
    }
}

pub(super) fn subscription_request(user_id: UserId, trial_days: Option<u32>) -> CreateSubscriptionRequest {
    CreateSubscriptionRequest {
        user_id,
        plan_id: "portfolio-pro".to_string(),
        amount: dec("49.00"),
        currency: Some("usd".to_string()),
        trial_days,
        gateway_reference: Some("sub_123".to_string()),
    }
}

pub(super) fn card_request(user_id: UserId, last_four: &str) -> AddPaymentMethodRequest {
    AddPaymentMethodRequest {
        user_id,
        method_type: PaymentMethodType::Card,
        last_four: last_four.to_string(),
        brand: Some("Visa".to_string()),
        expiry_month: Some(12),
        expiry_year: Some(2030),
        make_default: false,
    }
}

pub(super) type TestService = BillingService<MemoryRepository, MemoryQueue>;

pub(super) fn build_service() -> (TestService, Arc<MemoryRepository>, Arc<MemoryQueue>) {
    let repository = Arc::new(MemoryRepository::default());
    let queue = Arc::new(MemoryQueue::default());
    let service = BillingService::new(
        repository.clone(),
        queue.clone(),
        billing_config(),
        pagination_config(),
    );
    (service, repository, queue)
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    billing_router(Arc::new(service))
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    payments: Arc<Mutex<HashMap<PaymentId, Payment>>>,
    subscriptions: Arc<Mutex<HashMap<SubscriptionId, Subscription>>>,
    methods: Arc<Mutex<HashMap<PaymentMethodId, PaymentMethod>>>,
    method_updates_offline: Arc<AtomicBool>,
}

impl MemoryRepository {
    pub(super) fn take_method_updates_offline(&self) {
        self.method_updates_offline.store(true, Ordering::SeqCst);
    }

    pub(super) fn stored_methods(&self, user_id: UserId) -> Vec<PaymentMethod> {
        self.payment_methods_for_user(user_id)
            .expect("memory repository lists methods")
    }
}

impl BillingRepository for MemoryRepository {
    fn insert_payment(&self, payment: Payment) -> Result<Payment, RepositoryError> {
        let mut guard = self.payments.lock().expect("repository mutex poisoned");
        if guard.contains_key(&payment.id()) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(payment.id(), payment.clone());
        Ok(payment)
    }

    fn update_payment(&self, payment: Payment) -> Result<(), RepositoryError> {
        let mut guard = self.payments.lock().expect("repository mutex poisoned");
        match guard.get_mut(&payment.id()) {
            Some(slot) => {
                *slot = payment;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_payment(&self, id: PaymentId) -> Result<Option<Payment>, RepositoryError> {
        let guard = self.payments.lock().expect("repository mutex poisoned");
        Ok(guard.get(&id).cloned())
    }

    fn payments_for_user(&self, user_id: UserId) -> Result<Vec<Payment>, RepositoryError> {
        let guard = self.payments.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|payment| payment.user_id() == user_id)
            .cloned()
            .collect())
    }

    fn insert_subscription(
        &self,
        subscription: Subscription,
    ) -> Result<Subscription, RepositoryError> {
        let mut guard = self.subscriptions.lock().expect("repository mutex poisoned");
        if guard.contains_key(&subscription.id()) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(subscription.id(), subscription.clone());
        Ok(subscription)
    }

    fn update_subscription(&self, subscription: Subscription) -> Result<(), RepositoryError> {
        let mut guard = self.subscriptions.lock().expect("repository mutex poisoned");
        match guard.get_mut(&subscription.id()) {
            Some(slot) => {
                *slot = subscription;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_subscription(
        &self,
        id: SubscriptionId,
    ) -> Result<Option<Subscription>, RepositoryError> {
        let guard = self.subscriptions.lock().expect("repository mutex poisoned");
        Ok(guard.get(&id).cloned())
    }

    fn subscriptions_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Subscription>, RepositoryError> {
        let guard = self.subscriptions.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|subscription| subscription.user_id() == user_id)
            .cloned()
            .collect())
    }

    fn insert_payment_method(
        &self,
        method: PaymentMethod,
    ) -> Result<PaymentMethod, RepositoryError> {
        let mut guard = self.methods.lock().expect("repository mutex poisoned");
        if guard.contains_key(&method.id()) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(method.id(), method.clone());
        Ok(method)
    }

    fn update_payment_method(&self, method: PaymentMethod) -> Result<(), RepositoryError> {
        if self.method_updates_offline.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("method writes offline".to_string()));
        }
        let mut guard = self.methods.lock().expect("repository mutex poisoned");
        match guard.get_mut(&method.id()) {
            Some(slot) => {
                *slot = method;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_payment_method(
        &self,
        id: PaymentMethodId,
    ) -> Result<Option<PaymentMethod>, RepositoryError> {
        let guard = self.methods.lock().expect("repository mutex poisoned");
        Ok(guard.get(&id).cloned())
    }

    fn payment_methods_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<PaymentMethod>, RepositoryError> {
        let guard = self.methods.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|method| method.user_id() == user_id)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryQueue {
    tasks: Arc<Mutex<Vec<QueuedTask>>>,
}

impl MemoryQueue {
    pub(super) fn tasks(&self) -> Vec<QueuedTask> {
        self.tasks.lock().expect("queue mutex poisoned").clone()
    }

    pub(super) fn kinds(&self) -> Vec<TaskKind> {
        self.tasks().into_iter().map(|task| task.kind).collect()
    }
}

impl TaskQueue for MemoryQueue {
    fn enqueue(&self, kind: TaskKind, payload: Value) -> Result<TaskId, QueueError> {
        let id = TaskId::generate();
        self.tasks
            .lock()
            .expect("queue mutex poisoned")
            .push(QueuedTask { id, kind, payload });
        Ok(id)
    }
}

pub(super) struct OfflineQueue;

impl TaskQueue for OfflineQueue {
    fn enqueue(&self, _kind: TaskKind, _payload: Value) -> Result<TaskId, QueueError> {
        Err(QueueError::Unavailable("broker offline".to_string()))
    }
}

pub(super) struct UnavailableRepository;

impl UnavailableRepository {
    fn offline<T>() -> Result<T, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

impl BillingRepository for UnavailableRepository {
    fn insert_payment(&self, _payment: Payment) -> Result<Payment, RepositoryError> {
        Self::offline()
    }

    fn update_payment(&self, _payment: Payment) -> Result<(), RepositoryError> {
        Self::offline()
    }

    fn fetch_payment(&self, _id: PaymentId) -> Result<Option<Payment>, RepositoryError> {
        Self::offline()
    }

    fn payments_for_user(&self, _user_id: UserId) -> Result<Vec<Payment>, RepositoryError> {
        Self::offline()
    }

    fn insert_subscription(
        &self,
        _subscription: Subscription,
    ) -> Result<Subscription, RepositoryError> {
        Self::offline()
    }

    fn update_subscription(&self, _subscription: Subscription) -> Result<(), RepositoryError> {
        Self::offline()
    }

    fn fetch_subscription(
        &self,
        _id: SubscriptionId,
    ) -> Result<Option<Subscription>, RepositoryError> {
        Self::offline()
    }

    fn subscriptions_for_user(
        &self,
        _user_id: UserId,
    ) -> Result<Vec<Subscription>, RepositoryError> {
        Self::offline()
    }

    fn insert_payment_method(
        &self,
        _method: PaymentMethod,
    ) -> Result<PaymentMethod, RepositoryError> {
        Self::offline()
    }

    fn update_payment_method(&self, _method: PaymentMethod) -> Result<(), RepositoryError> {
        Self::offline()
    }

    fn fetch_payment_method(
        &self,
        _id: PaymentMethodId,
    ) -> Result<Option<PaymentMethod>, RepositoryError> {
        Self::offline()
    }

    fn payment_methods_for_user(
        &self,
        _user_id: UserId,
    ) -> Result<Vec<PaymentMethod>, RepositoryError> {
        Self::offline()
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
