use leasehold::billing::{
    BillingRepository, Payment, PaymentId, PaymentMethod, PaymentMethodId, RepositoryError,
    Subscription, SubscriptionId, UserId,
};
use leasehold::jobs::{QueueError, QueuedTask, TaskId, TaskKind, TaskQueue};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::Value;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Keyed table guarded by a mutex, shared by the in-memory repository collections.
struct Table<K, V> {
    rows: Mutex<HashMap<K, V>>,
}

impl<K, V> Default for Table<K, V> {
    fn default() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Copy, V: Clone> Table<K, V> {
    fn insert(&self, key: K, value: V) -> Result<V, RepositoryError> {
        let mut guard = self.rows.lock().expect("repository mutex poisoned");
        if guard.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(key, value.clone());
        Ok(value)
    }

    fn update(&self, key: K, value: V) -> Result<(), RepositoryError> {
        let mut guard = self.rows.lock().expect("repository mutex poisoned");
        match guard.get_mut(&key) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, key: K) -> Option<V> {
        let guard = self.rows.lock().expect("repository mutex poisoned");
        guard.get(&key).cloned()
    }

    fn select(&self, predicate: impl Fn(&V) -> bool) -> Vec<V> {
        let guard = self.rows.lock().expect("repository mutex poisoned");
        guard.values().filter(|row| predicate(*row)).cloned().collect()
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryBillingRepository {
    payments: Arc<Table<PaymentId, Payment>>,
    subscriptions: Arc<Table<SubscriptionId, Subscription>>,
    methods: Arc<Table<PaymentMethodId, PaymentMethod>>,
}

impl BillingRepository for InMemoryBillingRepository {
    fn insert_payment(&self, payment: Payment) -> Result<Payment, RepositoryError> {
        self.payments.insert(payment.id(), payment)
    }

    fn update_payment(&self, payment: Payment) -> Result<(), RepositoryError> {
        self.payments.update(payment.id(), payment)
    }

    fn fetch_payment(&self, id: PaymentId) -> Result<Option<Payment>, RepositoryError> {
        Ok(self.payments.fetch(id))
    }

    fn payments_for_user(&self, user_id: UserId) -> Result<Vec<Payment>, RepositoryError> {
        Ok(self.payments.select(|payment| payment.user_id() == user_id))
    }

    fn insert_subscription(
        &self,
        subscription: Subscription,
    ) -> Result<Subscription, RepositoryError> {
        self.subscriptions.insert(subscription.id(), subscription)
    }

    fn update_subscription(&self, subscription: Subscription) -> Result<(), RepositoryError> {
        self.subscriptions.update(subscription.id(), subscription)
    }

    fn fetch_subscription(
        &self,
        id: SubscriptionId,
    ) -> Result<Option<Subscription>, RepositoryError> {
        Ok(self.subscriptions.fetch(id))
    }

    fn subscriptions_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Subscription>, RepositoryError> {
        Ok(self
            .subscriptions
            .select(|subscription| subscription.user_id() == user_id))
    }

    fn insert_payment_method(
        &self,
        method: PaymentMethod,
    ) -> Result<PaymentMethod, RepositoryError> {
        self.methods.insert(method.id(), method)
    }

    fn update_payment_method(&self, method: PaymentMethod) -> Result<(), RepositoryError> {
        self.methods.update(method.id(), method)
    }

    fn fetch_payment_method(
        &self,
        id: PaymentMethodId,
    ) -> Result<Option<PaymentMethod>, RepositoryError> {
        Ok(self.methods.fetch(id))
    }

    fn payment_methods_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<PaymentMethod>, RepositoryError> {
        Ok(self.methods.select(|method| method.user_id() == user_id))
    }
}

/// Holds enqueued tasks in memory; nothing consumes them in this process.
#[derive(Default, Clone)]
pub(crate) struct InMemoryTaskQueue {
    tasks: Arc<Mutex<Vec<QueuedTask>>>,
}

impl TaskQueue for InMemoryTaskQueue {
    fn enqueue(&self, kind: TaskKind, payload: Value) -> Result<TaskId, QueueError> {
        let id = TaskId::generate();
        debug!(task_id = %id, kind = kind.label(), "task enqueued");
        let mut guard = self.tasks.lock().expect("queue mutex poisoned");
        guard.push(QueuedTask { id, kind, payload });
        Ok(id)
    }
}

impl InMemoryTaskQueue {
    pub(crate) fn tasks(&self) -> Vec<QueuedTask> {
        self.tasks.lock().expect("queue mutex poisoned").clone()
    }
}
