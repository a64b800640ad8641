use super::common::*;
use crate::billing::domain::{PaymentId, PaymentMethodId, PaymentOutcome, SubscriptionEvent, UserId};
use crate::billing::repository::{BillingRepository, RepositoryError};
use crate::billing::status::{PaymentStatus, SubscriptionStatus};
use crate::billing::{BillingService, BillingServiceError};
use crate::jobs::{QueueError, TaskKind};
use crate::pagination::PageParams;
use crate::values::{DomainError, Money};
use chrono::{Duration, Utc};
use std::sync::Arc;

#[test]
fn initiate_payment_applies_default_currency() {
    let (service, repository, _queue) = build_service();
    let user = UserId::generate();

    let dto = service
        .initiate_payment(payment_request(user, "1180.00"))
        .expect("payment initiates");

    assert_eq!(dto.currency, "USD");
    assert_eq!(dto.amount, dec("1180.00"));
    assert_eq!(dto.status, PaymentStatus::Pending);
    assert!(repository
        .fetch_payment(dto.id)
        .expect("fetch succeeds")
        .is_some());
}

#[test]
fn explicit_currency_is_normalized() {
    let (service, _repository, _queue) = build_service();
    let mut request = payment_request(UserId::generate(), "25");
    request.currency = Some(" cad ".to_string());

    let dto = service.initiate_payment(request).expect("payment initiates");
    assert_eq!(dto.currency, "CAD");
}

#[test]
fn initiate_payment_propagates_validation_errors() {
    let (service, _repository, _queue) = build_service();

    match service.initiate_payment(payment_request(UserId::generate(), "-5")) {
        Err(BillingServiceError::Domain(DomainError::Validation { field: "amount", .. })) => {}
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn successful_payment_enqueues_receipt_once() {
    let (service, _repository, queue) = build_service();
    let payment = service
        .initiate_payment(payment_request(UserId::generate(), "50"))
        .expect("payment initiates");

    service
        .record_payment_outcome(payment.id, PaymentOutcome::Processing)
        .expect("processing");
    let succeeded = PaymentOutcome::Succeeded {
        gateway_reference: Some("ch_42".to_string()),
    };
    let dto = service
        .record_payment_outcome(payment.id, succeeded.clone())
        .expect("succeeds");
    assert_eq!(dto.status, PaymentStatus::Succeeded);
    assert_eq!(dto.gateway_reference.as_deref(), Some("ch_42"));
    assert!(dto.processed_at.is_some());

    service
        .record_payment_outcome(payment.id, succeeded)
        .expect("redelivered webhook is a no-op");
    assert_eq!(queue.kinds(), vec![TaskKind::SendPaymentReceipt]);
    assert_eq!(queue.tasks()[0].payload["currency"], "USD");
}

#[test]
fn failed_payment_notifies_user() {
    let (service, _repository, queue) = build_service();
    let payment = service
        .initiate_payment(payment_request(UserId::generate(), "50"))
        .expect("payment initiates");

    let dto = service
        .record_payment_outcome(
            payment.id,
            PaymentOutcome::Failed {
                reason: "insufficient funds".to_string(),
            },
        )
        .expect("fails");

    assert_eq!(dto.status, PaymentStatus::Failed);
    assert_eq!(dto.failure_reason.as_deref(), Some("insufficient funds"));
    assert_eq!(queue.kinds(), vec![TaskKind::NotifyPaymentFailure]);
}

#[test]
fn illegal_transition_leaves_record_untouched() {
    let (service, repository, queue) = build_service();
    let payment = service
        .initiate_payment(payment_request(UserId::generate(), "50"))
        .expect("payment initiates");

    let refund = Money::new(dec("10"), "USD").expect("money");
    match service.record_payment_outcome(payment.id, PaymentOutcome::Refunded { amount: refund }) {
        Err(BillingServiceError::Domain(DomainError::InvalidTransition { .. })) => {}
        other => panic!("expected invalid transition, got {other:?}"),
    }

    let stored = repository
        .fetch_payment(payment.id)
        .expect("fetch succeeds")
        .expect("payment present");
    assert_eq!(stored.status(), PaymentStatus::Pending);
    assert!(queue.tasks().is_empty());
}

#[test]
fn refunds_enqueue_notices_and_track_totals() {
    let (service, _repository, queue) = build_service();
    let payment = service
        .initiate_payment(payment_request(UserId::generate(), "100"))
        .expect("payment initiates");
    service
        .record_payment_outcome(payment.id, PaymentOutcome::Processing)
        .expect("processing");
    service
        .record_payment_outcome(
            payment.id,
            PaymentOutcome::Succeeded {
                gateway_reference: None,
            },
        )
        .expect("succeeds");

    let partial = service
        .record_payment_outcome(
            payment.id,
            PaymentOutcome::Refunded {
                amount: Money::new(dec("40"), "usd").expect("money"),
            },
        )
        .expect("partial refund");
    assert_eq!(partial.status, PaymentStatus::PartiallyRefunded);
    assert_eq!(partial.refunded_amount, dec("40"));

    let full = service
        .record_payment_outcome(
            payment.id,
            PaymentOutcome::Refunded {
                amount: Money::new(dec("60"), "USD").expect("money"),
            },
        )
        .expect("full refund");
    assert_eq!(full.status, PaymentStatus::Refunded);

    assert_eq!(
        queue.kinds(),
        vec![
            TaskKind::SendPaymentReceipt,
            TaskKind::SendRefundNotice,
            TaskKind::SendRefundNotice
        ]
    );
}

#[test]
fn payment_lookup_propagates_not_found() {
    let (service, _repository, _queue) = build_service();
    match service.payment(PaymentId::generate()) {
        Err(BillingServiceError::Repository(RepositoryError::NotFound)) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn list_payments_pages_newest_first() {
    let (service, _repository, _queue) = build_service();
    let user = UserId::generate();
    let other_user = UserId::generate();

    let mut created = Vec::new();
    for amount in 1..=5 {
        let dto = service
            .initiate_payment(payment_request(user, &amount.to_string()))
            .expect("payment initiates");
        created.push(dto);
        std::thread::sleep(std::time::Duration::from_millis(2));
    }
    service
        .initiate_payment(payment_request(other_user, "99"))
        .expect("payment initiates");

    let page = service
        .list_payments(
            user,
            PageParams {
                page: Some(2),
                page_size: Some(2),
            },
        )
        .expect("list succeeds");

    assert_eq!(page.total_count, 5);
    assert_eq!(page.total_pages(), 3);
    assert!(page.has_next_page());
    assert!(page.has_previous_page());
    let amounts: Vec<_> = page.items.iter().map(|item| item.amount).collect();
    assert_eq!(amounts, vec![dec("3"), dec("2")]);
}

#[test]
fn subscription_with_trial_is_active() {
    let (service, _repository, queue) = build_service();
    let dto = service
        .create_subscription(subscription_request(UserId::generate(), Some(14)))
        .expect("subscription created");

    assert_eq!(dto.status, SubscriptionStatus::Trialing);
    assert!(dto.is_active);
    assert!(dto.trial_end.is_some());
    assert_eq!(queue.kinds(), vec![TaskKind::SyncSubscription]);
    assert_eq!(queue.tasks()[0].payload["gateway_reference"], "sub_123");
}

#[test]
fn subscription_without_trial_starts_incomplete() {
    let (service, _repository, _queue) = build_service();
    let dto = service
        .create_subscription(subscription_request(UserId::generate(), None))
        .expect("subscription created");
    assert_eq!(dto.status, SubscriptionStatus::Incomplete);
    assert!(!dto.is_active);
}

#[test]
fn subscription_events_drive_lifecycle() {
    let (service, _repository, queue) = build_service();
    let sub = service
        .create_subscription(subscription_request(UserId::generate(), None))
        .expect("subscription created");

    let start = Utc::now();
    let active = service
        .apply_subscription_event(
            sub.id,
            SubscriptionEvent::Activated {
                period_start: start,
                period_end: start + Duration::days(30),
            },
        )
        .expect("activates");
    assert!(active.is_active);

    let past_due = service
        .apply_subscription_event(sub.id, SubscriptionEvent::PaymentFailed)
        .expect("past due");
    assert_eq!(past_due.status, SubscriptionStatus::PastDue);
    assert!(!past_due.is_active);

    let canceled = service
        .apply_subscription_event(sub.id, SubscriptionEvent::Canceled)
        .expect("canceled");
    assert_eq!(canceled.status, SubscriptionStatus::Canceled);
    assert!(canceled.canceled_at.is_some());

    match service.apply_subscription_event(sub.id, SubscriptionEvent::Resumed) {
        Err(BillingServiceError::Domain(DomainError::InvalidOperation(_))) => {}
        other => panic!("expected invalid operation, got {other:?}"),
    }

    let kinds = queue.kinds();
    assert_eq!(
        kinds
            .iter()
            .filter(|kind| **kind == TaskKind::SendCancellationNotice)
            .count(),
        1
    );
    assert_eq!(kinds.last(), Some(&TaskKind::SendCancellationNotice));
}

#[test]
fn list_subscriptions_is_scoped_to_user() {
    let (service, _repository, _queue) = build_service();
    let user = UserId::generate();
    service
        .create_subscription(subscription_request(user, None))
        .expect("created");
    service
        .create_subscription(subscription_request(UserId::generate(), None))
        .expect("created");

    let page = service
        .list_subscriptions(user, PageParams::default())
        .expect("list succeeds");
    assert_eq!(page.total_count, 1);
    assert_eq!(page.page_size, 20);
    assert!(page.items.iter().all(|item| item.user_id == user));
}

#[test]
fn first_payment_method_becomes_default() {
    let (service, _repository, _queue) = build_service();
    let user = UserId::generate();

    let first = service
        .add_payment_method(card_request(user, "4242"))
        .expect("added");
    let second = service
        .add_payment_method(card_request(user, "1881"))
        .expect("added");

    assert!(first.is_default);
    assert!(!second.is_default);
    assert_eq!(first.display_name, "Visa ending in 4242");
}

#[test]
fn exactly_one_default_after_switching() {
    let (service, _repository, _queue) = build_service();
    let user = UserId::generate();
    let first = service
        .add_payment_method(card_request(user, "4242"))
        .expect("added");
    let second = service
        .add_payment_method(card_request(user, "1881"))
        .expect("added");
    let mut third_request = card_request(user, "0005");
    third_request.make_default = true;
    let third = service.add_payment_method(third_request).expect("added");
    assert!(third.is_default);

    service
        .set_default_payment_method(user, second.id)
        .expect("default switched");

    let methods = service.list_payment_methods(user).expect("list succeeds");
    let defaults: Vec<_> = methods.iter().filter(|method| method.is_default).collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].id, second.id);
    assert_eq!(methods[0].id, second.id, "default is listed first");
    assert!(methods.iter().any(|method| method.id == first.id));
}

#[test]
fn removing_default_promotes_newest_remaining_method() {
    let (service, _repository, _queue) = build_service();
    let user = UserId::generate();
    let first = service
        .add_payment_method(card_request(user, "4242"))
        .expect("added");
    std::thread::sleep(std::time::Duration::from_millis(2));
    let second = service
        .add_payment_method(card_request(user, "1881"))
        .expect("added");

    let removed = service
        .remove_payment_method(user, first.id)
        .expect("removed");
    assert!(!removed.is_active);
    assert!(!removed.is_default);

    let methods = service.list_payment_methods(user).expect("list succeeds");
    assert_eq!(methods.len(), 1);
    assert_eq!(methods[0].id, second.id);
    assert!(methods[0].is_default);
}

#[test]
fn removed_method_cannot_become_default() {
    let (service, _repository, _queue) = build_service();
    let user = UserId::generate();
    let method = service
        .add_payment_method(card_request(user, "4242"))
        .expect("added");
    service
        .remove_payment_method(user, method.id)
        .expect("removed");

    match service.set_default_payment_method(user, method.id) {
        Err(BillingServiceError::Domain(DomainError::InvalidOperation(_))) => {}
        other => panic!("expected invalid operation, got {other:?}"),
    }
}

#[test]
fn payment_methods_are_owner_scoped() {
    let (service, _repository, _queue) = build_service();
    let owner = UserId::generate();
    let intruder = UserId::generate();
    let method = service
        .add_payment_method(card_request(owner, "4242"))
        .expect("added");

    match service.set_default_payment_method(intruder, method.id) {
        Err(BillingServiceError::Ownership { user_id, method_id }) => {
            assert_eq!(user_id, intruder);
            assert_eq!(method_id, method.id);
        }
        other => panic!("expected ownership error, got {other:?}"),
    }
    match service.remove_payment_method(owner, PaymentMethodId::generate()) {
        Err(BillingServiceError::Repository(RepositoryError::NotFound)) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn partial_expiry_is_rejected() {
    let (service, _repository, _queue) = build_service();
    let mut request = card_request(UserId::generate(), "4242");
    request.expiry_year = None;

    match service.add_payment_method(request) {
        Err(BillingServiceError::Domain(DomainError::Validation { field: "expiry", .. })) => {}
        other => panic!("expected expiry validation error, got {other:?}"),
    }
}

#[test]
fn repository_failures_propagate() {
    let service = BillingService::new(
        Arc::new(UnavailableRepository),
        Arc::new(MemoryQueue::default()),
        billing_config(),
        pagination_config(),
    );

    match service.initiate_payment(payment_request(UserId::generate(), "10")) {
        Err(BillingServiceError::Repository(RepositoryError::Unavailable(_))) => {}
        other => panic!("expected unavailable repository, got {other:?}"),
    }
}

#[test]
fn queue_failures_propagate() {
    let service = BillingService::new(
        Arc::new(MemoryRepository::default()),
        Arc::new(OfflineQueue),
        billing_config(),
        pagination_config(),
    );

    match service.create_subscription(subscription_request(UserId::generate(), None)) {
        Err(BillingServiceError::Queue(QueueError::Unavailable(_))) => {}
        other => panic!("expected queue failure, got {other:?}"),
    }
}

#[test]
fn out_of_range_trial_is_a_validation_error() {
    let (service, repository, queue) = build_service();
    let user = UserId::generate();

    match service.create_subscription(subscription_request(user, Some(u32::MAX))) {
        Err(BillingServiceError::Domain(DomainError::Validation {
            field: "trial_days",
            ..
        })) => {}
        other => panic!("expected trial_days validation error, got {other:?}"),
    }
    assert!(repository
        .subscriptions_for_user(user)
        .expect("list succeeds")
        .is_empty());
    assert!(queue.tasks().is_empty());
}

#[test]
fn redelivered_subscription_events_leave_record_unchanged() {
    let (service, _repository, _queue) = build_service();
    let created = service
        .create_subscription(subscription_request(UserId::generate(), Some(14)))
        .expect("subscription created");

    let trial_end = created.trial_end.expect("trial end") + Duration::days(7);
    let after_trial_redelivery = service
        .apply_subscription_event(created.id, SubscriptionEvent::TrialStarted { trial_end })
        .expect("repeat trial applies");
    assert_eq!(after_trial_redelivery, created);

    let start = Utc::now();
    let activated = SubscriptionEvent::Activated {
        period_start: start,
        period_end: start + Duration::days(30),
    };
    service
        .apply_subscription_event(created.id, activated.clone())
        .expect("activates");
    let renewed = service
        .apply_subscription_event(
            created.id,
            SubscriptionEvent::Renewed {
                period_end: start + Duration::days(60),
            },
        )
        .expect("renews");

    let after_activation_redelivery = service
        .apply_subscription_event(created.id, activated)
        .expect("repeat activation applies");
    assert_eq!(after_activation_redelivery, renewed);
    assert_eq!(
        after_activation_redelivery.current_period_end,
        Some(start + Duration::days(60))
    );
}

#[test]
fn failed_default_swap_keeps_a_single_default() {
    let (service, repository, _queue) = build_service();
    let user = UserId::generate();
    let original = service
        .add_payment_method(card_request(user, "4242"))
        .expect("added");

    repository.take_method_updates_offline();
    let mut replacement = card_request(user, "1881");
    replacement.make_default = true;
    match service.add_payment_method(replacement) {
        Err(BillingServiceError::Repository(RepositoryError::Unavailable(_))) => {}
        other => panic!("expected unavailable repository, got {other:?}"),
    }

    let stored = repository.stored_methods(user);
    assert_eq!(stored.len(), 1);
    let defaults: Vec<_> = stored
        .into_iter()
        .filter(|method| method.is_active() && method.is_default())
        .collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].id(), original.id);
}
