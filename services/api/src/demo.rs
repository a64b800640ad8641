use crate::infra::{InMemoryBillingRepository, InMemoryTaskQueue};
use chrono::{Duration, Utc};
use clap::Args;
use leasehold::billing::{
    AddPaymentMethodRequest, BillingService, BillingServiceError, CreatePaymentRequest,
    CreateSubscriptionRequest, Lifecycle, PaymentMethodType, PaymentOutcome, SubscriptionEvent,
};
use leasehold::config::{BillingConfig, PaginationConfig};
use leasehold::error::AppError;
use leasehold::pagination::PageParams;
use leasehold::users::{User, UserDto};
use leasehold::values::{EmailPolicy, Money};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

type DemoService = BillingService<InMemoryBillingRepository, InMemoryTaskQueue>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Currency applied when a request omits one (defaults to USD).
    #[arg(long)]
    pub(crate) currency: Option<String>,
    /// Email address for the demo account holder.
    #[arg(long)]
    pub(crate) email: Option<String>,
    /// Monthly rent charged in the payment walkthrough.
    #[arg(long, default_value = "1450.00")]
    pub(crate) rent: Decimal,
    /// Skip the subscription portion of the demo.
    #[arg(long)]
    pub(crate) skip_subscription: bool,
}

#[derive(Debug, Serialize)]
struct DemoSummary {
    user: UserDto,
    default_currency: String,
    payments: u64,
    subscriptions: u64,
    payment_methods: usize,
    queued_tasks: Vec<&'static str>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        currency,
        email,
        rent,
        skip_subscription,
    } = args;

    let billing = BillingConfig::new(currency.as_deref().unwrap_or("USD"))?;
    let pagination = PaginationConfig::new(20, 100)?;
    let queue = Arc::new(InMemoryTaskQueue::default());
    let service = BillingService::new(
        Arc::new(InMemoryBillingRepository::default()),
        queue.clone(),
        billing.clone(),
        pagination,
    );

    println!("Billing walkthrough");
    let user = User::register(
        email.as_deref().unwrap_or("resident@leasehold.io"),
        "Morgan",
        "Ellis",
        &EmailPolicy::default(),
        Utc::now(),
    )
    .map_err(BillingServiceError::from)?;
    println!("Account holder: {} <{}>", user.full_name(), user.email());

    run_payment_walkthrough(&service, &user, rent)?;
    run_payment_method_walkthrough(&service, &user)?;
    if skip_subscription {
        println!("\nSubscription walkthrough skipped");
    } else {
        run_subscription_walkthrough(&service, &user, billing.default_currency())?;
    }

    let summary = DemoSummary {
        user: UserDto::from(&user),
        default_currency: billing.default_currency().to_string(),
        payments: service
            .list_payments(user.id(), PageParams::default())?
            .total_count,
        subscriptions: service
            .list_subscriptions(user.id(), PageParams::default())?
            .total_count,
        payment_methods: service.list_payment_methods(user.id())?.len(),
        queued_tasks: queue
            .tasks()
            .into_iter()
            .map(|task| task.kind.label())
            .collect(),
    };
    print_json("\nSummary", &summary);
    Ok(())
}

fn run_payment_walkthrough(
    service: &DemoService,
    user: &User,
    rent: Decimal,
) -> Result<(), AppError> {
    println!("\nPayments");
    let payment = service.initiate_payment(CreatePaymentRequest {
        user_id: user.id(),
        amount: rent,
        currency: None,
        method_type: PaymentMethodType::BankAccount,
        description: Some("Monthly rent".to_string()),
    })?;
    println!(
        "- initiated {} {} ({})",
        payment.amount,
        payment.currency,
        payment.status.label()
    );

    service.record_payment_outcome(payment.id, PaymentOutcome::Processing)?;
    let settled = service.record_payment_outcome(
        payment.id,
        PaymentOutcome::Succeeded {
            gateway_reference: Some(format!("demo_{}", payment.id)),
        },
    )?;
    println!("- gateway settled payment ({})", settled.status.label());

    let refund = Money::new(settled.amount / Decimal::from(10), &settled.currency)
        .map_err(BillingServiceError::from)?;
    let refunded = service.record_payment_outcome(
        payment.id,
        PaymentOutcome::Refunded {
            amount: refund.clone(),
        },
    )?;
    println!(
        "- refunded {} ({}; {} refunded so far)",
        refund,
        refunded.status.label(),
        refunded.refunded_amount
    );

    match service.record_payment_outcome(payment.id, PaymentOutcome::Cancelled) {
        Ok(_) => println!("- unexpected: settled payment was cancelled"),
        Err(err) => println!("- cancel after settlement rejected: {err}"),
    }

    print_json("  Payment payload", &refunded);
    Ok(())
}

fn run_payment_method_walkthrough(service: &DemoService, user: &User) -> Result<(), AppError> {
    println!("\nPayment methods");
    let card = service.add_payment_method(AddPaymentMethodRequest {
        user_id: user.id(),
        method_type: PaymentMethodType::Card,
        last_four: "4242".to_string(),
        brand: Some("Visa".to_string()),
        expiry_month: Some(8),
        expiry_year: Some(2029),
        make_default: false,
    })?;
    let bank = service.add_payment_method(AddPaymentMethodRequest {
        user_id: user.id(),
        method_type: PaymentMethodType::BankAccount,
        last_four: "6789".to_string(),
        brand: None,
        expiry_month: None,
        expiry_year: None,
        make_default: false,
    })?;
    println!("- added {} (default: {})", card.display_name, card.is_default);
    println!("- added {} (default: {})", bank.display_name, bank.is_default);

    service.set_default_payment_method(user.id(), bank.id)?;
    service.remove_payment_method(user.id(), card.id)?;
    for method in service.list_payment_methods(user.id())? {
        println!(
            "- active: {}{}",
            method.display_name,
            if method.is_default { " [default]" } else { "" }
        );
    }
    Ok(())
}

fn run_subscription_walkthrough(
    service: &DemoService,
    user: &User,
    currency: &str,
) -> Result<(), AppError> {
    println!("\nSubscriptions");
    let subscription = service.create_subscription(CreateSubscriptionRequest {
        user_id: user.id(),
        plan_id: "renters-insurance".to_string(),
        amount: Decimal::new(1299, 2),
        currency: Some(currency.to_string()),
        trial_days: Some(14),
        gateway_reference: None,
    })?;
    println!(
        "- {} started ({}, active: {})",
        subscription.plan_id,
        subscription.status.label(),
        subscription.is_active
    );

    let period_start = Utc::now();
    let events = [
        SubscriptionEvent::Activated {
            period_start,
            period_end: period_start + Duration::days(30),
        },
        SubscriptionEvent::PaymentFailed,
        SubscriptionEvent::Renewed {
            period_end: period_start + Duration::days(60),
        },
        SubscriptionEvent::Canceled,
    ];
    let mut latest = subscription;
    for event in events {
        latest = service.apply_subscription_event(latest.id, event)?;
        println!(
            "- now {} (active: {})",
            latest.status.label(),
            latest.is_active
        );
    }

    print_json("  Subscription payload", &latest);
    Ok(())
}

fn print_json<T: Serialize>(heading: &str, value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{heading}:\n{json}"),
        Err(err) => println!("{heading} unavailable: {err}"),
    }
}
