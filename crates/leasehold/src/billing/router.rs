use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use super::domain::{
    PaymentId, PaymentMethodId, PaymentOutcome, SubscriptionEvent, SubscriptionId, UserId,
};
use super::dto::{AddPaymentMethodRequest, CreatePaymentRequest, CreateSubscriptionRequest};
use super::repository::{BillingRepository, RepositoryError};
use super::service::{BillingService, BillingServiceError};
use crate::jobs::TaskQueue;
use crate::pagination::PageParams;
use crate::values::DomainError;

/// Router builder exposing payment, subscription, and payment method endpoints.
pub fn billing_router<R, Q>(service: Arc<BillingService<R, Q>>) -> Router
where
    R: BillingRepository + 'static,
    Q: TaskQueue + 'static,
{
    Router::new()
        .route("/api/v1/payments", post(create_payment_handler::<R, Q>))
        .route("/api/v1/payments/:payment_id", get(payment_handler::<R, Q>))
        .route(
            "/api/v1/payments/:payment_id/events",
            post(payment_event_handler::<R, Q>),
        )
        .route(
            "/api/v1/users/:user_id/payments",
            get(list_payments_handler::<R, Q>),
        )
        .route(
            "/api/v1/subscriptions",
            post(create_subscription_handler::<R, Q>),
        )
        .route(
            "/api/v1/subscriptions/:subscription_id",
            get(subscription_handler::<R, Q>),
        )
        .route(
            "/api/v1/subscriptions/:subscription_id/events",
            post(subscription_event_handler::<R, Q>),
        )
        .route(
            "/api/v1/users/:user_id/subscriptions",
            get(list_subscriptions_handler::<R, Q>),
        )
        .route(
            "/api/v1/payment-methods",
            post(add_payment_method_handler::<R, Q>),
        )
        .route(
            "/api/v1/users/:user_id/payment-methods",
            get(list_payment_methods_handler::<R, Q>),
        )
        .route(
            "/api/v1/users/:user_id/payment-methods/:method_id",
            axum::routing::delete(remove_payment_method_handler::<R, Q>),
        )
        .route(
            "/api/v1/users/:user_id/payment-methods/:method_id/default",
            put(set_default_payment_method_handler::<R, Q>),
        )
        .with_state(service)
}

type SharedService<R, Q> = State<Arc<BillingService<R, Q>>>;

fn respond<T: Serialize>(status: StatusCode, result: Result<T, BillingServiceError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) fn error_status(error: &BillingServiceError) -> StatusCode {
    match error {
        BillingServiceError::Domain(DomainError::Validation { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        BillingServiceError::Domain(
            DomainError::InvalidOperation(_) | DomainError::InvalidTransition { .. },
        ) => StatusCode::CONFLICT,
        BillingServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        BillingServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        BillingServiceError::Ownership { .. } => StatusCode::FORBIDDEN,
        BillingServiceError::Repository(RepositoryError::Unavailable(_))
        | BillingServiceError::Queue(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: BillingServiceError) -> Response {
    let status = error_status(&error);
    if status.is_server_error() {
        tracing::error!(%error, "billing request failed");
    }
    let payload = json!({ "error": error.to_string() });
    (status, Json(payload)).into_response()
}

pub(crate) async fn create_payment_handler<R, Q>(
    State(service): SharedService<R, Q>,
    Json(request): Json<CreatePaymentRequest>,
) -> Response
where
    R: BillingRepository + 'static,
    Q: TaskQueue + 'static,
{
    respond(StatusCode::CREATED, service.initiate_payment(request))
}

pub(crate) async fn payment_handler<R, Q>(
    State(service): SharedService<R, Q>,
    Path(payment_id): Path<Uuid>,
) -> Response
where
    R: BillingRepository + 'static,
    Q: TaskQueue + 'static,
{
    respond(StatusCode::OK, service.payment(PaymentId(payment_id)))
}

pub(crate) async fn payment_event_handler<R, Q>(
    State(service): SharedService<R, Q>,
    Path(payment_id): Path<Uuid>,
    Json(outcome): Json<PaymentOutcome>,
) -> Response
where
    R: BillingRepository + 'static,
    Q: TaskQueue + 'static,
{
    respond(
        StatusCode::OK,
        service.record_payment_outcome(PaymentId(payment_id), outcome),
    )
}

pub(crate) async fn list_payments_handler<R, Q>(
    State(service): SharedService<R, Q>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Response
where
    R: BillingRepository + 'static,
    Q: TaskQueue + 'static,
{
    respond(StatusCode::OK, service.list_payments(UserId(user_id), params))
}

pub(crate) async fn create_subscription_handler<R, Q>(
    State(service): SharedService<R, Q>,
    Json(request): Json<CreateSubscriptionRequest>,
) -> Response
where
    R: BillingRepository + 'static,
    Q: TaskQueue + 'static,
{
    respond(StatusCode::CREATED, service.create_subscription(request))
}

pub(crate) async fn subscription_handler<R, Q>(
    State(service): SharedService<R, Q>,
    Path(subscription_id): Path<Uuid>,
) -> Response
where
    R: BillingRepository + 'static,
    Q: TaskQueue + 'static,
{
    respond(
        StatusCode::OK,
        service.subscription(SubscriptionId(subscription_id)),
    )
}

pub(crate) async fn subscription_event_handler<R, Q>(
    State(service): SharedService<R, Q>,
    Path(subscription_id): Path<Uuid>,
    Json(event): Json<SubscriptionEvent>,
) -> Response
where
    R: BillingRepository + 'static,
    Q: TaskQueue + 'static,
{
    respond(
        StatusCode::OK,
        service.apply_subscription_event(SubscriptionId(subscription_id), event),
    )
}

pub(crate) async fn list_subscriptions_handler<R, Q>(
    State(service): SharedService<R, Q>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Response
where
    R: BillingRepository + 'static,
    Q: TaskQueue + 'static,
{
    respond(
        StatusCode::OK,
        service.list_subscriptions(UserId(user_id), params),
    )
}

pub(crate) async fn add_payment_method_handler<R, Q>(
    State(service): SharedService<R, Q>,
    Json(request): Json<AddPaymentMethodRequest>,
) -> Response
where
    R: BillingRepository + 'static,
    Q: TaskQueue + 'static,
{
    respond(StatusCode::CREATED, service.add_payment_method(request))
}

pub(crate) async fn list_payment_methods_handler<R, Q>(
    State(service): SharedService<R, Q>,
    Path(user_id): Path<Uuid>,
) -> Response
where
    R: BillingRepository + 'static,
    Q: TaskQueue + 'static,
{
    respond(StatusCode::OK, service.list_payment_methods(UserId(user_id)))
}

pub(crate) async fn set_default_payment_method_handler<R, Q>(
    State(service): SharedService<R, Q>,
    Path((user_id, method_id)): Path<(Uuid, Uuid)>,
) -> Response
where
    R: BillingRepository + 'static,
    Q: TaskQueue + 'static,
{
    respond(
        StatusCode::OK,
        service.set_default_payment_method(UserId(user_id), PaymentMethodId(method_id)),
    )
}

pub(crate) async fn remove_payment_method_handler<R, Q>(
    State(service): SharedService<R, Q>,
    Path((user_id, method_id)): Path<(Uuid, Uuid)>,
) -> Response
where
    R: BillingRepository + 'static,
    Q: TaskQueue + 'static,
{
    respond(
        StatusCode::OK,
        service.remove_payment_method(UserId(user_id), PaymentMethodId(method_id)),
    )
}
