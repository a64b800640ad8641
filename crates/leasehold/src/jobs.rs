//! Outbound background work, handed to whichever job runner backs [`TaskQueue`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    SendPaymentReceipt,
    NotifyPaymentFailure,
    SendRefundNotice,
    SyncSubscription,
    SendCancellationNotice,
}

impl TaskKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::SendPaymentReceipt => "send_payment_receipt",
            Self::NotifyPaymentFailure => "notify_payment_failure",
            Self::SendRefundNotice => "send_refund_notice",
            Self::SyncSubscription => "sync_subscription",
            Self::SendCancellationNotice => "send_cancellation_notice",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Task as recorded by a queue implementation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedTask {
    pub id: TaskId,
    pub kind: TaskKind,
    pub payload: Value,
}

/// Fire-and-forget work queue. Implementations decide how and when tasks run.
pub trait TaskQueue: Send + Sync {
    fn enqueue(&self, kind: TaskKind, payload: Value) -> Result<TaskId, QueueError>;
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("task queue unavailable: {0}")]
    Unavailable(String),
}
