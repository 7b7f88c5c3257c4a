//! In-memory collaborators for exercising webhook and dispatch flows in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::egress::EgressSender;
use crate::error::{DispatchError, LookupError, SinkError};
use crate::interfaces::{ActionSink, AlertStore};
use crate::types::{
    Alert, AlertAction, DeliveryState, DispatchResult, MessageKind, Notification, StatusUpdate,
};

fn guard<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Alert store backed by a map. Unknown ids yield [`LookupError::NotFound`]
/// unless the store was built with [`InMemoryAlertStore::unavailable`].
#[derive(Default)]
pub struct InMemoryAlertStore {
    alerts: Mutex<HashMap<i64, Alert>>,
    unavailable: bool,
    lookups: AtomicUsize,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every lookup fails with a backend error.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn with_alert(self, alert: Alert) -> Self {
        self.insert(alert);
        self
    }

    pub fn insert(&self, alert: Alert) {
        guard(&self.alerts).insert(alert.id, alert);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AlertStore for InMemoryAlertStore {
    async fn find_alert(&self, alert_id: i64) -> Result<Alert, LookupError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(LookupError::Backend("store unavailable".into()));
        }
        guard(&self.alerts)
            .get(&alert_id)
            .cloned()
            .ok_or(LookupError::NotFound(alert_id))
    }
}

/// Sink that keeps everything it receives.
#[derive(Default)]
pub struct RecordingSink {
    actions: Mutex<Vec<AlertAction>>,
    statuses: Mutex<Vec<StatusUpdate>>,
    fail_actions: bool,
    stalled: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects every action; status updates are still recorded.
    pub fn failing() -> Self {
        Self {
            fail_actions: true,
            ..Self::default()
        }
    }

    /// Never completes a write, like a host that stopped reading.
    pub fn stalled() -> Self {
        Self {
            stalled: true,
            ..Self::default()
        }
    }

    async fn stall_if_configured(&self) {
        if self.stalled {
            std::future::pending::<()>().await;
        }
    }

    pub fn actions(&self) -> Vec<AlertAction> {
        guard(&self.actions).clone()
    }

    pub fn statuses(&self) -> Vec<StatusUpdate> {
        guard(&self.statuses).clone()
    }
}

#[async_trait]
impl ActionSink for RecordingSink {
    async fn record_action(&self, action: AlertAction) -> Result<(), SinkError> {
        self.stall_if_configured().await;
        if self.fail_actions {
            return Err(SinkError("sink rejected action".into()));
        }
        guard(&self.actions).push(action);
        Ok(())
    }

    async fn record_status(&self, update: StatusUpdate) -> Result<(), SinkError> {
        self.stall_if_configured().await;
        guard(&self.statuses).push(update);
        Ok(())
    }
}

/// One call observed by [`RecordingSender`].
#[derive(Debug, Clone, PartialEq)]
pub enum SentItem {
    Notification {
        destination: String,
        kind: MessageKind,
        notification: Notification,
    },
    Text {
        destination: String,
        body: String,
    },
}

/// Sender that accepts everything without touching the network.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<SentItem>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentItem> {
        guard(&self.sent).clone()
    }

    fn accept(&self, item: SentItem) -> DispatchResult {
        let mut sent = guard(&self.sent);
        sent.push(item);
        DispatchResult {
            external_id: format!("recorded-{}", sent.len()),
            state: DeliveryState::Sending,
            source: "+15550000000".into(),
        }
    }
}

#[async_trait]
impl EgressSender for RecordingSender {
    async fn send(
        &self,
        destination: &str,
        kind: MessageKind,
        notification: &Notification,
    ) -> Result<DispatchResult, DispatchError> {
        Ok(self.accept(SentItem::Notification {
            destination: destination.to_string(),
            kind,
            notification: notification.clone(),
        }))
    }

    async fn send_text(
        &self,
        destination: &str,
        body: &str,
    ) -> Result<DispatchResult, DispatchError> {
        Ok(self.accept(SentItem::Text {
            destination: destination.to_string(),
            body: body.to_string(),
        }))
    }
}
