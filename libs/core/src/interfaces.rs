//! Narrow seams to the host alerting system. Implementations own their
//! connections; the adapter only invokes them.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{LookupError, SinkError};
use crate::types::{Alert, AlertAction, StatusUpdate};

/// Supplies alert text by id.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn find_alert(&self, alert_id: i64) -> Result<Alert, LookupError>;
}

/// Receives lifecycle intents and delivery updates.
#[async_trait]
pub trait ActionSink: Send + Sync {
    async fn record_action(&self, action: AlertAction) -> Result<(), SinkError>;

    async fn record_status(&self, update: StatusUpdate) -> Result<(), SinkError>;
}

pub type SharedAlertStore = Arc<dyn AlertStore>;
pub type SharedActionSink = Arc<dyn ActionSink>;
