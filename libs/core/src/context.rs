//! Callback context carried in the voice callback URL.
//!
//! The dispatcher encodes intent and references into the query string and the
//! provider echoes the URL back on every webhook, so any instance can answer a
//! callback without shared call state.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::Notification;

const TYPE_PARAM: &str = "type";
const ALERT_PARAM: &str = "alertID";
const CODE_PARAM: &str = "code";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Alert,
    Verification,
    Test,
    Default,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Alert => "alert",
            Intent::Verification => "verify",
            Intent::Test => "test",
            Intent::Default => "default",
        }
    }

    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "alert" => Intent::Alert,
            "verify" | "verification" => Intent::Verification,
            "test" => Intent::Test,
            _ => Intent::Default,
        }
    }
}

/// Immutable, parsed fresh for every inbound request.
///
/// ```
/// use tnx_core::{CallbackContext, Intent};
///
/// let ctx = CallbackContext::from_query("type=alert&alertID=42");
/// assert_eq!(ctx.intent, Intent::Alert);
/// assert_eq!(ctx.alert_id, Some(42));
///
/// let broken = CallbackContext::from_query("type=alert&alertID=forty-two");
/// assert_eq!(broken.alert_id, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackContext {
    pub intent: Intent,
    pub alert_id: Option<i64>,
    pub code: Option<String>,
}

impl Default for CallbackContext {
    fn default() -> Self {
        Self {
            intent: Intent::Default,
            alert_id: None,
            code: None,
        }
    }
}

impl CallbackContext {
    pub fn for_notification(notification: &Notification) -> Self {
        match notification {
            Notification::Test => Self {
                intent: Intent::Test,
                ..Self::default()
            },
            Notification::Alert { alert_id, .. } => Self {
                intent: Intent::Alert,
                alert_id: Some(*alert_id),
                code: None,
            },
            Notification::Verification { code } => Self {
                intent: Intent::Verification,
                alert_id: None,
                code: Some(code.clone()),
            },
        }
    }

    /// Builds a context from decoded query pairs. Never fails: unknown intents
    /// become `Default` and unparsable references are dropped.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut ctx = Self::default();
        for (key, value) in pairs {
            match key {
                TYPE_PARAM => ctx.intent = Intent::parse(value),
                ALERT_PARAM => ctx.alert_id = value.trim().parse::<i64>().ok(),
                CODE_PARAM => {
                    let code = value.trim();
                    ctx.code = (!code.is_empty()).then(|| code.to_string());
                }
                _ => {}
            }
        }
        ctx
    }

    pub fn from_query(query: &str) -> Self {
        let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        Self::from_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// Appends this context to `base`, keeping any query the base already has.
    pub fn apply_to(&self, base: &Url) -> Url {
        let mut url = base.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair(TYPE_PARAM, self.intent.as_str());
            if let Some(id) = self.alert_id {
                query.append_pair(ALERT_PARAM, &id.to_string());
            }
            if let Some(code) = &self.code {
                query.append_pair(CODE_PARAM, code);
            }
        }
        url
    }
}
