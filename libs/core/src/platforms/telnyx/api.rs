//! Telnyx v2 wire structures shared by the sender and the webhook router.

use serde::{Deserialize, Serialize};

use crate::types::CarrierInfo;

#[derive(Debug, Serialize)]
pub(crate) struct SendMessageRequest<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CallInitiateRequest<'a> {
    pub to: &'a str,
    pub from: &'a str,
    pub url: &'a str,
    pub url_method: &'static str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CallData {
    #[serde(default)]
    pub sid: Option<String>,
    #[serde(default)]
    pub call_control_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NumberLookupData {
    #[serde(default)]
    pub carrier: CarrierInfo,
}

/// A phone number, either bare or as a Telnyx endpoint object.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Endpoint {
    Number(String),
    Detailed {
        phone_number: String,
        #[serde(default)]
        status: Option<String>,
    },
}

impl Endpoint {
    pub fn phone_number(&self) -> &str {
        match self {
            Endpoint::Number(number) => number,
            Endpoint::Detailed { phone_number, .. } => phone_number,
        }
    }

    pub fn status(&self) -> Option<&str> {
        match self {
            Endpoint::Number(_) => None,
            Endpoint::Detailed { status, .. } => status.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Endpoints {
    One(Endpoint),
    Many(Vec<Endpoint>),
}

impl Endpoints {
    pub fn first(&self) -> Option<&Endpoint> {
        match self {
            Endpoints::One(endpoint) => Some(endpoint),
            Endpoints::Many(list) => list.first(),
        }
    }
}

/// Message object returned by `POST /messages` and carried in message
/// webhooks.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MessagePayload {
    pub id: String,
    #[serde(default)]
    pub from: Option<Endpoint>,
    #[serde(default)]
    pub to: Option<Endpoints>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl MessagePayload {
    /// Top-level status, else the first recipient's.
    pub fn status(&self) -> &str {
        self.status
            .as_deref()
            .or_else(|| self.to.as_ref().and_then(Endpoints::first).and_then(Endpoint::status))
            .unwrap_or_default()
    }

    pub fn from_number(&self) -> Option<&str> {
        self.from.as_ref().map(Endpoint::phone_number)
    }

    pub fn to_number(&self) -> Option<&str> {
        self.to
            .as_ref()
            .and_then(Endpoints::first)
            .map(Endpoint::phone_number)
    }
}
