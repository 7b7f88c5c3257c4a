//! Classification of inbound SMS reply bodies.

use serde::{Deserialize, Serialize};

use crate::types::ActionKind;

const STOP_WORDS: &[&str] = &["stop", "stopall", "unsubscribe", "cancel", "end", "quit"];
const START_WORDS: &[&str] = &["start", "unstop", "yes", "subscribe"];
const ACK_WORDS: &[&str] = &["a", "ack", "acknowledge"];
const CLOSE_WORDS: &[&str] = &["c", "close", "resolve"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", content = "alert_id", rename_all = "snake_case")]
pub enum ReplyIntent {
    Acknowledge(Option<i64>),
    Close(Option<i64>),
    Unsubscribe,
    Resubscribe,
    /// A command word whose alert reference could not be read.
    BadReference,
    Unknown,
}

impl ReplyIntent {
    /// The lifecycle action to signal upward, if any.
    pub fn action(&self) -> Option<(ActionKind, Option<i64>)> {
        match *self {
            ReplyIntent::Acknowledge(id) => Some((ActionKind::Acknowledge, id)),
            ReplyIntent::Close(id) => Some((ActionKind::Close, id)),
            ReplyIntent::Unsubscribe => Some((ActionKind::Unsubscribe, None)),
            ReplyIntent::Resubscribe => Some((ActionKind::Resubscribe, None)),
            ReplyIntent::BadReference | ReplyIntent::Unknown => None,
        }
    }

    /// Text sent back to the replier. Unsubscribe has none since the carrier
    /// answers STOP itself; unrecognised text has none so auto-responders
    /// cannot loop with us.
    pub fn confirmation(&self) -> Option<String> {
        match *self {
            ReplyIntent::Acknowledge(Some(id)) => Some(format!("Acknowledged alert #{id}.")),
            ReplyIntent::Acknowledge(None) => Some("Acknowledged.".into()),
            ReplyIntent::Close(Some(id)) => Some(format!("Closed alert #{id}.")),
            ReplyIntent::Close(None) => Some("Closed.".into()),
            ReplyIntent::Resubscribe => {
                Some("Resubscribed. You will receive notifications again.".into())
            }
            ReplyIntent::Unsubscribe | ReplyIntent::Unknown => None,
            ReplyIntent::BadReference => Some(
                "Sorry, that alert number was not recognised. Reply 'ack' to acknowledge, \
                 'close' to close, or 'stop' to unsubscribe."
                    .into(),
            ),
        }
    }
}

/// Parses a reply, ignoring case and surrounding/internal whitespace.
///
/// ```
/// use tnx_core::{ReplyIntent, parse_reply};
///
/// assert_eq!(parse_reply(" Stop "), ReplyIntent::Unsubscribe);
/// assert_eq!(parse_reply("START"), ReplyIntent::Resubscribe);
/// assert_eq!(parse_reply("12a"), ReplyIntent::Acknowledge(Some(12)));
/// assert_eq!(parse_reply("close 7"), ReplyIntent::Close(Some(7)));
/// ```
pub fn parse_reply(body: &str) -> ReplyIntent {
    let normalized = body
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    if normalized.is_empty() {
        return ReplyIntent::Unknown;
    }
    if STOP_WORDS.contains(&normalized.as_str()) {
        return ReplyIntent::Unsubscribe;
    }
    if START_WORDS.contains(&normalized.as_str()) {
        return ReplyIntent::Resubscribe;
    }

    let (reference, word) = split_reference(&normalized);
    let is_command = ACK_WORDS.contains(&word) || CLOSE_WORDS.contains(&word);
    let alert_id = match reference {
        Reference::None => None,
        Reference::Id(id) => Some(id),
        Reference::Unreadable if is_command => return ReplyIntent::BadReference,
        Reference::Unreadable => return ReplyIntent::Unknown,
    };
    if ACK_WORDS.contains(&word) {
        ReplyIntent::Acknowledge(alert_id)
    } else if CLOSE_WORDS.contains(&word) {
        ReplyIntent::Close(alert_id)
    } else {
        ReplyIntent::Unknown
    }
}

/// Alert number found next to a command word. `Unreadable` digits must never
/// fall back to an unreferenced action, which the host would resolve by phone
/// number to some other alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reference {
    None,
    Id(i64),
    Unreadable,
}

impl Reference {
    fn parse(digits: &str) -> Self {
        digits
            .parse::<i64>()
            .map(Reference::Id)
            .unwrap_or(Reference::Unreadable)
    }
}

/// Splits `"42a"`, `"42 ack"` or `"ack 42"` into the alert reference and the
/// command word.
fn split_reference(text: &str) -> (Reference, &str) {
    let digits_end = text
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    if digits_end > 0 {
        return (
            Reference::parse(&text[..digits_end]),
            text[digits_end..].trim(),
        );
    }

    if let Some((word, tail)) = text.rsplit_once(' ') {
        if !tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit()) {
            return (Reference::parse(tail), word.trim());
        }
    }
    (Reference::None, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_and_start_ignore_case_and_whitespace() {
        for body in ["stop", "STOP", " Stop ", "\tsToP\n", "unsubscribe"] {
            assert_eq!(parse_reply(body), ReplyIntent::Unsubscribe, "{body:?}");
        }
        for body in ["start", "START", "  Start", "unstop"] {
            assert_eq!(parse_reply(body), ReplyIntent::Resubscribe, "{body:?}");
        }
    }

    #[test]
    fn ack_and_close_with_and_without_reference() {
        assert_eq!(parse_reply("ack"), ReplyIntent::Acknowledge(None));
        assert_eq!(parse_reply("1a"), ReplyIntent::Acknowledge(Some(1)));
        assert_eq!(parse_reply("42 Ack"), ReplyIntent::Acknowledge(Some(42)));
        assert_eq!(parse_reply("close"), ReplyIntent::Close(None));
        assert_eq!(parse_reply(" 9C "), ReplyIntent::Close(Some(9)));
        assert_eq!(parse_reply("close   15"), ReplyIntent::Close(Some(15)));
    }

    #[test]
    fn anything_else_is_unknown() {
        for body in ["", "   ", "hello", "42", "stop now", "acked", "99z"] {
            assert_eq!(parse_reply(body), ReplyIntent::Unknown, "{body:?}");
        }
    }

    #[test]
    fn overflowing_reference_is_never_an_unreferenced_action() {
        for body in ["99999999999999999999a", "99999999999999999999 close", "ack 99999999999999999999"] {
            assert_eq!(parse_reply(body), ReplyIntent::BadReference, "{body:?}");
        }
        assert_eq!(parse_reply("99999999999999999999"), ReplyIntent::Unknown);
        assert!(ReplyIntent::BadReference.action().is_none());
        assert!(
            ReplyIntent::BadReference
                .confirmation()
                .is_some_and(|text| text.contains("not recognised"))
        );
    }

    #[test]
    fn confirmations_per_intent() {
        assert_eq!(
            ReplyIntent::Close(Some(3)).confirmation().as_deref(),
            Some("Closed alert #3.")
        );
        assert!(ReplyIntent::Unsubscribe.confirmation().is_none());
        assert!(ReplyIntent::Unknown.confirmation().is_none());
        assert_eq!(
            ReplyIntent::Resubscribe.action(),
            Some((ActionKind::Resubscribe, None))
        );
        assert_eq!(ReplyIntent::Unknown.action(), None);
    }
}
