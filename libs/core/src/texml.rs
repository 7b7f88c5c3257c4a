//! Call-menu generation: semantic prompts rendered to TeXML.

use std::fmt::Write as _;

use crate::config::{MenuDigits, TelnyxConfig};
use crate::types::{ActionKind, Alert};

const GATHER_TIMEOUT_SECS: u8 = 10;

pub const GENERIC_MESSAGE: &str = "This is a notification from your alerting system.";
pub const ALERT_FALLBACK_MESSAGE: &str =
    "You have a critical alert. Details could not be loaded. Please check your dashboard.";
pub const TEST_MESSAGE: &str = "This is a test message from your alerting system. \
     If you are hearing this, your voice configuration is correct.";
pub const ACTION_FAILED_MESSAGE: &str =
    "Sorry, your request could not be processed. Please try again later.";

/// One TeXML instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Say(String),
    Gather {
        num_digits: u8,
        timeout_secs: u8,
        children: Vec<Verb>,
    },
    Pause(u8),
    Hangup,
}

/// Ordered instruction list for a single webhook response. Built fresh per
/// request and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VoicePrompt {
    verbs: Vec<Verb>,
}

impl VoicePrompt {
    pub fn new(verbs: Vec<Verb>) -> Self {
        Self { verbs }
    }

    pub fn verbs(&self) -> &[Verb] {
        &self.verbs
    }

    /// Renders the `<Response>` document.
    ///
    /// ```
    /// use tnx_core::{Verb, VoicePrompt};
    ///
    /// let xml = VoicePrompt::new(vec![Verb::Say("Hi & bye".into()), Verb::Hangup])
    ///     .render("alice", "en-US");
    /// assert!(xml.ends_with(
    ///     "<Response><Say voice=\"alice\" language=\"en-US\">Hi &amp; bye</Say><Hangup/></Response>"
    /// ));
    /// ```
    pub fn render(&self, voice: &str, language: &str) -> String {
        let mut out = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        out.push_str("<Response>");
        for verb in &self.verbs {
            render_verb(&mut out, verb, voice, language);
        }
        out.push_str("</Response>");
        out
    }
}

fn render_verb(out: &mut String, verb: &Verb, voice: &str, language: &str) {
    match verb {
        Verb::Say(text) => {
            let _ = write!(
                out,
                r#"<Say voice="{}" language="{}">{}</Say>"#,
                escape(voice),
                escape(language),
                escape(text)
            );
        }
        Verb::Gather {
            num_digits,
            timeout_secs,
            children,
        } => {
            let _ = write!(
                out,
                r#"<Gather numDigits="{num_digits}" timeout="{timeout_secs}" method="POST">"#
            );
            for child in children {
                render_verb(out, child, voice, language);
            }
            out.push_str("</Gather>");
        }
        Verb::Pause(length) => {
            let _ = write!(out, r#"<Pause length="{length}"/>"#);
        }
        Verb::Hangup => out.push_str("<Hangup/>"),
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c if c.is_control() && c != '\n' && c != '\t' => escaped.push(' '),
            c => escaped.push(c),
        }
    }
    escaped
}

/// What the caller should hear next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallMenu {
    /// Alert details followed by the keypad menu.
    Alert(Alert),
    /// Alert whose details could not be loaded; the menu is still offered
    /// when the alert reference is known.
    AlertUnavailable { alert_id: Option<i64> },
    Confirmation(ActionKind),
    Verification { code: String },
    Test,
    Generic,
    ActionFailed,
    Hangup,
}

/// Turns [`CallMenu`] intents into rendered markup using the configured
/// voice and keypad digits.
#[derive(Debug, Clone)]
pub struct CallMenuGenerator {
    voice: String,
    language: String,
    digits: MenuDigits,
}

impl CallMenuGenerator {
    pub fn new(cfg: &TelnyxConfig) -> Self {
        Self {
            voice: cfg.voice_name.clone(),
            language: cfg.voice_language.clone(),
            digits: cfg.digits.clone(),
        }
    }

    /// Maps a pressed key to the alert action it stands for.
    pub fn action_for_digit(&self, digits: &str) -> Option<ActionKind> {
        let pressed = digits.trim();
        if pressed == self.digits.acknowledge {
            Some(ActionKind::Acknowledge)
        } else if pressed == self.digits.close {
            Some(ActionKind::Close)
        } else if pressed == self.digits.unsubscribe {
            Some(ActionKind::Unsubscribe)
        } else {
            None
        }
    }

    pub fn prompt(&self, menu: &CallMenu) -> VoicePrompt {
        match menu {
            CallMenu::Alert(alert) => self.with_menu(alert_text(alert)),
            CallMenu::AlertUnavailable { alert_id: Some(_) } => {
                self.with_menu(ALERT_FALLBACK_MESSAGE.to_string())
            }
            CallMenu::AlertUnavailable { alert_id: None } => {
                say_and_hangup(ALERT_FALLBACK_MESSAGE)
            }
            CallMenu::Confirmation(kind) => say_and_hangup(confirmation_text(*kind)),
            CallMenu::Verification { code } => VoicePrompt::new(vec![
                Verb::Gather {
                    num_digits: 1,
                    timeout_secs: GATHER_TIMEOUT_SECS,
                    children: vec![
                        Verb::Say(format!(
                            "Your verification code is: {code}. Repeat: {code}."
                        )),
                        Verb::Say("Press any key to hear the code again.".into()),
                    ],
                },
                Verb::Say("Goodbye.".into()),
                Verb::Hangup,
            ]),
            CallMenu::Test => say_and_hangup(TEST_MESSAGE),
            CallMenu::Generic => say_and_hangup(GENERIC_MESSAGE),
            CallMenu::ActionFailed => say_and_hangup(ACTION_FAILED_MESSAGE),
            CallMenu::Hangup => VoicePrompt::new(vec![Verb::Hangup]),
        }
    }

    pub fn render(&self, menu: &CallMenu) -> String {
        self.prompt(menu).render(&self.voice, &self.language)
    }

    fn with_menu(&self, text: String) -> VoicePrompt {
        let instructions = format!(
            "Press {} to acknowledge, {} to close, or {} to stop all calls to this number. \
             Press any other key to repeat this message.",
            self.digits.acknowledge, self.digits.close, self.digits.unsubscribe
        );
        VoicePrompt::new(vec![
            Verb::Gather {
                num_digits: 1,
                timeout_secs: GATHER_TIMEOUT_SECS,
                children: vec![Verb::Say(text), Verb::Pause(1), Verb::Say(instructions)],
            },
            Verb::Say("Goodbye.".into()),
            Verb::Hangup,
        ])
    }
}

fn say_and_hangup(text: impl Into<String>) -> VoicePrompt {
    VoicePrompt::new(vec![Verb::Say(text.into()), Verb::Hangup])
}

fn alert_text(alert: &Alert) -> String {
    let details = alert.details.trim();
    if details.is_empty() {
        format!("Alert {}: {}.", alert.id, alert.summary.trim())
    } else {
        format!("Alert {}: {}. {}", alert.id, alert.summary.trim(), details)
    }
}

fn confirmation_text(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::Acknowledge => "Acknowledged. Goodbye.",
        ActionKind::Close => "Closed. Goodbye.",
        ActionKind::Unsubscribe => {
            "Unsubscribed. You will no longer receive calls at this number. Goodbye."
        }
        ActionKind::Resubscribe => "Resubscribed. Goodbye.",
    }
}
