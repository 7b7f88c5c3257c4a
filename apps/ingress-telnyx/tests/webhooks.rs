use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use ed25519_dalek::{Signer, SigningKey};
use http_body_util::BodyExt;
use rand::RngCore;
use tnx_core::testkit::{InMemoryAlertStore, RecordingSender, RecordingSink, SentItem};
use tnx_core::{
    ACTION_FAILED_MESSAGE, ALERT_FALLBACK_MESSAGE, ActionKind, ActionSource, Alert,
    DeliveryState, TelnyxConfig,
};
use tnx_ingress_telnyx::{AppState, REQUEST_ID_HEADER, router};
use tnx_security::SignatureVerifier;
use tower::ServiceExt;
use tracing_test::traced_test;

const TIMESTAMP: &str = "1700000000";

struct Harness {
    key: SigningKey,
    store: Arc<InMemoryAlertStore>,
    sink: Arc<RecordingSink>,
    sender: Arc<RecordingSender>,
    app: Router,
}

impl Harness {
    fn new(store: InMemoryAlertStore, sink: RecordingSink) -> Self {
        Self::with_config(store, sink, TelnyxConfig::default())
    }

    fn with_config(store: InMemoryAlertStore, sink: RecordingSink, config: TelnyxConfig) -> Self {
        let mut seed = [0u8; 32];
        rand::rng().fill_bytes(&mut seed);
        let key = SigningKey::from_bytes(&seed);

        let store = Arc::new(store);
        let sink = Arc::new(sink);
        let sender = Arc::new(RecordingSender::new());
        let state = AppState::new(
            Arc::new(config),
            store.clone(),
            sink.clone(),
            sender.clone(),
        );
        let verifier = SignatureVerifier::from_key(key.verifying_key());
        let app = router(state, Arc::new(verifier));
        Self {
            key,
            store,
            sink,
            sender,
            app,
        }
    }

    fn with_alert_42() -> Self {
        Self::new(
            InMemoryAlertStore::new().with_alert(Alert {
                id: 42,
                summary: "Server Down".into(),
                details: "CPU at 100%".into(),
            }),
            RecordingSink::new(),
        )
    }

    fn signed(&self, uri: &str, content_type: &str, body: &str) -> Request<Body> {
        let mut payload = TIMESTAMP.as_bytes().to_vec();
        payload.extend_from_slice(body.as_bytes());
        let signature = B64.encode(self.key.sign(&payload).to_bytes());
        Request::post(uri)
            .header(header::CONTENT_TYPE, content_type)
            .header("X-Telnyx-Signature-Ed25519", signature)
            .header("X-Telnyx-Timestamp", TIMESTAMP)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn voice(&self, query: &str, form: &str) -> Request<Body> {
        self.signed(
            &format!("/telnyx/voice?{query}"),
            "application/x-www-form-urlencoded",
            form,
        )
    }

    fn sms(&self, json: &str) -> Request<Body> {
        self.signed("/telnyx/sms", "application/json", json)
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, String) {
        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }
}

const IN_PROGRESS: &str =
    "CallSid=CA42&CallStatus=in-progress&From=%2B15550009999&To=%2B15550000001";

fn inbound_sms(from: &str, text: &str) -> String {
    serde_json::json!({
        "data": {
            "event_type": "message.received",
            "id": "evt-1",
            "payload": {
                "id": "msg-in-1",
                "from": {"phone_number": from},
                "to": [{"phone_number": "+15550009999"}],
                "text": text
            }
        }
    })
    .to_string()
}

#[tokio::test]
async fn alert_call_speaks_summary() {
    let h = Harness::with_alert_42();
    let resp = h
        .app
        .clone()
        .oneshot(h.voice("type=alert&alertID=42", IN_PROGRESS))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/xml"
    );
    assert!(resp.headers().contains_key(REQUEST_ID_HEADER));
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let xml = String::from_utf8(body.to_vec()).unwrap();
    assert!(xml.contains("Alert 42: Server Down"), "{xml}");
    assert!(xml.contains(r#"<Say voice="alice" language="en-US">"#));
    assert!(xml.contains("<Gather"));
}

#[tokio::test]
async fn replayed_voice_webhook_yields_identical_markup() {
    let h = Harness::with_alert_42();
    let (_, first) = h.send(h.voice("type=alert&alertID=42", IN_PROGRESS)).await;
    let (_, second) = h.send(h.voice("type=alert&alertID=42", IN_PROGRESS)).await;
    assert_eq!(first, second);

    let pressed = format!("{IN_PROGRESS}&Digits=4");
    let (_, ack_one) = h.send(h.voice("type=alert&alertID=42", &pressed)).await;
    let (_, ack_two) = h.send(h.voice("type=alert&alertID=42", &pressed)).await;
    assert_eq!(ack_one, ack_two);
}

#[tokio::test]
async fn close_digit_records_close_and_confirms() {
    let h = Harness::with_alert_42();
    let (status, xml) = h
        .send(h.voice(
            "type=alert&alertID=42",
            &format!("{IN_PROGRESS}&Digits=5"),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(xml.contains("Closed. Goodbye."), "{xml}");
    assert!(xml.contains("<Hangup/>"));

    let actions = h.sink.actions();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].kind, ActionKind::Close);
    assert_eq!(actions[0].alert_id, Some(42));
    assert_eq!(actions[0].phone_number, "+15550000001");
    assert_eq!(
        actions[0].source,
        ActionSource::Voice {
            call_sid: "CA42".into()
        }
    );
}

#[tokio::test]
async fn acknowledge_and_unsubscribe_digits() {
    let h = Harness::with_alert_42();
    let (_, ack) = h
        .send(h.voice("type=alert&alertID=42", &format!("{IN_PROGRESS}&Digits=4")))
        .await;
    assert!(ack.contains("Acknowledged. Goodbye."));
    let (_, unsub) = h
        .send(h.voice("type=alert&alertID=42", &format!("{IN_PROGRESS}&Digits=1")))
        .await;
    assert!(unsub.contains("Unsubscribed."));

    let kinds: Vec<_> = h.sink.actions().iter().map(|a| a.kind).collect();
    assert_eq!(kinds, vec![ActionKind::Acknowledge, ActionKind::Unsubscribe]);
}

#[tokio::test]
async fn unmapped_digit_repeats_the_prompt() {
    let h = Harness::with_alert_42();
    let (status, xml) = h
        .send(h.voice("type=alert&alertID=42", &format!("{IN_PROGRESS}&Digits=9")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(xml.contains("Alert 42: Server Down"), "{xml}");
    assert!(h.sink.actions().is_empty());
}

#[tokio::test]
async fn unauthenticated_webhook_never_reaches_the_router() {
    let h = Harness::with_alert_42();
    let req = Request::post("/telnyx/voice?type=alert&alertID=42")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("X-Telnyx-Timestamp", TIMESTAMP)
        .body(Body::from(IN_PROGRESS))
        .unwrap();
    let (status, body) = h.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.is_empty());
    assert_eq!(h.store.lookups(), 0);
    assert!(h.sink.actions().is_empty());
}

#[tokio::test]
async fn tampered_body_is_rejected() {
    let h = Harness::with_alert_42();
    let mut req = h.voice("type=alert&alertID=42", &format!("{IN_PROGRESS}&Digits=4"));
    *req.body_mut() = Body::from(format!("{IN_PROGRESS}&Digits=5"));
    let (status, _) = h.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(h.sink.actions().is_empty());
}

#[traced_test]
#[tokio::test]
async fn failed_lookup_degrades_to_generic_alert() {
    let h = Harness::new(InMemoryAlertStore::unavailable(), RecordingSink::new());
    let (status, xml) = h.send(h.voice("type=alert&alertID=42", IN_PROGRESS)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(xml.contains(ALERT_FALLBACK_MESSAGE), "{xml}");
    assert!(xml.contains("Press 4 to acknowledge"));
    assert_eq!(h.store.lookups(), 1);
    assert!(logs_contain("alert lookup failed"));
}

#[tokio::test]
async fn malformed_alert_reference_still_speaks() {
    let h = Harness::with_alert_42();
    let (status, xml) = h
        .send(h.voice("type=alert&alertID=not-a-number", IN_PROGRESS))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(xml.contains(ALERT_FALLBACK_MESSAGE));
    assert_eq!(h.store.lookups(), 0);
}

#[tokio::test]
async fn missing_alert_degrades_to_generic_alert() {
    let h = Harness::with_alert_42();
    let (_, xml) = h.send(h.voice("type=alert&alertID=7", IN_PROGRESS)).await;
    assert!(xml.contains(ALERT_FALLBACK_MESSAGE));
}

#[tokio::test]
async fn action_sink_failure_apologises() {
    let h = Harness::new(
        InMemoryAlertStore::new().with_alert(Alert {
            id: 42,
            summary: "Server Down".into(),
            details: String::new(),
        }),
        RecordingSink::failing(),
    );
    let (status, xml) = h
        .send(h.voice("type=alert&alertID=42", &format!("{IN_PROGRESS}&Digits=5")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(xml.contains(ACTION_FAILED_MESSAGE));
}

#[tokio::test]
async fn verification_test_and_default_intents() {
    let h = Harness::with_alert_42();
    let (_, verify) = h.send(h.voice("type=verify&code=123456", IN_PROGRESS)).await;
    assert!(verify.contains("Your verification code is: 123456. Repeat: 123456."));

    let (_, test) = h.send(h.voice("type=test", IN_PROGRESS)).await;
    assert!(test.contains("This is a test message"));

    let (_, default) = h.send(h.voice("", IN_PROGRESS)).await;
    assert!(default.contains("This is a notification from your alerting system."));
}

#[tokio::test]
async fn completed_call_records_status_and_hangs_up() {
    let h = Harness::with_alert_42();
    let (status, xml) = h
        .send(h.voice(
            "type=alert&alertID=42",
            "CallSid=CA42&CallStatus=completed&From=%2B15550009999&To=%2B15550000001",
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(xml.ends_with("<Response><Hangup/></Response>"), "{xml}");
    let statuses = h.sink.statuses();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].external_id, "CA42");
    assert_eq!(statuses[0].state, DeliveryState::Delivered);
    assert_eq!(h.store.lookups(), 0);
}

#[tokio::test]
async fn stop_variants_unsubscribe_without_reply() {
    let h = Harness::with_alert_42();
    for body in ["stop", "STOP", " Stop "] {
        let (status, _) = h.send(h.sms(&inbound_sms("+15550000001", body))).await;
        assert_eq!(status, StatusCode::OK);
    }
    let actions = h.sink.actions();
    assert_eq!(actions.len(), 3);
    assert!(actions.iter().all(|a| a.kind == ActionKind::Unsubscribe));
    assert!(actions.iter().all(|a| a.phone_number == "+15550000001"));
    assert!(h.sender.sent().is_empty());
}

#[tokio::test]
async fn start_resubscribes_and_confirms() {
    let h = Harness::with_alert_42();
    h.send(h.sms(&inbound_sms("+15550000001", "START"))).await;
    assert_eq!(h.sink.actions()[0].kind, ActionKind::Resubscribe);
    assert_eq!(
        h.sender.sent(),
        vec![SentItem::Text {
            destination: "+15550000001".into(),
            body: "Resubscribed. You will receive notifications again.".into(),
        }]
    );
}

#[tokio::test]
async fn close_reply_with_reference() {
    let h = Harness::with_alert_42();
    let (status, body) = h.send(h.sms(&inbound_sms("+15550000001", "close 42"))).await;
    assert_eq!(status, StatusCode::OK);
    let ack: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(ack["ok"], true);

    let actions = h.sink.actions();
    assert_eq!(actions[0].kind, ActionKind::Close);
    assert_eq!(actions[0].alert_id, Some(42));
    assert_eq!(
        actions[0].source,
        ActionSource::Sms {
            message_id: "msg-in-1".into()
        }
    );
    assert_eq!(
        h.sender.sent(),
        vec![SentItem::Text {
            destination: "+15550000001".into(),
            body: "Closed alert #42.".into(),
        }]
    );
}

fn stalled_sink_harness() -> Harness {
    Harness::with_config(
        InMemoryAlertStore::new(),
        RecordingSink::stalled(),
        TelnyxConfig {
            lookup_timeout_ms: 50,
            ..TelnyxConfig::default()
        },
    )
}

#[tokio::test]
async fn stalled_sink_does_not_hold_voice_callback() {
    let h = stalled_sink_harness();
    let (status, xml) = h
        .send(h.voice(
            "type=alert&alertID=42",
            "CallSid=CA42&CallStatus=in-progress&From=%2B15550009999&To=%2B15550000001&Digits=4",
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(xml.contains(ACTION_FAILED_MESSAGE), "{xml}");

    let (status, xml) = h
        .send(h.voice(
            "type=alert&alertID=42",
            "CallSid=CA42&CallStatus=completed&From=%2B15550009999&To=%2B15550000001",
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(xml.ends_with("<Response><Hangup/></Response>"), "{xml}");
}

#[tokio::test]
async fn stalled_sink_does_not_hold_sms_webhook() {
    let h = stalled_sink_harness();
    let (status, body) = h.send(h.sms(&inbound_sms("+15550000001", "ack"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"ok\":true"));
    assert!(h.sender.sent().is_empty());
}

#[tokio::test]
async fn unrecognised_reply_is_not_answered() {
    let h = Harness::with_alert_42();
    for body in [
        "what is this",
        "Sorry, that alert number was not recognised. Reply 'ack' to acknowledge, 'close' to close, or 'stop' to unsubscribe.",
        "I am away until Monday.",
    ] {
        let (status, _) = h.send(h.sms(&inbound_sms("+15550000001", body))).await;
        assert_eq!(status, StatusCode::OK);
    }
    assert!(h.sink.actions().is_empty());
    assert!(h.sender.sent().is_empty());
}

#[tokio::test]
async fn unreadable_alert_number_gets_help_text_and_no_action() {
    let h = Harness::with_alert_42();
    h.send(h.sms(&inbound_sms("+15550000001", "99999999999999999999a")))
        .await;
    assert!(h.sink.actions().is_empty());
    match &h.sender.sent()[..] {
        [SentItem::Text { destination, body }] => {
            assert_eq!(destination, "+15550000001");
            assert!(body.contains("not recognised"), "{body}");
        }
        other => panic!("unexpected sends: {other:?}"),
    }
}

#[tokio::test]
async fn delivery_status_event_is_recorded() {
    let h = Harness::with_alert_42();
    let json = serde_json::json!({
        "data": {
            "event_type": "message.finalized",
            "id": "evt-2",
            "payload": {
                "id": "msg-out-9",
                "to": [{"phone_number": "+15550000001", "status": "delivered"}]
            }
        }
    })
    .to_string();
    let (status, _) = h.send(h.sms(&json)).await;
    assert_eq!(status, StatusCode::OK);
    let statuses = h.sink.statuses();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].external_id, "msg-out-9");
    assert_eq!(statuses[0].state, DeliveryState::Delivered);
}

#[tokio::test]
async fn undecodable_sms_payload_is_acknowledged() {
    let h = Harness::with_alert_42();
    let (status, body) = h.send(h.sms("{not json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"ok\":true"));
    assert!(h.sink.statuses().is_empty());
}

#[tokio::test]
async fn healthz_needs_no_signature() {
    let h = Harness::with_alert_42();
    let req = Request::get("/healthz").body(Body::empty()).unwrap();
    let (status, _) = h.send(req).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
