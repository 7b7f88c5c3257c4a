use std::sync::Arc;

use serde_json::json;
use tnx_core::platforms::telnyx::TelnyxSender;
use tnx_core::{
    CarrierInfo, DeliveryState, DispatchError, EgressSender, MessageKind, Notification,
    TelnyxConfig,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> TelnyxConfig {
    TelnyxConfig {
        api_base: server.uri(),
        api_key: "KEY123".into(),
        from_number: "+15550009999".into(),
        connection_id: "conn-1".into(),
        callback_base: "https://alerts.example.com".into(),
        ..TelnyxConfig::default()
    }
}

fn sender(server: &MockServer) -> TelnyxSender {
    TelnyxSender::new(reqwest::Client::new(), Arc::new(config(server)))
}

#[tokio::test]
async fn sms_success_maps_queued_to_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("authorization", "Bearer KEY123"))
        .and(body_partial_json(json!({
            "from": "+15550009999",
            "to": "+15550000001",
            "text": "Alert #42: Server Down"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "id": "msg-1",
                "from": {"phone_number": "+15550009999"},
                "to": [{"phone_number": "+15550000001", "status": "queued"}]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = sender(&server)
        .send(
            "+15550000001",
            MessageKind::Sms,
            &Notification::Alert {
                alert_id: 42,
                summary: "Server Down".into(),
                details: "disk full".into(),
            },
        )
        .await
        .unwrap();

    assert_eq!(result.external_id, "msg-1");
    assert_eq!(result.state, DeliveryState::Sending);
    assert_eq!(result.source, "+15550009999");
}

#[tokio::test]
async fn long_bodies_are_truncated_on_the_wire() {
    let server = MockServer::start().await;
    let expected = format!("{}...", "a".repeat(157));
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(body_partial_json(json!({ "text": expected })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": "msg-2", "to": [{"phone_number": "+15550000001", "status": "sent"}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = sender(&server)
        .send_text("+15550000001", &"a".repeat(400))
        .await
        .unwrap();
    assert_eq!(result.state, DeliveryState::Sent);
}

#[tokio::test]
async fn provider_error_surfaces_code_and_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [{
                "code": "10002",
                "title": "Invalid phone number",
                "detail": "The 'to' number is invalid"
            }]
        })))
        .mount(&server)
        .await;

    let err = sender(&server)
        .send_text("not-a-number", "hello")
        .await
        .expect_err("provider rejection");

    match &err {
        DispatchError::Provider { status, errors } => {
            assert_eq!(status.as_u16(), 400);
            assert_eq!(errors.codes(), vec!["10002"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let message = err.to_string();
    assert!(message.contains("10002"), "{message}");
    assert!(message.contains("The 'to' number is invalid"), "{message}");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn server_errors_are_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = sender(&server)
        .send_text("+15550000001", "hello")
        .await
        .expect_err("503");
    assert!(err.is_retryable());
    assert!(err.to_string().contains("upstream unavailable"));
}

#[tokio::test]
async fn malformed_success_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&server)
        .await;

    let err = sender(&server)
        .send_text("+15550000001", "hello")
        .await
        .expect_err("decode");
    assert!(matches!(err, DispatchError::Decode(_)));
}

#[tokio::test]
async fn voice_call_posts_callback_url_and_returns_sid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/texml/calls/conn-1"))
        .and(header("authorization", "Bearer KEY123"))
        .and(body_partial_json(json!({
            "to": "+15550000001",
            "from": "+15550009999",
            "url": "https://alerts.example.com/telnyx/voice?type=alert&alertID=42",
            "url_method": "POST"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"sid": "CA-42", "status": "queued"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = sender(&server)
        .send(
            "+15550000001",
            MessageKind::Voice,
            &Notification::Alert {
                alert_id: 42,
                summary: "Server Down".into(),
                details: String::new(),
            },
        )
        .await
        .unwrap();
    assert_eq!(result.external_id, "CA-42");
    assert_eq!(result.state, DeliveryState::Sending);
    assert_eq!(result.source, "+15550000001");
}

#[tokio::test]
async fn voice_call_falls_back_to_call_control_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/texml/calls/conn-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"call_control_id": "v3:abc"}
        })))
        .mount(&server)
        .await;

    let id = sender(&server)
        .make_call("+15550000001", "https://alerts.example.com/telnyx/voice?type=test")
        .await
        .unwrap();
    assert_eq!(id, "v3:abc");
}

#[tokio::test]
async fn voice_call_without_identifier_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/texml/calls/conn-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .mount(&server)
        .await;

    let err = sender(&server)
        .make_call("+15550000001", "https://alerts.example.com/telnyx/voice")
        .await
        .expect_err("no id");
    assert!(matches!(err, DispatchError::Decode(_)));
}

#[tokio::test]
async fn carrier_lookup_gets_escaped_number() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/number_lookup/%2B15550000001"))
        .and(header("authorization", "Bearer KEY123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "phone_number": "+15550000001",
                "carrier": {"name": "T-Mobile USA", "type": "mobile", "mobile_network_code": "260"}
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let carrier = sender(&server)
        .lookup_carrier("+15550000001")
        .await
        .unwrap();
    assert_eq!(
        carrier,
        CarrierInfo {
            name: "T-Mobile USA".into(),
            line_type: "mobile".into(),
        }
    );
}

#[tokio::test]
async fn carrier_lookup_errors_use_dispatch_taxonomy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/number_lookup/%2B15550000002"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errors": [{"code": "10005", "title": "Resource not found", "detail": ""}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/number_lookup/%2B15550000003"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let sender = sender(&server);
    let err = sender
        .lookup_carrier("+15550000002")
        .await
        .expect_err("not found");
    assert!(matches!(err, DispatchError::Provider { .. }));
    assert!(err.to_string().contains("10005: Resource not found"), "{err}");
    assert!(!err.is_retryable());

    let err = sender
        .lookup_carrier("+15550000003")
        .await
        .expect_err("decode");
    assert!(matches!(err, DispatchError::Decode(_)));

    let err = sender.lookup_carrier("  ").await.expect_err("empty");
    assert!(matches!(err, DispatchError::Config(_)));
}
