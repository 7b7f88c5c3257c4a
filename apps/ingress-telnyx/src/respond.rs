use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::reqid::RequestId;

/// `200 {"ok":true,"request_id":..}` acknowledgement for JSON webhooks.
pub fn ack(request_id: Option<&RequestId>) -> Response {
    let rid = request_id
        .map(|rid| rid.0.clone())
        .unwrap_or_else(|| "n/a".to_string());
    (StatusCode::OK, Json(json!({ "ok": true, "request_id": rid }))).into_response()
}

/// `200 application/xml` response carrying rendered TeXML.
pub fn texml(markup: String) -> Response {
    let mut res = (StatusCode::OK, markup).into_response();
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/xml"),
    );
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn ack_uses_request_id_when_present() {
        let rid = RequestId("abc123".into());
        let response = ack(Some(&rid));
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect")
            .to_bytes();
        let payload: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(payload, json!({ "ok": true, "request_id": "abc123" }));
    }

    #[tokio::test]
    async fn ack_defaults_when_missing() {
        let bytes = ack(None)
            .into_body()
            .collect()
            .await
            .expect("collect")
            .to_bytes();
        let payload: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(payload["request_id"], "n/a");
    }

    #[test]
    fn texml_sets_xml_content_type() {
        let response = texml("<Response/>".into());
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/xml"
        );
    }
}
