use appointment_sms_relay::config::GatewayConfig;
use appointment_sms_relay::models::MessageId;
use appointment_sms_relay::sms::{SmsGateway, TwilioClient};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MESSAGES_PATH: &str = "/2010-04-01/Accounts/AC123/Messages.json";

fn gateway_config() -> GatewayConfig {
    GatewayConfig {
        account_id: "AC123".to_string(),
        auth_secret: "token".to_string(),
        sender_number: "+15550000000".to_string(),
        owner_number: "+15559999999".to_string(),
    }
}

#[tokio::test]
async fn posts_form_with_basic_auth_and_returns_sid() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .and(header_exists("authorization"))
        .and(body_string_contains("To=%2B15559999999"))
        .and(body_string_contains("From=%2B15550000000"))
        .and(body_string_contains("Body=Hello"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "sid": "SM0123456789abcdef",
            "status": "queued",
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = TwilioClient::new(&gateway_config(), mock_server.uri());
    let id = client
        .send("Hello there", "+15559999999", "+15550000000")
        .await
        .unwrap();

    assert_eq!(id, MessageId("SM0123456789abcdef".to_string()));
}

#[tokio::test]
async fn maps_twilio_error_document() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 21211,
            "message": "The 'To' number +1555 is not a valid phone number.",
            "more_info": "https://www.twilio.com/docs/errors/21211",
            "status": 400,
        })))
        .mount(&mock_server)
        .await;

    let client = TwilioClient::new(&gateway_config(), mock_server.uri());
    let err = client.send("Hi", "+1555", "+15550000000").await.unwrap_err();

    assert_eq!(err.code, Some(21211));
    assert_eq!(err.status, Some(400));
    assert_eq!(err.message, "The 'To' number +1555 is not a valid phone number.");
}

#[tokio::test]
async fn unparseable_error_body_falls_back_to_status() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&mock_server)
        .await;

    let client = TwilioClient::new(&gateway_config(), mock_server.uri());
    let err = client.send("Hi", "+15559999999", "+15550000000").await.unwrap_err();

    assert_eq!(err.code, None);
    assert_eq!(err.status, Some(503));
    assert_eq!(err.message, "Gateway responded with status 503");
}

#[tokio::test]
async fn transport_failure_has_no_code() {
    // Nothing listens on the discard port.
    let client = TwilioClient::new(&gateway_config(), "http://127.0.0.1:9");
    let err = client.send("Hi", "+15559999999", "+15550000000").await.unwrap_err();

    assert_eq!(err.code, None);
    assert!(!err.message.is_empty());
}
