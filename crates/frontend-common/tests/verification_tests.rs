//! Phone verification flow against a mock SMS service

use logistics_frontend_common::verification::ManualClock;
use logistics_frontend_common::{
    ClientConfig, ClientSet, FlowError, PhoneVerification, ResendOutcome, Step, TokenStore,
};
use logistics_http::types::{MAX_COOLDOWN_SECS, RegisterRequest};
use logistics_http::{ApiClient, SmsClient, SmsRoutes};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PHONE: &str = "79990001111";

async fn mount_config(server: &MockServer, cooldown: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/sms/config"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "resendCooldownSeconds": cooldown })),
        )
        .mount(server)
        .await;
}

fn flow_for(server: &MockServer) -> (PhoneVerification, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let sms = SmsClient::new(ApiClient::new(server.uri()).unwrap(), SmsRoutes::default());
    (PhoneVerification::new(sms, clock.clone()), clock)
}

fn rate_limited(message: &str, code: &str) -> ResponseTemplate {
    ResponseTemplate::new(429).set_body_json(json!({ "error": code, "message": message }))
}

#[tokio::test]
async fn test_send_enters_verify_and_blocks_early_resend() {
    let server = MockServer::start().await;
    mount_config(&server, json!(60)).await;
    Mock::given(method("POST"))
        .and(path("/sms/send-verification-code"))
        .and(body_json(json!({ "phone": PHONE })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let (flow, clock) = flow_for(&server);
    assert_eq!(flow.step(), Step::Input);

    flow.send_code(PHONE).await.unwrap();
    assert_eq!(flow.step(), Step::Verify);
    assert_eq!(flow.seconds_left(), 60);
    assert!(flow.is_ticking());

    clock.advance(Duration::from_secs(10));
    assert_eq!(flow.resend().await.unwrap(), ResendOutcome::CoolingDown(50));
    assert_eq!(flow.step(), Step::Verify);
}

#[tokio::test]
async fn test_countdown_is_monotonic_and_resets_on_resend() {
    let server = MockServer::start().await;
    mount_config(&server, json!(30)).await;
    Mock::given(method("POST"))
        .and(path("/sms/send-verification-code"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let (flow, clock) = flow_for(&server);
    flow.send_code(PHONE).await.unwrap();

    let mut previous = flow.seconds_left();
    assert_eq!(previous, 30);
    for _ in 0..130 {
        clock.advance(Duration::from_millis(250));
        let left = flow.seconds_left();
        assert!(left <= previous);
        previous = left;
    }
    assert_eq!(previous, 0);

    assert_eq!(flow.resend().await.unwrap(), ResendOutcome::Sent);
    assert_eq!(flow.seconds_left(), 30);
}

#[tokio::test]
async fn test_rate_limited_resend_resyncs_from_hint() {
    let server = MockServer::start().await;
    mount_config(&server, json!(60)).await;
    Mock::given(method("POST"))
        .and(path("/sms/send-verification-code"))
        .respond_with(ResponseTemplate::new(200))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sms/send-verification-code"))
        .respond_with(rate_limited(
            "Повторная отправка будет доступна через 37 сек.",
            "RATE_LIMIT_EXCEEDED",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let (flow, clock) = flow_for(&server);
    flow.send_code(PHONE).await.unwrap();
    clock.advance(Duration::from_secs(61));

    assert_eq!(flow.resend().await.unwrap(), ResendOutcome::Resynced(37));
    assert_eq!(flow.seconds_left(), 37);
    assert_eq!(flow.step(), Step::Verify);

    let snapshot = flow.snapshot();
    let error = snapshot.last_error.unwrap();
    assert_eq!(error.status, Some(429));
    assert_eq!(error.code.as_deref(), Some("RATE_LIMIT_EXCEEDED"));
}

#[tokio::test]
async fn test_legacy_rate_limit_on_send_falls_back_to_configured_cooldown() {
    let server = MockServer::start().await;
    mount_config(&server, json!(45)).await;
    Mock::given(method("POST"))
        .and(path("/sms/send-verification-code"))
        .respond_with(rate_limited("Слишком много запросов", "RATELIMITEXCEEDED"))
        .expect(1)
        .mount(&server)
        .await;

    let (flow, _clock) = flow_for(&server);
    let error = flow.send_code(PHONE).await.unwrap_err();

    assert_eq!(error.info().unwrap().message, "Слишком много запросов");
    assert_eq!(flow.step(), Step::Input);
    assert_eq!(flow.seconds_left(), 45);
}

#[tokio::test]
async fn test_oversized_rate_limit_hint_is_capped() {
    let server = MockServer::start().await;
    mount_config(&server, json!(60)).await;
    Mock::given(method("POST"))
        .and(path("/sms/send-verification-code"))
        .respond_with(rate_limited(
            "Повторите через 18446744073709551615 сек",
            "RATE_LIMIT_EXCEEDED",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let (flow, _clock) = flow_for(&server);
    let error = flow.send_code(PHONE).await.unwrap_err();

    assert_eq!(error.info().unwrap().status, Some(429));
    assert_eq!(flow.seconds_left(), MAX_COOLDOWN_SECS);
    assert_eq!(flow.step(), Step::Input);
}

#[tokio::test]
async fn test_oversized_configured_cooldown_is_capped() {
    let server = MockServer::start().await;
    mount_config(&server, json!(i64::MAX)).await;
    Mock::given(method("POST"))
        .and(path("/sms/send-verification-code"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let (flow, _clock) = flow_for(&server);
    flow.send_code(PHONE).await.unwrap();

    assert_eq!(flow.step(), Step::Verify);
    assert_eq!(flow.seconds_left(), MAX_COOLDOWN_SECS);
    assert_eq!(
        flow.resend().await.unwrap(),
        ResendOutcome::CoolingDown(MAX_COOLDOWN_SECS)
    );
}

#[tokio::test]
async fn test_missing_config_uses_default_cooldown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sms/config"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sms/send-verification-code"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (flow, clock) = flow_for(&server);
    flow.send_code(PHONE).await.unwrap();
    assert_eq!(flow.seconds_left(), 60);

    // Fetched once per flow.
    clock.advance(Duration::from_secs(60));
    assert_eq!(flow.resend().await.unwrap(), ResendOutcome::Sent);
    assert_eq!(flow.cooldown_seconds().await, 60);
}

#[tokio::test]
async fn test_non_positive_config_uses_default_cooldown() {
    let server = MockServer::start().await;
    mount_config(&server, json!(0)).await;
    Mock::given(method("POST"))
        .and(path("/sms/send-verification-code"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (flow, _clock) = flow_for(&server);
    flow.send_code(PHONE).await.unwrap();
    assert_eq!(flow.seconds_left(), 60);
}

#[tokio::test]
async fn test_invalid_code_surfaces_field_error() {
    let server = MockServer::start().await;
    mount_config(&server, json!(60)).await;
    Mock::given(method("POST"))
        .and(path("/sms/send-verification-code"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sms/verify-phone"))
        .and(body_json(json!({ "phone": PHONE, "code": "000000" })))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "VALIDATION_FAILED",
            "message": "Ошибка валидации",
            "fields": { "code": "invalid" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (flow, _clock) = flow_for(&server);
    flow.send_code(PHONE).await.unwrap();

    let error = flow.verify_code("000000").await.unwrap_err();
    let info = error.info().unwrap();
    assert_eq!(info.fields.len(), 1);
    assert_eq!(info.fields.get("code").map(String::as_str), Some("invalid"));

    assert_eq!(flow.step(), Step::Verify);
    assert_eq!(flow.snapshot().last_error.as_ref(), Some(info));
}

#[tokio::test]
async fn test_legacy_validation_spelling_keeps_fields() {
    let server = MockServer::start().await;
    mount_config(&server, json!(60)).await;
    Mock::given(method("POST"))
        .and(path("/sms/send-verification-code"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "VALIDATIONFAILED",
            "message": "Исправьте ошибки",
            "fields": { "phone": "Неверный формат" }
        })))
        .mount(&server)
        .await;

    let (flow, _clock) = flow_for(&server);
    let error = flow.send_code("7999").await.unwrap_err();

    let info = error.info().unwrap();
    assert_eq!(info.fields.get("phone").map(String::as_str), Some("Неверный формат"));
    assert_eq!(flow.step(), Step::Input);
    assert_eq!(flow.seconds_left(), 0);
}

#[tokio::test]
async fn test_verified_code_ends_flow() {
    let server = MockServer::start().await;
    mount_config(&server, json!(60)).await;
    Mock::given(method("POST"))
        .and(path("/sms/send-verification-code"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sms/verify-phone"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let (flow, _clock) = flow_for(&server);
    flow.send_code(PHONE).await.unwrap();

    let verified = flow.verify_code(" 123456 ").await.unwrap();
    assert_eq!(verified.phone, PHONE);
    assert_eq!(verified.code, "123456");
    assert_eq!(flow.step(), Step::Input);
    assert!(!flow.is_ticking());
}

#[tokio::test]
async fn test_back_clears_code_error_and_cooldown() {
    let server = MockServer::start().await;
    mount_config(&server, json!(60)).await;
    Mock::given(method("POST"))
        .and(path("/sms/send-verification-code"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sms/verify-phone"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "INVALID_CODE",
            "message": "Неверный код"
        })))
        .mount(&server)
        .await;

    let (flow, _clock) = flow_for(&server);
    flow.send_code(PHONE).await.unwrap();
    flow.verify_code("111111").await.unwrap_err();
    assert_eq!(flow.snapshot().code, "111111");

    flow.back();

    let snapshot = flow.snapshot();
    assert_eq!(snapshot.step, Step::Input);
    assert_eq!(snapshot.code, "");
    assert_eq!(snapshot.last_error, None);
    assert_eq!(snapshot.seconds_left, 0);
    assert!(!flow.is_ticking());
    assert_eq!(*flow.subscribe_seconds_left().borrow(), 0);
}

#[tokio::test]
async fn test_resend_requires_verify_step() {
    let server = MockServer::start().await;
    let (flow, _clock) = flow_for(&server);

    let error = flow.resend().await.unwrap_err();
    assert_eq!(
        error,
        FlowError::InvalidStep {
            expected: Step::Verify,
            actual: Step::Input
        }
    );
    assert!(matches!(
        flow.verify_code("123456").await,
        Err(FlowError::InvalidStep { .. })
    ));
}

#[tokio::test]
async fn test_late_response_after_back_is_ignored() {
    let server = MockServer::start().await;
    mount_config(&server, json!(60)).await;
    Mock::given(method("POST"))
        .and(path("/sms/send-verification-code"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let (flow, _clock) = flow_for(&server);
    let (result, ()) = tokio::join!(flow.send_code(PHONE), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        flow.back();
    });

    assert_eq!(result, Err(FlowError::Superseded));
    assert_eq!(flow.step(), Step::Input);
    assert_eq!(flow.seconds_left(), 0);
    assert!(!flow.is_ticking());
}

#[tokio::test]
async fn test_resend_while_verifying_keeps_accepted_code() {
    let server = MockServer::start().await;
    mount_config(&server, json!(1)).await;
    Mock::given(method("POST"))
        .and(path("/sms/send-verification-code"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sms/verify-phone"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let (flow, clock) = flow_for(&server);
    flow.send_code(PHONE).await.unwrap();
    clock.advance(Duration::from_secs(2));

    let (verified, resent) = tokio::join!(flow.verify_code("123456"), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        flow.resend().await
    });

    assert_eq!(verified.unwrap().code, "123456");
    assert_eq!(resent, Err(FlowError::Busy));
    assert_eq!(flow.step(), Step::Input);
}

#[tokio::test]
async fn test_flow_is_usable_after_abandoned_send() {
    let server = MockServer::start().await;
    mount_config(&server, json!(60)).await;
    Mock::given(method("POST"))
        .and(path("/sms/send-verification-code"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sms/send-verification-code"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (flow, _clock) = flow_for(&server);
    let abandoned = tokio::time::timeout(Duration::from_millis(50), flow.send_code(PHONE)).await;
    assert!(abandoned.is_err());

    flow.send_code(PHONE).await.unwrap();
    assert_eq!(flow.step(), Step::Verify);
}

#[tokio::test]
async fn test_closed_flow_ignores_everything() {
    let server = MockServer::start().await;
    mount_config(&server, json!(60)).await;
    Mock::given(method("POST"))
        .and(path("/sms/send-verification-code"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (flow, _clock) = flow_for(&server);
    flow.close();
    assert_eq!(flow.send_code(PHONE).await, Err(FlowError::Superseded));
}

#[tokio::test]
async fn test_ticker_publishes_and_stops_when_window_elapses() {
    let server = MockServer::start().await;
    mount_config(&server, json!(5)).await;
    Mock::given(method("POST"))
        .and(path("/sms/send-verification-code"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (flow, clock) = flow_for(&server);
    let mut seconds = flow.subscribe_seconds_left();
    flow.send_code(PHONE).await.unwrap();
    assert_eq!(*seconds.borrow_and_update(), 5);

    clock.advance(Duration::from_secs(6));
    tokio::time::timeout(Duration::from_secs(2), seconds.wait_for(|left| *left == 0))
        .await
        .unwrap()
        .unwrap();

    tokio::time::timeout(Duration::from_secs(2), async {
        while flow.is_ticking() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_complete_registration_verifies_then_registers() {
    let server = MockServer::start().await;
    mount_config(&server, json!(60)).await;
    Mock::given(method("POST"))
        .and(path("/sms/send-verification-code"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sms/verify-phone"))
        .and(body_json(json!({ "phone": PHONE, "code": "123456" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(body_json(json!({
            "email": "user@example.com",
            "phone": PHONE,
            "password": "secret",
            "firstName": "Иван",
            "lastName": "Петров"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "accessToken": "a1", "refreshToken": "r1" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig {
        api_base_url: server.uri(),
        core_api_base_url: server.uri(),
        ..ClientConfig::default()
    };
    let clients = ClientSet::new(&config, TokenStore::in_memory()).unwrap();
    let flow = clients.phone_verification();
    flow.send_code(PHONE).await.unwrap();

    let request = RegisterRequest {
        email: "user@example.com".into(),
        phone: String::new(),
        password: "secret".into(),
        first_name: "Иван".into(),
        last_name: "Петров".into(),
        middle_name: None,
    };
    clients
        .auth
        .complete_registration(&flow, request, "123456")
        .await
        .unwrap();

    assert!(clients.session.is_authenticated());
}

#[tokio::test]
async fn test_change_phone_commits_verified_number() {
    let server = MockServer::start().await;
    mount_config(&server, json!(60)).await;
    Mock::given(method("POST"))
        .and(path("/sms/send-verification-code"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sms/verify-phone"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/users/me/phone"))
        .and(header("authorization", "Bearer a1"))
        .and(body_json(json!({ "phone": "79995556677" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "phone": "79995556677" })))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = TokenStore::in_memory();
    tokens.set("a1", "r1");
    let config = ClientConfig {
        api_base_url: server.uri(),
        core_api_base_url: server.uri(),
        ..ClientConfig::default()
    };
    let clients = ClientSet::new(&config, tokens).unwrap();
    let flow = clients.phone_verification();
    flow.send_code("79995556677").await.unwrap();

    let profile = clients.users.change_phone(&flow, "654321").await.unwrap();
    assert_eq!(profile.unwrap().phone, "79995556677");
}
