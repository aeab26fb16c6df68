use std::sync::{Arc, Mutex};
use std::time::Duration;

pub mod mock;
pub mod telemetry;

use client::notify::UnauthorizedNotifier;
use client::session::{InMemorySessionStore, SessionStore};
use client::time::TimeSource;
use client::uploads::{FileProcessor, PendingAsset, ProcessError};
use client::{ApiClient, ClientError};
use payloads::{Identity, Session};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tracing_log::LogTracer;
use tracing_subscriber::util::SubscriberInitExt;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub struct TestApp {
    pub server: MockServer,
    pub client: ApiClient,
    pub sessions: Arc<InMemorySessionStore>,
    pub time_source: TimeSource,
}

pub async fn spawn_app() -> TestApp {
    let subscriber = telemetry::get_subscriber("error".into());
    let _ = LogTracer::init();
    let _ = subscriber.try_init();

    #[cfg(feature = "mock-time")]
    let time_source = TimeSource::new("2025-01-01T00:00:00Z".parse().unwrap());

    #[cfg(not(feature = "mock-time"))]
    let time_source = TimeSource::new();

    let server = MockServer::start().await;
    let sessions = Arc::new(InMemorySessionStore::new());
    let client =
        ApiClient::new(server.uri(), sessions.clone(), time_source.clone());

    TestApp {
        server,
        client,
        sessions,
        time_source,
    }
}

impl TestApp {
    /// Store the standard test session directly, as if a login had
    /// happened earlier in the tab.
    pub fn seed_session(&self) -> Session {
        let session = mock::session();
        self.sessions.save(&session);
        session
    }

    /// Identity of the seeded session.
    pub fn identity(&self) -> Identity {
        self.sessions.load().expect("no session seeded").identity()
    }

    /// Mount the login endpoint and sign in as the standard test user.
    pub async fn login_asha(&self) -> anyhow::Result<Session> {
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                ok_envelope(serde_json::to_value(mock::session())?),
            ))
            .mount(&self.server)
            .await;
        Ok(self.client.login(&mock::login_credentials()).await?)
    }

    /// Mount the refresh endpoint answering `new_token` for the standard
    /// refresh token. The expectation pins the single-flight invariant:
    /// the endpoint must be called exactly once. An optional delay holds
    /// the refresh window open so concurrent requests pile up behind it.
    pub async fn mount_refresh(
        &self,
        new_token: &str,
        delay: Option<Duration>,
    ) {
        let mut template = ResponseTemplate::new(200)
            .set_body_json(json!({ "token": new_token }));
        if let Some(delay) = delay {
            template = template.set_delay(delay);
        }
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh-token"))
            .and(body_json(json!({ "refreshToken": mock::REFRESH_TOKEN })))
            .respond_with(template)
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Mount a refresh endpoint that always fails. Also expected to be
    /// called exactly once: a failed refresh must not be retried.
    pub async fn mount_failing_refresh(&self) {
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh-token"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&self.server)
            .await;
    }
}

/// The `{success: true, data}` wrapper the backend puts around payloads.
pub fn ok_envelope(data: Value) -> Value {
    json!({ "success": true, "data": data })
}

/// A `{success: false, message}` failure body.
pub fn error_envelope(message: &str) -> Value {
    json!({ "success": false, "message": message })
}

/// Assert that an API action failed validation with the expected message,
/// before any request went out.
pub fn assert_validation_error<T: std::fmt::Debug>(
    result: Result<T, ClientError>,
    expected: &str,
) {
    match result {
        Err(ClientError::Validation(message)) => {
            assert_eq!(message, expected)
        }
        other => panic!("Expected a validation error, got {other:?}"),
    }
}

/// Assert that an API action failed with a specific status code.
pub fn assert_status_code<T: std::fmt::Debug>(
    result: Result<T, ClientError>,
    expected: StatusCode,
) {
    match result {
        Err(ClientError::Api(code, _)) => assert_eq!(code, expected),
        other => panic!("Expected an API error, got {other:?}"),
    }
}

/// Notifier that records every delivery, for asserting the
/// one-notice-per-episode behavior.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl UnauthorizedNotifier for RecordingNotifier {
    fn show_unauthorized_error(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// Processor that fails for one asset by name and passes the rest
/// through, for exercising partial-failure handling.
pub struct FailOn(pub &'static str);

impl FileProcessor for FailOn {
    fn process(&self, asset: &PendingAsset) -> Result<Vec<u8>, ProcessError> {
        if asset.name == self.0 {
            Err(ProcessError("compression failed".to_string()))
        } else {
            Ok(asset.bytes.clone())
        }
    }
}
