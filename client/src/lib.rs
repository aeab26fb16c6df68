pub mod cache;
pub mod form;
pub mod notify;
mod refresh;
pub mod session;
pub mod time;
pub mod uploads;
mod valuations;

use std::path::PathBuf;
use std::sync::Arc;

use jiff::{Span, ToSpan};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;

use payloads::{Identity, Session};

use crate::cache::{DEFAULT_CACHE_TTL_MINUTES, ResponseCache, cache_key};
use crate::notify::{NotifyHandle, UnauthorizedNotifier};
use crate::refresh::{Acquired, RefreshFailed, RefreshGate};
use crate::session::{FileSessionStore, InMemorySessionStore, SessionStore};
use crate::time::TimeSource;

/// Message delivered through the unauthorized notifier and displayed by
/// [`ClientError::SessionExpired`].
pub const SESSION_EXPIRED_MESSAGE: &str =
    "Your session has expired. Please sign in again.";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A parameter failed validation before any network call.
    #[error("{0}")]
    Validation(String),
    /// The backend answered with `success: false`; the message is the
    /// backend's own.
    #[error("{0}")]
    Envelope(#[from] payloads::EnvelopeError),
    /// An unhandled HTTP error status, containing response text.
    #[error("{1}")]
    Api(StatusCode, String),
    /// Terminal auth failure: the stored session was cleared.
    #[error("{}", SESSION_EXPIRED_MESSAGE)]
    SessionExpired,
    #[error("Network error. Please check your connection.")]
    Network(#[from] reqwest::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl From<payloads::ParseIdError> for ClientError {
    fn from(err: payloads::ParseIdError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Whether a GET may be served from the response cache.
///
/// The capture side always runs; serving a cached payload is an explicit
/// choice by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Go to the network and refresh the cached entry.
    #[default]
    Refresh,
    /// Serve a fresh cached entry if one exists, otherwise fetch.
    CacheFirst,
}

pub struct Config {
    pub address: String,
    /// Directory for the persisted session record; `None` keeps the
    /// session in memory only.
    pub session_dir: Option<PathBuf>,
    pub cache_ttl_minutes: i64,
}

impl Config {
    pub fn from_env() -> Self {
        use std::env::var;

        Config {
            address: var("VALUATION_API_ADDRESS").unwrap(),
            session_dir: var("VALUATION_SESSION_DIR").ok().map(PathBuf::from),
            cache_ttl_minutes: var("VALUATION_CACHE_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CACHE_TTL_MINUTES),
        }
    }
}

/// A prepared request that can be (re)built as many times as the auth
/// machinery needs to send it.
pub(crate) struct RequestSpec {
    method: Method,
    url: String,
    query: Vec<(String, String)>,
    body: Body,
}

pub(crate) enum Body {
    Empty,
    Json(Value),
    Multipart {
        field: &'static str,
        file_name: String,
        bytes: Vec<u8>,
        folder_path: String,
    },
}

/// An API client for interfacing with the valuation backend.
///
/// Wraps the HTTP layer with bearer-token injection, identity query
/// scoping on GETs, GET-response caching, and the single-flight
/// refresh-and-retry protocol for 401 responses. Requests are not
/// cancellable and carry no per-request timeout; they run to completion
/// or failure.
pub struct ApiClient {
    address: String,
    http: reqwest::Client,
    /// Dedicated instance for the refresh endpoint: it bypasses the auth
    /// machinery entirely, so a 401 from the refresh call cannot recurse.
    refresh_http: reqwest::Client,
    sessions: Arc<dyn SessionStore>,
    cache: ResponseCache,
    gate: RefreshGate,
    notify: NotifyHandle,
    time_source: TimeSource,
}

impl ApiClient {
    pub fn new(
        address: impl Into<String>,
        sessions: Arc<dyn SessionStore>,
        time_source: TimeSource,
    ) -> Self {
        Self {
            address: address.into(),
            http: reqwest::Client::new(),
            refresh_http: reqwest::Client::new(),
            sessions,
            cache: ResponseCache::new(
                time_source.clone(),
                DEFAULT_CACHE_TTL_MINUTES.minutes(),
            ),
            gate: RefreshGate::new(),
            notify: NotifyHandle::new(),
            time_source,
        }
    }

    pub fn from_config(config: &Config, time_source: TimeSource) -> Self {
        let sessions: Arc<dyn SessionStore> = match &config.session_dir {
            Some(dir) => Arc::new(FileSessionStore::new(dir)),
            None => Arc::new(InMemorySessionStore::new()),
        };
        Self::new(&config.address, sessions, time_source)
            .with_cache_ttl(config.cache_ttl_minutes.minutes())
    }

    pub fn with_cache_ttl(mut self, ttl: Span) -> Self {
        self.cache = ResponseCache::new(self.time_source.clone(), ttl);
        self
    }

    /// Register the host's surface for the one-time session-expired
    /// notice. Registration re-arms delivery for a new episode.
    pub fn set_unauthorized_notifier(
        &self,
        notifier: Arc<dyn UnauthorizedNotifier>,
    ) {
        self.notify.set(notifier);
    }

    /// Drop the registered notifier and re-arm delivery.
    pub fn reset_unauthorized_notifier(&self) {
        self.notify.reset();
    }

    /// Remove cached GET responses whose key contains `pattern`.
    pub fn invalidate_cache(&self, pattern: &str) {
        self.cache.invalidate(pattern);
    }

    /// Empty the response cache.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn session(&self) -> Option<Session> {
        self.sessions.load()
    }

    pub(crate) fn save_session(&self, session: &Session) {
        self.sessions.save(session);
    }

    pub(crate) fn clear_session(&self) {
        self.sessions.clear();
    }

    pub(crate) fn rearm_unauthorized_notice(&self) {
        self.notify.rearm();
    }

    fn format_url(&self, path: &str) -> String {
        format!("{}/api/{path}", &self.address)
    }
}

/// Identity fields merged into every authenticated GET's query string,
/// required by the backend for authorization scoping.
fn identity_query(identity: &Identity) -> [(String, String); 3] {
    [
        ("username".to_string(), identity.username.clone()),
        ("role".to_string(), identity.role.as_str().to_string()),
        ("clientId".to_string(), identity.client_id.clone()),
    ]
}

/// Request pipeline internals.
impl ApiClient {
    fn build_request(
        &self,
        spec: &RequestSpec,
        bearer: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let mut request = self.http.request(spec.method.clone(), &spec.url);
        if !spec.query.is_empty() {
            request = request.query(&spec.query);
        }
        request = match &spec.body {
            Body::Empty => request,
            Body::Json(value) => request.json(value),
            Body::Multipart {
                field,
                file_name,
                bytes,
                folder_path,
            } => {
                let part = reqwest::multipart::Part::bytes(bytes.clone())
                    .file_name(file_name.clone());
                let form = reqwest::multipart::Form::new()
                    .part(*field, part)
                    .text("folderPath", folder_path.clone());
                request.multipart(form)
            }
        };
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        request
    }

    async fn send_once(
        &self,
        spec: &RequestSpec,
        bearer: Option<&str>,
    ) -> Result<reqwest::Response, ClientError> {
        Ok(self.build_request(spec, bearer).send().await?)
    }

    /// Send a request with the stored credentials, running the refresh
    /// protocol if the backend answers 401.
    async fn execute(
        &self,
        spec: &RequestSpec,
    ) -> Result<reqwest::Response, ClientError> {
        let session = self.sessions.load();
        let response = self
            .send_once(spec, session.as_ref().map(|s| s.token.as_str()))
            .await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        // 401. Without a session this was an unauthenticated request;
        // hand the status back untouched.
        let Some(session) = session else {
            return Ok(response);
        };
        if session.refresh_token.is_empty() {
            return self.terminal_unauthorized();
        }

        match self.gate.acquire() {
            Acquired::Leader => self.lead_refresh(spec, &session).await,
            Acquired::Waiter(outcome) => match outcome.await {
                Ok(Ok(token)) => self.replay(spec, &token).await,
                _ => Err(ClientError::SessionExpired),
            },
        }
    }

    /// This request owns the refresh: rotate the token, wake the queue,
    /// then retry the triggering request once.
    async fn lead_refresh(
        &self,
        spec: &RequestSpec,
        session: &Session,
    ) -> Result<reqwest::Response, ClientError> {
        // another request may have finished a refresh, or torn the session
        // down, between this one being sent and the gate being acquired
        let Some(current) = self.sessions.load() else {
            self.gate.complete(Err(RefreshFailed));
            return self.terminal_unauthorized();
        };
        if current.token != session.token {
            self.gate.complete(Ok(current.token.clone()));
            return self.replay(spec, &current.token).await;
        }

        match self.refresh_access_token(&session.refresh_token).await {
            Ok(token) => {
                let mut updated = session.clone();
                updated.token = token.clone();
                self.sessions.save(&updated);
                tracing::info!("access token refreshed");
                self.gate.complete(Ok(token.clone()));
                self.replay(spec, &token).await
            }
            Err(err) => {
                tracing::warn!(error = %err, "token refresh failed");
                self.gate.complete(Err(RefreshFailed));
                self.terminal_unauthorized()
            }
        }
    }

    /// Retry once with the refreshed token. A second 401 is terminal.
    async fn replay(
        &self,
        spec: &RequestSpec,
        token: &str,
    ) -> Result<reqwest::Response, ClientError> {
        let response = self.send_once(spec, Some(token)).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return self.terminal_unauthorized();
        }
        Ok(response)
    }

    fn terminal_unauthorized<T>(&self) -> Result<T, ClientError> {
        self.sessions.clear();
        self.notify.notify(SESSION_EXPIRED_MESSAGE);
        Err(ClientError::SessionExpired)
    }

    async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<String, ClientError> {
        let body = payloads::requests::RefreshToken {
            refresh_token: refresh_token.to_string(),
        };
        let response = self
            .refresh_http
            .post(self.format_url("auth/refresh-token"))
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ClientError::Api(
                response.status(),
                response.text().await?,
            ));
        }
        let parsed: payloads::responses::RefreshTokenResponse =
            response.json().await?;
        Ok(parsed.token)
    }
}

/// Typed helpers over the pipeline.
impl ApiClient {
    /// GET returning the raw response payload. Successful payloads are
    /// captured into the response cache; `policy` controls whether a
    /// fresh cached payload may be served instead of fetching.
    pub(crate) async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
        policy: CachePolicy,
    ) -> Result<T, ClientError> {
        let mut query = query;
        if let Some(session) = self.sessions.load() {
            query.extend(identity_query(&session.identity()));
        }
        let key = cache_key(path, &query);

        if policy == CachePolicy::CacheFirst
            && let Some(payload) = self.cache.lookup(&key)
        {
            return Ok(serde_json::from_value(payload)?);
        }

        let spec = RequestSpec {
            method: Method::GET,
            url: self.format_url(path),
            query,
            body: Body::Empty,
        };
        let response = self.execute(&spec).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Api(status, response.text().await?));
        }
        let payload: Value = response.json().await?;
        self.cache.store(&key, payload.clone());
        Ok(serde_json::from_value(payload)?)
    }

    /// GET through the response envelope.
    pub(crate) async fn get_envelope<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
        policy: CachePolicy,
    ) -> Result<T, ClientError> {
        let envelope: payloads::Envelope<T> =
            self.get_json(path, query, policy).await?;
        Ok(envelope.into_result()?)
    }

    pub(crate) async fn request_envelope<
        B: Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    >(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let spec = RequestSpec {
            method,
            url: self.format_url(path),
            query: Vec::new(),
            body: Body::Json(serde_json::to_value(body)?),
        };
        let response = self.execute(&spec).await?;
        envelope_body(response).await
    }

    pub(crate) async fn delete_envelope(
        &self,
        path: &str,
    ) -> Result<(), ClientError> {
        let spec = RequestSpec {
            method: Method::DELETE,
            url: self.format_url(path),
            query: Vec::new(),
            body: Body::Empty,
        };
        let response = self.execute(&spec).await?;
        envelope_empty(response).await
    }

    /// Multipart POST. Upload endpoints answer with a plain payload, not
    /// the envelope.
    pub(crate) async fn post_multipart<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        field: &'static str,
        file_name: String,
        bytes: Vec<u8>,
        folder_path: String,
    ) -> Result<T, ClientError> {
        let spec = RequestSpec {
            method: Method::POST,
            url: self.format_url(path),
            query: Vec::new(),
            body: Body::Multipart {
                field,
                file_name,
                bytes,
                folder_path,
            },
        };
        let response = self.execute(&spec).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Api(status, response.text().await?));
        }
        Ok(response.json().await?)
    }

    /// POST outside the auth machinery, for the login endpoint.
    pub(crate) async fn post_unauthenticated<
        B: Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    >(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self
            .http
            .post(self.format_url(path))
            .json(body)
            .send()
            .await?;
        envelope_body(response).await
    }
}

/// Deserialize a successful enveloped response into the desired type, or
/// return an appropriate error.
async fn envelope_body<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Api(status, response.text().await?));
    }
    let envelope: payloads::Envelope<T> = response.json().await?;
    Ok(envelope.into_result()?)
}

/// Check that an enveloped response reports success, discarding any
/// payload.
async fn envelope_empty(
    response: reqwest::Response,
) -> Result<(), ClientError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Api(status, response.text().await?));
    }
    let envelope: payloads::Envelope<Value> = response.json().await?;
    Ok(envelope.into_empty_result()?)
}
