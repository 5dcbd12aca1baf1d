// crates/sync-engine/src/transport.rs
//! Remote store transports
//!
//! [`RemoteStore`] is the seam between the engine and the network. [`HttpRemote`]
//! talks JSON over HTTP; [`InMemoryRemote`] keeps records in process for tests and
//! offline use.

use crate::protocol::{PullRequest, PullResponse, PushRequest, PushResponse};
use duelrank_core::{SessionId, StoreSnapshot};
use reqwest::Client as ReqwestClient;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;

pub type TransportResult<T> = Result<T, TransportError>;

/// Why a request did not produce a usable answer
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    /// Non-success HTTP status
    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },

    /// The body could not be decoded
    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Remote unavailable: {0}")]
    Unavailable(String),
}

impl TransportError {
    /// True for answers that arrived but could not be read
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

/// Remote copy of every session's store contents
pub trait RemoteStore: Send + Sync + 'static {
    fn push(
        &self,
        request: PushRequest,
    ) -> impl Future<Output = TransportResult<PushResponse>> + Send;

    fn pull(
        &self,
        request: PullRequest,
    ) -> impl Future<Output = TransportResult<PullResponse>> + Send;
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpRemoteConfig {
    /// Base URL; requests go to `{endpoint}/push` and `{endpoint}/pull`
    pub endpoint: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpRemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/api/rankings".to_string(),
            timeout: Duration::from_secs(10),
            user_agent: format!("duelrank/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// JSON over HTTP
#[derive(Debug, Clone)]
pub struct HttpRemote {
    inner: ReqwestClient,
    config: HttpRemoteConfig,
}

impl HttpRemote {
    pub fn new(config: HttpRemoteConfig) -> TransportResult<Self> {
        let inner = ReqwestClient::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(TransportError::Http)?;

        Ok(Self { inner, config })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    async fn post<Req, Resp>(&self, operation: &'static str, body: &Req) -> TransportResult<Resp>
    where
        Req: serde::Serialize + Sync,
        Resp: serde::de::DeserializeOwned,
    {
        let url = self.url(operation);
        log::debug!("POST {}", url);

        let response = self
            .inner
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify(operation, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        response
            .json::<Resp>()
            .await
            .map_err(|e| self.classify(operation, e))
    }

    fn classify(&self, operation: &'static str, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout {
                operation,
                seconds: self.config.timeout.as_secs(),
            }
        } else if error.is_decode() {
            TransportError::Malformed(error.to_string())
        } else if error.is_connect() {
            TransportError::Unavailable(error.to_string())
        } else {
            TransportError::Http(error)
        }
    }
}

impl RemoteStore for HttpRemote {
    async fn push(&self, request: PushRequest) -> TransportResult<PushResponse> {
        self.post("push", &request).await
    }

    async fn pull(&self, request: PullRequest) -> TransportResult<PullResponse> {
        self.post("pull", &request).await
    }
}

/// One call seen by an [`InMemoryRemote`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCall {
    Push(SessionId),
    Pull(SessionId),
}

#[derive(Debug, Default)]
struct MemoryRemoteState {
    records: HashMap<SessionId, StoreSnapshot>,
    calls: Vec<RemoteCall>,
    last_push: Option<PushRequest>,
    offline: bool,
    rejection: Option<String>,
    malformed: bool,
    latency: Option<Duration>,
}

/// In-process remote store shared between clones
#[derive(Debug, Clone, Default)]
pub struct InMemoryRemote {
    state: Arc<Mutex<MemoryRemoteState>>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryRemoteState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `snapshot` as the remote record of `session`
    pub fn seed(&self, session: SessionId, snapshot: StoreSnapshot) {
        self.lock().records.insert(session, snapshot);
    }

    pub fn record(&self, session: SessionId) -> Option<StoreSnapshot> {
        self.lock().records.get(&session).cloned()
    }

    /// Every call so far, oldest first
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    pub fn push_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, RemoteCall::Push(_)))
            .count()
    }

    pub fn pull_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, RemoteCall::Pull(_)))
            .count()
    }

    pub fn last_push(&self) -> Option<PushRequest> {
        self.lock().last_push.clone()
    }

    /// Fails every call as unreachable
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Answers every call with `success: false`
    pub fn reject_with(&self, reason: Option<&str>) {
        self.lock().rejection = reason.map(str::to_string);
    }

    /// Answers pulls with an undecodable body
    pub fn serve_malformed(&self, malformed: bool) {
        self.lock().malformed = malformed;
    }

    /// Delays every answer
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.lock().latency = latency;
    }

    /// Records the call and returns the configured latency, or the injected failure
    fn begin(&self, call: RemoteCall) -> TransportResult<Option<Duration>> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.offline {
            return Err(TransportError::Unavailable("remote is offline".to_string()));
        }
        Ok(state.latency)
    }
}

impl RemoteStore for InMemoryRemote {
    async fn push(&self, request: PushRequest) -> TransportResult<PushResponse> {
        let latency = self.begin(RemoteCall::Push(request.session_id))?;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.lock();
        if let Some(reason) = &state.rejection {
            return Ok(PushResponse::rejected(reason.clone()));
        }
        state.last_push = Some(request.clone());
        state
            .records
            .insert(request.session_id, request.into_snapshot());
        Ok(PushResponse::ok())
    }

    async fn pull(&self, request: PullRequest) -> TransportResult<PullResponse> {
        let latency = self.begin(RemoteCall::Pull(request.session_id))?;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let state = self.lock();
        if let Some(reason) = &state.rejection {
            return Ok(PullResponse::failed(reason.clone()));
        }
        if state.malformed {
            return Err(TransportError::Malformed(
                "expected value at line 1 column 1".to_string(),
            ));
        }
        Ok(match state.records.get(&request.session_id) {
            Some(snapshot) => PullResponse::found(snapshot.clone()),
            None => PullResponse::empty(),
        })
    }
}
