//! Recording fakes for the dispatch collaborators.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};

use crate::services::push::credential::{
    BearerCredential, CacheOptions, CredentialCache, CredentialError, CredentialSource,
};
use crate::services::push::dispatcher::Dispatcher;
use crate::services::push::request::DeviceToken;
use crate::services::push::resolver::{RecipientResolver, ResolveError};
use crate::services::push::transport::{
    Transport, TransportError, TransportRequest, TransportResponse,
};

pub(crate) const ENDPOINT: &str = "https://push.test/v1/projects/demo/messages:send";

pub(crate) fn valid_for(token: &str, secs: i64) -> BearerCredential {
    BearerCredential::new(token, Timestamp::now() + SignedDuration::from_secs(secs))
}

/// Counts refreshes and replays scripted results; unscripted calls return
/// `tok-{n}` valid for an hour.
pub(crate) struct CountingSource {
    calls: AtomicUsize,
    delay: Duration,
    script: Mutex<VecDeque<Result<BearerCredential, CredentialError>>>,
}

impl CountingSource {
    pub(crate) fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
            script: Mutex::new(VecDeque::new()),
        }
    }

    pub(crate) fn then(self, result: Result<BearerCredential, CredentialError>) -> Self {
        self.script.lock().unwrap().push_back(result);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialSource for CountingSource {
    async fn refresh(&self) -> Result<BearerCredential, CredentialError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(valid_for(&format!("tok-{n}"), 3600)))
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

/// Directory fake; unknown users resolve to `None`
#[derive(Default)]
pub(crate) struct FakeResolver {
    tokens: HashMap<String, String>,
    failure: Option<ResolveError>,
    delay: Option<Duration>,
}

impl FakeResolver {
    pub(crate) fn with(mut self, user: &str, token: &str) -> Self {
        self.tokens.insert(user.to_string(), token.to_string());
        self
    }

    pub(crate) fn failing(mut self, error: ResolveError) -> Self {
        self.failure = Some(error);
        self
    }

    pub(crate) fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl RecipientResolver for FakeResolver {
    async fn resolve(&self, user_id: &str) -> Result<Option<DeviceToken>, ResolveError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(ref error) = self.failure {
            return Err(error.clone());
        }
        Ok(self.tokens.get(user_id).map(DeviceToken::new))
    }
}

#[derive(Clone)]
pub(crate) enum Reply {
    Respond(u16, &'static str),
    Fail(TransportError),
    /// Never answers, ignoring the request timeout
    Hang,
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Records every request and answers with a fixed [`Reply`].
pub(crate) struct RecordingTransport {
    reply: Reply,
    requests: Mutex<Vec<TransportRequest>>,
    abandoned: Arc<AtomicBool>,
}

impl RecordingTransport {
    pub(crate) fn new(reply: Reply) -> Self {
        Self {
            reply,
            requests: Mutex::new(Vec::new()),
            abandoned: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// True once a hanging call's future was dropped by the caller
    pub(crate) fn was_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn post(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        match self.reply.clone() {
            Reply::Respond(status, body) => Ok(TransportResponse::new(status, body)),
            Reply::Fail(error) => Err(error),
            Reply::Hang => {
                let _flag = DropFlag(self.abandoned.clone());
                std::future::pending().await
            }
        }
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// A dispatcher over the given fakes with default cache options.
pub(crate) fn dispatcher(
    resolver: FakeResolver,
    source: &Arc<CountingSource>,
    transport: &Arc<RecordingTransport>,
    timeout: Duration,
) -> Dispatcher {
    Dispatcher::builder()
        .resolver(Arc::new(resolver))
        .credentials(CredentialCache::new(source.clone(), CacheOptions::default()))
        .transport(transport.clone())
        .endpoint(ENDPOINT)
        .timeout(timeout)
        .build()
        .expect("test dispatcher should build")
}
