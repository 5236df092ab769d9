use std::{
    fmt,
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::{
    wire::{Envelope, RpcRequest},
    CallFailure, ConnectionParams,
};

/// The wrapped RPC collaborator.
///
/// A transport performs exactly one remote call per invocation and settles it
/// into a single outcome. Retry and timeout handling live above this trait.
pub trait Transport: Send + Sync {
    fn call(
        &self,
        method: &str,
        params: &[Value],
    ) -> impl Future<Output = Result<Envelope, CallFailure>> + Send;
}

#[derive(Clone)]
/// bitcoind-style JSON-RPC 1.0 over HTTP.
pub struct HttpTransport {
    http: reqwest::Client,
    connection: ConnectionParams,
    endpoint: String,
    next_id: Arc<AtomicU64>,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("connection", &self.connection)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl HttpTransport {
    pub fn new(connection: ConnectionParams) -> Self {
        Self::with_http_client(reqwest::Client::new(), connection)
    }

    /// Uses a preconfigured `reqwest` client (proxies, TLS roots, pooling).
    pub fn with_http_client(http: reqwest::Client, connection: ConnectionParams) -> Self {
        Self {
            http,
            endpoint: connection.endpoint(),
            connection,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn connection(&self) -> &ConnectionParams {
        &self.connection
    }
}

impl Transport for HttpTransport {
    async fn call(&self, method: &str, params: &[Value]) -> Result<Envelope, CallFailure> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut request = self
            .http
            .post(&self.endpoint)
            .json(&RpcRequest::new(id, method, params));

        if self.connection.user.is_some() || self.connection.pass.is_some() {
            request = request.basic_auth(
                self.connection.user.as_deref().unwrap_or_default(),
                self.connection.pass.as_deref(),
            );
        }

        let response = request.send().await.map_err(CallFailure::Transport)?;
        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(CallFailure::Rejected {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(CallFailure::Transport)?;
        decode_envelope(status, body)
    }
}

fn decode_envelope(status: StatusCode, body: String) -> Result<Envelope, CallFailure> {
    match serde_json::from_str::<Envelope>(&body) {
        Ok(mut envelope) => {
            // bitcoind reports RPC errors with HTTP 500 and a JSON body.
            if let Some(error) = envelope.error.take() {
                return Err(CallFailure::Remote {
                    code: error.code,
                    message: error.message,
                });
            }
            if !status.is_success() {
                return Err(CallFailure::Http {
                    status: status.as_u16(),
                    body,
                });
            }
            Ok(envelope)
        }
        Err(_) if !status.is_success() => Err(CallFailure::Http {
            status: status.as_u16(),
            body,
        }),
        Err(err) => Err(CallFailure::Decode(format!(
            "invalid json-rpc response: {err}; body: {body}"
        ))),
    }
}

/// Settles a callback-style call. Completing after the caller gave up is a no-op.
#[derive(Debug)]
pub struct Completion {
    tx: oneshot::Sender<Result<Envelope, CallFailure>>,
}

impl Completion {
    pub fn complete(self, outcome: Result<Envelope, CallFailure>) {
        let _ = self.tx.send(outcome);
    }

    /// Returns `true` once the awaiting side has been dropped, e.g. after a timeout.
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Adapts a completion-callback function into a [`Transport`].
///
/// The handler receives the wire method name, the coerced parameters and a
/// [`Completion`]. It may settle the completion inline or hand it to another
/// task. A completion dropped without settling yields [`CallFailure::Abandoned`].
pub struct CallbackTransport<F> {
    handler: F,
}

impl<F> fmt::Debug for CallbackTransport<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackTransport").finish_non_exhaustive()
    }
}

impl<F> CallbackTransport<F>
where
    F: Fn(&str, &[Value], Completion) + Send + Sync,
{
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F> Transport for CallbackTransport<F>
where
    F: Fn(&str, &[Value], Completion) + Send + Sync,
{
    async fn call(&self, method: &str, params: &[Value]) -> Result<Envelope, CallFailure> {
        let (tx, rx) = oneshot::channel();
        (self.handler)(method, params, Completion { tx });
        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(CallFailure::Abandoned),
        }
    }
}
