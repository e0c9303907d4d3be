//! Request execution: build, submit, observe, cancel.
//!
//! An [`Executor`] owns a [`Transport`] and turns an [`Endpoint`] plus a
//! caller [`Request`] into a [`Call`]. Starting the call builds the request
//! synchronously, then drives the exchange on one tokio task which is the
//! single context for progress and completion callbacks.
//!
//! ```text
//! Configured ──start──▶ Building ──▶ InFlight ──▶ Completed
//!                          │            ├──────▶ Failed
//!                          └──▶ Failed  └──────▶ Cancelled
//! ```
//!
//! # Example
//!
//! ```no_run
//! use courier::{Endpoint, Executor, HyperTransport, Request, TextDecoder};
//!
//! struct Status;
//!
//! impl Endpoint for Status {
//!     type Decoder = TextDecoder;
//!
//!     fn url(&self) -> String {
//!         "https://status.example.com/health".to_string()
//!     }
//! }
//!
//! # async fn run() -> courier::Result<()> {
//! let executor = Executor::new(HyperTransport::new());
//!
//! let handle = executor.call(Status, Request::get()).start(|completion| {
//!     match completion.result {
//!         Ok(text) => println!("status: {text}"),
//!         Err(err) => eprintln!("failed: {err}"),
//!     }
//! });
//! handle.finished().await;
//!
//! let text = executor.call(Status, Request::get()).send().await.into_result()?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::{
    BodyEncoder, Endpoint, EndpointOutput, Error, Method, PostFormat, PreparedRequest, Progress,
    ProgressReporter, Request, Response, ResponseMeta, Result, Transport, resolve,
};

// ============================================================================
// State
// ============================================================================

/// Lifecycle of a [`Call`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallState {
    /// Configured but not started.
    Configured,
    /// Parameters are resolved and the body encoded.
    Building,
    /// Submitted to the transport.
    InFlight,
    /// A response arrived and the handler ran.
    Completed,
    /// Cancelled before a response arrived; the handler got [`Error::Cancelled`].
    Cancelled,
    /// The request could not be built or the transport failed.
    Failed,
}

impl CallState {
    /// Returns `true` for `Completed`, `Cancelled` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configured => "configured",
            Self::Building => "building",
            Self::InFlight => "in-flight",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Completion
// ============================================================================

/// What the handler receives: a value or an error, never both, plus the
/// response metadata when a response arrived.
#[derive(Debug)]
pub struct Completion<T> {
    /// Decoded value or the single error of the request.
    pub result: Result<T>,
    /// Status and headers, absent when no response arrived.
    pub response: Option<ResponseMeta>,
}

impl<T> Completion<T> {
    fn failed(error: Error) -> Self {
        Self {
            result: Err(error),
            response: None,
        }
    }

    /// The decoded value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }

    /// The error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        self.result.as_ref().err()
    }

    /// Returns `true` if the request was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.error().is_some_and(Error::is_cancelled)
    }

    /// Drop the metadata and keep the result.
    ///
    /// # Errors
    ///
    /// Returns the request's error.
    pub fn into_result(self) -> Result<T> {
        self.result
    }
}

// ============================================================================
// Handle
// ============================================================================

/// Observes and cancels one request.
///
/// Cloning shares the same request. Dropping every handle does not cancel it.
#[derive(Debug, Clone)]
pub struct ExecutionHandle {
    token: CancellationToken,
    state: Arc<watch::Sender<CallState>>,
}

impl ExecutionHandle {
    fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            state: Arc::new(watch::Sender::new(CallState::Configured)),
        }
    }

    fn set(&self, state: CallState) {
        self.state.send_replace(state);
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> CallState {
        *self.state.borrow()
    }

    /// Request cancellation.
    ///
    /// Only a started, unfinished request reacts; before `start` and after
    /// completion this does nothing. Calling it more than once is harmless.
    pub fn cancel(&self) {
        match self.state() {
            CallState::Building | CallState::InFlight => {
                debug!("cancellation requested");
                self.token.cancel();
            }
            CallState::Configured
            | CallState::Completed
            | CallState::Cancelled
            | CallState::Failed => {}
        }
    }

    /// Returns `true` once the request ended by cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state() == CallState::Cancelled
    }

    /// Returns `true` once the handler has run.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Wait until the handler has run and return the terminal state.
    pub async fn finished(&self) -> CallState {
        let mut state = self.state.subscribe();
        match state.wait_for(|state| state.is_terminal()).await {
            Ok(terminal) => *terminal,
            Err(_) => self.state(),
        }
    }
}

// ============================================================================
// Executor
// ============================================================================

/// Issues requests through a [`Transport`].
///
/// Cheap to clone; clones share the transport.
pub struct Executor<T> {
    transport: Arc<T>,
    encoder: BodyEncoder,
}

impl<T> Clone for Executor<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            encoder: self.encoder.clone(),
        }
    }
}

impl<T> fmt::Debug for Executor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("transport", &std::any::type_name::<T>())
            .field("encoder", &self.encoder)
            .finish()
    }
}

impl<T: Transport> Executor<T> {
    /// Create an executor over `transport`.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            encoder: BodyEncoder::new(),
        }
    }

    /// Use `encoder` for request bodies, e.g. to pin the multipart boundary.
    #[must_use]
    pub fn with_encoder(mut self, encoder: BodyEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    /// The underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Bind `request` to `endpoint`. Nothing is sent until the call starts.
    pub fn call<E: Endpoint>(&self, endpoint: E, request: Request) -> Call<E, T> {
        Call {
            transport: Arc::clone(&self.transport),
            encoder: self.encoder.clone(),
            endpoint,
            request,
            handle: ExecutionHandle::new(),
        }
    }
}

// ============================================================================
// Call
// ============================================================================

type ProgressFn = Box<dyn FnMut(Progress) + Send>;

/// A request bound to an endpoint, ready to start.
///
/// Starting consumes the call, so the request cannot change afterwards.
#[must_use = "a call does nothing until started"]
pub struct Call<E, T> {
    transport: Arc<T>,
    encoder: BodyEncoder,
    endpoint: E,
    request: Request,
    handle: ExecutionHandle,
}

impl<E, T> fmt::Debug for Call<E, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("request", &self.request)
            .field("state", &self.handle.state())
            .finish_non_exhaustive()
    }
}

impl<E: Endpoint, T: Transport> Call<E, T> {
    /// The endpoint.
    pub const fn endpoint(&self) -> &E {
        &self.endpoint
    }

    /// The caller's request.
    pub const fn request(&self) -> &Request {
        &self.request
    }

    /// A handle to this call, usable before it starts.
    pub fn handle(&self) -> ExecutionHandle {
        self.handle.clone()
    }

    /// Start the request; `handler` runs exactly once with the outcome.
    ///
    /// Build failures (configuration, encoding) call `handler` before this
    /// returns. Otherwise the exchange runs on a spawned tokio task, which
    /// requires a tokio runtime.
    pub fn start<H>(self, handler: H) -> ExecutionHandle
    where
        H: FnOnce(Completion<EndpointOutput<E>>) + Send + 'static,
    {
        self.launch(handler, None)
    }

    /// Like [`Call::start`], also reporting upload and download progress.
    ///
    /// `on_progress` runs on the same task as `handler` and never after it.
    pub fn start_with_progress<H, P>(self, handler: H, on_progress: P) -> ExecutionHandle
    where
        H: FnOnce(Completion<EndpointOutput<E>>) + Send + 'static,
        P: FnMut(Progress) + Send + 'static,
    {
        self.launch(handler, Some(Box::new(on_progress)))
    }

    /// Start the request and wait for its completion.
    ///
    /// Dropping the returned future cancels the request.
    pub async fn send(self) -> Completion<EndpointOutput<E>> {
        let (tx, rx) = oneshot::channel();
        let handle = self.start(move |completion| {
            // The receiver only goes away when `send` itself was dropped.
            let _ = tx.send(completion);
        });
        let guard = handle.token.clone().drop_guard();

        let completion = rx
            .await
            .unwrap_or_else(|_| Completion::failed(Error::Cancelled));
        guard.disarm();
        completion
    }

    fn launch<H>(self, handler: H, on_progress: Option<ProgressFn>) -> ExecutionHandle
    where
        H: FnOnce(Completion<EndpointOutput<E>>) + Send + 'static,
    {
        let Self {
            transport,
            encoder,
            endpoint,
            request,
            handle,
        } = self;

        let method = request.method();
        let url = endpoint.url();
        let span = info_span!("courier.request", %method, %url);
        handle.set(CallState::Building);

        let prepared = span.in_scope(|| build(&endpoint, &url, request, &encoder));
        let prepared = match prepared {
            Ok(prepared) => prepared,
            Err(error) => {
                span.in_scope(|| warn!(%error, "request could not be built"));
                settle(&handle, CallState::Failed, || handler(Completion::failed(error)));
                return handle;
            }
        };

        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let prepared = if on_progress.is_some() {
            prepared.with_progress(ProgressReporter::new(move |progress| {
                // Closed once the task has finished.
                let _ = progress_tx.send(progress);
            }))
        } else {
            prepared
        };

        handle.set(CallState::InFlight);
        span.in_scope(|| debug!(url = %prepared.url(), "submitting request"));

        let task = Task {
            transport,
            endpoint,
            handle: handle.clone(),
            progress_rx,
            on_progress,
        };
        tokio::spawn(task.run(prepared, handler).instrument(span));

        handle
    }
}

/// Resolve parameters and encode the body.
fn build<E: Endpoint>(
    endpoint: &E,
    url: &str,
    request: Request,
    encoder: &BodyEncoder,
) -> Result<PreparedRequest> {
    let resolved = resolve(
        request.parameters().clone(),
        endpoint.extra_parameters(),
        endpoint.extra_query_parameters(),
    );

    if !resolved.overridden.is_empty() {
        debug!(keys = ?resolved.overridden, "endpoint parameters override caller parameters");
    }
    if request.method() == Method::Post
        && request.effective_post_format() == PostFormat::Raw
        && !resolved.body.is_empty()
    {
        warn!(
            keys = ?resolved.body.keys().collect::<Vec<_>>(),
            "raw format ignores body parameters"
        );
    }

    let prepared = request.prepare(url, resolved, encoder)?;
    debug!(
        body_len = prepared.body().map_or(0, bytes::Bytes::len),
        "request built"
    );
    Ok(prepared)
}

// ============================================================================
// Task
// ============================================================================

struct Task<E, T> {
    transport: Arc<T>,
    endpoint: E,
    handle: ExecutionHandle,
    progress_rx: mpsc::UnboundedReceiver<Progress>,
    on_progress: Option<ProgressFn>,
}

enum Outcome {
    Finished(Result<Response>),
    Cancelled,
}

impl<E: Endpoint, T: Transport> Task<E, T> {
    async fn run<H>(mut self, prepared: PreparedRequest, handler: H)
    where
        H: FnOnce(Completion<EndpointOutput<E>>),
    {
        let token = self.handle.token.clone();
        let transport = Arc::clone(&self.transport);
        let outcome = {
            let exchange = transport.execute(prepared);
            tokio::pin!(exchange);
            loop {
                tokio::select! {
                    biased;
                    result = &mut exchange => break Outcome::Finished(result),
                    () = token.cancelled() => break Outcome::Cancelled,
                    Some(progress) = self.progress_rx.recv() => {
                        notify(self.on_progress.as_mut(), progress);
                    }
                }
            }
        };

        match outcome {
            Outcome::Cancelled => {
                warn!("request cancelled");
                settle(&self.handle, CallState::Cancelled, || {
                    handler(Completion::failed(Error::Cancelled));
                });
            }
            Outcome::Finished(Err(error)) => {
                self.drain_progress();
                warn!(%error, "request failed");
                settle(&self.handle, CallState::Failed, || {
                    handler(Completion::failed(error));
                });
            }
            Outcome::Finished(Ok(response)) => {
                self.drain_progress();
                let (meta, body) = response.split();
                let result = self.endpoint.handle_result(body);
                match &result {
                    Ok(_) => info!(status = meta.status(), "request completed"),
                    Err(error) => warn!(status = meta.status(), %error, "response could not be decoded"),
                }
                settle(&self.handle, CallState::Completed, || {
                    handler(Completion {
                        result,
                        response: Some(meta),
                    });
                });
            }
        }
    }

    fn drain_progress(&mut self) {
        while let Ok(progress) = self.progress_rx.try_recv() {
            notify(self.on_progress.as_mut(), progress);
        }
    }
}

/// Run the handler, then publish `state`.
///
/// A panicking handler still leaves the call terminal, as `Failed`.
fn settle(handle: &ExecutionHandle, state: CallState, handler: impl FnOnce()) {
    let mut guard = Settle {
        handle,
        state: CallState::Failed,
    };
    handler();
    guard.state = state;
}

struct Settle<'a> {
    handle: &'a ExecutionHandle,
    state: CallState,
}

impl Drop for Settle<'_> {
    fn drop(&mut self) {
        self.handle.set(self.state);
    }
}

fn notify(on_progress: Option<&mut ProgressFn>, progress: Progress) {
    if let Some(on_progress) = on_progress {
        on_progress(progress);
    }
}
