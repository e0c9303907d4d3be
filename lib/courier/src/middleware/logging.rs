//! Exchange logging for [`HyperTransport`](crate::HyperTransport).
//!
//! Every [`PreparedRequest`] passing through gets a `courier.transport` span
//! with one event when it leaves and one when the exchange ends.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use bytes::Bytes;
use tower::{Layer, Service};
use tracing::{Instrument, Level, debug, info, span, warn};

use crate::{Error, PreparedRequest, Response, Result};

/// Wraps a transport stack in [`Logging`].
///
/// # Example
///
/// ```no_run
/// use courier::HyperTransport;
/// use courier::middleware::LoggingLayer;
///
/// let transport = HyperTransport::builder()
///     .layer(LoggingLayer::debug())
///     .build();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingLayer {
    level: LogLevel,
}

/// How much of the outgoing request is logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Headers, body size and whether progress is observed, at `debug`.
    Debug,
    /// Method and URL only, at `info`.
    #[default]
    Info,
}

impl LoggingLayer {
    /// Summary logging.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Detailed logging of the outgoing request.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
        }
    }

    /// The configured level.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = Logging<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Logging {
            inner,
            level: self.level,
        }
    }
}

/// Logs the exchanges of the wrapped service.
#[derive(Debug, Clone)]
pub struct Logging<S> {
    inner: S,
    level: LogLevel,
}

impl<S> Service<PreparedRequest> for Logging<S>
where
    S: Service<PreparedRequest, Response = Response<Bytes>, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Bytes>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: PreparedRequest) -> Self::Future {
        let method = request.method();
        let url = request.url().to_string();
        let level = self.level;

        let span = span!(Level::INFO, "courier.transport", %method, %url);

        let mut inner = self.inner.clone();
        Box::pin(
            async move {
                let start = Instant::now();

                if level == LogLevel::Debug {
                    debug!(
                        headers = ?request.headers(),
                        body_len = request.body().map_or(0, Bytes::len),
                        progress = request.progress().is_enabled(),
                        "sending request"
                    );
                } else {
                    info!("sending request");
                }

                let result = inner.call(request).await;
                let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                log_outcome(&result, elapsed_ms);
                result
            }
            .instrument(span),
        )
    }
}

fn log_outcome(result: &Result<Response<Bytes>>, elapsed_ms: u64) {
    match result {
        Ok(response) => {
            let status = response.status();
            let body_len = response.body().len();
            if response.is_success() {
                info!(status, body_len, elapsed_ms, "exchange done");
            } else {
                warn!(status, body_len, elapsed_ms, "server answered with an error status");
            }
        }
        Err(error) => warn!(%error, elapsed_ms, "exchange failed"),
    }
}
