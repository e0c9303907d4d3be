//! The transport contract.
//!
//! A [`Transport`] performs the actual network exchange for a
//! [`PreparedRequest`]. The runtime crate ships a hyper-based implementation;
//! tests can substitute a scripted one.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;

use crate::{PreparedRequest, Response, Result};

/// Executes prepared HTTP requests.
///
/// Implementations feed [`PreparedRequest::progress`] while the body is sent
/// and received, and report at most one error per request. Dropping the
/// returned future aborts the exchange.
///
/// # Example
///
/// ```
/// use std::future::Future;
///
/// use bytes::Bytes;
/// use courier_core::{PreparedRequest, Response, Result, Transport};
///
/// #[derive(Clone)]
/// struct Echo;
///
/// impl Transport for Echo {
///     fn execute(
///         &self,
///         request: PreparedRequest,
///     ) -> impl Future<Output = Result<Response<Bytes>>> + Send {
///         let body = request.body().cloned().unwrap_or_default();
///         async move { Ok(Response::new(200, Default::default(), body)) }
///     }
/// }
/// ```
pub trait Transport: Send + Sync + 'static {
    /// Execute a request and return the buffered response.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails:
    /// - [`Error::Connection`](crate::Error::Connection) for network failures
    /// - [`Error::Tls`](crate::Error::Tls) for TLS failures
    /// - [`Error::Timeout`](crate::Error::Timeout) when the deadline passes
    fn execute(
        &self,
        request: PreparedRequest,
    ) -> impl Future<Output = Result<Response<Bytes>>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn execute(
        &self,
        request: PreparedRequest,
    ) -> impl Future<Output = Result<Response<Bytes>>> + Send {
        T::execute(self, request)
    }
}
