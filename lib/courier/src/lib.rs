//! Asynchronous HTTP requests with pluggable parameters, selectable POST
//! encodings, progress reporting and cancellation.
//!
//! An [`Endpoint`] names the resource and the parameters it always adds; a
//! [`Request`] carries what the caller configures. An [`Executor`] builds the
//! final URL and body, submits them to a [`Transport`], and reports the
//! decoded outcome to a handler exactly once.
//!
//! # Example
//!
//! ```no_run
//! use courier::prelude::*;
//!
//! #[derive(Debug, Deserialize)]
//! struct Uploaded {
//!     id: u64,
//! }
//!
//! struct Upload;
//!
//! impl Endpoint for Upload {
//!     type Decoder = JsonDecoder<Uploaded>;
//!
//!     fn url(&self) -> String {
//!         "https://files.example.com/upload".to_string()
//!     }
//!
//!     fn extra_query_parameters(&self) -> Params {
//!         Params::new().with("api_key", "secret")
//!     }
//! }
//!
//! # async fn run() -> courier::Result<()> {
//! let executor = Executor::new(HyperTransport::new());
//!
//! let request = Request::post()
//!     .param("album", "holidays")
//!     .file(FilePart::guessed("photo", "beach.jpg", vec![0_u8; 1024]));
//!
//! let handle = executor.call(Upload, request).start_with_progress(
//!     |completion| println!("done: {:?}", completion.result),
//!     |progress| println!("uploading={} {:.0}%", progress.is_uploading(), progress.fraction * 100.0),
//! );
//! handle.finished().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod connector;
mod executor;
pub mod middleware;
pub mod prelude;
mod transport;

pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_UPLOAD_CHUNK_SIZE};
pub use executor::{Call, CallState, Completion, ExecutionHandle, Executor};
pub use transport::{BoxedService, HyperTransport, HyperTransportBuilder, ServiceFuture};

// Re-export tower for middleware composition
pub use tower;

// Re-export core types
pub use courier_core::{
    Body, BodyEncoder, ContentType, Endpoint, EndpointOutput, Error, FilePart, Form, JsonDecoder,
    Method, ParamValue, Params, Part, Phase, PostFormat, PreparedRequest, PreparedRequestBuilder,
    Progress, ProgressReporter, RawDecoder, Request, ResolvedParams, Response, ResponseMeta,
    Result, ResultDecoder, TextDecoder, Transport, encode_body, from_json, resolve, to_form,
    to_query_string,
};

// Re-export http types for status codes and headers
pub use courier_core::{StatusCode, header};
