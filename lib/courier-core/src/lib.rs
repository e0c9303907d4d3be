//! Core types and traits for courier.
//!
//! This crate holds everything that does not touch the network:
//! - [`Params`] and [`resolve`] - request parameters and their merge rules
//! - [`Body`], [`BodyEncoder`] and [`Form`] - raw, URL-encoded and multipart bodies
//! - [`Request`] and [`PreparedRequest`] - caller configuration and the built request
//! - [`Endpoint`] and [`ResultDecoder`] - target URL, extra parameters, result decoding
//! - [`Transport`] - the contract a network implementation fulfils
//! - [`ProgressReporter`] - monotonic upload/download progress
//! - [`Error`] and [`Result`] - error handling

mod body;
mod endpoint;
mod error;
mod method;
mod multipart;
mod params;
pub mod prelude;
mod progress;
mod request;
mod response;
mod transport;

pub use body::{
    Body, BodyEncoder, ContentType, PostFormat, encode_body, from_json, to_form, to_query_string,
};
pub use endpoint::{Endpoint, EndpointOutput, JsonDecoder, RawDecoder, ResultDecoder, TextDecoder};
pub use error::{Error, Result};
pub use method::Method;
pub use multipart::{FilePart, Form, Part};
pub use params::{ParamValue, Params, ResolvedParams, resolve};
pub use progress::{Phase, Progress, ProgressReporter};
pub use request::{PreparedRequest, PreparedRequestBuilder, Request};
pub use response::{Response, ResponseMeta};
pub use transport::Transport;

// Re-export http crate types for status codes and headers
pub use http::{StatusCode, header};
