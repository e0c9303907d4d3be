//! Endpoints and result decoders.
//!
//! An [`Endpoint`] describes a remote resource: its URL, the parameters it
//! always adds, and how its response body turns into a value. Decoding goes
//! through a [`ResultDecoder`]; the three provided decoders cover raw bytes,
//! UTF-8 text and JSON.
//!
//! # Example
//!
//! ```
//! use courier_core::{Endpoint, JsonDecoder, Params};
//!
//! #[derive(serde::Deserialize)]
//! struct Weather {
//!     temperature: f64,
//! }
//!
//! struct CurrentWeather {
//!     city: String,
//! }
//!
//! impl Endpoint for CurrentWeather {
//!     type Decoder = JsonDecoder<Weather>;
//!
//!     fn url(&self) -> String {
//!         format!("https://weather.example.com/v1/{}", self.city)
//!     }
//!
//!     fn extra_query_parameters(&self) -> Params {
//!         Params::new().with("units", "metric")
//!     }
//! }
//!
//! let weather = CurrentWeather { city: "lyon".into() }
//!     .handle_result(r#"{"temperature":21.5}"#.into())
//!     .expect("decode");
//! assert!((weather.temperature - 21.5).abs() < f64::EPSILON);
//! ```

use std::fmt;
use std::marker::PhantomData;

use bytes::Bytes;

use crate::{Error, Params, Result};

/// Output type produced by an endpoint's decoder.
pub type EndpointOutput<E> = <<E as Endpoint>::Decoder as ResultDecoder>::Output;

/// A remote resource a [`Request`](crate::Request) is sent to.
///
/// Only [`Endpoint::url`] is required. The remaining hooks default to no
/// extra parameters and to the associated decoder.
pub trait Endpoint: Send + Sync + 'static {
    /// Decoder applied to the response body.
    type Decoder: ResultDecoder + Default;

    /// Absolute URL of the resource.
    ///
    /// An empty URL is a configuration error reported when the request is
    /// built.
    fn url(&self) -> String;

    /// Parameters merged into every request's body parameters.
    ///
    /// On key collision these win over the caller's.
    fn extra_parameters(&self) -> Params {
        Params::new()
    }

    /// Parameters always appended to the query string, whatever the method.
    fn extra_query_parameters(&self) -> Params {
        Params::new()
    }

    /// Turn the response body into a value.
    ///
    /// # Errors
    ///
    /// Returns a decode error when the body does not match the expected shape.
    fn handle_result(&self, body: Bytes) -> Result<EndpointOutput<Self>> {
        Self::Decoder::default().decode(body)
    }
}

/// Converts a response body into a value.
pub trait ResultDecoder: Send + Sync {
    /// Decoded value.
    type Output: Send + 'static;

    /// Decode `body`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] or [`Error::JsonDeserialization`] when the
    /// body cannot be decoded.
    fn decode(&self, body: Bytes) -> Result<Self::Output>;
}

/// Passes the body through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawDecoder;

impl ResultDecoder for RawDecoder {
    type Output = Bytes;

    fn decode(&self, body: Bytes) -> Result<Bytes> {
        Ok(body)
    }
}

/// Decodes the body as UTF-8 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDecoder;

impl ResultDecoder for TextDecoder {
    type Output = String;

    fn decode(&self, body: Bytes) -> Result<String> {
        String::from_utf8(body.to_vec()).map_err(|e| Error::decode(e.to_string()))
    }
}

/// Decodes the body as JSON into `T`.
pub struct JsonDecoder<T>(PhantomData<fn() -> T>);

impl<T> JsonDecoder<T> {
    /// Create a JSON decoder.
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonDecoder<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for JsonDecoder<T> {}

impl<T> fmt::Debug for JsonDecoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("JsonDecoder")
            .field(&std::any::type_name::<T>())
            .finish()
    }
}

impl<T> ResultDecoder for JsonDecoder<T>
where
    T: serde::de::DeserializeOwned + Send + 'static,
{
    type Output = T;

    fn decode(&self, body: Bytes) -> Result<T> {
        crate::from_json(&body)
    }
}
