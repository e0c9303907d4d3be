//! Prelude module for convenient imports.
//!
//! ```ignore
//! use courier_core::prelude::*;
//! ```

pub use crate::{
    Body, Endpoint, Error, FilePart, JsonDecoder, Method, Params, PostFormat, Progress,
    RawDecoder, Request, Response, ResponseMeta, Result, TextDecoder, Transport,
};
