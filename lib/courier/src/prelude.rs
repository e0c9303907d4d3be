//! Prelude module for convenient imports.
//!
//! ```ignore
//! use courier::prelude::*;
//! ```

pub use crate::{
    Body, CallState, ClientConfig, Completion, Endpoint, Error, ExecutionHandle, Executor,
    FilePart, HyperTransport, JsonDecoder, Method, Params, PostFormat, Progress, RawDecoder,
    Request, Response, Result, TextDecoder, Transport,
};
pub use serde::{Deserialize, Serialize};
