//! Tower middleware for [`HyperTransport`](crate::HyperTransport).
//!
//! Layers wrap the transport service and see every [`PreparedRequest`](crate::PreparedRequest)
//! it executes. Add them with [`HyperTransportBuilder::layer`](crate::HyperTransportBuilder::layer);
//! the first layer added is the outermost.

mod logging;

pub use logging::{LogLevel, Logging, LoggingLayer};

// Re-export tower types for convenience
pub use tower::{Layer, ServiceBuilder};
