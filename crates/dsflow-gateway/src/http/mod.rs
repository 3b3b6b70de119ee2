//! HTTP transport for the gateway.
//!
//! This module provides a reqwest-based implementation of the
//! [`GatewayProvider`](crate::GatewayProvider) trait. Every remote procedure is
//! a `POST {endpoint}/{method}` carrying its named arguments as a JSON object;
//! the bridge answers with a [`Envelope`].
//!
//! # Example
//!
//! ```rust,ignore
//! use dsflow_gateway::http::{HttpGateway, HttpGatewayConfig};
//! use dsflow_gateway::GatewayService;
//!
//! let config = HttpGatewayConfig::builder()
//!     .with_endpoint("http://127.0.0.1:25333")?
//!     .build()?;
//! let service: GatewayService = HttpGateway::new(config)?.into_service();
//! ```

mod client;
mod config;
mod envelope;

pub use client::HttpGateway;
pub use config::{HttpGatewayBuilder, HttpGatewayConfig};
pub use envelope::{Envelope, STATUS_SUCCESS};

/// Tracing target for HTTP gateway operations.
pub const TRACING_TARGET: &str = "dsflow_gateway::http";
