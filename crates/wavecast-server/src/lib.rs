//! # wavecast-server
//!
//! Axum `WebSocket` endpoints streaming generated samples.
//!
//! - Connection handles with bounded outbound queues ([`connection`])
//! - Session registry for per-client streams, connection set for the shared stream ([`registry`])
//! - Broadcast and per-client generation loops ([`stream`])
//! - Open/message/close event handlers ([`handlers`]) driven by the socket glue ([`websocket`])
//! - One [`SignalEndpoint`] per generator family, two listeners per [`WavecastServer`]
//! - `/health`, `/metrics`, and graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod connection;
pub mod endpoint;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod registry;
pub mod server;
pub mod shutdown;
pub mod stream;
pub mod websocket;

pub use config::{EndpointConfig, ServerConfig};
pub use endpoint::SignalEndpoint;
pub use errors::ServerError;
pub use server::{BoundAddrs, WavecastServer};
