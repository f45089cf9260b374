//! # Realtime
//!
//! Reconnecting messaging client for the marketplace realtime server.
//!
//! ## Overview
//!
//! [`RealtimeClient`] keeps one logical connection per signed-in user. Frames
//! sent while offline wait in a FIFO queue and are flushed, in order, as soon
//! as the connection opens. Dropped connections are retried with linear
//! backoff ([`ReconnectPolicy`]) using a token fetched fresh from a
//! [`CredentialStore`] on every attempt.
//!
//! Inbound frames are decoded and published as typed topics on a
//! [`bazaar_event_bus::EventBus`]; see [`events`] for the full list.
//!
//! ## Features
//!
//! * `websocket` (default): [`WebSocketTransport`] on `tokio-tungstenite` with rustls.
//!
//! Other transports implement [`Transport`]; tests use in-memory channels.

pub mod credentials;
pub mod events;
pub mod frame;
pub mod policy;
pub mod transport;

mod client;
mod error;

pub use client::{
    ConnectionStatus, Delivery, FLUSH_TIMEOUT, NoCredentials, NoEndpoint, NoTransport, RealtimeClient, RealtimeClientBuilder,
    WithCredentials, WithEndpoint, WithTransport,
};
pub use credentials::{CredentialStore, MemoryCredentials, StoredCredentials};
pub use error::{RealtimeError, RealtimeErrorExt};
pub use frame::{InboundFrame, OutboundFrame};
pub use policy::ReconnectPolicy;
#[cfg(feature = "websocket")]
pub use transport::WebSocketTransport;
pub use transport::{FrameSink, FrameStream, Transport};
