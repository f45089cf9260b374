use std::borrow::Cow;

/// Error types specific to the realtime client.
#[bazaar_derive::bazaar_error]
pub enum RealtimeError {
    /// The configured endpoint is not a usable `ws://` or `wss://` URL.
    #[error("Invalid realtime endpoint{}: {message}", format_context(.context))]
    InvalidEndpoint { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[cfg(feature = "websocket")]
    #[error("WebSocket failure{}: {source}", format_context(.context))]
    WebSocket {
        source: tokio_tungstenite::tungstenite::Error,
        context: Option<Cow<'static, str>>,
    },

    /// Transport-level failure reported by a non-WebSocket transport.
    #[error("Transport failure{}: {message}", format_context(.context))]
    Transport { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// An outbound frame could not be serialized.
    #[error("Frame serialization failed{}: {source}", format_context(.context))]
    Serialization { source: serde_json::Error, context: Option<Cow<'static, str>> },

    /// An inbound frame was not valid JSON or did not match its payload type.
    #[error("Malformed frame{}: {message}", format_context(.context))]
    Frame { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Credential lookup failed{}: {message}", format_context(.context))]
    Credentials { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
