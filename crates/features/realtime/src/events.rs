//! Topics emitted by [`RealtimeClient`](crate::RealtimeClient).
//!
//! Subscribe with `client.on::<NewMessage>(|message| ...)` or open an async
//! stream with `client.events().stream::<NewMessage>()`.

use crate::error::RealtimeError;
use bazaar_domain::model::Message;
use bazaar_domain::realtime::{NotificationPayload, Presence, ReadReceipt, TypingIndicator};
use bazaar_event_bus::Topic;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub user_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The connection dropped or the server closed it; a reconnect follows.
    Closed,
    /// [`RealtimeClient::disconnect`](crate::RealtimeClient::disconnect) was called.
    Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisconnectInfo {
    pub reason: DisconnectReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Every allowed attempt was used.
    Exhausted,
    /// No auth token was available for the next attempt.
    MissingToken,
}

/// Terminal: no further reconnects are scheduled after this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectFailure {
    pub attempts: u32,
    pub reason: FailureReason,
}

macro_rules! topics {
    ($($(#[$doc:meta])* $topic:ident => $payload:ty, $name:literal;)*) => {
        $(
            $(#[$doc])*
            #[derive(Debug)]
            pub struct $topic;

            impl Topic for $topic {
                type Payload = $payload;
                const NAME: &'static str = $name;
            }
        )*
    };
}

topics! {
    Connected => ConnectionInfo, "connected";
    Disconnected => DisconnectInfo, "disconnected";
    /// Errors do not tear the connection down; the close that follows does.
    TransportError => RealtimeError, "error";
    ReconnectFailed => ReconnectFailure, "reconnect-failed";
    NewMessage => Message, "new-message";
    MessageRead => ReadReceipt, "message-read";
    UserTyping => TypingIndicator, "user-typing";
    UserOnline => Presence, "user-online";
    UserOffline => Presence, "user-offline";
    Notification => NotificationPayload, "notification";
}
