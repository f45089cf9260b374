//! # Event Bus
//!
//! A typed publish/subscribe registry for realtime client events.
//!
//! ## Overview
//!
//! Events are declared as [`Topic`] marker types that fix the payload type at
//! compile time. Listeners are plain callbacks registered with [`EventBus::on`];
//! async code can additionally open a broadcast stream per topic with
//! [`EventBus::stream`].
//!
//! ## Features
//!
//! * **Type-Safe**: Topic names map to payload types at compile time.
//! * **Isolated dispatch**: A panicking listener never stops its siblings.
//! * **Re-entrant**: Listeners may subscribe or unsubscribe while an event is dispatched.
//! * **Async Ready**: Optional `tokio` broadcast streams per topic.
//!
//! # Example
//!
//! ```rust
//! use bazaar_event_bus::{EventBus, EventBusError, EventReceiverExt, Topic};
//!
//! struct ItemSold;
//! impl Topic for ItemSold {
//!     type Payload = String;
//!     const NAME: &'static str = "item-sold";
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), EventBusError> {
//!     let bus = EventBus::new();
//!     let mut rx = bus.stream::<ItemSold>()?;
//!     let _sub = bus.on::<ItemSold>(|id| assert_eq!(id, "item-42"));
//!
//!     bus.emit::<ItemSold>("item-42".to_owned());
//!
//!     let event = rx.recv_event().await.expect("stream open");
//!     assert_eq!(event.as_str(), "item-42");
//!     Ok(())
//! }
//! ```

mod bus;
mod error;
mod receiver;

pub use bus::{Dispatch, EventBus, ListenerId, Subscription, Topic};
pub use error::{EventBusError, EventBusErrorExt};
pub use receiver::EventReceiverExt;
