use crate::error::EventBusError;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tracing::{error, trace, warn};

/// Default buffer for broadcast streams.
/// 128 is plenty for realtime UI events that are consumed as they arrive.
const DEFAULT_CAPACITY: usize = 128;
const MIN_CAPACITY: usize = 1;

/// Compile-time mapping from an event name to its payload type.
///
/// Each topic is a zero-sized marker type, so subscribing with the wrong
/// payload is a type error rather than a silent runtime miss.
///
/// ```rust
/// use bazaar_event_bus::Topic;
///
/// struct OrderShipped;
///
/// impl Topic for OrderShipped {
///     type Payload = u64;
///     const NAME: &'static str = "order-shipped";
/// }
/// ```
pub trait Topic: 'static {
    /// Data delivered to listeners of this topic.
    type Payload: Send + Sync + 'static;
    /// Stable, human-readable event name used in logs.
    const NAME: &'static str;
}

/// Identifies a single registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Outcome of a single [`EventBus::emit`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dispatch {
    /// Listeners that returned normally.
    pub delivered: usize,
    /// Listeners that panicked; their siblings were still invoked.
    pub panicked: usize,
    /// Async stream receivers that got the payload.
    pub streamed: usize,
}

type Callback<P> = Arc<dyn Fn(&P) + Send + Sync>;

#[derive(Debug)]
struct Listener {
    id: ListenerId,
    callback: Box<dyn Any + Send + Sync>,
}

#[derive(Debug)]
struct StreamState {
    capacity: usize,
    sender: Box<dyn Any + Send + Sync>,
}

#[derive(Debug)]
struct TopicSlot {
    name: &'static str,
    listeners: Vec<Listener>,
    stream: Option<StreamState>,
}

impl TopicSlot {
    const fn new(name: &'static str) -> Self {
        Self { name, listeners: Vec::new(), stream: None }
    }
}

#[derive(Debug, Default)]
struct Registry {
    topics: RwLock<FxHashMap<TypeId, TopicSlot>>,
    next_id: AtomicU64,
}

impl Registry {
    fn remove(&self, topic: TypeId, id: ListenerId) -> bool {
        let mut topics = self.topics.write();
        let Some(slot) = topics.get_mut(&topic) else {
            return false;
        };
        let before = slot.listeners.len();
        slot.listeners.retain(|l| l.id != id);
        let removed = slot.listeners.len() != before;
        if removed {
            trace!(event = slot.name, listener = id.0, "Listener removed");
        }
        removed
    }
}

/// Handle returned by [`EventBus::on`].
///
/// Dropping the handle keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[must_use = "keep the subscription to be able to unsubscribe later"]
#[derive(Debug)]
pub struct Subscription {
    registry: Weak<Registry>,
    topic: TypeId,
    name: &'static str,
    id: ListenerId,
}

impl Subscription {
    #[must_use]
    pub const fn id(&self) -> ListenerId {
        self.id
    }

    /// Name of the topic this listener is attached to.
    #[must_use]
    pub const fn topic(&self) -> &'static str {
        self.name
    }

    /// Removes the listener. Returns `false` if it was already removed or the
    /// bus no longer exists.
    pub fn unsubscribe(self) -> bool {
        self.registry.upgrade().is_some_and(|registry| registry.remove(self.topic, self.id))
    }
}

/// A typed, thread-safe publish/subscribe registry.
///
/// Listeners are plain callbacks keyed by [`Topic`]. Async consumers can also
/// attach a broadcast stream per topic. Cloning the bus shares the registry.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    registry: Arc<Registry>,
}

impl EventBus {
    /// Creates a new, empty `EventBus`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for topic `T`.
    ///
    /// # Examples
    /// ```rust
    /// use bazaar_event_bus::{EventBus, Topic};
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicU64, Ordering};
    ///
    /// struct Tick;
    /// impl Topic for Tick {
    ///     type Payload = u64;
    ///     const NAME: &'static str = "tick";
    /// }
    ///
    /// let bus = EventBus::new();
    /// let seen = Arc::new(AtomicU64::new(0));
    /// let sink = seen.clone();
    /// let sub = bus.on::<Tick>(move |n| sink.store(*n, Ordering::SeqCst));
    ///
    /// bus.emit::<Tick>(7);
    /// assert_eq!(seen.load(Ordering::SeqCst), 7);
    /// assert!(sub.unsubscribe());
    /// ```
    pub fn on<T: Topic>(&self, callback: impl Fn(&T::Payload) + Send + Sync + 'static) -> Subscription {
        let id = ListenerId(self.registry.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let callback: Callback<T::Payload> = Arc::new(callback);

        self.registry
            .topics
            .write()
            .entry(TypeId::of::<T>())
            .or_insert_with(|| TopicSlot::new(T::NAME))
            .listeners
            .push(Listener { id, callback: Box::new(callback) });

        trace!(event = T::NAME, listener = id.0, "Listener registered");

        Subscription { registry: Arc::downgrade(&self.registry), topic: TypeId::of::<T>(), name: T::NAME, id }
    }

    /// Removes the listener `id` from topic `T`.
    pub fn off<T: Topic>(&self, id: ListenerId) -> bool {
        self.registry.remove(TypeId::of::<T>(), id)
    }

    /// Number of callback listeners currently attached to `T`.
    #[must_use]
    pub fn listener_count<T: Topic>(&self) -> usize {
        self.registry.topics.read().get(&TypeId::of::<T>()).map_or(0, |slot| slot.listeners.len())
    }

    /// Dispatches `payload` to every listener of `T` and to its stream, if any.
    ///
    /// Listeners are invoked on a snapshot taken before dispatch, so a listener
    /// may (un)subscribe without deadlocking. A panicking listener is logged and
    /// counted in [`Dispatch::panicked`]; the remaining listeners still run.
    pub fn emit<T: Topic>(&self, payload: T::Payload) -> Dispatch {
        let payload = Arc::new(payload);

        let (callbacks, stream) = {
            let topics = self.registry.topics.read();
            topics.get(&TypeId::of::<T>()).map_or_else(
                || (Vec::new(), None),
                |slot| {
                    let callbacks: Vec<Callback<T::Payload>> = slot
                        .listeners
                        .iter()
                        .filter_map(|l| l.callback.downcast_ref::<Callback<T::Payload>>().cloned())
                        .collect();
                    let stream = slot.stream.as_ref().and_then(|s| {
                        s.sender.downcast_ref::<broadcast::Sender<Arc<T::Payload>>>().cloned()
                    });
                    (callbacks, stream)
                },
            )
        };

        let mut dispatch = Dispatch::default();

        for callback in &callbacks {
            match catch_unwind(AssertUnwindSafe(|| callback(&*payload))) {
                Ok(()) => dispatch.delivered += 1,
                Err(panic) => {
                    dispatch.panicked += 1;
                    error!(event = T::NAME, reason = panic_reason(&*panic), "Event listener panicked");
                },
            }
        }

        if let Some(tx) = stream {
            dispatch.streamed = tx.send(payload).unwrap_or(0);
        }

        trace!(
            event = T::NAME,
            delivered = dispatch.delivered,
            panicked = dispatch.panicked,
            streamed = dispatch.streamed,
            "Event dispatched"
        );
        dispatch
    }

    /// Opens an async broadcast stream for `T` with the default capacity.
    ///
    /// # Errors
    /// Returns [`EventBusError::TypeMismatch`] if the registry invariant is broken.
    pub fn stream<T: Topic>(&self) -> Result<broadcast::Receiver<Arc<T::Payload>>, EventBusError> {
        self.stream_with_capacity::<T>(DEFAULT_CAPACITY)
    }

    /// Opens an async broadcast stream for `T`.
    ///
    /// The first caller decides the capacity; later callers with a different
    /// capacity share the existing channel and get a warning.
    ///
    /// # Errors
    /// Returns [`EventBusError::InvalidCapacity`] if `capacity` is zero.
    pub fn stream_with_capacity<T: Topic>(
        &self,
        capacity: usize,
    ) -> Result<broadcast::Receiver<Arc<T::Payload>>, EventBusError> {
        let capacity = validate_capacity(capacity)?;
        let mut topics = self.registry.topics.write();
        let slot = topics.entry(TypeId::of::<T>()).or_insert_with(|| TopicSlot::new(T::NAME));

        let state = slot.stream.get_or_insert_with(|| {
            trace!(event = T::NAME, capacity, "Initializing event stream");
            let (tx, _) = broadcast::channel::<Arc<T::Payload>>(capacity);
            StreamState { capacity, sender: Box::new(tx) }
        });

        if state.capacity != capacity {
            warn!(
                event = T::NAME,
                existing_capacity = state.capacity,
                requested_capacity = capacity,
                "Event stream already initialized with a different capacity"
            );
        }

        state
            .sender
            .downcast_ref::<broadcast::Sender<Arc<T::Payload>>>()
            .map(broadcast::Sender::subscribe)
            .ok_or_else(|| EventBusError::TypeMismatch {
                message: std::any::type_name::<T::Payload>().into(),
                context: Some(T::NAME.into()),
            })
    }

    /// Drops every listener and stream. Open stream receivers observe closure.
    ///
    /// Returns the number of topics that were cleared.
    pub fn clear(&self) -> usize {
        let mut topics = self.registry.topics.write();
        let count = topics.len();
        topics.clear();
        count
    }
}

fn validate_capacity(capacity: usize) -> Result<usize, EventBusError> {
    if capacity < MIN_CAPACITY {
        return Err(EventBusError::InvalidCapacity {
            message: format!("capacity must be >= {MIN_CAPACITY}").into(),
            context: None,
        });
    }
    Ok(capacity)
}

fn panic_reason(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ping;
    impl Topic for Ping {
        type Payload = u32;
        const NAME: &'static str = "ping";
    }

    #[test]
    fn listener_ids_are_unique_across_topics() {
        struct Pong;
        impl Topic for Pong {
            type Payload = ();
            const NAME: &'static str = "pong";
        }

        let bus = EventBus::new();
        let a = bus.on::<Ping>(|_| {});
        let b = bus.on::<Pong>(|()| {});
        assert_ne!(a.id(), b.id());
        assert_eq!(a.topic(), "ping");
        assert_eq!(b.topic(), "pong");
    }

    #[test]
    fn unsubscribe_after_bus_dropped_is_false() {
        let bus = EventBus::new();
        let sub = bus.on::<Ping>(|_| {});
        drop(bus);
        assert!(!sub.unsubscribe());
    }

    #[test]
    fn panic_reason_extracts_messages() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_reason(&*boxed), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_reason(&*boxed), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(5_u8);
        assert_eq!(panic_reason(&*boxed), "non-string panic payload");
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let bus = EventBus::new();
        assert!(matches!(
            bus.stream_with_capacity::<Ping>(0),
            Err(EventBusError::InvalidCapacity { .. })
        ));
    }
}
