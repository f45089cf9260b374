pub mod fixtures;

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use bazaar_event_bus::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recorder(bus: &EventBus) -> (Arc<Mutex<Vec<usize>>>, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sub = bus.on::<BidPlaced>(move |bid| sink.lock().push(bid.0));
        (seen, sub)
    }

    #[test]
    fn test_listener_receives_events_in_order() {
        let bus = EventBus::new();
        let (seen, _sub) = recorder(&bus);

        for i in 0..5 {
            bus.emit::<BidPlaced>(Bid(i));
        }

        assert_eq!(*seen.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let (seen, sub) = recorder(&bus);

        bus.emit::<BidPlaced>(Bid(1));
        assert!(sub.unsubscribe());
        bus.emit::<BidPlaced>(Bid(2));

        assert_eq!(*seen.lock(), vec![1]);
        assert_eq!(bus.listener_count::<BidPlaced>(), 0);
    }

    #[test]
    fn test_off_removes_only_the_given_listener() {
        let bus = EventBus::new();
        let (first, first_sub) = recorder(&bus);
        let (second, _second_sub) = recorder(&bus);

        assert!(bus.off::<BidPlaced>(first_sub.id()));
        assert!(!bus.off::<BidPlaced>(first_sub.id()), "second removal is a no-op");

        let dispatch = bus.emit::<BidPlaced>(Bid(9));

        assert_eq!(dispatch.delivered, 1);
        assert!(first.lock().is_empty());
        assert_eq!(*second.lock(), vec![9]);
    }

    #[test]
    fn test_off_with_wrong_topic_is_noop() {
        let bus = EventBus::new();
        let (seen, sub) = recorder(&bus);

        assert!(!bus.off::<BidWithdrawn>(sub.id()));
        bus.emit::<BidPlaced>(Bid(3));
        assert_eq!(*seen.lock(), vec![3]);
    }

    #[test]
    fn test_panicking_listener_does_not_block_siblings() {
        let bus = EventBus::new();
        let (before, _a) = recorder(&bus);
        let _boom = bus.on::<BidPlaced>(|_| panic!("listener failure"));
        let (after, _b) = recorder(&bus);

        let dispatch = bus.emit::<BidPlaced>(Bid(7));

        assert_eq!(dispatch, Dispatch { delivered: 2, panicked: 1, streamed: 0 });
        assert_eq!(*before.lock(), vec![7]);
        assert_eq!(*after.lock(), vec![7]);

        // The bus stays usable after a panic.
        bus.emit::<BidPlaced>(Bid(8));
        assert_eq!(*after.lock(), vec![7, 8]);
    }

    #[test]
    fn test_topics_are_isolated() {
        let bus = EventBus::new();
        let withdrawn = Arc::new(AtomicUsize::new(0));
        let counter = withdrawn.clone();
        let _sub = bus.on::<BidWithdrawn>(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let dispatch = bus.emit::<BidPlaced>(Bid(1));

        assert_eq!(dispatch, Dispatch::default());
        assert_eq!(withdrawn.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_listener_may_unsubscribe_itself_during_dispatch() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let counter = calls.clone();
        let own = slot.clone();
        let sub = bus.on::<BidPlaced>(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(sub) = own.lock().take() {
                sub.unsubscribe();
            }
        });
        *slot.lock() = Some(sub);

        bus.emit::<BidPlaced>(Bid(1));
        bus.emit::<BidPlaced>(Bid(2));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_may_subscribe_during_dispatch() {
        let bus = EventBus::new();
        let inner_bus = bus.clone();
        let _sub = bus.on::<BidPlaced>(move |_| {
            let _late = inner_bus.on::<BidWithdrawn>(|_| {});
        });

        bus.emit::<BidPlaced>(Bid(1));

        assert_eq!(bus.listener_count::<BidWithdrawn>(), 1);
    }

    #[tokio::test]
    async fn test_stream_receives_alongside_callbacks() {
        let bus = EventBus::new();
        let mut rx = bus.stream::<BidPlaced>().unwrap();
        let (seen, _sub) = recorder(&bus);

        let dispatch = bus.emit::<BidPlaced>(Bid(42));

        assert_eq!(dispatch.streamed, 1);
        assert_eq!(rx.recv_event().await.unwrap().0, 42);
        assert_eq!(*seen.lock(), vec![42]);
    }

    #[tokio::test]
    async fn test_stream_lag_recovery() {
        let bus = EventBus::new();
        let mut rx = bus.stream_with_capacity::<BidPlaced>(2).unwrap();

        for i in 0..50 {
            bus.emit::<BidPlaced>(Bid(i));
        }

        let first = rx.recv_event().await.unwrap();
        assert!(first.0 >= 48, "expected the retained tail, got {}", first.0);
        let second = rx.recv_event().await.unwrap();
        assert_eq!(second.0, first.0 + 1);
    }

    #[tokio::test]
    async fn test_clear_closes_streams_and_listeners() {
        let bus = EventBus::new();
        let mut rx = bus.stream::<BidPlaced>().unwrap();
        let (seen, _sub) = recorder(&bus);

        assert_eq!(bus.clear(), 1);
        bus.emit::<BidPlaced>(Bid(5));

        assert!(rx.recv_event().await.is_none());
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_bus_is_reusable_after_clear() {
        let bus = EventBus::new();
        let (stale, _old) = recorder(&bus);
        bus.clear();

        let (fresh, _new) = recorder(&bus);
        bus.emit::<BidPlaced>(Bid(3));

        assert!(stale.lock().is_empty());
        assert_eq!(*fresh.lock(), vec![3]);
        assert_eq!(bus.listener_count::<BidPlaced>(), 1);
    }

    #[test]
    fn test_clones_share_the_registry() {
        let bus = EventBus::new();
        let clone = bus.clone();
        let (seen, _sub) = recorder(&clone);

        bus.emit::<BidPlaced>(Bid(11));

        assert_eq!(*seen.lock(), vec![11]);
    }
}
