mod support;

use bazaar_realtime::ReconnectPolicy;
use bazaar_realtime::events::Connected;
use proptest::prelude::*;
use std::time::Duration;
use support::{MockTransport, client, next, payload};

/// Sends `offline` messages, connects, then sends `online` messages while the
/// connection opens, yielding to the runtime after sends flagged in `yields`.
async fn delivered_order(offline: Vec<String>, online: Vec<String>, yields: Vec<bool>) -> Vec<String> {
    let (transport, mut acceptor) = MockTransport::new();
    let (client, bus, _) = client(transport, Some("t-1"), ReconnectPolicy::new(5, Duration::from_secs(1)));
    let mut connected = bus.stream::<Connected>().unwrap();

    for text in &offline {
        client.send_message("c-1", text).unwrap();
    }
    client.connect("u-1", "t-1").unwrap();

    for (i, text) in online.iter().enumerate() {
        client.send_message("c-1", text).unwrap();
        if yields.get(i).copied().unwrap_or(false) {
            tokio::task::yield_now().await;
        }
    }

    let mut server = acceptor.accept().await;
    next(&mut connected).await;

    let mut received = Vec::new();
    for _ in 0..offline.len() + online.len() {
        let frame = server.next_sent().await.unwrap();
        received.push(payload(&frame)["message"].as_str().unwrap().to_owned());
    }
    assert_eq!(client.status().queue_length, 0);
    received
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn sends_arrive_in_enqueue_order(
        offline in prop::collection::vec("[a-z0-9 ]{1,12}", 0..16),
        online in prop::collection::vec("[a-z0-9 ]{1,12}", 0..16),
        yields in prop::collection::vec(any::<bool>(), 0..16),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .start_paused(true)
            .build()
            .unwrap();

        let expected: Vec<String> = offline.iter().chain(&online).cloned().collect();
        let received = runtime.block_on(delivered_order(offline, online, yields));
        prop_assert_eq!(received, expected);
    }
}
