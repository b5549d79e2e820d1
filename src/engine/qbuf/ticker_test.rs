use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::engine::qbuf::message::QBufMessage;
use crate::engine::qbuf::ticker::start_lifecycle_ticker;
use crate::logging::init_for_tests;

#[tokio::test]
async fn ticker_emits_ticks_at_the_configured_interval() {
    init_for_tests();
    let (tx, mut rx) = mpsc::channel(8);
    let handle = start_lifecycle_ticker(tx, Duration::from_millis(10));

    for _ in 0..3 {
        let msg = timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("tick within the interval")
            .expect("ticker alive");
        assert!(matches!(msg, QBufMessage::Tick));
    }

    drop(rx);
    timeout(Duration::from_millis(500), handle)
        .await
        .expect("ticker stops once the manager is gone")
        .unwrap();
}
