use std::time::Duration;

use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::debug;

use crate::engine::qbuf::message::QBufMessage;

const LOG_TARGET: &str = "engine::qbuf::ticker";

/// Emit a lifecycle `Tick` into the manager's queue at least once per
/// interval. The sweep itself runs inside the actor, serialized with
/// commands; the loop ends when the manager is gone.
pub fn start_lifecycle_ticker(tx: Sender<QBufMessage>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            sleep(interval).await;
            if tx.send(QBufMessage::Tick).await.is_err() {
                debug!(target: LOG_TARGET, "Manager gone; lifecycle ticker stopping");
                break;
            }
        }
    })
}
