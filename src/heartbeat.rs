//! Periodic heartbeat sender.
//!
//! Pushes a `ping` event on a fixed interval, either to one client or to
//! everyone. This keeps idle streams alive through proxies and surfaces dead
//! peers: a write to a vanished client fails and its writer unregisters it.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::domain::{ClientId, Event};
use crate::hub::ConnectionRegistry;

/// Builds the heartbeat event for tick number `seq`.
#[must_use]
pub fn ping_event(seq: u64) -> Event {
    Event::new(serde_json::json!({
        "seq": seq,
        "timestamp": Utc::now().to_rfc3339(),
    }))
    .with_kind("ping")
    .with_id(seq.to_string())
}

/// Spawns the heartbeat loop.
///
/// Runs until `shutdown` flips to `true` (or its sender is dropped).
pub fn spawn(
    registry: ConnectionRegistry,
    interval: Duration,
    target: Option<ClientId>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;
        let mut seq: u64 = 0;

        loop {
            tokio::select! {
                () = stopped(&mut shutdown) => break,
                _ = ticker.tick() => {}
            }
            seq = seq.wrapping_add(1);
            let event = ping_event(seq);
            let result = match &target {
                Some(id) => registry.send_to(id, &event).await.map(usize::from),
                None => registry.broadcast(&event).await,
            };
            match result {
                Ok(delivered) => tracing::debug!(seq, delivered, "heartbeat"),
                Err(err) => tracing::warn!(seq, error = %err, "heartbeat not encodable"),
            }
        }
        tracing::debug!("heartbeat stopped");
    })
}

async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
