use crate::application::pool::PoolService;
use crate::foundation::{now_nanos, Result};
use crate::infrastructure::transport::TransportSubscription;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Drive timeouts and round progress every `interval`. Runs until the task is dropped.
pub async fn run_pool_tick_loop(service: Arc<PoolService>, interval: Duration) -> Result<()> {
    info!("pool tick loop started interval_ms={}", interval.as_millis());
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        if let Err(err) = service.tick(now_nanos()).await {
            warn!("pool tick failed error={}", err);
        }
    }
}

/// Feed inbound envelopes to `service` until the subscription closes.
pub async fn run_message_loop(service: Arc<PoolService>, mut subscription: TransportSubscription) -> Result<()> {
    info!("message loop started peer={}", service.local_peer_id());
    while let Some(item) = subscription.next().await {
        let envelope = match item {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!("inbound message dropped error={}", err);
                continue;
            }
        };
        let kind = envelope.payload.kind();
        let sender = envelope.sender_peer_id.clone();
        if let Err(err) = service.handle_envelope(envelope, now_nanos()).await {
            warn!("inbound message failed kind={} peer={} error={}", kind, sender, err);
        }
    }
    debug!("message loop finished peer={}", service.local_peer_id());
    Ok(())
}
