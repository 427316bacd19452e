use crate::domain::{Outbound, ProtocolMessage};
use crate::infrastructure::transport::Transport;
use log::{trace, warn};
use std::sync::Arc;

/// Delivers what a session queued once its lock is released.
///
/// Delivery failures are logged and dropped; the session state is already settled.
pub struct RelayNotifier {
    transport: Arc<dyn Transport>,
}

impl RelayNotifier {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Returns how many messages were handed to the transport.
    pub async fn dispatch(&self, outbound: Vec<Outbound>) -> usize {
        let mut delivered = 0;
        for item in outbound {
            let kind = item.message().kind();
            let result = match item {
                Outbound::Broadcast(message) => self.transport.broadcast(message).await,
                Outbound::Send { peer, message } => {
                    trace!("sending direct message kind={} peer={}", kind, peer);
                    self.transport.send(&peer, message).await
                }
            };
            match result {
                Ok(()) => delivered += 1,
                Err(err) => warn!("relay failed kind={} error={}", kind, err),
            }
        }
        delivered
    }

    pub async fn relay(&self, message: ProtocolMessage) -> bool {
        self.dispatch(vec![Outbound::Broadcast(message)]).await == 1
    }
}
