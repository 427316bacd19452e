use crate::foundation::{PeerId, Result};
use crate::domain::ProtocolMessage;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;

pub use crate::infrastructure::transport::messages::MessageEnvelope;

/// Inbound envelopes addressed to this node, direct or broadcast.
pub struct TransportSubscription {
    inner: BoxStream<'static, Result<MessageEnvelope>>,
}

impl TransportSubscription {
    pub fn new(inner: BoxStream<'static, Result<MessageEnvelope>>) -> Self {
        Self { inner }
    }

    pub async fn next(&mut self) -> Option<Result<MessageEnvelope>> {
        self.inner.next().await
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    fn local_peer_id(&self) -> &PeerId;
    async fn send(&self, peer: &PeerId, message: ProtocolMessage) -> Result<()>;
    /// Deliver to every other peer.
    async fn broadcast(&self, message: ProtocolMessage) -> Result<()>;
    async fn subscribe(&self) -> Result<TransportSubscription>;
}
