//! In-process transport for tests and single-binary simulations.
//!
//! Envelopes go through the wire encoding so that everything a node publishes is known to serialize.

use super::encoding::{decode_envelope, encode_envelope};
use super::traits::{MessageEnvelope, Transport, TransportSubscription};
use crate::domain::ProtocolMessage;
use crate::foundation::{now_nanos, Hash32, MixError, PeerId, Result, PROTOCOL_VERSION};
use async_trait::async_trait;
use futures_util::stream::{self, BoxStream};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

const TOPIC_CAPACITY: usize = 256;

pub struct MockHub {
    topics: Mutex<HashMap<Hash32, broadcast::Sender<Arc<Vec<u8>>>>>,
}

impl MockHub {
    pub fn new() -> Self {
        Self { topics: Mutex::new(HashMap::new()) }
    }

    async fn topic(&self, topic: Hash32) -> broadcast::Sender<Arc<Vec<u8>>> {
        let mut guard = self.topics.lock().await;
        guard.entry(topic).or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0).clone()
    }
}

impl Default for MockHub {
    fn default() -> Self {
        Self::new()
    }
}

pub struct MockTransport {
    hub: Arc<MockHub>,
    sender_peer_id: PeerId,
    protocol_version: u32,
    seq: AtomicU64,
}

impl MockTransport {
    pub fn new(hub: Arc<MockHub>, sender_peer_id: PeerId) -> Self {
        Self::with_protocol_version(hub, sender_peer_id, PROTOCOL_VERSION)
    }

    pub fn with_protocol_version(hub: Arc<MockHub>, sender_peer_id: PeerId, protocol_version: u32) -> Self {
        Self { hub, sender_peer_id, protocol_version, seq: AtomicU64::new(1) }
    }

    fn broadcast_topic_id() -> Hash32 {
        *blake3::hash(b"mixpool/broadcast/v1").as_bytes()
    }

    fn peer_topic_id(peer: &PeerId) -> Hash32 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"mixpool/peer/v1");
        hasher.update(peer.as_bytes());
        *hasher.finalize().as_bytes()
    }

    async fn publish(&self, topic: Hash32, payload: ProtocolMessage) -> Result<()> {
        let envelope = MessageEnvelope {
            sender_peer_id: self.sender_peer_id.clone(),
            protocol_version: self.protocol_version,
            seq_no: self.seq.fetch_add(1, Ordering::Relaxed),
            timestamp_nanos: now_nanos(),
            payload,
        };
        let bytes = encode_envelope(&envelope)?;
        let sender = self.hub.topic(topic).await;
        // No receivers is not an error: nobody is listening yet.
        let _ = sender.send(Arc::new(bytes));
        Ok(())
    }

    fn receiver_stream(
        mut receiver: broadcast::Receiver<Arc<Vec<u8>>>,
        local: PeerId,
    ) -> BoxStream<'static, Result<MessageEnvelope>> {
        Box::pin(async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(bytes) => match decode_envelope(&bytes) {
                        Ok(envelope) if envelope.sender_peer_id == local => continue,
                        Ok(envelope) => yield Ok(envelope),
                        Err(err) => yield Err(err),
                    },
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        yield Err(MixError::transport("subscribe", format!("mock transport lagged by {skipped}")));
                    }
                }
            }
        })
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn local_peer_id(&self) -> &PeerId {
        &self.sender_peer_id
    }

    async fn send(&self, peer: &PeerId, message: ProtocolMessage) -> Result<()> {
        self.publish(Self::peer_topic_id(peer), message).await
    }

    async fn broadcast(&self, message: ProtocolMessage) -> Result<()> {
        self.publish(Self::broadcast_topic_id(), message).await
    }

    async fn subscribe(&self) -> Result<TransportSubscription> {
        let direct = self.hub.topic(Self::peer_topic_id(&self.sender_peer_id)).await.subscribe();
        let broadcast = self.hub.topic(Self::broadcast_topic_id()).await.subscribe();
        let merged = stream::select(
            Self::receiver_stream(direct, self.sender_peer_id.clone()),
            Self::receiver_stream(broadcast, self.sender_peer_id.clone()),
        );
        Ok(TransportSubscription::new(Box::pin(merged)))
    }
}
