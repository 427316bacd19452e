//! Peer messaging: the `Transport` port, wire envelope, and the in-process hub.

pub mod encoding;
pub mod messages;
pub mod mock;
pub mod traits;

pub use messages::MessageEnvelope;
pub use mock::{MockHub, MockTransport};
pub use traits::{Transport, TransportSubscription};
