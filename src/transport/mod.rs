//! Publish/subscribe transport.
//!
//! The server talks to the message bus only through [`Transport`], so the
//! broker client can be swapped (or mocked in tests).

use std::time::Duration;

use crate::error::Result;
use crate::protocol::QoS;

#[cfg(feature = "mqtt")]
mod mqtt;

#[cfg(feature = "mqtt")]
pub use mqtt::MqttTransport;

/// Callback for inbound messages: topic and payload.
///
/// Runs on the transport's delivery thread and must not block.
pub type MessageHandler = Box<dyn FnMut(&str, &[u8]) + Send + 'static>;

/// Message bus client.
///
/// Setup order is `set_last_will`, `set_message_handler`, `connect`,
/// `subscribe`. Inbound messages are only delivered between
/// `start_delivery` and `stop_delivery`.
pub trait Transport: Send + Sync {
    /// Register the message published by the broker if the connection
    /// drops without a disconnect.
    fn set_last_will(&self, topic: &str, payload: &[u8], qos: QoS, retain: bool) -> Result<()>;

    /// Register the callback for inbound messages.
    fn set_message_handler(&self, handler: MessageHandler) -> Result<()>;

    /// Connect to the broker.
    fn connect(&self) -> Result<()>;

    /// Subscribe to a topic.
    fn subscribe(&self, topic: &str, qos: QoS) -> Result<()>;

    /// Queue a message for publication.
    fn publish(&self, topic: &str, payload: &[u8], qos: QoS, retain: bool) -> Result<()>;

    /// Publish a message and block until it was delivered to the broker.
    fn publish_confirmed(
        &self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
        timeout: Duration,
    ) -> Result<()>;

    /// Start the background delivery of messages.
    fn start_delivery(&self) -> Result<()>;

    /// Stop the background delivery of messages.
    fn stop_delivery(&self) -> Result<()>;

    /// Disconnect from the broker.
    fn disconnect(&self) -> Result<()>;
}
