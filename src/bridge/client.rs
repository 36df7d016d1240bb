//! Bridge client: one logical connection to the robot-control bridge.
//!
//! Every client carries the epoch of the connect attempt that created it
//! and stamps it onto each polled event, so the connection manager can drop
//! events that belong to a dead attempt.

use crate::bridge::transport::{BridgeFrame, BridgeTransport, TransportEvent};
use crate::error::Result;

/// A transport event tagged with its connection epoch
#[derive(Debug)]
pub struct BridgeEvent {
    pub epoch: u64,
    pub event: TransportEvent,
}

/// One logical connection to the bridge
pub struct BridgeClient {
    epoch: u64,
    transport: Box<dyn BridgeTransport>,
}

impl BridgeClient {
    /// Open the channel for attempt `epoch`
    pub fn open(epoch: u64, mut transport: Box<dyn BridgeTransport>, url: &str) -> Result<Self> {
        transport.open(url)?;
        Ok(Self { epoch, transport })
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Declare an outbound topic
    pub fn advertise(&mut self, topic: &str) -> Result<()> {
        self.transport
            .send(&BridgeFrame::new("advertise", topic, serde_json::Value::Null))
    }

    /// Declare an inbound topic
    pub fn subscribe(&mut self, topic: &str) -> Result<()> {
        self.transport
            .send(&BridgeFrame::new("subscribe", topic, serde_json::Value::Null))
    }

    pub fn unsubscribe(&mut self, topic: &str) -> Result<()> {
        self.transport
            .send(&BridgeFrame::new("unsubscribe", topic, serde_json::Value::Null))
    }

    /// Publish a message on a previously advertised topic
    pub fn publish(&mut self, topic: &str, msg: serde_json::Value) -> Result<()> {
        self.transport.send(&BridgeFrame::new("publish", topic, msg))
    }

    /// Poll for the next pending event, stamped with this client's epoch
    pub fn poll(&mut self) -> Result<Option<BridgeEvent>> {
        Ok(self.transport.poll()?.map(|event| BridgeEvent {
            epoch: self.epoch,
            event,
        }))
    }

    pub fn close(&mut self) {
        self.transport.close();
    }
}
