use crate::frame::components::{FrameControl, MacAddress};
use crate::frame_types::{FrameSubType, FrameType};
use crate::Addresses;

/// Sent by the receiving station to indicate that the data has been transmitted.
///
/// Part of the `RTS -> CTS -> Data -> ACK` protocol.
///
/// The protocol was introduced to reduce frame collisions introduced by the
/// [hidden node problem](https://en.wikipedia.org/wiki/Hidden_node_problem).
#[derive(Clone, Debug)]
pub struct Ack {
    pub frame_control: FrameControl,
    pub duration: [u8; 2],
    pub destination: MacAddress,
}

impl Ack {
    /// A minimal acknowledgement addressed at `destination`.
    pub fn new(destination: MacAddress) -> Self {
        Ack {
            frame_control: FrameControl {
                protocol_version: 0,
                frame_type: FrameType::Control,
                frame_subtype: FrameSubType::Ack,
                flags: 0,
            },
            duration: [0, 0],
            destination,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(10);

        bytes.extend(self.frame_control.encode());
        bytes.extend(self.duration);
        bytes.extend(self.destination.0);

        bytes
    }
}

impl Addresses for Ack {
    fn src(&self) -> Option<&MacAddress> {
        None
    }

    fn dest(&self) -> &MacAddress {
        &self.destination
    }

    fn bssid(&self) -> Option<&MacAddress> {
        None
    }
}
