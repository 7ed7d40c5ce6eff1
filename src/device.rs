//! Capability surface shared by the capture devices.

use std::sync::Arc;

use thiserror::Error;

use crate::capture::CaptureError;
use crate::connector::Connector;

/// Lifecycle of a capture device. Transitions only move forward; a device
/// that went through Stopping can be opened again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceState {
    Closed,
    Opened,
    Capturing,
    Stopping,
}

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("operation not allowed while the device is {0:?}")]
    InvalidState(DeviceState),
    #[error("no connector attached to the device")]
    NoConnector,
    #[error("could not spawn the capture worker: {0}")]
    Worker(String),
}

/// The operations the engine and the connector drive a capture device with.
///
/// Two implementations exist: [MonitorDevice](crate::monitor::MonitorDevice)
/// for a plain monitor mode adapter and
/// [PspPluginDevice](crate::psp_plugin::PspPluginDevice) for handhelds
/// running the custom plugin. The engine picks the variant at construction
/// time; nothing downcasts afterwards.
pub trait PacketDevice: Send + Sync {
    /// Open the capture source so the device can be used for capture.
    fn open(&self, name: &str, ssid_filter: Vec<String>) -> Result<(), DeviceError>;

    /// Stop the receiver and close the capture source. Blocks until the
    /// capture worker has exited, which takes at most one capture timeout.
    fn close(&self);

    /// Hand the device an Ethernet frame from the relay for on-air
    /// injection. Returns false while no cell is locked or the device is
    /// not capturing.
    fn send(&self, data: &[u8]) -> bool;

    /// Start the capture worker thread.
    fn start_receiver(&self) -> Result<(), DeviceError>;

    /// Attach the connector that converted frames are handed to.
    /// Must happen before the receiver is started.
    fn set_connector(&self, connector: Arc<dyn Connector>);

    /// True once the capture worker died unexpectedly.
    fn has_failed(&self) -> bool;
}
