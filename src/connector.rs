//! Outbound connection toward the relay service.
//!
//! The pipeline only knows the [Connector] capability; the concrete
//! transport here is a connected UDP socket whose receiver thread routes
//! relay frames back into the device for on-air injection.

use std::io;
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::device::PacketDevice;

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("could not reach the relay at {0}: {1}")]
    Unreachable(String, String),
}

/// What the pipeline needs from the relay transport.
///
/// The connector holds only a weak reference back to the device; the engine
/// owns the device and clears the wiring on stop.
pub trait Connector: Send + Sync {
    fn open(&self) -> Result<(), ConnectorError>;

    fn close(&self);

    /// Ship a converted frame toward the relay.
    fn send(&self, data: &[u8]) -> bool;

    /// Start routing relay frames into the registered device.
    fn start_receiver_thread(&self) -> bool;

    /// Register the device incoming frames are handed to via
    /// [PacketDevice::send].
    fn set_incoming_connection(&self, device: Weak<dyn PacketDevice>);
}

/// Enough for a maximum sized Ethernet frame from the relay.
const RECEIVE_BUFFER_SIZE: usize = 4096;
/// Receive timeout; bounds how long `close` waits for the receiver thread.
const RECEIVE_TIMEOUT: Duration = Duration::from_millis(100);

/// Relay connection over a connected UDP socket.
pub struct UdpConnector {
    address: String,
    socket: RwLock<Option<UdpSocket>>,
    device: RwLock<Option<Weak<dyn PacketDevice>>>,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl UdpConnector {
    pub fn new(ip: &str, port: u16) -> Self {
        UdpConnector {
            address: format!("{ip}:{port}"),
            socket: RwLock::new(None),
            device: RwLock::new(None),
            running: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    fn unreachable(&self, error: io::Error) -> ConnectorError {
        ConnectorError::Unreachable(self.address.clone(), error.to_string())
    }
}

impl Connector for UdpConnector {
    fn open(&self) -> Result<(), ConnectorError> {
        let socket = UdpSocket::bind("0.0.0.0:0").map_err(|error| self.unreachable(error))?;
        socket
            .connect(&self.address)
            .map_err(|error| self.unreachable(error))?;
        socket
            .set_read_timeout(Some(RECEIVE_TIMEOUT))
            .map_err(|error| self.unreachable(error))?;

        *self.socket.write() = Some(socket);
        info!("connected to the relay at {}", self.address);
        Ok(())
    }

    fn close(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.lock().take() {
            let _ = worker.join();
        }
        *self.socket.write() = None;
        *self.device.write() = None;
    }

    fn send(&self, data: &[u8]) -> bool {
        match self.socket.read().as_ref() {
            Some(socket) => match socket.send(data) {
                Ok(_) => true,
                Err(error) => {
                    debug!("relay send failed: {error}");
                    false
                }
            },
            None => false,
        }
    }

    fn start_receiver_thread(&self) -> bool {
        let socket = match self
            .socket
            .read()
            .as_ref()
            .and_then(|socket| socket.try_clone().ok())
        {
            Some(socket) => socket,
            None => {
                warn!("cannot start the relay receiver without an open socket");
                return false;
            }
        };
        let device = match self.device.read().clone() {
            Some(device) => device,
            None => {
                warn!("cannot start the relay receiver without an incoming connection");
                return false;
            }
        };

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);

        let worker = thread::Builder::new()
            .name("airlink-relay".to_string())
            .spawn(move || {
                let mut buffer = [0u8; RECEIVE_BUFFER_SIZE];
                while running.load(Ordering::SeqCst) {
                    match socket.recv(&mut buffer) {
                        Ok(length) => {
                            if let Some(device) = device.upgrade() {
                                if !device.send(&buffer[..length]) {
                                    debug!("the device dropped a relay frame");
                                }
                            }
                        }
                        Err(error)
                            if matches!(
                                error.kind(),
                                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                            ) => {}
                        Err(error) => {
                            error!("relay receive failed: {error}");
                            break;
                        }
                    }
                }
            });

        match worker {
            Ok(worker) => {
                *self.worker.lock() = Some(worker);
                true
            }
            Err(error) => {
                error!("could not spawn the relay receiver: {error}");
                false
            }
        }
    }

    fn set_incoming_connection(&self, device: Weak<dyn PacketDevice>) {
        *self.device.write() = Some(device);
    }
}
