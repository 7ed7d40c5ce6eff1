//! Captures the traffic a handheld's own Wi-Fi chip mirrors when it runs
//! the custom plugin.
//!
//! The plugin makes the handheld address its frames directly, so there is no
//! beacon discovery here: the device locks onto the cell of the first data
//! frame transmitted by the configured handheld MAC and drops everything
//! else. The short capture timeout keeps the mirror latency low.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use libdot11::frame::components::MacAddress;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::capture::{open_source, CaptureError, CaptureSource};
use crate::connector::Connector;
use crate::converter::{self, FrameKind, WifiBeaconInformation};
use crate::device::{DeviceError, DeviceState, PacketDevice};

const SNAPSHOT_LENGTH: i32 = 65535;
/// Low-latency mirror of the handheld's own traffic.
const TIMEOUT_MS: i32 = 1;

struct Shared {
    running: AtomicBool,
    failed: AtomicBool,
    bssid_locked: AtomicBool,
    wifi_information: RwLock<WifiBeaconInformation>,
    /// The handheld's MAC address. Without it the device never locks.
    source_mac_filter: AtomicU64,
    connector: RwLock<Option<Arc<dyn Connector>>>,
    inject_tx: Mutex<Option<Sender<Vec<u8>>>>,
    parse_errors: AtomicU64,
}

/// Device for handhelds that run the plugin and use their own Wi-Fi chip.
pub struct PspPluginDevice {
    state: Mutex<DeviceState>,
    shared: Arc<Shared>,
    source: Mutex<Option<Box<dyn CaptureSource>>>,
    inject_rx: Mutex<Option<Receiver<Vec<u8>>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PspPluginDevice {
    pub fn new() -> Self {
        PspPluginDevice {
            state: Mutex::new(DeviceState::Closed),
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                failed: AtomicBool::new(false),
                bssid_locked: AtomicBool::new(false),
                wifi_information: RwLock::new(WifiBeaconInformation::default()),
                source_mac_filter: AtomicU64::new(0),
                connector: RwLock::new(None),
                inject_tx: Mutex::new(None),
                parse_errors: AtomicU64::new(0),
            }),
            source: Mutex::new(None),
            inject_rx: Mutex::new(None),
            worker: Mutex::new(None),
        }
    }

    /// The handheld MAC whose first data frame determines the cell to lock.
    pub fn set_source_mac_filter(&self, mac: u64) {
        self.shared.source_mac_filter.store(mac, Ordering::SeqCst);
    }

    /// The BSSID found through the filtered handheld's frames, for
    /// diagnostics. None while unlocked.
    pub fn locked_bssid(&self) -> Option<MacAddress> {
        if self.shared.bssid_locked.load(Ordering::SeqCst) {
            Some(self.shared.wifi_information.read().bssid)
        } else {
            None
        }
    }

    /// Open the device on an already prepared capture source.
    pub fn open_with_source(&self, mut source: Box<dyn CaptureSource>) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        if *state != DeviceState::Closed {
            return Err(DeviceError::InvalidState(*state));
        }

        let filter = self.shared.source_mac_filter.load(Ordering::SeqCst);
        if filter == 0 {
            warn!("no handheld MAC configured, the plugin device will not lock onto a cell");
        } else {
            // Frames that slip past the filter are still dropped in handle_data.
            let program = format!("wlan addr2 {}", MacAddress::from_u64(filter));
            if let Err(error) = source.apply_filter(&program) {
                warn!("could not apply the capture filter: {error}");
            }
        }

        let (inject_tx, inject_rx) = mpsc::channel();
        *self.shared.inject_tx.lock() = Some(inject_tx);
        self.shared.bssid_locked.store(false, Ordering::SeqCst);
        self.shared.failed.store(false, Ordering::SeqCst);
        *self.inject_rx.lock() = Some(inject_rx);
        *self.source.lock() = Some(source);

        *state = DeviceState::Opened;
        Ok(())
    }

    fn capture_loop(
        mut source: Box<dyn CaptureSource>,
        inject_rx: Receiver<Vec<u8>>,
        shared: Arc<Shared>,
    ) {
        let mut packet_count: u64 = 0;
        while shared.running.load(Ordering::SeqCst) {
            match source.next_packet() {
                Ok(packet) => {
                    packet_count += 1;
                    if packet_count % 1000 == 0 {
                        debug!(
                            "captured {packet_count} packets, last one {} bytes",
                            packet.meta.captured_length
                        );
                    }
                    Self::handle_frame(&shared, packet.data);
                }
                Err(CaptureError::Timeout) => {}
                Err(CaptureError::EndOfCapture) => {
                    info!("capture source ended");
                    break;
                }
                Err(error) => {
                    error!("capture worker failed: {error}");
                    shared.failed.store(true, Ordering::SeqCst);
                    break;
                }
            }

            while let Ok(frame) = inject_rx.try_recv() {
                if let Err(error) = source.inject(&frame) {
                    error!("could not inject frame: {error}");
                }
            }
        }
    }

    fn handle_frame(shared: &Shared, data: &[u8]) {
        match converter::classify(data) {
            FrameKind::Data | FrameKind::DataQos => Self::handle_data(shared, data),
            _ => {}
        }
    }

    fn handle_data(shared: &Shared, data: &[u8]) {
        let source = match converter::source_address(data) {
            Some(source) => source,
            None => {
                shared.parse_errors.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        if !shared.bssid_locked.load(Ordering::SeqCst) {
            let filter = shared.source_mac_filter.load(Ordering::SeqCst);
            if filter == 0 || source.to_u64() != filter {
                return;
            }
            let Some(bssid) = converter::bssid_address(data) else {
                return;
            };

            info!("locking onto {bssid} through frames of {source}");
            shared.wifi_information.write().bssid = bssid;
            shared.bssid_locked.store(true, Ordering::SeqCst);
        }

        let information = shared.wifi_information.read().clone();
        if !converter::is_for_bssid(data, &information.bssid) {
            return;
        }

        let ethernet = match converter::to_8023(data) {
            Some(ethernet) => ethernet,
            None => {
                shared.parse_errors.fetch_add(1, Ordering::Relaxed);
                debug!("dropping data frame that could not be converted");
                return;
            }
        };

        let connector = shared.connector.read().clone();
        if let Some(connector) = connector {
            if !connector.send(&ethernet) {
                warn!("the connector rejected a converted frame");
            }
        }
    }
}

impl Default for PspPluginDevice {
    fn default() -> Self {
        PspPluginDevice::new()
    }
}

impl PacketDevice for PspPluginDevice {
    fn open(&self, name: &str, _ssid_filter: Vec<String>) -> Result<(), DeviceError> {
        let source = open_source(name, SNAPSHOT_LENGTH, TIMEOUT_MS)?;
        self.open_with_source(source)?;
        info!("plugin device opened on {name}");
        Ok(())
    }

    fn close(&self) {
        {
            let mut state = self.state.lock();
            if *state == DeviceState::Closed {
                return;
            }
            *state = DeviceState::Stopping;
        }

        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                error!("the capture worker panicked");
            }
        }

        *self.source.lock() = None;
        *self.inject_rx.lock() = None;
        *self.shared.inject_tx.lock() = None;
        *self.shared.connector.write() = None;
        self.shared.bssid_locked.store(false, Ordering::SeqCst);

        *self.state.lock() = DeviceState::Closed;
        info!("plugin device closed");
    }

    /// Relay frames are always converted; the handheld expects properly
    /// addressed 802.11 on-air.
    fn send(&self, data: &[u8]) -> bool {
        if *self.state.lock() != DeviceState::Capturing {
            return false;
        }
        if !self.shared.bssid_locked.load(Ordering::SeqCst) {
            debug!("dropping relay frame, not locked onto a cell yet");
            return false;
        }

        let information = self.shared.wifi_information.read().clone();
        let frame = match converter::to_80211(
            data,
            &information.bssid,
            information.frequency,
            information.max_rate,
        ) {
            Some(frame) => frame,
            None => {
                debug!("dropping relay frame that could not be converted");
                return false;
            }
        };

        let inject_tx = self.shared.inject_tx.lock().clone();
        match inject_tx {
            Some(inject_tx) => inject_tx.send(frame).is_ok(),
            None => false,
        }
    }

    fn start_receiver(&self) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        if *state != DeviceState::Opened {
            return Err(DeviceError::InvalidState(*state));
        }
        if self.shared.connector.read().is_none() {
            return Err(DeviceError::NoConnector);
        }

        let source = self
            .source
            .lock()
            .take()
            .ok_or(DeviceError::InvalidState(*state))?;
        let inject_rx = self
            .inject_rx
            .lock()
            .take()
            .ok_or(DeviceError::InvalidState(*state))?;

        let shared = Arc::clone(&self.shared);
        shared.running.store(true, Ordering::SeqCst);

        let worker = thread::Builder::new()
            .name("airlink-plugin".to_string())
            .spawn(move || Self::capture_loop(source, inject_rx, shared))
            .map_err(|error| DeviceError::Worker(error.to_string()))?;

        *self.worker.lock() = Some(worker);
        *state = DeviceState::Capturing;
        Ok(())
    }

    fn set_connector(&self, connector: Arc<dyn Connector>) {
        *self.shared.connector.write() = Some(connector);
    }

    fn has_failed(&self) -> bool {
        self.shared.failed.load(Ordering::SeqCst)
    }
}
