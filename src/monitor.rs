//! Captures data from a wireless adapter in monitor mode.
//!
//! The device starts out scanning every received beacon for an SSID matching
//! its filter list. The first match locks the device onto that cell's BSSID;
//! from then on data frames belonging to the cell are converted to Ethernet
//! and handed to the connector, while frames from the relay are converted
//! back and injected on-air.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::capture::{open_source, CaptureError, CaptureSource};
use crate::connector::Connector;
use crate::converter::{self, FrameKind, WifiBeaconInformation};
use crate::device::{DeviceError, DeviceState, PacketDevice};

/// Large enough for everything the adapter delivers, including frames of
/// foreign cells.
const SNAPSHOT_LENGTH: i32 = 65535;
/// Capture read timeout in milliseconds; also bounds how long `close` may
/// block on the worker.
const TIMEOUT_MS: i32 = 10;

/// State shared between the device handle, its capture worker and the
/// connector threads calling [MonitorDevice::send].
struct Shared {
    running: AtomicBool,
    failed: AtomicBool,
    /// Written only by the capture worker. `wifi_information` is published
    /// before this flips to true.
    bssid_locked: AtomicBool,
    wifi_information: RwLock<WifiBeaconInformation>,
    ssid_filter: RwLock<Vec<String>>,
    /// Source MAC frames must carry to be forwarded. Zero accepts all.
    source_mac_filter: AtomicU64,
    acknowledge_packets: AtomicBool,
    convert_data: AtomicBool,
    connector: RwLock<Option<Arc<dyn Connector>>>,
    inject_tx: Mutex<Option<Sender<Vec<u8>>>>,
    parse_errors: AtomicU64,
}

/// Device which allows a wireless adapter in monitor mode to capture data
/// and send wireless frames.
pub struct MonitorDevice {
    state: Mutex<DeviceState>,
    shared: Arc<Shared>,
    source: Mutex<Option<Box<dyn CaptureSource>>>,
    inject_rx: Mutex<Option<Receiver<Vec<u8>>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MonitorDevice {
    pub fn new() -> Self {
        MonitorDevice {
            state: Mutex::new(DeviceState::Closed),
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                failed: AtomicBool::new(false),
                bssid_locked: AtomicBool::new(false),
                wifi_information: RwLock::new(WifiBeaconInformation::default()),
                ssid_filter: RwLock::new(Vec::new()),
                source_mac_filter: AtomicU64::new(0),
                acknowledge_packets: AtomicBool::new(false),
                convert_data: AtomicBool::new(true),
                connector: RwLock::new(None),
                inject_tx: Mutex::new(None),
                parse_errors: AtomicU64::new(0),
            }),
            source: Mutex::new(None),
            inject_rx: Mutex::new(None),
            worker: Mutex::new(None),
        }
    }

    /// Forge an acknowledgement for every forwarded data frame.
    pub fn set_acknowledge_packets(&self, acknowledge: bool) {
        self.shared
            .acknowledge_packets
            .store(acknowledge, Ordering::SeqCst);
    }

    /// Only forward frames transmitted by this MAC. Zero accepts all.
    pub fn set_source_mac_filter(&self, mac: u64) {
        self.shared.source_mac_filter.store(mac, Ordering::SeqCst);
    }

    /// Treat relay frames as Ethernet and convert them before injection.
    /// When disabled they are injected verbatim.
    pub fn set_convert_data(&self, convert: bool) {
        self.shared.convert_data.store(convert, Ordering::SeqCst);
    }

    /// Frequency to inject at until a beacon announces the cell's channel.
    pub fn set_frequency(&self, frequency: u16) {
        self.shared.wifi_information.write().frequency = frequency;
    }

    /// Whether a beacon matching the SSID filter has been seen.
    pub fn is_locked(&self) -> bool {
        self.shared.bssid_locked.load(Ordering::SeqCst)
    }

    /// Snapshot of the cell information the device is locked onto.
    pub fn wifi_information(&self) -> WifiBeaconInformation {
        self.shared.wifi_information.read().clone()
    }

    /// Number of malformed frames dropped so far.
    pub fn parse_errors(&self) -> u64 {
        self.shared.parse_errors.load(Ordering::Relaxed)
    }

    /// Open the device on an already prepared capture source.
    pub fn open_with_source(
        &self,
        source: Box<dyn CaptureSource>,
        ssid_filter: Vec<String>,
    ) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        if *state != DeviceState::Closed {
            return Err(DeviceError::InvalidState(*state));
        }

        let (inject_tx, inject_rx) = mpsc::channel();
        *self.shared.ssid_filter.write() = ssid_filter;
        *self.shared.inject_tx.lock() = Some(inject_tx);
        self.shared.bssid_locked.store(false, Ordering::SeqCst);
        self.shared.failed.store(false, Ordering::SeqCst);
        *self.inject_rx.lock() = Some(inject_rx);
        *self.source.lock() = Some(source);

        *state = DeviceState::Opened;
        Ok(())
    }

    /// Convert and queue a frame using caller-provided cell information
    /// instead of the locked-in beacon data.
    pub fn send_with_information(
        &self,
        data: &[u8],
        information: &WifiBeaconInformation,
        convert_data: bool,
    ) -> bool {
        if *self.state.lock() != DeviceState::Capturing {
            return false;
        }

        let frame = if convert_data {
            match converter::to_80211(
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
            }
        } else {
            data.to_vec()
        };

        let inject_tx = self.shared.inject_tx.lock().clone();
        match inject_tx {
            Some(inject_tx) => inject_tx.send(frame).is_ok(),
            None => false,
        }
    }

    /// The capture worker: read, convert, forward, and inject whatever the
    /// relay queued since the last tick.
    fn capture_loop(
        mut source: Box<dyn CaptureSource>,
        inject_rx: Receiver<Vec<u8>>,
        shared: Arc<Shared>,
    ) {
        while shared.running.load(Ordering::SeqCst) {
            let acknowledgement = match source.next_packet() {
                Ok(packet) => Self::handle_frame(&shared, packet.data),
                Err(CaptureError::Timeout) => None,
                Err(CaptureError::EndOfCapture) => {
                    info!("capture source ended");
                    break;
                }
                Err(error) => {
                    error!("capture worker failed: {error}");
                    shared.failed.store(true, Ordering::SeqCst);
                    break;
                }
            };

            if let Some(acknowledgement) = acknowledgement {
                if let Err(error) = source.inject(&acknowledgement) {
                    error!("could not inject acknowledgement: {error}");
                }
            }

            while let Ok(frame) = inject_rx.try_recv() {
                if let Err(error) = source.inject(&frame) {
                    error!("could not inject frame: {error}");
                }
            }
        }
    }

    /// Handle one captured frame. Returns the acknowledgement to inject,
    /// if one is due.
    fn handle_frame(shared: &Shared, data: &[u8]) -> Option<Vec<u8>> {
        match converter::classify(data) {
            FrameKind::Beacon => {
                Self::handle_beacon(shared, data);
                None
            }
            FrameKind::Data | FrameKind::DataQos => Self::handle_data(shared, data),
            FrameKind::NullFunc => Self::handle_null_function(shared, data),
            FrameKind::Other => None,
        }
    }

    fn handle_beacon(shared: &Shared, data: &[u8]) {
        let information = match converter::fill_wifi_information(data) {
            Ok(information) => information,
            Err(error) => {
                shared.parse_errors.fetch_add(1, Ordering::Relaxed);
                debug!("dropping malformed beacon: {error}");
                return;
            }
        };

        if shared.bssid_locked.load(Ordering::SeqCst) {
            // The cell may change rate or channel between beacons.
            let mut current = shared.wifi_information.write();
            if current.bssid == information.bssid {
                *current = information;
            }
        } else {
            let matches = shared
                .ssid_filter
                .read()
                .iter()
                .any(|prefix| information.ssid.starts_with(prefix.as_str()));
            if matches {
                info!(
                    "locking onto \"{}\" ({})",
                    information.ssid, information.bssid
                );
                *shared.wifi_information.write() = information;
                shared.bssid_locked.store(true, Ordering::SeqCst);
            }
        }
    }

    fn handle_data(shared: &Shared, data: &[u8]) -> Option<Vec<u8>> {
        if !shared.bssid_locked.load(Ordering::SeqCst) {
            return None;
        }

        let information = shared.wifi_information.read().clone();
        if !converter::is_for_bssid(data, &information.bssid) {
            return None;
        }

        let ethernet = match converter::to_8023(data) {
            Some(ethernet) => ethernet,
            None => {
                shared.parse_errors.fetch_add(1, Ordering::Relaxed);
                debug!("dropping data frame that could not be converted");
                return None;
            }
        };

        let source = converter::source_address(data);
        let source_filter = shared.source_mac_filter.load(Ordering::SeqCst);
        if source_filter != 0 && source.map(|mac| mac.to_u64()) != Some(source_filter) {
            return None;
        }

        let connector = shared.connector.read().clone();
        if let Some(connector) = connector {
            if !connector.send(&ethernet) {
                warn!("the connector rejected a converted frame");
            }
        }

        if shared.acknowledge_packets.load(Ordering::SeqCst) {
            return source.map(|mac| {
                converter::build_acknowledgement(
                    &mac,
                    information.frequency,
                    information.max_rate,
                )
            });
        }

        None
    }

    fn handle_null_function(shared: &Shared, data: &[u8]) -> Option<Vec<u8>> {
        if !shared.bssid_locked.load(Ordering::SeqCst)
            || !shared.acknowledge_packets.load(Ordering::SeqCst)
        {
            return None;
        }

        let information = shared.wifi_information.read().clone();
        if !converter::is_for_bssid(data, &information.bssid) {
            return None;
        }

        converter::source_address(data).map(|mac| {
            converter::build_acknowledgement(&mac, information.frequency, information.max_rate)
        })
    }
}

impl Default for MonitorDevice {
    fn default() -> Self {
        MonitorDevice::new()
    }
}

impl PacketDevice for MonitorDevice {
    fn open(&self, name: &str, ssid_filter: Vec<String>) -> Result<(), DeviceError> {
        let source = open_source(name, SNAPSHOT_LENGTH, TIMEOUT_MS)?;
        self.open_with_source(source, ssid_filter)?;
        info!("monitor device opened on {name}");
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
        self.shared.ssid_filter.write().clear();
        self.shared.bssid_locked.store(false, Ordering::SeqCst);

        *self.state.lock() = DeviceState::Closed;
        info!("monitor device closed");
    }

    fn send(&self, data: &[u8]) -> bool {
        if !self.shared.bssid_locked.load(Ordering::SeqCst) {
            debug!("dropping relay frame, not locked onto a cell yet");
            return false;
        }

        let information = self.shared.wifi_information.read().clone();
        let convert_data = self.shared.convert_data.load(Ordering::SeqCst);
        self.send_with_information(data, &information, convert_data)
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
            .name("airlink-monitor".to_string())
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
