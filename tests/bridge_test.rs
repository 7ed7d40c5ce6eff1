//! Device scenarios: beacon discovery, BSSID locking, bidirectional
//! conversion, acknowledgement forgery and shutdown behaviour, driven
//! through a scripted capture source and a recording connector.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use airlink::capture::{CaptureError, CaptureSource, CapturedPacket, PacketMeta};
use airlink::connector::{Connector, ConnectorError};
use airlink::converter::{self, WifiBeaconInformation};
use airlink::device::PacketDevice;
use airlink::monitor::MonitorDevice;
use airlink::psp_plugin::PspPluginDevice;
use libdot11::frame::components::MacAddress;

const BSSID: [u8; 6] = [0x02, 0x11, 0x22, 0x33, 0x44, 0x55];
const STATION: [u8; 6] = [0x02, 0xaa, 0xbb, 0xcc, 0xdd, 0xee];

/// Frames waiting to be "captured" and everything injected back on-air.
#[derive(Default)]
struct FakeCaptureState {
    frames: Mutex<VecDeque<Vec<u8>>>,
    injected: Mutex<Vec<Vec<u8>>>,
}

impl FakeCaptureState {
    fn push(&self, frame: Vec<u8>) {
        self.frames.lock().unwrap().push_back(frame);
    }

    fn drained(&self) -> bool {
        self.frames.lock().unwrap().is_empty()
    }

    fn injected(&self) -> Vec<Vec<u8>> {
        self.injected.lock().unwrap().clone()
    }
}

struct FakeCaptureSource {
    state: Arc<FakeCaptureState>,
    current: Vec<u8>,
}

impl FakeCaptureSource {
    fn new(state: Arc<FakeCaptureState>) -> Box<Self> {
        Box::new(FakeCaptureSource {
            state,
            current: Vec::new(),
        })
    }
}

impl CaptureSource for FakeCaptureSource {
    fn next_packet(&mut self) -> Result<CapturedPacket<'_>, CaptureError> {
        let frame = self.state.frames.lock().unwrap().pop_front();
        match frame {
            Some(frame) => {
                self.current = frame;
                Ok(CapturedPacket {
                    meta: PacketMeta {
                        timestamp: SystemTime::now(),
                        captured_length: self.current.len() as u32,
                    },
                    data: &self.current,
                })
            }
            None => {
                // Behave like a quiet adapter with a bounded read timeout.
                thread::sleep(Duration::from_millis(2));
                Err(CaptureError::Timeout)
            }
        }
    }

    fn inject(&mut self, frame: &[u8]) -> Result<(), CaptureError> {
        self.state.injected.lock().unwrap().push(frame.to_vec());
        Ok(())
    }

    fn apply_filter(&mut self, _program: &str) -> Result<(), CaptureError> {
        Ok(())
    }
}

#[derive(Default)]
struct RecordingConnector {
    sent: Mutex<Vec<Vec<u8>>>,
}

impl RecordingConnector {
    fn received(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }
}

impl Connector for RecordingConnector {
    fn open(&self) -> Result<(), ConnectorError> {
        Ok(())
    }

    fn close(&self) {}

    fn send(&self, data: &[u8]) -> bool {
        self.sent.lock().unwrap().push(data.to_vec());
        true
    }

    fn start_receiver_thread(&self) -> bool {
        true
    }

    fn set_incoming_connection(&self, _device: Weak<dyn PacketDevice>) {}
}

fn beacon_frame(bssid: [u8; 6], ssid: &str) -> Vec<u8> {
    beacon_frame_on_channel(bssid, ssid, 1)
}

fn beacon_frame_on_channel(bssid: [u8; 6], ssid: &str, channel: u8) -> Vec<u8> {
    let mut frame = converter::build_radiotap(2412, 0x16);
    frame.extend([128, 0, 0, 0]);
    frame.extend([255u8; 6]);
    frame.extend(bssid);
    frame.extend(bssid);
    frame.extend([16, 0]);
    frame.extend([0u8; 8]); // timestamp
    frame.extend([100, 0]); // beacon interval
    frame.extend([34, 0]); // capability info
    frame.extend([0, ssid.len() as u8]);
    frame.extend(ssid.as_bytes());
    frame.extend([1, 4, 0x82, 0x84, 0x0b, 0x16]);
    frame.extend([3, 1, channel]);
    frame
}

fn data_frame(
    destination: [u8; 6],
    source: [u8; 6],
    bssid: [u8; 6],
    payload: &[u8],
) -> Vec<u8> {
    let mut frame = converter::build_radiotap(2412, 0x16);
    frame.extend([0x08, 0x00, 0x00, 0x00]);
    frame.extend(destination);
    frame.extend(source);
    frame.extend(bssid);
    frame.extend([0x50, 0x02]); // sequence control
    frame.extend([0xaa, 0xaa, 0x03, 0x00, 0x00, 0x00]);
    frame.extend([0x08, 0x00]); // EtherType
    frame.extend_from_slice(payload);
    frame
}

fn ethernet_frame(destination: [u8; 6], source: [u8; 6], payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::new();
    frame.extend(destination);
    frame.extend(source);
    frame.extend([0x08, 0x00]);
    frame.extend_from_slice(payload);
    frame
}

fn wait_for(predicate: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    false
}

fn capturing_monitor(
    ssid_filter: Vec<String>,
) -> (MonitorDevice, Arc<FakeCaptureState>, Arc<RecordingConnector>) {
    let state = Arc::new(FakeCaptureState::default());
    let connector = Arc::new(RecordingConnector::default());

    let device = MonitorDevice::new();
    device.set_connector(connector.clone());
    device
        .open_with_source(FakeCaptureSource::new(state.clone()), ssid_filter)
        .unwrap();
    device.start_receiver().unwrap();

    (device, state, connector)
}

fn capturing_plugin(
    source_mac: u64,
) -> (PspPluginDevice, Arc<FakeCaptureState>, Arc<RecordingConnector>) {
    let state = Arc::new(FakeCaptureState::default());
    let connector = Arc::new(RecordingConnector::default());

    let device = PspPluginDevice::new();
    device.set_source_mac_filter(source_mac);
    device.set_connector(connector.clone());
    device
        .open_with_source(FakeCaptureSource::new(state.clone()))
        .unwrap();
    device.start_receiver().unwrap();

    (device, state, connector)
}

#[test]
fn beacon_matching_the_ssid_filter_locks_the_device() {
    let (device, state, _connector) = capturing_monitor(vec!["PSP_".to_string()]);

    state.push(beacon_frame(BSSID, "PSP_AULUS10000"));

    assert!(wait_for(|| device.is_locked()));
    let information = device.wifi_information();
    assert_eq!(information.bssid.to_u64(), 0x0000_0211_2233_4455);
    assert_eq!(information.ssid, "PSP_AULUS10000");

    device.close();
}

#[test]
fn beacon_missing_the_filter_does_not_lock() {
    let (device, state, _connector) = capturing_monitor(vec!["PSP_".to_string()]);

    state.push(beacon_frame(BSSID, "HomeNetwork"));

    assert!(wait_for(|| state.drained()));
    thread::sleep(Duration::from_millis(20));
    assert!(!device.is_locked());

    device.close();
}

#[test]
fn locked_data_frames_are_forwarded_to_the_connector() {
    let (device, state, connector) = capturing_monitor(vec!["PSP_".to_string()]);

    state.push(beacon_frame(BSSID, "PSP_AULUS10000"));
    assert!(wait_for(|| device.is_locked()));

    state.push(data_frame(BSSID, STATION, BSSID, b"hello"));

    assert!(wait_for(|| !connector.received().is_empty()));
    assert_eq!(
        connector.received()[0],
        ethernet_frame(BSSID, STATION, b"hello")
    );

    device.close();
}

#[test]
fn frames_of_a_foreign_cell_are_dropped() {
    let (device, state, connector) = capturing_monitor(vec!["PSP_".to_string()]);

    state.push(beacon_frame(BSSID, "PSP_AULUS10000"));
    assert!(wait_for(|| device.is_locked()));

    let foreign = [0x02, 0x99, 0x99, 0x99, 0x99, 0x99];
    state.push(data_frame(foreign, STATION, foreign, b"hello"));

    assert!(wait_for(|| state.drained()));
    thread::sleep(Duration::from_millis(20));
    assert!(connector.received().is_empty());

    device.close();
}

#[test]
fn source_mac_filter_drops_other_stations() {
    let (device, state, connector) = capturing_monitor(vec!["PSP_".to_string()]);
    device.set_source_mac_filter(converter::mac_to_int("02:aa:bb:cc:dd:ee"));

    state.push(beacon_frame(BSSID, "PSP_AULUS10000"));
    assert!(wait_for(|| device.is_locked()));

    let other_station = [0x02, 0xaa, 0xbb, 0xcc, 0xdd, 0xef];
    state.push(data_frame(BSSID, other_station, BSSID, b"hello"));
    assert!(wait_for(|| state.drained()));
    thread::sleep(Duration::from_millis(20));
    assert!(connector.received().is_empty());

    // The filtered station itself still passes.
    state.push(data_frame(BSSID, STATION, BSSID, b"hello"));
    assert!(wait_for(|| !connector.received().is_empty()));

    device.close();
}

#[test]
fn nothing_reaches_the_connector_while_unlocked() {
    let (device, state, connector) = capturing_monitor(vec!["PSP_".to_string()]);

    state.push(data_frame(BSSID, STATION, BSSID, b"hello"));

    assert!(wait_for(|| state.drained()));
    thread::sleep(Duration::from_millis(20));
    assert!(connector.received().is_empty());
    // The inject direction is refused as well.
    assert!(!device.send(&ethernet_frame(STATION, BSSID, b"hello")));

    device.close();
}

#[test]
fn later_beacons_of_the_locked_cell_refresh_the_information() {
    let (device, state, _connector) = capturing_monitor(vec!["PSP_".to_string()]);

    state.push(beacon_frame_on_channel(BSSID, "PSP_AULUS10000", 1));
    assert!(wait_for(|| device.is_locked()));

    // The cell hops to channel 6; a foreign cell's beacon must not interfere.
    state.push(beacon_frame_on_channel([0x02, 0x99, 0x99, 0x99, 0x99, 0x99], "PSP_OTHER", 11));
    state.push(beacon_frame_on_channel(BSSID, "PSP_AULUS10000", 6));

    assert!(wait_for(|| device.wifi_information().frequency == 2437));
    assert_eq!(device.wifi_information().bssid.to_u64(), 0x0000_0211_2233_4455);

    device.close();
}

#[test]
fn send_converts_and_injects_with_the_locked_cell_information() {
    let (device, state, _connector) = capturing_monitor(vec!["PSP_".to_string()]);

    state.push(beacon_frame([0x02, 0xaa, 0xbb, 0xcc, 0xdd, 0xee], "PSP_AULUS10000"));
    assert!(wait_for(|| device.is_locked()));

    assert!(device.send(&ethernet_frame(BSSID, STATION, b"hello")));

    assert!(wait_for(|| !state.injected().is_empty()));
    let injected = state.injected()[0].clone();
    // RadioTap channel 2412 little-endian, then the 802.11 data header with
    // the locked BSSID third.
    assert_eq!(&injected[10..12], &[0x6c, 0x09]);
    assert_eq!(&injected[14..16], &[0x08, 0x00]);
    assert_eq!(&injected[30..36], &[0x02, 0xaa, 0xbb, 0xcc, 0xdd, 0xee]);

    device.close();
}

#[test]
fn send_with_information_uses_the_given_cell() {
    let (device, state, _connector) = capturing_monitor(Vec::new());

    let information = WifiBeaconInformation {
        bssid: MacAddress([0x02, 0xaa, 0xbb, 0xcc, 0xdd, 0xee]),
        ssid: String::new(),
        max_rate: 0x82,
        frequency: 2412,
    };
    assert!(device.send_with_information(
        &ethernet_frame(BSSID, STATION, b"hello"),
        &information,
        true,
    ));

    assert!(wait_for(|| !state.injected().is_empty()));
    let injected = state.injected()[0].clone();
    assert_eq!(injected[9], 0x82);
    assert_eq!(&injected[10..12], &[0x6c, 0x09]);
    assert_eq!(&injected[30..36], &[0x02, 0xaa, 0xbb, 0xcc, 0xdd, 0xee]);

    device.close();
}

#[test]
fn forwarded_data_frames_are_acknowledged_when_enabled() {
    let (device, state, connector) = capturing_monitor(vec!["PSP_".to_string()]);
    device.set_acknowledge_packets(true);

    state.push(beacon_frame(BSSID, "PSP_AULUS10000"));
    assert!(wait_for(|| device.is_locked()));

    state.push(data_frame(BSSID, STATION, BSSID, b"hello"));

    assert!(wait_for(|| !state.injected().is_empty()));
    assert!(!connector.received().is_empty());

    let acknowledgement = state.injected()[0].clone();
    // A fresh RadioTap header, then the 10-byte ACK addressed at the
    // frame's transmitter.
    assert_eq!(acknowledgement.len(), 24);
    assert_eq!(&acknowledgement[14..16], &[0xd4, 0x00]);
    assert_eq!(&acknowledgement[18..24], &STATION);

    device.close();
}

#[test]
fn close_returns_within_one_capture_timeout() {
    let (device, _state, _connector) = capturing_monitor(vec!["PSP_".to_string()]);

    let started = Instant::now();
    device.close();

    assert!(started.elapsed() < Duration::from_millis(100));
    assert!(!device.send(&ethernet_frame(BSSID, STATION, b"hello")));
}

#[test]
fn plugin_locks_through_the_filtered_station() {
    let (device, state, connector) = capturing_plugin(0x0000_02aa_bbcc_ddee);

    state.push(data_frame(BSSID, STATION, BSSID, b"hello"));

    assert!(wait_for(|| !connector.received().is_empty()));
    assert_eq!(
        device.locked_bssid().map(|bssid| bssid.to_u64()),
        Some(0x0000_0211_2233_4455)
    );

    device.close();
}

#[test]
fn plugin_ignores_other_stations_before_locking() {
    let (device, state, connector) = capturing_plugin(0x0000_02aa_bbcc_ddee);

    let other_station = [0x02, 0xaa, 0xbb, 0xcc, 0xdd, 0xef];
    state.push(data_frame(BSSID, other_station, BSSID, b"hello"));

    assert!(wait_for(|| state.drained()));
    thread::sleep(Duration::from_millis(20));
    assert!(device.locked_bssid().is_none());
    assert!(connector.received().is_empty());

    device.close();
}

#[test]
fn plugin_drops_foreign_cells_after_locking() {
    let (device, state, connector) = capturing_plugin(0x0000_02aa_bbcc_ddee);

    state.push(data_frame(BSSID, STATION, BSSID, b"hello"));
    assert!(wait_for(|| device.locked_bssid().is_some()));

    let foreign = [0x02, 0x99, 0x99, 0x99, 0x99, 0x99];
    state.push(data_frame(foreign, STATION, foreign, b"dropped"));

    assert!(wait_for(|| state.drained()));
    thread::sleep(Duration::from_millis(20));
    assert_eq!(connector.received().len(), 1);

    device.close();
}

#[test]
fn plugin_send_always_converts() {
    let (device, state, _connector) = capturing_plugin(0x0000_02aa_bbcc_ddee);

    state.push(data_frame(BSSID, STATION, BSSID, b"hello"));
    assert!(wait_for(|| device.locked_bssid().is_some()));

    assert!(device.send(&ethernet_frame(STATION, BSSID, b"pong")));

    assert!(wait_for(|| !state.injected().is_empty()));
    let injected = state.injected()[0].clone();
    assert_eq!(&injected[14..16], &[0x08, 0x00]);
    assert_eq!(&injected[30..36], &BSSID);

    device.close();
}
