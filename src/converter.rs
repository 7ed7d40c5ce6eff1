//! Converts packets from a monitor format to promiscuous format and vice versa.
//!
//! The monitor side is RadioTap + 802.11 as delivered by a monitor mode
//! adapter, the promiscuous side plain Ethernet II. Beacon frames are not
//! converted; they are mined for the ad-hoc cell information
//! ([WifiBeaconInformation]) that addresses everything the bridge injects.

use libdot11::frame::components::{DataHeader, FrameControl, MacAddress, SequenceControl};
use libdot11::frame::{Ack, Frame};
use libdot11::{parse_frame, parse_frame_control, Addresses, FrameSubType, FrameType};
use radiotap::Radiotap;
use thiserror::Error;

/// The LLC/SNAP sequence separating the 802.11 header from the EtherType.
const LLC_SNAP: [u8; 6] = [0xaa, 0xaa, 0x03, 0x00, 0x00, 0x00];

/// Length of an Ethernet II header: destination, source, EtherType.
const ETHERNET_HEADER_LENGTH: usize = 14;

// RadioTap layout for injected frames: version 0, then flags, rate and
// channel marked present, all fields little-endian.
const RADIOTAP_LENGTH: u16 = 14;
const RADIOTAP_PRESENT_FLAGS: u32 = 0x0000_000e;
const CHANNEL_FLAGS: u16 = 0x00a0;
const CHANNEL_FLAGS_CCK: u16 = 0x0020;
/// Highest frequency that is still modulated with CCK.
const LAST_CCK_FREQUENCY: u16 = 2472;

/// Rate advertised before a beacon tells us better: 11 Mbit, in units of
/// 500 kbit/s. The handhelds are 802.11b devices.
pub const DEFAULT_MAX_RATE: u8 = 0x16;
/// Channel 1, the handhelds' default ad-hoc channel.
pub const DEFAULT_FREQUENCY: u16 = 2412;

/// Network information learned from a beacon frame.
///
/// A device copies this into its own state when it locks onto a cell and
/// refreshes it on every later beacon from the same BSSID.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WifiBeaconInformation {
    pub bssid: MacAddress,
    pub ssid: String,
    pub max_rate: u8,
    pub frequency: u16,
}

impl Default for WifiBeaconInformation {
    fn default() -> Self {
        WifiBeaconInformation {
            bssid: MacAddress([0; 6]),
            ssid: String::new(),
            max_rate: DEFAULT_MAX_RATE,
            frequency: DEFAULT_FREQUENCY,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("the RadioTap header could not be parsed")]
    RadioTap,
    #[error("expected a beacon frame")]
    NotABeacon,
    #[error(transparent)]
    Dot11(#[from] libdot11::error::Error),
}

/// Rough shape of a captured frame, judged from its frame control field alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
    Beacon,
    Data,
    DataQos,
    NullFunc,
    Other,
}

/// Locate the 802.11 part of a captured frame by skipping the RadioTap
/// prefix. Fields unknown to the parser are skipped through the
/// present-bitmap extension rule.
pub fn dot11_payload(data: &[u8]) -> Option<&[u8]> {
    let radiotap = Radiotap::from_bytes(data).ok()?;
    data.get(radiotap.header.length..)
        .filter(|payload| !payload.is_empty())
}

/// Classify a captured frame.
pub fn classify(data: &[u8]) -> FrameKind {
    let Some(payload) = dot11_payload(data) else {
        return FrameKind::Other;
    };
    let Ok((_, frame_control)) = parse_frame_control(payload) else {
        return FrameKind::Other;
    };

    match frame_control.frame_subtype {
        FrameSubType::Beacon => FrameKind::Beacon,
        FrameSubType::Data => FrameKind::Data,
        FrameSubType::QosData => FrameKind::DataQos,
        FrameSubType::NullData | FrameSubType::QosNull => FrameKind::NullFunc,
        _ => FrameKind::Other,
    }
}

/// Read the ad-hoc cell information from a captured beacon frame.
///
/// The frequency comes from the DS parameter set (the advertised channel);
/// beacons without one are assumed to sit on the handhelds' default channel.
pub fn fill_wifi_information(data: &[u8]) -> Result<WifiBeaconInformation, ConvertError> {
    let payload = dot11_payload(data).ok_or(ConvertError::RadioTap)?;
    let beacon = match parse_frame(payload)? {
        Frame::Beacon(beacon) => beacon,
        _ => return Err(ConvertError::NotABeacon),
    };

    let mut ssid = beacon.station_info.ssid.clone().unwrap_or_default();
    if ssid.len() > 32 {
        ssid = ssid.chars().take(32).collect();
    }

    let max_rate = match beacon.station_info.max_rate() {
        0 => DEFAULT_MAX_RATE,
        rate => rate,
    };

    let frequency = beacon
        .station_info
        .ds_parameter_set
        .and_then(frequency_for_channel)
        .unwrap_or(DEFAULT_FREQUENCY);

    Ok(WifiBeaconInformation {
        bssid: beacon.header.address_3,
        ssid,
        max_rate,
        frequency,
    })
}

/// Convert a monitor mode packet to a promiscuous mode packet, stripping the
/// RadioTap and 802.11 headers and prepending an 802.3 header.
/// Only converts data packets; anything else yields `None`.
pub fn to_8023(data: &[u8]) -> Option<Vec<u8>> {
    let payload = dot11_payload(data)?;
    let (header, body) = match parse_frame(payload).ok()? {
        Frame::Data(frame) => (frame.header, frame.data),
        Frame::QosData(frame) => (frame.header, frame.data),
        _ => return None,
    };

    // A frame relayed between two distribution systems carries four
    // addresses and has no single Ethernet equivalent.
    if header.frame_control.to_ds() && header.frame_control.from_ds() {
        return None;
    }

    let source = *header.src()?;
    let destination = *header.dest();

    // EtherType and payload trail the LLC/SNAP sequence.
    let body = body.strip_prefix(&LLC_SNAP)?;
    if body.len() < 2 {
        return None;
    }

    let mut ethernet = Vec::with_capacity(ETHERNET_HEADER_LENGTH + body.len() - 2);
    ethernet.extend(destination.0);
    ethernet.extend(source.0);
    ethernet.extend_from_slice(body);

    Some(ethernet)
}

/// Convert a promiscuous mode packet to a monitor mode packet, prepending
/// RadioTap and 802.11 headers and stripping the 802.3 header.
///
/// The frame is addressed for an independent (ad-hoc) cell: receiver and
/// transmitter from the Ethernet header, the cell's BSSID third. The
/// EtherType is carried over unvalidated, sequencing is left to the adapter.
pub fn to_80211(
    data: &[u8],
    bssid: &MacAddress,
    frequency: u16,
    max_rate: u8,
) -> Option<Vec<u8>> {
    if data.len() < ETHERNET_HEADER_LENGTH {
        return None;
    }

    let destination = MacAddress(data[0..6].try_into().unwrap());
    let source = MacAddress(data[6..12].try_into().unwrap());

    let header = DataHeader {
        frame_control: FrameControl {
            protocol_version: 0,
            frame_type: FrameType::Data,
            frame_subtype: FrameSubType::Data,
            flags: 0,
        },
        duration: [0, 0],
        address_1: destination,
        address_2: source,
        address_3: *bssid,
        sequence_control: SequenceControl {
            fragment_number: 0,
            sequence_number: 0,
        },
        address_4: None,
        qos: None,
    };

    let mut frame = build_radiotap(frequency, max_rate);
    frame.extend(header.encode());
    frame.extend(LLC_SNAP);
    frame.extend_from_slice(&data[12..]);

    Some(frame)
}

/// The fixed RadioTap header put in front of everything the bridge injects.
pub fn build_radiotap(frequency: u16, max_rate: u8) -> Vec<u8> {
    let mut channel_flags = CHANNEL_FLAGS;
    if frequency <= LAST_CCK_FREQUENCY {
        channel_flags |= CHANNEL_FLAGS_CCK;
    }

    let mut header = Vec::with_capacity(RADIOTAP_LENGTH as usize);
    header.extend([0x00, 0x00]); // version and padding
    header.extend(RADIOTAP_LENGTH.to_le_bytes());
    header.extend(RADIOTAP_PRESENT_FLAGS.to_le_bytes());
    header.push(0x00); // flags
    header.push(max_rate);
    header.extend(frequency.to_le_bytes());
    header.extend(channel_flags.to_le_bytes());

    header
}

/// A minimal acknowledgement for a data frame received from `source`,
/// ready for injection.
pub fn build_acknowledgement(source: &MacAddress, frequency: u16, max_rate: u8) -> Vec<u8> {
    let mut frame = build_radiotap(frequency, max_rate);
    frame.extend(Ack::new(*source).encode());
    frame
}

/// Check whether a captured packet belongs to the given BSSID by comparing
/// its third address, which holds the BSSID for every frame an ad-hoc cell
/// produces.
pub fn is_for_bssid(data: &[u8], bssid: &MacAddress) -> bool {
    let Some(payload) = dot11_payload(data) else {
        return false;
    };

    payload.get(16..22) == Some(bssid.0.as_slice())
}

/// The transmitter address of a captured data frame.
pub fn source_address(data: &[u8]) -> Option<MacAddress> {
    let payload = dot11_payload(data)?;
    let header = match parse_frame(payload).ok()? {
        Frame::Data(frame) => frame.header,
        Frame::QosData(frame) => frame.header,
        Frame::NullData(frame) => frame.header,
        Frame::QosNull(frame) => frame.header,
        _ => return None,
    };

    header.src().copied()
}

/// The BSSID a captured data frame belongs to.
pub fn bssid_address(data: &[u8]) -> Option<MacAddress> {
    let payload = dot11_payload(data)?;
    let header = match parse_frame(payload).ok()? {
        Frame::Data(frame) => frame.header,
        Frame::QosData(frame) => frame.header,
        _ => return None,
    };

    header.bssid().copied()
}

/// Converts a mac address string in format (xx:xx:xx:xx:xx:xx) to an int.
/// Characters that aren't hex digits are skipped, not rejected; feeding this
/// something other than a mac address is the caller's problem.
pub fn mac_to_int(mac: &str) -> u64 {
    let mut value = 0u64;
    for byte in mac.bytes() {
        match byte {
            b'0'..=b'9' => value = (value << 4) | u64::from(byte - b'0'),
            b'a'..=b'f' => value = (value << 4) | u64::from(byte - b'a' + 10),
            b'A'..=b'F' => value = (value << 4) | u64::from(byte - b'A' + 10),
            _ => {}
        }
    }

    value
}

/// Converts a channel into a frequency in MHz.
pub fn frequency_for_channel(channel: u8) -> Option<u16> {
    match channel {
        1..=13 => Some(2407 + 5 * u16::from(channel)),
        14 => Some(2484),
        36..=165 => Some(5000 + 5 * u16::from(channel)),
        _ => None,
    }
}

/// Converts a frequency in MHz back into its channel number.
pub fn channel_for_frequency(frequency: u16) -> Option<u8> {
    match frequency {
        2412..=2472 if (frequency - 2407) % 5 == 0 => Some(((frequency - 2407) / 5) as u8),
        2484 => Some(14),
        5180..=5825 if (frequency - 5000) % 5 == 0 => Some(((frequency - 5000) / 5) as u8),
        _ => None,
    }
}
