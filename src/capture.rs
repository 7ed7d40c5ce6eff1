//! Thin abstraction over a live packet capture source.
//!
//! Both device variants drive the same interface. A capture source is either
//! a monitor mode network adapter or a previously recorded capture file,
//! selected by name, with an identical API for both.

use std::path::Path;
use std::time::{Duration, SystemTime};

use pcap::{Active, Capture, Offline};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("could not open capture source {0}: {1}")]
    Open(String, String),
    #[error("read timed out")]
    Timeout,
    #[error("the capture has ended")]
    EndOfCapture,
    #[error("could not inject frame: {0}")]
    Inject(String),
    #[error("could not apply capture filter: {0}")]
    Filter(String),
    #[error("capture read failed: {0}")]
    Read(String),
}

/// Capture metadata of a single packet.
#[derive(Clone, Copy, Debug)]
pub struct PacketMeta {
    pub timestamp: SystemTime,
    pub captured_length: u32,
}

/// A single captured packet.
///
/// The data aliases the capture's internal buffer and is only valid until
/// the next read. Anything held longer must be copied out first.
pub struct CapturedPacket<'a> {
    pub meta: PacketMeta,
    pub data: &'a [u8],
}

/// A packet capture source: blocking reads, frame injection and BPF
/// filter compilation.
pub trait CaptureSource: Send {
    /// Block until the next packet arrives or the capture timeout elapses.
    fn next_packet(&mut self) -> Result<CapturedPacket<'_>, CaptureError>;

    /// Put a raw frame on the air (or fail, for file based sources).
    fn inject(&mut self, frame: &[u8]) -> Result<(), CaptureError>;

    /// Compile and apply a BPF filter program.
    fn apply_filter(&mut self, program: &str) -> Result<(), CaptureError>;
}

/// Open a capture source by name: an existing file is replayed, anything
/// else is treated as an interface name.
pub fn open_source(
    name: &str,
    snapshot_length: i32,
    timeout_ms: i32,
) -> Result<Box<dyn CaptureSource>, CaptureError> {
    if Path::new(name).is_file() {
        let capture = Capture::from_file(name)
            .map_err(|error| CaptureError::Open(name.to_string(), error.to_string()))?;
        Ok(Box::new(PcapSource::File(capture)))
    } else {
        let capture = Capture::from_device(name)
            .and_then(|capture| {
                capture
                    .promisc(true)
                    .snaplen(snapshot_length)
                    .timeout(timeout_ms)
                    .open()
            })
            .map_err(|error| CaptureError::Open(name.to_string(), error.to_string()))?;
        Ok(Box::new(PcapSource::Live(capture)))
    }
}

/// Capture source backed by libpcap, live or file based.
enum PcapSource {
    Live(Capture<Active>),
    File(Capture<Offline>),
}

impl CaptureSource for PcapSource {
    fn next_packet(&mut self) -> Result<CapturedPacket<'_>, CaptureError> {
        let packet = match self {
            PcapSource::Live(capture) => capture.next_packet(),
            PcapSource::File(capture) => capture.next_packet(),
        };
        match packet {
            Ok(packet) => Ok(CapturedPacket {
                meta: PacketMeta {
                    timestamp: timestamp_of(packet.header.ts),
                    captured_length: packet.header.caplen,
                },
                data: packet.data,
            }),
            Err(pcap::Error::TimeoutExpired) => Err(CaptureError::Timeout),
            Err(pcap::Error::NoMorePackets) => Err(CaptureError::EndOfCapture),
            Err(error) => Err(CaptureError::Read(error.to_string())),
        }
    }

    fn inject(&mut self, frame: &[u8]) -> Result<(), CaptureError> {
        match self {
            PcapSource::Live(capture) => capture
                .sendpacket(frame)
                .map_err(|error| CaptureError::Inject(error.to_string())),
            PcapSource::File(_) => Err(CaptureError::Inject(
                "cannot inject into a file based capture".to_string(),
            )),
        }
    }

    fn apply_filter(&mut self, program: &str) -> Result<(), CaptureError> {
        match self {
            PcapSource::Live(capture) => capture
                .filter(program, true)
                .map_err(|error| CaptureError::Filter(error.to_string())),
            PcapSource::File(capture) => capture
                .filter(program, true)
                .map_err(|error| CaptureError::Filter(error.to_string())),
        }
    }
}

fn timestamp_of(ts: libc::timeval) -> SystemTime {
    SystemTime::UNIX_EPOCH
        + Duration::new(ts.tv_sec.max(0) as u64, ts.tv_usec.max(0) as u32 * 1_000)
}
