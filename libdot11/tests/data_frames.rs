use libdot11::frame::Frame;
use libdot11::{parse_frame, Addresses};

#[test]
fn test_data() {
    let payload = [
        8, 0, // FrameControl (data, IBSS)
        0, 0, // Duration id
        2, 17, 34, 51, 68, 85, // First address
        2, 170, 187, 204, 221, 238, // Second address
        2, 17, 34, 51, 68, 85, // Third address
        80, 2, // SequenceControl
        // LLC/SNAP header followed by an IPv4 EtherType and payload
        0xaa, 0xaa, 0x03, 0x00, 0x00, 0x00, 0x08, 0x00, //
        104, 101, 108, 108, 111,
    ];

    let frame = parse_frame(&payload).expect("Payload should be valid");
    let data = match frame {
        Frame::Data(data) => data,
        _ => panic!("Expected a data frame"),
    };

    assert_eq!(
        data.header.src().map(|mac| mac.to_string()),
        Some("02:aa:bb:cc:dd:ee".to_string())
    );
    assert_eq!(data.header.dest().to_string(), "02:11:22:33:44:55");
    assert_eq!(&data.data[8..], b"hello");
}

#[test]
fn test_qos_data() {
    let payload = [
        136, 0, // FrameControl (QoS data)
        44, 0, // Duration id
        2, 17, 34, 51, 68, 85, // Address 1
        2, 170, 187, 204, 221, 238, // Address 2
        2, 17, 34, 51, 68, 85, // Address 3
        64, 119, // SequenceControl
        0, 0, // QoS
        0xaa, 0xaa, 0x03, 0x00, 0x00, 0x00, 0x08, 0x00, //
        1, 2, 3, 4,
    ];

    let frame = parse_frame(&payload).expect("Payload should be valid");
    let qos_data = match frame {
        Frame::QosData(qos_data) => qos_data,
        _ => panic!("Expected a QoS data frame"),
    };

    // The QoS control field must not leak into the payload.
    assert_eq!(qos_data.header.qos, Some([0, 0]));
    assert_eq!(&qos_data.data[..6], &[0xaa, 0xaa, 0x03, 0x00, 0x00, 0x00]);
}

#[test]
fn test_null_data() {
    let payload = [
        72, 17, // FrameControl (null function)
        60, 0, // Duration id
        2, 17, 34, 51, 68, 85, //
        2, 170, 187, 204, 221, 238, //
        2, 17, 34, 51, 68, 85, //
        128, 43, // SequenceControl
    ];

    let frame = parse_frame(&payload).expect("Payload should be valid");
    assert!(matches!(frame, Frame::NullData(_)));
}

#[test]
fn test_qos_null() {
    let payload = [
        200, 1, // FrameControl
        58, 1, // Duration id
        2, 17, 34, 51, 68, 85, // First Address
        2, 170, 187, 204, 221, 238, // Second Address
        2, 17, 34, 51, 68, 85, // Third Address
        80, 106, // Sequence Control
        0, 0, // QoS Header
    ];

    let frame = parse_frame(&payload).expect("Payload should be valid");
    assert!(matches!(frame, Frame::QosNull(_)));
}

#[test]
fn test_header_round_trip() {
    let payload = [
        8, 0, //
        0, 0, //
        2, 17, 34, 51, 68, 85, //
        2, 170, 187, 204, 221, 238, //
        2, 17, 34, 51, 68, 85, //
        80, 2, //
        0xaa, 0xaa, 0x03, 0x00, 0x00, 0x00, 0x08, 0x00,
    ];

    let frame = parse_frame(&payload).expect("Payload should be valid");
    let data = match frame {
        Frame::Data(data) => data,
        _ => panic!("Expected a data frame"),
    };

    assert_eq!(data.header.encode(), &payload[..24]);
}
