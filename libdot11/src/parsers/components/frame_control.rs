use nom::bytes::complete::take;
use nom::IResult;

use crate::frame::components::FrameControl;
use crate::frame_types::*;

/// Parse the 2-byte frame control field.
///
/// The first byte packs the protocol version into its lowest two bits, the
/// frame type into the next two and the subtype into the upper nibble; the
/// second byte carries the flags verbatim.
pub fn parse_frame_control(input: &[u8]) -> IResult<&[u8], FrameControl> {
    let (remaining, bytes) = take(2usize)(input)?;

    let protocol_version = bytes[0] & 0b0000_0011;
    let frame_type = frame_type_of((bytes[0] & 0b0000_1100) >> 2);
    let frame_subtype = frame_subtype_of(frame_type, (bytes[0] & 0b1111_0000) >> 4);
    let flags = bytes[1];

    Ok((
        remaining,
        FrameControl {
            protocol_version,
            frame_type,
            frame_subtype,
            flags,
        },
    ))
}

fn frame_type_of(bits: u8) -> FrameType {
    match bits {
        0 => FrameType::Management,
        1 => FrameType::Control,
        2 => FrameType::Data,
        _ => FrameType::Unknown,
    }
}

/// The meaning of the subtype nibble depends on the frame type.
fn frame_subtype_of(frame_type: FrameType, bits: u8) -> FrameSubType {
    match frame_type {
        FrameType::Management => management_subtype(bits),
        FrameType::Control => control_subtype(bits),
        FrameType::Data => data_subtype(bits),
        FrameType::Unknown => FrameSubType::Unhandled,
    }
}

fn management_subtype(bits: u8) -> FrameSubType {
    match bits {
        0 => FrameSubType::AssociationRequest,
        1 => FrameSubType::AssociationResponse,
        2 => FrameSubType::ReassociationRequest,
        3 => FrameSubType::ReassociationResponse,
        4 => FrameSubType::ProbeRequest,
        5 => FrameSubType::ProbeResponse,
        6 => FrameSubType::TimingAdvertisement,
        8 => FrameSubType::Beacon,
        9 => FrameSubType::Atim,
        10 => FrameSubType::Disassociation,
        11 => FrameSubType::Authentication,
        12 => FrameSubType::Deauthentication,
        13 => FrameSubType::Action,
        14 => FrameSubType::ActionNoAck,
        _ => FrameSubType::Reserved,
    }
}

fn control_subtype(bits: u8) -> FrameSubType {
    match bits {
        2 => FrameSubType::Trigger,
        3 => FrameSubType::Tack,
        4 => FrameSubType::BeamformingReportPoll,
        5 => FrameSubType::NdpAnnouncement,
        6 => FrameSubType::ControlFrameExtension,
        7 => FrameSubType::ControlWrapper,
        8 => FrameSubType::BlockAckRequest,
        9 => FrameSubType::BlockAck,
        10 => FrameSubType::PsPoll,
        11 => FrameSubType::Rts,
        12 => FrameSubType::Cts,
        13 => FrameSubType::Ack,
        14 => FrameSubType::CfEnd,
        15 => FrameSubType::CfEndCfAck,
        _ => FrameSubType::Reserved,
    }
}

fn data_subtype(bits: u8) -> FrameSubType {
    match bits {
        0 => FrameSubType::Data,
        1 => FrameSubType::DataCfAck,
        2 => FrameSubType::DataCfPoll,
        3 => FrameSubType::DataCfAckCfPoll,
        4 => FrameSubType::NullData,
        5 => FrameSubType::CfAck,
        6 => FrameSubType::CfPoll,
        7 => FrameSubType::CfAckCfPoll,
        8 => FrameSubType::QosData,
        9 => FrameSubType::QosDataCfAck,
        10 => FrameSubType::QosDataCfPoll,
        11 => FrameSubType::QosDataCfAckCfPoll,
        12 => FrameSubType::QosNull,
        14 => FrameSubType::QosCfPoll,
        15 => FrameSubType::QosCfAckCfPoll,
        _ => FrameSubType::Reserved,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Decode every subtype nibble for each frame type and re-encode it;
    /// the round trip must land on the original byte.
    #[test]
    fn test_first_byte_round_trip() {
        for type_bits in 0..=2u8 {
            for subtype_bits in 0..16u8 {
                let first_byte = (subtype_bits << 4) | (type_bits << 2);
                let (_, frame_control) = parse_frame_control(&[first_byte, 0]).unwrap();
                if matches!(frame_control.frame_subtype, FrameSubType::Reserved) {
                    continue;
                }

                assert_eq!(frame_control.encode(), [first_byte, 0]);
            }
        }
    }

    #[test]
    fn test_unknown_frame_type() {
        let (_, frame_control) = parse_frame_control(&[0b0000_1100, 0]).unwrap();

        assert!(matches!(frame_control.frame_type, FrameType::Unknown));
        assert!(matches!(
            frame_control.frame_subtype,
            FrameSubType::Unhandled
        ));
    }
}
