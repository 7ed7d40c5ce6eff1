use nom::bytes::complete::take;
use nom::sequence::tuple;

use crate::error::Error;
use crate::frame::components::FrameControl;
use crate::frame::*;
use crate::parsers::{clone_slice, parse_mac};

/// Parse an [Ack] frame.
pub fn parse_ack(frame_control: FrameControl, input: &[u8]) -> Result<Frame, Error> {
    let (_, (duration, destination)) = tuple((take(2usize), parse_mac))(input)?;

    Ok(Frame::Ack(Ack {
        frame_control,
        duration: clone_slice::<2>(duration),
        destination,
    }))
}
