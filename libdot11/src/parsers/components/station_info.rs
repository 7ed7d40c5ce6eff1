use nom::bytes::complete::take;
use nom::number::complete::u8 as get_u8;
use nom::sequence::tuple;
use nom::IResult;

use crate::frame::components::{StationInfo, SupportedRate};

/// Parse variable length and variable field information.
/// The general structure of the data looks like this:
///
/// 1 byte: Element id
/// 1 byte: Element length (up to 255 bytes)
/// $element_length bytes: Element data
///
/// This format is only used in management frames.
///
/// A list that ends mid-element (a sender lied about a length or the capture
/// was cut short) yields the elements collected up to that point.
pub fn parse_station_info(mut input: &[u8]) -> IResult<&[u8], StationInfo> {
    let mut station_info = StationInfo::default();

    let mut element_id;
    let mut length;
    let mut data;
    while input.len() >= 2 {
        (input, (element_id, length)) = tuple((get_u8, get_u8))(input)?;
        if input.len() < length as usize {
            break;
        }
        (input, data) = take(length)(input)?;

        match element_id {
            0 => {
                let mut ssid = String::from_utf8_lossy(data).to_string();
                ssid = ssid.replace('\0', " ");
                station_info.ssid = Some(ssid);
            }
            1 => station_info.supported_rates = parse_supported_rates(data),
            3 => station_info.ds_parameter_set = data.first().copied(),
            50 => station_info.extended_supported_rates = Some(parse_supported_rates(data)),
            _ => {
                station_info.data.push((element_id, data.to_vec()));
            }
        };
    }

    Ok((input, station_info))
}

/// Each rate byte carries the rate in 500 kbit/s units in its lower seven
/// bits; the high bit marks membership in the basic (mandatory) rate set.
fn parse_supported_rates(data: &[u8]) -> Vec<SupportedRate> {
    data.iter()
        .map(|&byte| SupportedRate {
            mandatory: byte & 0x80 != 0,
            rate: byte & 0x7f,
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ssid_and_rates() {
        let mut bytes: Vec<u8> = vec![0, 4];
        bytes.extend(b"PSP_");
        // 1, 2, 5.5 and 11 Mbit, the first two mandatory.
        bytes.extend([1, 4, 0x82, 0x84, 0x0b, 0x16]);
        // DS parameter set, channel 6.
        bytes.extend([3, 1, 6]);

        let (_, info) = parse_station_info(&bytes).unwrap();

        assert_eq!(info.ssid.as_deref(), Some("PSP_"));
        assert_eq!(info.ds_parameter_set, Some(6));
        assert_eq!(info.max_rate(), 22);
        assert!(info.supported_rates[0].mandatory);
        assert!(!info.supported_rates[2].mandatory);
    }

    #[test]
    fn test_truncated_element_keeps_partial_result() {
        // SSID element followed by a rates element that claims more bytes
        // than the frame still has.
        let mut bytes: Vec<u8> = vec![0, 3];
        bytes.extend(b"ABC");
        bytes.extend([1, 200, 0x82]);

        let (_, info) = parse_station_info(&bytes).unwrap();

        assert_eq!(info.ssid.as_deref(), Some("ABC"));
        assert!(info.supported_rates.is_empty());
    }

    #[test]
    fn test_unknown_elements_are_kept_raw() {
        let bytes: Vec<u8> = vec![221, 3, 1, 2, 3];

        let (_, info) = parse_station_info(&bytes).unwrap();

        assert_eq!(info.data, vec![(221, vec![1, 2, 3])]);
    }
}
