/// A single rate from a (extended) supported rates element.
///
/// The rate is kept in the protocol's native unit of 500 kbit/s so it can be
/// copied straight into a RadioTap rate field. The high "basic rate set" bit
/// is stripped off during parsing and kept in `mandatory`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SupportedRate {
    pub mandatory: bool,
    pub rate: u8,
}

#[derive(Clone, Debug, Default)]
/// StationInfo is used to parse and store variable length fields that are often sent
/// with management frames.
///
/// Each field has an `id`, the length of the bytes for this field, and then payload of the field.
/// Since there's a large number of possible fields and many proprietary vendor-specific usages
/// of these fields, the bytes of all unhandled elements are saved in the `data` field under
/// their respective element id.
pub struct StationInfo {
    pub ssid: Option<String>,
    pub supported_rates: Vec<SupportedRate>,
    pub extended_supported_rates: Option<Vec<SupportedRate>>,
    pub ds_parameter_set: Option<u8>,
    pub data: Vec<(u8, Vec<u8>)>,
}

impl StationInfo {
    /// The highest advertised rate in units of 500 kbit/s, across the plain
    /// and extended rate elements. Zero if the frame carried no rates.
    pub fn max_rate(&self) -> u8 {
        let extended = self.extended_supported_rates.iter().flatten();
        self.supported_rates
            .iter()
            .chain(extended)
            .map(|rate| rate.rate)
            .max()
            .unwrap_or(0)
    }
}
