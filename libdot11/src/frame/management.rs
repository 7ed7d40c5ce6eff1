use crate::frame::components::{MacAddress, ManagementHeader, StationInfo};
use crate::traits::Addresses;

#[derive(Clone, Debug)]
pub struct Beacon {
    pub header: ManagementHeader,
    pub timestamp: u64,
    pub beacon_interval: u16,
    pub capability_info: u16,
    pub station_info: StationInfo,
}

impl Addresses for Beacon {
    fn src(&self) -> Option<&MacAddress> {
        self.header.src()
    }

    fn dest(&self) -> &MacAddress {
        self.header.dest()
    }

    fn bssid(&self) -> Option<&MacAddress> {
        self.header.bssid()
    }
}
