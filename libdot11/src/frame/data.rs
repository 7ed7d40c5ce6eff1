use crate::frame::components::{DataHeader, MacAddress};
use crate::traits::Addresses;

#[derive(Clone, Debug)]
pub struct Data {
    pub header: DataHeader,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct QosData {
    pub header: DataHeader,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct NullData {
    pub header: DataHeader,
}

#[derive(Clone, Debug)]
pub struct QosNull {
    pub header: DataHeader,
}

macro_rules! forward_header_addresses {
    ($($frame:ty),+) => {
        $(impl Addresses for $frame {
            fn src(&self) -> Option<&MacAddress> {
                self.header.src()
            }

            fn dest(&self) -> &MacAddress {
                self.header.dest()
            }

            fn bssid(&self) -> Option<&MacAddress> {
                self.header.bssid()
            }
        })+
    };
}

forward_header_addresses!(Data, QosData, NullData, QosNull);
