mod frame_control;
mod header;
mod sequence_control;
mod station_info;

pub use frame_control::parse_frame_control;
pub use header::*;
pub use sequence_control::parse_sequence_control;
pub use station_info::parse_station_info;
