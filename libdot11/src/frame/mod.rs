use enum_dispatch::enum_dispatch;

/// Contains structs representing recurring sets of structured data.
/// For instance, MAC-Addresses, default headers, etc.
pub mod components;

/// Control frame structs
mod control;
/// Data frame structs
mod data;
/// Management frame structs
mod management;

pub use control::*;
pub use data::*;
pub use management::*;

#[enum_dispatch(Addresses)]
#[derive(Clone, Debug)]
/// This represents all frame subtypes the bridge consumes or produces.
/// Each variant is represented by its own struct.
///
/// The structs are organized by their frame type in submodules.
pub enum Frame {
    // Management frames
    Beacon(Beacon),

    // Control frames
    Ack(Ack),

    // Data frames
    Data(Data),
    QosData(QosData),
    QosNull(QosNull),
    NullData(NullData),
}
