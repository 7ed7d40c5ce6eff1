//! Airlink library components
//!
//! Bridges the ad-hoc Wi-Fi traffic of handheld game consoles to an IP relay
//! service: frames captured from a monitor mode adapter are converted to
//! Ethernet and shipped to the relay, relay frames are converted back and
//! injected on-air.

pub mod capture;
pub mod config;
pub mod connector;
pub mod converter;
pub mod device;
pub mod engine;
pub mod monitor;
pub mod psp_plugin;
