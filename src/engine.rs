//! Command dispatcher tying one capture device to the relay connector.
//!
//! The engine is single-threaded: the UI collaborator writes a command into
//! the [EngineModel], the engine reacts on its next tick and reports back
//! through the model's status. Delays (retry backoff) are implemented as the
//! non-blocking [Command::WaitForTime] so the UI stays responsive.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::config::Config;
use crate::connector::Connector;
use crate::converter;
use crate::device::PacketDevice;
use crate::monitor::MonitorDevice;
use crate::psp_plugin::PspPluginDevice;

/// How often the engine looks at its command word.
const POLL_INTERVAL: Duration = Duration::from_millis(1);
/// Backoff after a device failure, before the engine is stopped.
const DEVICE_RETRY_DELAY: Duration = Duration::from_secs(5);
/// Backoff between attempts to reach the relay.
const CONNECTOR_RETRY_DELAY: Duration = Duration::from_secs(10);

/// SSID prefixes the handhelds use for their ad-hoc networks.
const PSP_SSID_PREFIX: &str = "PSP_";
const VITA_SSID_PREFIX: &str = "SCE_";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    StartEngine,
    StopEngine,
    WaitForTime,
    NoCommand,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineStatus {
    Idle,
    Running,
    Error,
}

/// The slice of UI state the engine reacts to and reports through.
#[derive(Debug)]
pub struct EngineModel {
    pub command: Command,
    pub status: EngineStatus,
    pub time_to_wait: Duration,
    pub command_after_wait: Command,
}

impl Default for EngineModel {
    fn default() -> Self {
        EngineModel {
            command: Command::NoCommand,
            status: EngineStatus::Idle,
            time_to_wait: Duration::ZERO,
            command_after_wait: Command::NoCommand,
        }
    }
}

/// Owns the device and shares the connector with it for one engine run.
pub struct Engine {
    config: Config,
    connector: Arc<dyn Connector>,
    device: Option<Arc<dyn PacketDevice>>,
    wait_start: Option<Instant>,
}

impl Engine {
    pub fn new(config: Config, connector: Arc<dyn Connector>) -> Self {
        Engine {
            config,
            connector,
            device: None,
            wait_start: None,
        }
    }

    /// Drive the command state machine until the shutdown latch flips,
    /// then stop the engine.
    pub fn run(&mut self, model: &mut EngineModel, running: &AtomicBool) {
        while running.load(Ordering::SeqCst) {
            self.tick(model);
            thread::sleep(POLL_INTERVAL);
        }
        self.stop(model);
    }

    /// A single pass over the command word. The UI collaborator mutates the
    /// model between calls.
    pub fn tick(&mut self, model: &mut EngineModel) {
        match model.command {
            Command::StartEngine => self.start(model),
            Command::WaitForTime => {
                // Wait state, adds a delay without making the UI unresponsive.
                let started = *self.wait_start.get_or_insert_with(Instant::now);
                if started.elapsed() >= model.time_to_wait {
                    self.wait_start = None;
                    model.command = model.command_after_wait;
                }
            }
            Command::StopEngine => self.stop(model),
            Command::NoCommand => {
                let failed = self
                    .device
                    .as_ref()
                    .map(|device| device.has_failed())
                    .unwrap_or(false);
                if model.status == EngineStatus::Running && failed {
                    error!("the capture worker died, stop the engine to recover");
                    model.status = EngineStatus::Error;
                }
            }
        }
    }

    fn start(&mut self, model: &mut EngineModel) {
        let device = self.build_device();
        self.connector.set_incoming_connection(Arc::downgrade(&device));
        device.set_connector(Arc::clone(&self.connector));
        self.device = Some(Arc::clone(&device));

        let mut ssid_filter = Vec::new();
        if self.config.auto_discover_psp_vita_networks {
            ssid_filter.push(PSP_SSID_PREFIX.to_string());
            ssid_filter.push(VITA_SSID_PREFIX.to_string());
        }

        if let Err(error) = self.connector.open() {
            error!("failed to open the relay connection, retrying in 10 seconds: {error}");
            model.status = EngineStatus::Error;
            model.command = Command::WaitForTime;
            model.time_to_wait = CONNECTOR_RETRY_DELAY;
            model.command_after_wait = Command::NoCommand;
            return;
        }

        if let Err(error) = device.open(&self.config.adapter_name, ssid_filter) {
            error!("failed to activate the capture interface: {error}");
            self.schedule_stop(model);
            return;
        }

        match device.start_receiver() {
            Ok(()) if self.connector.start_receiver_thread() => {
                model.status = EngineStatus::Running;
                model.command = Command::NoCommand;
                info!("engine running on {}", self.config.adapter_name);
            }
            Ok(()) => {
                error!("failed to start the relay receiver thread");
                self.schedule_stop(model);
            }
            Err(error) => {
                error!("failed to start the capture worker: {error}");
                self.schedule_stop(model);
            }
        }
    }

    fn schedule_stop(&mut self, model: &mut EngineModel) {
        model.status = EngineStatus::Error;
        model.command = Command::WaitForTime;
        model.time_to_wait = DEVICE_RETRY_DELAY;
        model.command_after_wait = Command::StopEngine;
    }

    fn stop(&mut self, model: &mut EngineModel) {
        self.connector.close();
        if let Some(device) = self.device.take() {
            device.close();
        }
        model.status = EngineStatus::Idle;
        model.command = Command::NoCommand;
    }

    fn build_device(&self) -> Arc<dyn PacketDevice> {
        if self.config.use_psp_plugin {
            let device = PspPluginDevice::new();
            if !self.config.only_accept_from_mac.is_empty() {
                device.set_source_mac_filter(converter::mac_to_int(
                    &self.config.only_accept_from_mac,
                ));
            }
            Arc::new(device)
        } else {
            let device = MonitorDevice::new();
            if !self.config.only_accept_from_mac.is_empty() {
                device.set_source_mac_filter(converter::mac_to_int(
                    &self.config.only_accept_from_mac,
                ));
            }
            device.set_acknowledge_packets(self.config.acknowledge_data_frames);
            Arc::new(device)
        }
    }
}
