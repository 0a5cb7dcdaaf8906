//! Runtime composition root
//!
//! [`Node`] owns every component and the shared device state. One call to
//! [`Node::poll`] is one iteration of the control loop:
//!
//! 1. one step of the update session
//! 2. one step of the HTTP server
//! 3. every scheduler job that is due
//!
//! and then returns. The caller decides how to yield between iterations.

use embassy_time::{Duration, Instant};

use growstation_hal::analog::AnalogFrontEnd;
use growstation_hal::net::{LinkUp, Listener};
use growstation_hal::storage::FlashStore;
use growstation_hal::system::SystemProbe;
use growstation_hal::update::UpdateSession;

use crate::config::{ConfigError, NodeConfig};
use crate::http::HttpServer;
use crate::scheduler::{Scheduler, SchedulerError};
use crate::sensor::{SensorReading, SensorSampler};
use crate::storage::{FileStore, Transfer};
use crate::update::{UpdatePhase, UpdateLog};

/// State shared by the request handlers and the scheduled jobs
///
/// Only ever touched from the control loop, so it needs no locking.
pub struct Device<S: FlashStore, P> {
    /// Flash-backed file store
    pub store: FileStore<S>,
    /// Slot for the one upload that may be in flight
    pub transfer: Transfer<S::File>,
    /// Last calibrated probe reading
    pub reading: SensorReading,
    /// Heap, analog and pin-level probe
    pub probe: P,
}

impl<S: FlashStore, P> Device<S, P> {
    /// Create device state with an empty reading and no upload
    pub fn new(store: FileStore<S>, probe: P) -> Self {
        Self {
            store,
            transfer: Transfer::new(),
            reading: SensorReading::default(),
            probe,
        }
    }
}

/// Jobs run by the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Job {
    /// Sample every probe channel
    SampleSensors,
}

/// Errors while assembling the node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NodeError {
    Config(ConfigError),
    Scheduler(SchedulerError),
}

impl From<ConfigError> for NodeError {
    fn from(e: ConfigError) -> Self {
        NodeError::Config(e)
    }
}

impl From<SchedulerError> for NodeError {
    fn from(e: SchedulerError) -> Self {
        NodeError::Scheduler(e)
    }
}

/// Collaborators the node runs on
pub struct Peripherals<L, S, A, P, U> {
    /// Persistent storage
    pub flash: S,
    /// HTTP listener
    pub listener: L,
    /// Soil probe front end
    pub analog: A,
    /// System probe
    pub probe: P,
    /// Remote update session
    pub update: U,
}

/// The whole node, driven by [`Node::poll`]
pub struct Node<L, S, A, P, U>
where
    L: Listener,
    S: FlashStore,
{
    server: HttpServer<L, S>,
    device: Device<S, P>,
    sampler: SensorSampler<A>,
    scheduler: Scheduler<Job>,
    update: U,
    update_log: UpdateLog,
}

impl<L, S, A, P, U> Node<L, S, A, P, U>
where
    L: Listener,
    S: FlashStore,
    A: AnalogFrontEnd,
    P: SystemProbe,
    U: UpdateSession,
{
    /// Assemble the node once the network link is up
    ///
    /// Logs the stored files and starts the HTTP service and the sampling
    /// timer, measured from `now`.
    pub fn new(
        link: &LinkUp,
        config: &NodeConfig,
        peripherals: Peripherals<L, S, A, P, U>,
        now: Instant,
    ) -> Result<Self, NodeError> {
        config.validate()?;

        let [a, b, c, d] = link.address;
        info!("connected! {}.{}.{}.{}", a, b, c, d);

        let mut store = FileStore::new(peripherals.flash, config.index_name.clone());
        store.log_contents();
        info!(
            "Open http://{}/edit to see the file browser",
            link.hostname.as_str()
        );

        let mut scheduler = Scheduler::new();
        scheduler.every(
            Duration::from_millis(u64::from(config.sample_period_ms)),
            Job::SampleSensors,
            now,
        )?;

        let server = HttpServer::new(
            peripherals.listener,
            Duration::from_millis(u64::from(config.idle_timeout_ms)),
        );
        info!("HTTP server started");

        Ok(Self {
            server,
            device: Device::new(store, peripherals.probe),
            sampler: SensorSampler::new(peripherals.analog, config.calibration),
            scheduler,
            update: peripherals.update,
            update_log: UpdateLog::new(),
        })
    }

    /// Run one iteration of the control loop
    pub fn poll(&mut self, now: Instant) {
        self.update.poll(&mut self.update_log);
        self.server.poll(now, &mut self.device);

        let Self {
            scheduler,
            sampler,
            device,
            ..
        } = self;
        scheduler.poll(now, |job| match job {
            Job::SampleSensors => sampler.sample(&mut device.reading),
        });
    }

    /// Shared device state
    pub fn device(&self) -> &Device<S, P> {
        &self.device
    }

    /// Mutable shared device state
    pub fn device_mut(&mut self) -> &mut Device<S, P> {
        &mut self.device
    }

    /// Scheduler, for registering additional timers
    pub fn scheduler_mut(&mut self) -> &mut Scheduler<Job> {
        &mut self.scheduler
    }

    /// Phase of the last observed update session
    pub fn update_phase(&self) -> UpdatePhase {
        self.update_log.phase()
    }

    /// Check whether a client is being served
    pub fn is_serving(&self) -> bool {
        self.server.is_busy()
    }
}
