//! Experiment server.
//!
//! Turns target angles received over the transport into ramp moves,
//! elevator runs and landing zone waits, and publishes the outcome.
//!
//! Two threads are involved: the transport's delivery thread decodes
//! targets and queues them, and the worker thread running
//! [`ExperimentServer::loop_forever`] does all blocking hardware work.

mod handle;
mod waiter;

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{debug, error, info, warn};

use crate::config::{ExperimentConfig, TopicConfig};
use crate::device::{Actuator, EdgeSensor};
use crate::error::{ConfigError, Error, Result};
use crate::protocol::{decode_angle, encode_angle, encode_timestamp, QoS, Status};
use crate::ramp::Ramp;
use crate::transport::Transport;

pub use handle::ServerHandle;
pub use waiter::Waiter;

/// Default idle poll interval of the worker loop.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default time to wait for the broker to confirm the final OFFLINE status.
pub const CONFIRM_TIMEOUT: Duration = Duration::from_secs(5);

/// Run-time settings of the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    /// Topic names.
    pub topics: TopicConfig,
    /// Quality of service for every publish and subscribe.
    pub qos: QoS,
    /// How long to wait for the ball to reach the landing zone.
    pub sensor_timeout: Duration,
    /// Minimum time between two landing zone waits.
    pub cooldown: Duration,
    /// Angle (radians) between two current angle publications.
    pub step_size: f64,
    /// How long the worker waits for a target before checking for a stop.
    pub poll_interval: Duration,
    /// How long `stop` waits for the OFFLINE status to be confirmed.
    pub confirm_timeout: Duration,
}

impl ServerSettings {
    /// Build the settings from a validated configuration.
    pub fn from_config(config: &ExperimentConfig) -> Result<Self> {
        let timeout = config.experiment.timeout_secs;
        let cooldown = config.experiment.cooldown_secs;

        Ok(Self {
            topics: config.topics.clone(),
            qos: QoS::try_from(config.mqtt.qos)?,
            sensor_timeout: Duration::try_from_secs_f64(timeout)
                .map_err(|_| ConfigError::InvalidTimeout(timeout))?,
            cooldown: Duration::try_from_secs_f64(cooldown)
                .map_err(|_| ConfigError::InvalidCooldown(cooldown))?,
            step_size: config.ramp.step_size.to_radians(),
            poll_interval: POLL_INTERVAL,
            confirm_timeout: CONFIRM_TIMEOUT,
        })
    }
}

/// Work item for the worker loop.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    /// Tilt the ramp to this angle (radians) and run the experiment.
    Target(f64),
    /// Wake the worker so it sees the stop flag.
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Idle,
    Running,
    Exited,
}

/// State shared by the worker, the handles and the delivery thread.
struct Shared<T> {
    transport: T,
    topics: TopicConfig,
    qos: QoS,
    confirm_timeout: Duration,
    stop: AtomicBool,
    lifecycle: Mutex<LoopState>,
    exited: Condvar,
    status: AtomicU8,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Transport> Shared<T> {
    fn publish_status(&self, status: Status) -> Result<()> {
        self.transport
            .publish(&self.topics.status, &status.to_bytes(), self.qos, true)?;
        self.status.store(status.as_u8(), Ordering::Release);
        info!("status {:?}", status);
        Ok(())
    }

    fn publish_status_confirmed(&self, status: Status) -> Result<()> {
        self.transport.publish_confirmed(
            &self.topics.status,
            &status.to_bytes(),
            self.qos,
            true,
            self.confirm_timeout,
        )?;
        self.status.store(status.as_u8(), Ordering::Release);
        info!("status {:?}", status);
        Ok(())
    }

    fn publish_angle(&self, angle: f64) -> Result<()> {
        debug!("current angle {:.5} rad", angle);
        self.transport
            .publish(&self.topics.current_angle, &encode_angle(angle), self.qos, false)
    }

    fn publish_timestamp(&self, seconds: f64) -> Result<()> {
        self.transport.publish(
            &self.topics.last_timestamp,
            &encode_timestamp(seconds),
            self.qos,
            false,
        )
    }

    fn status(&self) -> Status {
        Status::from_u8(self.status.load(Ordering::Acquire)).unwrap_or(Status::Offline)
    }
}

/// Marks the loop as exited when dropped, including on error or panic.
struct ExitGuard<'a, T> {
    shared: &'a Shared<T>,
}

impl<T> Drop for ExitGuard<'_, T> {
    fn drop(&mut self) {
        *lock(&self.shared.lifecycle) = LoopState::Exited;
        self.shared.exited.notify_all();
    }
}

/// Remote controlled ramp experiment.
///
/// Owns the ramp, the elevator and the landing zone sensor. Only the
/// thread running [`loop_forever`](Self::loop_forever) touches them.
pub struct ExperimentServer<P, D, A, S, T>
where
    P: OutputPin,
    D: DelayNs,
    A: Actuator,
    S: EdgeSensor,
    T: Transport,
{
    ramp: Ramp<P, D>,
    elevator: A,
    landing_zone: S,
    shared: Arc<Shared<T>>,
    targets: Receiver<Command>,
    commands: Sender<Command>,
    waiter: Waiter,
    sensor_timeout: Duration,
    step_size: f64,
    poll_interval: Duration,
}

impl<P, D, A, S, T> ExperimentServer<P, D, A, S, T>
where
    P: OutputPin,
    D: DelayNs,
    A: Actuator,
    S: EdgeSensor,
    T: Transport,
{
    /// Register the last will and the target handler, connect and subscribe.
    ///
    /// # Errors
    ///
    /// Any transport failure aborts construction. The devices passed in are
    /// dropped, which powers the motor driver down.
    pub fn new(
        ramp: Ramp<P, D>,
        elevator: A,
        landing_zone: S,
        transport: T,
        settings: ServerSettings,
    ) -> Result<Self> {
        let (commands, targets) = mpsc::channel();
        let topics = settings.topics;
        let qos = settings.qos;

        transport.set_last_will(&topics.status, &Status::Offline.to_bytes(), qos, true)?;

        let target_topic = String::from(topics.target_angle.as_str());
        let queue = commands.clone();
        transport.set_message_handler(Box::new(move |topic, payload| {
            if topic != target_topic {
                warn!("ignoring message on unexpected topic {}", topic);
                return;
            }
            match decode_angle(payload) {
                Ok(angle) if angle.is_finite() => {
                    if queue.send(Command::Target(angle)).is_err() {
                        warn!("server gone, dropping target {}", angle);
                    }
                }
                Ok(angle) => warn!("dropping non-finite target {}", angle),
                Err(e) => warn!("dropping target message: {}", e),
            }
        }))?;

        transport.connect()?;
        if let Err(e) = transport.subscribe(&topics.target_angle, qos) {
            error!("failed to subscribe to {}: {}", topics.target_angle, e);
            return Err(e);
        }
        info!("listening for targets on {}", topics.target_angle);

        Ok(Self {
            ramp,
            elevator,
            landing_zone,
            shared: Arc::new(Shared {
                transport,
                topics,
                qos,
                confirm_timeout: settings.confirm_timeout,
                stop: AtomicBool::new(false),
                lifecycle: Mutex::new(LoopState::Idle),
                exited: Condvar::new(),
                status: AtomicU8::new(Status::Offline.as_u8()),
            }),
            targets,
            commands,
            waiter: Waiter::new(settings.cooldown),
            sensor_timeout: settings.sensor_timeout,
            step_size: settings.step_size,
            poll_interval: settings.poll_interval,
        })
    }

    /// Get a handle for stopping the loop from another thread.
    pub fn handle(&self) -> ServerHandle<T> {
        ServerHandle::new(Arc::clone(&self.shared), self.commands.clone())
    }

    /// Get the last published status.
    pub fn status(&self) -> Status {
        self.shared.status()
    }

    /// Get the ramp.
    #[inline]
    pub fn ramp(&self) -> &Ramp<P, D> {
        &self.ramp
    }

    /// Process targets until a stop is requested.
    ///
    /// Publishes READY, starts message delivery and handles one target at
    /// a time. A stop only takes effect between targets.
    ///
    /// # Errors
    ///
    /// Any failure while handling a target other than a landing zone
    /// timeout ends the loop and is returned.
    pub fn loop_forever(&mut self) -> Result<()> {
        *lock(&self.shared.lifecycle) = LoopState::Running;
        let shared = Arc::clone(&self.shared);
        let _exit = ExitGuard { shared: &shared };

        shared.publish_status(Status::Ready)?;
        shared.transport.start_delivery()?;

        while !shared.stop.load(Ordering::Acquire) {
            match self.targets.recv_timeout(self.poll_interval) {
                Ok(Command::Target(angle)) => {
                    if let Err(e) = self.handle_target(angle) {
                        error!("fatal error while handling target {}: {}", angle, e);
                        return Err(e);
                    }
                }
                Ok(Command::Stop) | Err(RecvTimeoutError::Timeout) => {}
                // the server itself holds a sender
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        info!("worker loop stopped");
        Ok(())
    }

    fn handle_target(&mut self, angle: f64) -> Result<()> {
        info!("handling target {:.5} rad", angle);

        let outcome = self.run_target(angle);
        let disabled = self.elevator.disable();
        self.waiter.reset();

        outcome.and(disabled)
    }

    fn run_target(&mut self, angle: f64) -> Result<()> {
        self.shared.publish_status(Status::Busy)?;
        self.drive_ramp(angle)?;

        let slept = self.waiter.wait();
        if !slept.is_zero() {
            debug!("waited {:?} for the landing zone to settle", slept);
        }

        self.elevator.enable()?;
        if self.landing_zone.wait_for_edge(self.sensor_timeout)? {
            self.shared.publish_timestamp(unix_seconds())?;
            self.shared.publish_status(Status::Ready)
        } else {
            warn!("no landing detected within {:?}", self.sensor_timeout);
            self.shared.publish_status(Status::Error)
        }
    }

    fn drive_ramp(&mut self, angle: f64) -> Result<()> {
        let shared = &self.shared;
        for reached in self.ramp.iter_angle(angle, self.step_size)? {
            shared.publish_angle(reached?)?;
        }
        shared.publish_angle(self.ramp.get_angle())
    }

    /// Stop the loop, disconnect and release every device.
    ///
    /// Each step is attempted even if an earlier one failed; the first
    /// error is returned.
    pub fn shutdown(self) -> Result<()> {
        let mut first = None;

        record(&mut first, "stop", self.handle().stop().map(drop));
        record(&mut first, "disconnect", self.shared.transport.disconnect());

        let Self {
            ramp,
            elevator,
            landing_zone,
            ..
        } = self;
        record(&mut first, "ramp shutdown", ramp.shutdown());
        record(&mut first, "elevator release", elevator.release());
        record(&mut first, "landing zone release", landing_zone.release());

        first.map_or(Ok(()), Err)
    }
}

fn record(first: &mut Option<Error>, step: &str, result: Result<()>) {
    if let Err(e) = result {
        error!("{} failed: {}", step, e);
        first.get_or_insert(e);
    }
}

fn unix_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0)
}
