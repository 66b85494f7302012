//! Shared test doubles: recording driver lines, devices and transport.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};
use embedded_hal_mock::eh1::delay::NoopDelay;

use ramp_experiment::device::{Actuator, EdgeSensor};
use ramp_experiment::error::{Result, TransportError};
use ramp_experiment::protocol::{QoS, Status};
use ramp_experiment::transport::{MessageHandler, Transport};
use ramp_experiment::{parse_config, ExperimentConfig, StepperDriver};

// =============================================================================
// Configuration
// =============================================================================

pub const CONFIG: &str = r#"
[mqtt]
host = "localhost"
client_id = "ramp-test"
qos = 1

[topics]
status = "ramp/status"
last_timestamp = "ramp/timestamp"
current_angle = "ramp/angle/current"
target_angle = "ramp/angle/target"

[driver]
enable = 0
sleep = 1
step = 19
direction = 18

[motor]
direction = "high"
step_width = 0.025
pps = 1000000
limit_lower = 0.0
limit_upper = 82.0

[ramp]
adjacent = 70.0
step_size_degrees = 1.0

[elevator]
channel = 0
frequency = 50.0
duty_cycle = 7.5

[landing_zone]
pin = 3

[experiment]
timeout_secs = 0.05
cooldown_secs = 0.0
"#;

pub fn config() -> ExperimentConfig {
    parse_config(CONFIG).unwrap()
}

// =============================================================================
// Driver lines
// =============================================================================

/// Every level written to any line, in order.
#[derive(Clone, Default)]
pub struct LineLog {
    writes: Arc<Mutex<Vec<(&'static str, bool)>>>,
    broken: Arc<Mutex<Vec<&'static str>>>,
}

impl LineLog {
    pub fn line(&self, name: &'static str) -> FakeLine {
        FakeLine {
            name,
            log: self.clone(),
        }
    }

    /// Make every further write to `name` fail.
    pub fn break_line(&self, name: &'static str) {
        self.broken.lock().unwrap().push(name);
    }

    pub fn writes(&self) -> Vec<(&'static str, bool)> {
        self.writes.lock().unwrap().clone()
    }

    /// Last level written to `name`.
    pub fn level(&self, name: &str) -> Option<bool> {
        self.writes()
            .iter()
            .rev()
            .find(|(line, _)| *line == name)
            .map(|(_, high)| *high)
    }

    /// Number of rising edges on the step line.
    pub fn pulses(&self) -> usize {
        self.writes()
            .iter()
            .filter(|(line, high)| *line == "step" && *high)
            .count()
    }

    pub fn clear(&self) {
        self.writes.lock().unwrap().clear();
    }
}

pub struct FakeLine {
    name: &'static str,
    log: LineLog,
}

impl FakeLine {
    fn write(&mut self, high: bool) -> core::result::Result<(), ErrorKind> {
        if self.log.broken.lock().unwrap().contains(&self.name) {
            return Err(ErrorKind::Other);
        }
        self.log.writes.lock().unwrap().push((self.name, high));
        Ok(())
    }
}

impl ErrorType for FakeLine {
    type Error = ErrorKind;
}

impl OutputPin for FakeLine {
    fn set_low(&mut self) -> core::result::Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> core::result::Result<(), Self::Error> {
        self.write(true)
    }
}

pub type TestDriver = StepperDriver<FakeLine, NoopDelay>;

pub fn driver() -> (TestDriver, LineLog) {
    let log = LineLog::default();
    let driver = StepperDriver::new(
        log.line("enable"),
        log.line("sleep"),
        log.line("step"),
        log.line("direction"),
        NoopDelay::new(),
    )
    .unwrap();
    (driver, log)
}

// =============================================================================
// Devices
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActuatorCounts {
    pub enabled: usize,
    pub disabled: usize,
    pub released: usize,
}

#[derive(Clone, Default)]
pub struct MockActuator {
    counts: Arc<Mutex<ActuatorCounts>>,
}

impl MockActuator {
    pub fn counts(&self) -> ActuatorCounts {
        *self.counts.lock().unwrap()
    }
}

impl Actuator for MockActuator {
    fn enable(&mut self) -> Result<()> {
        self.counts.lock().unwrap().enabled += 1;
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        self.counts.lock().unwrap().disabled += 1;
        Ok(())
    }

    fn release(self) -> Result<()> {
        self.counts.lock().unwrap().released += 1;
        Ok(())
    }
}

/// Sensor answering each wait from a script; an empty script times out.
#[derive(Clone, Default)]
pub struct MockSensor {
    script: Arc<Mutex<VecDeque<bool>>>,
    waits: Arc<Mutex<usize>>,
    released: Arc<Mutex<bool>>,
}

impl MockSensor {
    pub fn with_edges(edges: &[bool]) -> Self {
        let sensor = Self::default();
        sensor.script.lock().unwrap().extend(edges);
        sensor
    }

    pub fn waits(&self) -> usize {
        *self.waits.lock().unwrap()
    }

    pub fn released(&self) -> bool {
        *self.released.lock().unwrap()
    }
}

impl EdgeSensor for MockSensor {
    fn wait_for_edge(&mut self, _timeout: Duration) -> Result<bool> {
        *self.waits.lock().unwrap() += 1;
        Ok(self.script.lock().unwrap().pop_front().unwrap_or(false))
    }

    fn release(self) -> Result<()> {
        *self.released.lock().unwrap() = true;
        Ok(())
    }
}

// =============================================================================
// Transport
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: String,
    pub payload: Vec<u8>,
    pub retain: bool,
    pub confirmed: bool,
}

#[derive(Default)]
struct TransportState {
    will: Option<Published>,
    handler: Option<MessageHandler>,
    connected: bool,
    subscriptions: Vec<String>,
    published: Vec<Published>,
    delivering: bool,
    fail_subscribe: bool,
}

#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<TransportState>>,
}

impl MockTransport {
    pub fn failing_subscribe() -> Self {
        let transport = Self::default();
        transport.state.lock().unwrap().fail_subscribe = true;
        transport
    }

    /// Deliver an inbound message to the registered handler.
    pub fn inject(&self, topic: &str, payload: &[u8]) {
        let mut state = self.state.lock().unwrap();
        let handler = state.handler.as_mut().expect("no message handler");
        handler(topic, payload);
    }

    pub fn will(&self) -> Option<Published> {
        self.state.lock().unwrap().will.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }

    pub fn is_delivering(&self) -> bool {
        self.state.lock().unwrap().delivering
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.state.lock().unwrap().subscriptions.clone()
    }

    pub fn published(&self) -> Vec<Published> {
        self.state.lock().unwrap().published.clone()
    }

    pub fn on(&self, topic: &str) -> Vec<Published> {
        self.published()
            .into_iter()
            .filter(|message| message.topic == topic)
            .collect()
    }

    pub fn statuses(&self) -> Vec<Status> {
        self.on("ramp/status")
            .iter()
            .map(|message| Status::from_bytes(&message.payload).unwrap())
            .collect()
    }
}

impl Transport for MockTransport {
    fn set_last_will(&self, topic: &str, payload: &[u8], _qos: QoS, retain: bool) -> Result<()> {
        self.state.lock().unwrap().will = Some(Published {
            topic: topic.into(),
            payload: payload.to_vec(),
            retain,
            confirmed: false,
        });
        Ok(())
    }

    fn set_message_handler(&self, handler: MessageHandler) -> Result<()> {
        self.state.lock().unwrap().handler = Some(handler);
        Ok(())
    }

    fn connect(&self) -> Result<()> {
        self.state.lock().unwrap().connected = true;
        Ok(())
    }

    fn subscribe(&self, topic: &str, _qos: QoS) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_subscribe {
            return Err(TransportError::Disconnected.into());
        }
        state.subscriptions.push(topic.into());
        Ok(())
    }

    fn publish(&self, topic: &str, payload: &[u8], _qos: QoS, retain: bool) -> Result<()> {
        self.state.lock().unwrap().published.push(Published {
            topic: topic.into(),
            payload: payload.to_vec(),
            retain,
            confirmed: false,
        });
        Ok(())
    }

    fn publish_confirmed(
        &self,
        topic: &str,
        payload: &[u8],
        _qos: QoS,
        retain: bool,
        _timeout: Duration,
    ) -> Result<()> {
        self.state.lock().unwrap().published.push(Published {
            topic: topic.into(),
            payload: payload.to_vec(),
            retain,
            confirmed: true,
        });
        Ok(())
    }

    fn start_delivery(&self) -> Result<()> {
        self.state.lock().unwrap().delivering = true;
        Ok(())
    }

    fn stop_delivery(&self) -> Result<()> {
        self.state.lock().unwrap().delivering = false;
        Ok(())
    }

    fn disconnect(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.delivering = false;
        state.connected = false;
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Poll `condition` until it holds, panicking after a generous timeout.
pub fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(2));
    }
}
