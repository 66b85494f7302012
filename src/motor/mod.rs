//! Motor module for the ramp experiment.
//!
//! Provides the stepper driver, the worm gear motor with limit-checked
//! position tracking, and incremental moves.

mod chunks;
mod driver;
mod position;
mod worm;

pub use chunks::StepChunks;
pub use driver::{DriverTiming, StepperDriver, PULSE_WIDTH_NS, WAKE_SETTLE_NS};
pub use position::Position;
pub use worm::{Direction, WormMotor};
