//! Incremental moves.

use core::iter::FusedIterator;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::error::Result;

use super::worm::{Direction, WormMotor};

/// A move performed one chunk of pulses at a time.
///
/// Each call to `next` issues up to `chunk` pulses and yields the step
/// count reached, so callers can do other work between chunks. The driver
/// is woken before the first chunk and put back to sleep after the last
/// one, after a failed pulse, or when the iterator is dropped early.
///
/// The sequence cannot be restarted; once exhausted it keeps returning
/// `None`.
pub struct StepChunks<'a, P, D>
where
    P: OutputPin,
    D: DelayNs,
{
    motor: &'a mut WormMotor<P, D>,
    direction: Direction,
    remaining: u64,
    chunk: u64,
    awake: bool,
    finished: bool,
}

impl<'a, P, D> StepChunks<'a, P, D>
where
    P: OutputPin,
    D: DelayNs,
{
    pub(super) fn new(
        motor: &'a mut WormMotor<P, D>,
        direction: Direction,
        remaining: u64,
        chunk: u64,
    ) -> Self {
        Self {
            motor,
            direction,
            remaining,
            chunk,
            awake: false,
            finished: remaining == 0,
        }
    }

    /// Pulses still to be issued.
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Direction of the move.
    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    fn rest(&mut self) -> Result<()> {
        if self.awake {
            self.awake = false;
            self.motor.rest()
        } else {
            Ok(())
        }
    }

    fn fail(&mut self, error: crate::error::Error) -> Result<i64> {
        self.finished = true;
        if let Err(e) = self.rest() {
            log::error!("failed to put driver to sleep after {}: {}", error, e);
        }
        Err(error)
    }
}

impl<P, D> Iterator for StepChunks<'_, P, D>
where
    P: OutputPin,
    D: DelayNs,
{
    type Item = Result<i64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        if !self.awake {
            // marked first so a half-done wake still ends in sleep
            self.awake = true;
            if let Err(e) = self.motor.start_move(self.direction) {
                return Some(self.fail(e));
            }
        }

        for _ in 0..self.chunk.min(self.remaining) {
            if let Err(e) = self.motor.pulse(self.direction) {
                return Some(self.fail(e));
            }
            self.remaining -= 1;
        }

        if self.remaining == 0 {
            self.finished = true;
            if let Err(e) = self.rest() {
                return Some(Err(e));
            }
        }

        log::trace!("motor at step {}", self.motor.get_steps());
        Some(Ok(self.motor.get_steps()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished {
            return (0, Some(0));
        }
        let chunks = self.remaining.div_ceil(self.chunk) as usize;
        (chunks, Some(chunks))
    }
}

impl<P, D> FusedIterator for StepChunks<'_, P, D>
where
    P: OutputPin,
    D: DelayNs,
{
}

impl<P, D> Drop for StepChunks<'_, P, D>
where
    P: OutputPin,
    D: DelayNs,
{
    fn drop(&mut self) {
        if let Err(e) = self.rest() {
            log::error!("failed to put driver to sleep: {}", e);
        }
    }
}
