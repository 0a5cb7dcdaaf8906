//! Elapsed-time timer table
//!
//! The scheduler owns no clock. Every call takes the current
//! [`Instant`] from the caller, which keeps it deterministic under test
//! and lets the control loop decide where time comes from.

use embassy_time::{Duration, Instant};
use heapless::Vec;

/// Default number of timer slots
pub const MAX_TIMERS: usize = 8;

/// Scheduler errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SchedulerError {
    /// Every timer slot is taken
    Full,
    /// No timer with this id
    UnknownTimer,
    /// Period of zero would fire on every tick
    ZeroPeriod,
}

/// Handle of a registered timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerId(u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Repeat {
    Periodic,
    Once,
}

#[derive(Debug, Clone, Copy)]
struct Timer<J> {
    id: TimerId,
    job: J,
    period: Duration,
    /// Reference time the period is measured from
    last: Instant,
    repeat: Repeat,
    enabled: bool,
    /// One-shot timer that has run
    spent: bool,
}

/// Runs registered jobs by elapsed-time polling
///
/// Jobs are plain values handed back to the caller of [`Scheduler::poll`]
/// when due. Timers that come due in the same tick run in registration
/// order. The scheduler never sleeps.
#[derive(Debug)]
pub struct Scheduler<J, const N: usize = MAX_TIMERS> {
    timers: Vec<Timer<J>, N>,
    next_id: u16,
}

impl<J: Copy, const N: usize> Default for Scheduler<J, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<J: Copy, const N: usize> Scheduler<J, N> {
    /// Create an empty scheduler
    pub const fn new() -> Self {
        Self {
            timers: Vec::new(),
            next_id: 0,
        }
    }

    /// Run `job` every `period`, first after one period from `now`
    pub fn every(&mut self, period: Duration, job: J, now: Instant) -> Result<TimerId, SchedulerError> {
        self.register(period, job, now, Repeat::Periodic)
    }

    /// Run `job` once, `delay` after `now`
    pub fn once(&mut self, delay: Duration, job: J, now: Instant) -> Result<TimerId, SchedulerError> {
        self.register(delay, job, now, Repeat::Once)
    }

    fn register(
        &mut self,
        period: Duration,
        job: J,
        now: Instant,
        repeat: Repeat,
    ) -> Result<TimerId, SchedulerError> {
        if period.as_ticks() == 0 {
            return Err(SchedulerError::ZeroPeriod);
        }

        let id = TimerId(self.next_id);
        self.timers
            .push(Timer {
                id,
                job,
                period,
                last: now,
                repeat,
                enabled: true,
                spent: false,
            })
            .map_err(|_| SchedulerError::Full)?;
        self.next_id = self.next_id.wrapping_add(1);
        Ok(id)
    }

    fn timer_mut(&mut self, id: TimerId) -> Result<&mut Timer<J>, SchedulerError> {
        self.timers
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(SchedulerError::UnknownTimer)
    }

    /// Resume a disabled timer
    pub fn enable(&mut self, id: TimerId) -> Result<(), SchedulerError> {
        self.timer_mut(id)?.enabled = true;
        Ok(())
    }

    /// Stop a timer from firing without removing it
    pub fn disable(&mut self, id: TimerId) -> Result<(), SchedulerError> {
        self.timer_mut(id)?.enabled = false;
        Ok(())
    }

    /// Check if a timer is enabled
    pub fn is_enabled(&self, id: TimerId) -> Result<bool, SchedulerError> {
        self.timers
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.enabled)
            .ok_or(SchedulerError::UnknownTimer)
    }

    /// Measure the timer's next period from `now`
    pub fn restart(&mut self, id: TimerId, now: Instant) -> Result<(), SchedulerError> {
        self.timer_mut(id)?.last = now;
        Ok(())
    }

    /// Unregister a timer, returning its job
    pub fn remove(&mut self, id: TimerId) -> Result<J, SchedulerError> {
        let index = self
            .timers
            .iter()
            .position(|t| t.id == id)
            .ok_or(SchedulerError::UnknownTimer)?;
        Ok(self.timers.remove(index).job)
    }

    /// Number of registered timers
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Check if no timer is registered
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Run every due job once
    ///
    /// A timer is due when at least its period has elapsed since its
    /// reference time; running it resets the reference time to `now`.
    /// One-shot timers are unregistered after running. Returns the number
    /// of jobs run.
    pub fn poll<F>(&mut self, now: Instant, mut run: F) -> usize
    where
        F: FnMut(J),
    {
        let mut ran = 0;
        let mut expired = false;

        for timer in self.timers.iter_mut().filter(|t| t.enabled) {
            if now.saturating_duration_since(timer.last) < timer.period {
                continue;
            }

            trace!("timer {} due", timer.id.0);
            run(timer.job);
            timer.last = now;
            ran += 1;

            if timer.repeat == Repeat::Once {
                timer.spent = true;
                expired = true;
            }
        }

        if expired {
            self.timers.retain(|t| !t.spent);
        }
        ran
    }
}
