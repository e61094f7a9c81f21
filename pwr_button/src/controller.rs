//! Line controller: pulse control over exactly one output line.
//!
//! A `LineController` emulates a finger on a power button. `power_on()` holds
//! the line high for the short press, `power_off()` for the long press.
//!
//! # Lifecycle
//!
//! ```text
//!  Uninitialized ──initialize()──► Ready ──cleanup()──► Released
//!        │                          │  ▲                   │
//!        └─ cleanup(): no-op        └──┘ pulse()           └─ initialize()/cleanup(): no-op
//! ```
//!
//! # Guard
//!
//! Each controller owns one mutex. It is held for the whole pulse (including
//! the sleep) and for every lifecycle transition, so pulses on one line never
//! overlap and `cleanup()` waits for an in-flight pulse. Different
//! controllers never share a guard.
//!
//! The line is low whenever the guard is free: the low write of a pulse runs
//! on every exit path out of the critical section, including a failed high
//! write and unwinding.

use parking_lot::Mutex;
use pwr_common::line::driver::{LineDriver, LineError};
use pwr_common::line::types::{Level, LineId};
use serde::Serialize;
use static_assertions::assert_impl_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Lifecycle state of a [`LineController`]. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum LifecycleState {
    /// Constructed, line not yet configured.
    Uninitialized = 0,
    /// Line configured as output and low; pulses allowed.
    Ready = 1,
    /// Line forced low and released. Terminal.
    Released = 2,
}

impl LifecycleState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Uninitialized,
            1 => Self::Ready,
            _ => Self::Released,
        }
    }
}

/// Errors returned by [`LineController`] operations.
#[derive(Debug, Clone, Error)]
pub enum ControllerError {
    /// Pulse requested before `initialize()` or after `cleanup()`.
    #[error("{line} is not initialized")]
    NotInitialized {
        /// Line the request targeted.
        line: LineId,
    },

    /// A pulse or press duration of zero.
    #[error("{line}: pulse duration must be greater than zero")]
    InvalidDuration {
        /// Line the request targeted.
        line: LineId,
    },

    /// The line driver failed.
    #[error(transparent)]
    Line(#[from] LineError),
}

/// Stateful wrapper around one output line.
pub struct LineController {
    line: LineId,
    short_press: Duration,
    long_press: Duration,
    active_low: bool,
    driver: Arc<dyn LineDriver>,
    /// Serializes pulses and lifecycle transitions on this line.
    guard: Mutex<()>,
    /// `LifecycleState` as u8. Written only while `guard` is held.
    state: AtomicU8,
}

assert_impl_all!(LineController: Send, Sync);

impl LineController {
    /// Create a controller for `line`, driven through `driver`.
    ///
    /// # Errors
    /// Returns `ControllerError::InvalidDuration` if either press is zero.
    pub fn new(
        line: LineId,
        short_press: Duration,
        long_press: Duration,
        driver: Arc<dyn LineDriver>,
    ) -> Result<Self, ControllerError> {
        if short_press.is_zero() || long_press.is_zero() {
            return Err(ControllerError::InvalidDuration { line });
        }

        Ok(Self {
            line,
            short_press,
            long_press,
            active_low: false,
            driver,
            guard: Mutex::new(()),
            state: AtomicU8::new(LifecycleState::Uninitialized as u8),
        })
    }

    /// Treat the line as active-low. Applied by `initialize()`.
    pub fn with_active_low(mut self, active_low: bool) -> Self {
        self.active_low = active_low;
        self
    }

    /// Line identifier.
    pub fn line_id(&self) -> LineId {
        self.line
    }

    /// Short press (power on) duration.
    pub fn short_press(&self) -> Duration {
        self.short_press
    }

    /// Long press (forced power off) duration.
    pub fn long_press(&self) -> Duration {
        self.long_press
    }

    /// Current lifecycle state. Does not wait for an in-flight pulse.
    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: LifecycleState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Configure the line as output, driven low.
    ///
    /// On `Ready` this re-asserts low. On `Released` it does nothing: a
    /// released controller stays released.
    pub fn initialize(&self) -> Result<(), ControllerError> {
        let _guard = self.guard.lock();

        match self.state() {
            LifecycleState::Uninitialized => {
                if self.active_low {
                    self.driver.set_active_low(self.line)?;
                }
                self.driver.configure_output(self.line, Level::Low)?;
                self.set_state(LifecycleState::Ready);
                info!(
                    "{} ready on driver '{}' (short={:?}, long={:?}{})",
                    self.line,
                    self.driver.name(),
                    self.short_press,
                    self.long_press,
                    if self.active_low { ", active-low" } else { "" }
                );
            }
            LifecycleState::Ready => {
                debug!("{} already initialized, re-asserting LOW", self.line);
                self.driver.write_level(self.line, Level::Low)?;
            }
            LifecycleState::Released => {
                warn!("{} initialize() after cleanup ignored", self.line);
            }
        }

        Ok(())
    }

    /// Drive the line high for `duration`, then low.
    ///
    /// Blocks while another pulse on this line is in progress, then for
    /// `duration`. Returns once the line is low again.
    ///
    /// # Errors
    /// - `NotInitialized` outside `Ready`, without touching the line
    /// - `InvalidDuration` for a zero duration
    /// - `Line` if the driver fails; the line has been driven low regardless
    pub fn pulse(&self, duration: Duration) -> Result<(), ControllerError> {
        if duration.is_zero() {
            return Err(ControllerError::InvalidDuration { line: self.line });
        }

        let _guard = self.guard.lock();
        if self.state() != LifecycleState::Ready {
            return Err(ControllerError::NotInitialized { line: self.line });
        }

        let started = Instant::now();
        let low = ForceLow::arm(self.driver.as_ref(), self.line);
        self.driver.write_level(self.line, Level::High)?;
        thread::sleep(duration);
        low.finish()?;

        debug!("{} pulse complete after {:?}", self.line, started.elapsed());
        Ok(())
    }

    /// Short press: signals the host to power on.
    pub fn power_on(&self) -> Result<(), ControllerError> {
        info!("{} power_on ({:?} press)", self.line, self.short_press);
        self.pulse(self.short_press)
    }

    /// Long press: forces the host off.
    pub fn power_off(&self) -> Result<(), ControllerError> {
        info!("{} power_off ({:?} press)", self.line, self.long_press);
        self.pulse(self.long_press)
    }

    /// Force the line low and release it.
    ///
    /// Waits for an in-flight pulse. No-op unless `Ready`. Both the low write
    /// and the release are attempted; the controller is `Released` afterwards
    /// even if one of them failed, and the first failure is returned.
    pub fn cleanup(&self) -> Result<(), ControllerError> {
        let _guard = self.guard.lock();

        if self.state() != LifecycleState::Ready {
            debug!("{} cleanup skipped ({:?})", self.line, self.state());
            return Ok(());
        }

        let low = self.driver.write_level(self.line, Level::Low);
        let released = self.driver.release(self.line);
        self.set_state(LifecycleState::Released);

        match (low, released) {
            (Ok(()), Ok(())) => {
                info!("{} released", self.line);
                Ok(())
            }
            (Err(e), Err(release_err)) => {
                warn!("{} release failed after low write failure: {}", self.line, release_err);
                Err(e.into())
            }
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for LineController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineController")
            .field("line", &self.line)
            .field("short_press", &self.short_press)
            .field("long_press", &self.long_press)
            .field("active_low", &self.active_low)
            .field("driver", &self.driver.name())
            .field("state", &self.state())
            .finish()
    }
}

/// Writes LOW to the line when dropped, unless `finish()` already did.
struct ForceLow<'a> {
    driver: &'a dyn LineDriver,
    line: LineId,
    armed: bool,
}

impl<'a> ForceLow<'a> {
    fn arm(driver: &'a dyn LineDriver, line: LineId) -> Self {
        Self {
            driver,
            line,
            armed: true,
        }
    }

    /// Write LOW now and report the result.
    fn finish(mut self) -> Result<(), LineError> {
        self.armed = false;
        self.driver.write_level(self.line, Level::Low)
    }
}

impl Drop for ForceLow<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.driver.write_level(self.line, Level::Low) {
                warn!("{} failed to force LOW on pulse exit: {}", self.line, e);
            }
        }
    }
}
