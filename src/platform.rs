//! Capabilities the measurement core needs from the board support code.
//!
//! The core never touches registers. A board provides a microsecond clock, a sensor input that
//! can call back on a rising edge, and some periodic timer (see [`crate::timers`] for the
//! supported flavours). Mutual exclusion comes from the `critical-section` implementation
//! the HAL registers.

use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError {
    #[error("Pin cannot raise an edge interrupt")]
    PinNotInterruptCapable,
    #[error("Requested timer is not available on this platform")]
    TimerUnavailable,
    #[error("Resource is already bound to another handler")]
    AlreadyBound,
}

/// Monotonic microsecond clock. Allowed to wrap at `u32::MAX`.
pub trait MicrosClock {
    fn now_micros(&self) -> u32;
}

impl<C: MicrosClock + ?Sized> MicrosClock for &C {
    fn now_micros(&self) -> u32 {
        (**self).now_micros()
    }
}

/// Called from the sensor's edge interrupt.
///
/// Implementations run at interrupt priority: they must not block, wait or loop unboundedly,
/// and must return quickly enough not to delay the periodic timer.
pub trait EdgeHandler: Sync {
    fn on_edge(&self);
}

/// Called from the periodic timer, once per sample period. Same contract as [`EdgeHandler`].
pub trait TickHandler: Sync {
    fn on_tick(&self);
}

/// Digital input wired to the pulse sensor.
pub trait SensorInput<'a> {
    fn configure_pull_up(&mut self) -> Result<(), HalError>;

    /// Binds `handler` to the rising edge of the pin. Rebinding replaces the old handler.
    fn attach_rising_edge(&mut self, handler: &'a dyn EdgeHandler) -> Result<(), HalError>;

    fn detach(&mut self);
}

/// Hardware or software timer driving the time base.
pub trait PeriodicTimer<'a> {
    fn start(&mut self, period_ms: u16, handler: &'a dyn TickHandler) -> Result<(), HalError>;

    /// Changes the period of a running timer. The next tick comes one new period from now at
    /// the latest.
    fn set_period(&mut self, period_ms: u16) -> Result<(), HalError>;

    fn stop(&mut self);
}

/// [`MicrosClock`] backed by the embassy time driver.
#[cfg(feature = "embassy-time")]
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

#[cfg(feature = "embassy-time")]
impl MicrosClock for EmbassyClock {
    fn now_micros(&self) -> u32 {
        // truncation is the wrap the capture code expects
        embassy_time::Instant::now().as_micros() as u32
    }
}
