#![cfg_attr(not(test), no_std)]
//! Pulse tachometer core driven by two interrupts.
//!
//! The sensor's rising edge feeds [`PulseCapture`] (debounce, pulse count, pulse interval), a
//! periodic timer feeds [`TimeBase`] (frequency, RPM, revolutions, filtering). [`Tachometer`]
//! owns both, hands itself to the board's [`SensorInput`] and [`PeriodicTimer`] as their
//! callback, and serves the results to foreground code through [`AtomicChannel`]s.
//!
//! All arithmetic is integer. Frequencies are whole hertz, the filter coefficient is in
//! thousandths.

// must come first so the macros are visible to every module below
mod fmt;

pub mod channel;
pub mod config;
pub mod errors;
pub mod filter;
pub mod platform;
pub mod pulse_capture;
pub mod reading;
pub mod tachometer;
pub mod time_base;
pub mod timers;

pub use channel::AtomicChannel;
pub use config::{Config, ConfigBuilder};
pub use errors::{ErrorSeverity, TachometerError};
pub use platform::{EdgeHandler, HalError, MicrosClock, PeriodicTimer, SensorInput, TickHandler};
pub use pulse_capture::PulseCapture;
pub use reading::Reading;
pub use tachometer::Tachometer;
pub use time_base::{SampleResult, TimeBase};

#[cfg(feature = "embassy-time")]
pub use platform::EmbassyClock;
