//! [`PeriodicTimer`](crate::platform::PeriodicTimer) flavours.
//!
//! - [`CompareMatchTimer`]: hardware counter in clear-on-compare mode behind a fixed prescaler,
//!   the classic 8-bit AVR setup. The board vector calls [`CompareMatchTimer::fire`].
//! - [`SoftwareTimer`]: callback timer advanced from a millisecond time source by
//!   [`SoftwareTimer::poll`], for platforms with a timer service instead of raw timers.
//! - [`IntervalTimer`]: microsecond interval timer peripheral (PIT style) that only needs
//!   `begin`/`update`/`end`.

pub mod compare_match;
pub mod interval;
pub mod software;

pub use compare_match::{compare_value, CompareMatchRegisters, CompareMatchTimer, TimerChannel};
pub use interval::{IntervalPeripheral, IntervalTimer};
pub use software::SoftwareTimer;
