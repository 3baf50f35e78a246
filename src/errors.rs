use thiserror_no_std::Error;

use crate::platform::HalError;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TachometerError {
    #[error("Sample period of {0}ms is below the 100ms minimum")]
    SamplePeriodTooShort(u16),
    #[error("Filter alpha {0} is outside 0..=1000")]
    FilterAlphaOutOfRange(u16),
    #[error("Moving average window {0} is outside 1..=20")]
    WindowSizeOutOfRange(u8),
    #[error("Sensor edge interrupt could not be bound: {0:?}")]
    SensorUnavailable(HalError),
    #[error("Time base timer could not be bound: {0:?}")]
    TimerUnavailable(HalError),
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorSeverity {
    /// The request was refused and nothing changed. Retrying with other values is fine.
    EntirelyRecoverable,
    /// The measurement cannot run until the platform resource problem is fixed.
    CompleteFailure,
}

impl TachometerError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TachometerError::SamplePeriodTooShort(_)
            | TachometerError::FilterAlphaOutOfRange(_)
            | TachometerError::WindowSizeOutOfRange(_) => ErrorSeverity::EntirelyRecoverable,
            TachometerError::SensorUnavailable(_) | TachometerError::TimerUnavailable(_) => {
                ErrorSeverity::CompleteFailure
            }
        }
    }
}
