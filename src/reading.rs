use core::fmt::{Debug, Formatter};

/// One consistent set of measurement outputs, all taken under the same critical section.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    pub frequency_hz: u32,
    pub rpm: u32,
    /// `None` while filtering is disabled.
    pub filtered_frequency_hz: Option<u32>,
    pub filtered_rpm: Option<u32>,
    pub total_revolutions: u32,
    pub pulses_this_period: u32,
    pub pulse_interval_us: u32,
}

impl Debug for Reading {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "Reading: {} Hz, {} rpm, filtered: {:?} Hz / {:?} rpm, revolutions: {}, pulses: {}, interval: {} us",
               self.frequency_hz, self.rpm, self.filtered_frequency_hz, self.filtered_rpm,
               self.total_revolutions, self.pulses_this_period, self.pulse_interval_us)
    }
}
