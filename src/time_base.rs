use crate::config::Config;
use crate::filter::DigitalFilter;

/// Output of one sample period, rewritten on every timer tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SampleResult {
    pub raw_frequency_hz: u32,
    pub raw_rpm: u32,
    pub pulses_this_period: u32,
    /// Lifetime count, only lowered by an explicit reset.
    pub total_revolutions: u32,
}

/// Pulses counted over `period_ms` as whole hertz. Truncates, no rounding.
pub fn frequency_from_pulses(pulses: u32, period_ms: u16) -> u32 {
    if period_ms == 0 {
        return 0;
    }
    let hz = u64::from(pulses) * 1000 / u64::from(period_ms);
    hz.min(u64::from(u32::MAX)) as u32
}

pub fn rpm_from_frequency(frequency_hz: u32, pulses_per_revolution: u8) -> u32 {
    if pulses_per_revolution == 0 {
        return 0;
    }
    let rpm = u64::from(frequency_hz) * 60 / u64::from(pulses_per_revolution);
    rpm.min(u64::from(u32::MAX)) as u32
}

/// Periodic side of the measurement. Owns the filter, which only ever runs from here.
pub struct TimeBase {
    result: SampleResult,
    filter: DigitalFilter,
}

impl TimeBase {
    pub fn new() -> Self {
        Self {
            result: SampleResult::default(),
            filter: DigitalFilter::new(),
        }
    }

    /// Turns the pulses drained for one period into frequency, RPM and revolutions.
    pub fn tick(&mut self, pulses: u32, config: &Config) -> SampleResult {
        let pulses_per_revolution = config.pulses_per_revolution();

        self.result.pulses_this_period = pulses;
        self.result.raw_frequency_hz = frequency_from_pulses(pulses, config.sample_period_ms());
        self.result.raw_rpm = rpm_from_frequency(self.result.raw_frequency_hz, pulses_per_revolution);

        if config.filter_enabled() {
            self.filter
                .apply(self.result.raw_frequency_hz, self.result.raw_rpm, config);
        }

        if pulses_per_revolution > 0 {
            // a partial revolution left over in this period is dropped, not carried
            self.result.total_revolutions = self
                .result
                .total_revolutions
                .saturating_add(pulses / u32::from(pulses_per_revolution));
        }

        self.result
    }

    pub fn result(&self) -> &SampleResult {
        &self.result
    }

    pub fn filter(&self) -> &DigitalFilter {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut DigitalFilter {
        &mut self.filter
    }

    pub fn reset(&mut self) {
        self.result = SampleResult::default();
        self.filter.reset();
    }

    pub fn reset_revolutions(&mut self) {
        self.result.pulses_this_period = 0;
        self.result.total_revolutions = 0;
    }

    /// Restarts the filter from the latest raw sample instead of from zero.
    pub fn reset_filter(&mut self) {
        self.filter
            .seed(self.result.raw_frequency_hz, self.result.raw_rpm);
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        Self::new()
    }
}
