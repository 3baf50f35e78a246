use crate::errors::TachometerError;

pub const MIN_SAMPLE_PERIOD_MS: u16 = 100;
/// Fixed-point scale of the low-pass coefficient. An alpha of `ALPHA_SCALE` means no smoothing.
pub const ALPHA_SCALE: u16 = 1000;
pub const MAX_WINDOW_SIZE: u8 = 20;

const DEFAULT_SAMPLE_PERIOD_MS: u16 = 1000;
const DEFAULT_DEBOUNCE_MICROS: u16 = 100;
const DEFAULT_PULSES_PER_REV: u8 = 1;
const DEFAULT_FILTER_ALPHA: u16 = 800; // 0.8
const DEFAULT_WINDOW_SIZE: u8 = 5;

/// Operating parameters shared by both interrupt handlers.
///
/// A `Config` only comes out of [`ConfigBuilder::build`], which clamps every field into range,
/// so the handlers never see an invalid value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    sample_period_ms: u16,
    debounce_micros: u16,
    /// 0 selects frequency-only mode: every RPM output stays at 0.
    pulses_per_revolution: u8,
    filter_enabled: bool,
    filter_alpha: u16,
    window_size: u8,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn sample_period_ms(&self) -> u16 {
        self.sample_period_ms
    }

    pub fn debounce_micros(&self) -> u16 {
        self.debounce_micros
    }

    pub fn pulses_per_revolution(&self) -> u8 {
        self.pulses_per_revolution
    }

    pub fn filter_enabled(&self) -> bool {
        self.filter_enabled
    }

    pub fn filter_alpha(&self) -> u16 {
        self.filter_alpha
    }

    pub fn window_size(&self) -> u8 {
        self.window_size
    }

    pub(crate) fn set_sample_period(&mut self, period_ms: u16) -> Result<(), TachometerError> {
        self.sample_period_ms = validate_sample_period(period_ms)?;
        Ok(())
    }

    /// Copy of `self` running at the sample period of `other`.
    pub(crate) fn with_sample_period_of(mut self, other: &Config) -> Config {
        self.sample_period_ms = other.sample_period_ms;
        self
    }

    pub(crate) fn set_debounce_micros(&mut self, debounce_micros: u16) {
        self.debounce_micros = debounce_micros;
    }

    pub(crate) fn set_filter_enabled(&mut self, enabled: bool) {
        self.filter_enabled = enabled;
    }

    pub(crate) fn set_filter_parameters(&mut self, alpha: u16, window_size: u8) -> Result<(), TachometerError> {
        validate_filter_parameters(alpha, window_size)?;
        self.filter_alpha = alpha;
        self.window_size = window_size;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        ConfigBuilder::new().build()
    }
}

pub fn validate_sample_period(period_ms: u16) -> Result<u16, TachometerError> {
    if period_ms < MIN_SAMPLE_PERIOD_MS {
        return Err(TachometerError::SamplePeriodTooShort(period_ms));
    }
    Ok(period_ms)
}

pub fn validate_filter_parameters(alpha: u16, window_size: u8) -> Result<(), TachometerError> {
    if alpha > ALPHA_SCALE {
        return Err(TachometerError::FilterAlphaOutOfRange(alpha));
    }
    if window_size < 1 || window_size > MAX_WINDOW_SIZE {
        return Err(TachometerError::WindowSizeOutOfRange(window_size));
    }
    Ok(())
}

pub struct ConfigBuilder {
    sample_period_ms: u16,
    debounce_micros: u16,
    pulses_per_revolution: u8,
    filter_enabled: bool,
    filter_alpha: u16,
    window_size: u8,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            sample_period_ms: DEFAULT_SAMPLE_PERIOD_MS,
            debounce_micros: DEFAULT_DEBOUNCE_MICROS,
            pulses_per_revolution: DEFAULT_PULSES_PER_REV,
            filter_enabled: false,
            filter_alpha: DEFAULT_FILTER_ALPHA,
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }

    pub fn set_sample_period_ms(mut self, period_ms: u16) -> Self {
        self.sample_period_ms = period_ms;
        self
    }

    pub fn set_debounce_micros(mut self, debounce_micros: u16) -> Self {
        self.debounce_micros = debounce_micros;
        self
    }

    pub fn set_pulses_per_revolution(mut self, pulses: u8) -> Self {
        self.pulses_per_revolution = pulses;
        self
    }

    pub fn set_filtering(mut self, enabled: bool) -> Self {
        self.filter_enabled = enabled;
        self
    }

    pub fn set_filter_alpha(mut self, alpha: u16) -> Self {
        self.filter_alpha = alpha;
        self
    }

    pub fn set_window_size(mut self, window_size: u8) -> Self {
        self.window_size = window_size;
        self
    }

    /// Out of range values are replaced here rather than rejected, there is nobody to report
    /// a failed construction to.
    pub fn build(self) -> Config {
        let mut sample_period_ms = self.sample_period_ms;
        if sample_period_ms < MIN_SAMPLE_PERIOD_MS {
            warn!("Sample period {}ms raised to the {}ms minimum", sample_period_ms, MIN_SAMPLE_PERIOD_MS);
            sample_period_ms = MIN_SAMPLE_PERIOD_MS;
        }

        let mut filter_alpha = self.filter_alpha;
        if filter_alpha > ALPHA_SCALE {
            warn!("Filter alpha {} capped to {}", filter_alpha, ALPHA_SCALE);
            filter_alpha = ALPHA_SCALE;
        }

        let mut window_size = self.window_size;
        if window_size < 1 || window_size > MAX_WINDOW_SIZE {
            warn!("Window size {} out of range, using {}", window_size, DEFAULT_WINDOW_SIZE);
            window_size = DEFAULT_WINDOW_SIZE;
        }

        Config {
            sample_period_ms,
            debounce_micros: self.debounce_micros,
            pulses_per_revolution: self.pulses_per_revolution,
            filter_enabled: self.filter_enabled,
            filter_alpha,
            window_size,
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
