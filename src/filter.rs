// Integer-only smoothing stage run from the time base: exponential low-pass followed by a
// moving average. RPM is re-derived from the averaged frequency, the two outputs are one pipeline.

use circular_buffer::CircularBuffer;

use crate::config::{Config, ALPHA_SCALE, MAX_WINDOW_SIZE};
use crate::time_base::rpm_from_frequency;

pub const HISTORY_CAPACITY: usize = MAX_WINDOW_SIZE as usize;

pub struct DigitalFilter {
    filtered_frequency_hz: u32,
    filtered_rpm: u32,
    history: CircularBuffer<HISTORY_CAPACITY, u32>,
}

impl DigitalFilter {
    pub fn new() -> Self {
        Self {
            filtered_frequency_hz: 0,
            filtered_rpm: 0,
            history: CircularBuffer::new(),
        }
    }

    pub fn apply(&mut self, raw_frequency_hz: u32, raw_rpm: u32, config: &Config) {
        let alpha = config.filter_alpha();
        self.filtered_frequency_hz = low_pass(raw_frequency_hz, self.filtered_frequency_hz, alpha);
        self.filtered_rpm = low_pass(raw_rpm, self.filtered_rpm, alpha);

        let window = usize::from(config.window_size());
        if window > 1 {
            // the window may have shrunk since the last sample
            while self.history.len() >= window {
                self.history.pop_front();
            }
            self.history.push_back(self.filtered_frequency_hz);

            let sum: u64 = self.history.iter().map(|&f| u64::from(f)).sum();
            self.filtered_frequency_hz = (sum / self.history.len() as u64) as u32;
            self.filtered_rpm = rpm_from_frequency(self.filtered_frequency_hz, config.pulses_per_revolution());
        }
    }

    /// Drops the moving-average history and restarts both outputs from the given values.
    pub fn seed(&mut self, frequency_hz: u32, rpm: u32) {
        self.filtered_frequency_hz = frequency_hz;
        self.filtered_rpm = rpm;
        self.history.clear();
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn reset(&mut self) {
        self.seed(0, 0);
    }

    pub fn filtered_frequency_hz(&self) -> u32 {
        self.filtered_frequency_hz
    }

    pub fn filtered_rpm(&self) -> u32 {
        self.filtered_rpm
    }

    /// Number of samples currently averaged, never more than the configured window.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

impl Default for DigitalFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// `alpha * sample + (1 - alpha) * previous` with alpha in thousandths, truncated.
pub fn low_pass(sample: u32, previous: u32, alpha: u16) -> u32 {
    let alpha = u64::from(alpha.min(ALPHA_SCALE));
    let scale = u64::from(ALPHA_SCALE);
    let mixed = (alpha * u64::from(sample) + (scale - alpha) * u64::from(previous)) / scale;
    mixed as u32
}
