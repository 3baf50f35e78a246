//! Edge-interrupt side of the measurement: debounce and pulse accounting.

/// State written by the edge interrupt and drained by the time base.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PulseCapture {
    pulse_counter: u32,
    /// `None` until the first accepted edge, there is nothing to measure an interval against.
    last_edge_us: Option<u32>,
    previous_edge_us: Option<u32>,
    pulse_interval_us: u32,
}

impl PulseCapture {
    pub const fn new() -> Self {
        Self {
            pulse_counter: 0,
            last_edge_us: None,
            previous_edge_us: None,
            pulse_interval_us: 0,
        }
    }

    /// Registers a rising edge seen at `now_us`. Returns false if it fell inside the debounce
    /// window, in which case nothing changes.
    ///
    /// Runs at interrupt priority: constant time, no loops.
    pub fn on_edge(&mut self, now_us: u32, debounce_us: u16) -> bool {
        if let Some(last) = self.last_edge_us {
            // the microsecond clock wraps every ~71 minutes
            let elapsed = now_us.wrapping_sub(last);
            if elapsed < u32::from(debounce_us) {
                return false;
            }
            self.pulse_interval_us = elapsed;
        }
        self.previous_edge_us = self.last_edge_us;
        self.last_edge_us = Some(now_us);
        self.pulse_counter = self.pulse_counter.wrapping_add(1);
        true
    }

    /// Read-then-zero of the pulse counter. Must run inside the same critical section as the read.
    pub fn drain(&mut self) -> u32 {
        core::mem::take(&mut self.pulse_counter)
    }

    pub fn clear_count(&mut self) {
        self.pulse_counter = 0;
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn pending_pulses(&self) -> u32 {
        self.pulse_counter
    }

    pub fn pulse_interval_us(&self) -> u32 {
        self.pulse_interval_us
    }

    pub fn last_edge_us(&self) -> Option<u32> {
        self.last_edge_us
    }

    pub fn previous_edge_us(&self) -> Option<u32> {
        self.previous_edge_us
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_inside_debounce_count_once() {
        let mut capture = PulseCapture::new();
        assert!(capture.on_edge(10_000, 100));
        assert!(!capture.on_edge(10_099, 100));
        assert_eq!(capture.pending_pulses(), 1);
        assert_eq!(capture.last_edge_us(), Some(10_000));
    }

    #[test]
    fn edges_at_debounce_boundary_count_twice() {
        let mut capture = PulseCapture::new();
        assert!(capture.on_edge(10_000, 100));
        assert!(capture.on_edge(10_100, 100));
        assert_eq!(capture.pending_pulses(), 2);
    }

    #[test]
    fn first_edge_sets_no_interval() {
        let mut capture = PulseCapture::new();
        capture.on_edge(5_000, 0);
        assert_eq!(capture.pulse_interval_us(), 0);
        assert_eq!(capture.previous_edge_us(), None);

        capture.on_edge(7_500, 0);
        assert_eq!(capture.pulse_interval_us(), 2_500);
        assert_eq!(capture.previous_edge_us(), Some(5_000));
        assert_eq!(capture.last_edge_us(), Some(7_500));
    }

    #[test]
    fn first_edge_is_never_debounced() {
        let mut capture = PulseCapture::new();
        assert!(capture.on_edge(3, 1_000));
    }

    #[test]
    fn rejected_edge_keeps_interval() {
        let mut capture = PulseCapture::new();
        capture.on_edge(0, 50);
        capture.on_edge(1_000, 50);
        assert!(!capture.on_edge(1_010, 50));
        assert_eq!(capture.pulse_interval_us(), 1_000);
    }

    #[test]
    fn interval_survives_clock_wrap() {
        let mut capture = PulseCapture::new();
        capture.on_edge(u32::MAX - 99, 100);
        assert!(capture.on_edge(100, 100));
        assert_eq!(capture.pulse_interval_us(), 200);
    }

    #[test]
    fn drain_zeroes_counter_only() {
        let mut capture = PulseCapture::new();
        capture.on_edge(100, 0);
        capture.on_edge(300, 0);
        assert_eq!(capture.drain(), 2);
        assert_eq!(capture.drain(), 0);
        assert_eq!(capture.pulse_interval_us(), 200);
        assert_eq!(capture.last_edge_us(), Some(300));
    }

    #[test]
    fn reset_forgets_reference_edge() {
        let mut capture = PulseCapture::new();
        capture.on_edge(100, 0);
        capture.on_edge(300, 0);
        capture.reset();
        assert_eq!(capture, PulseCapture::new());
        capture.on_edge(900, 0);
        assert_eq!(capture.pulse_interval_us(), 0);
    }
}
