use crate::platform::{HalError, PeriodicTimer, TickHandler};

/// Highest interrupt priority, the time base should not wait behind other timers.
const TIME_BASE_PRIORITY: u8 = 0;

/// Interval timer peripheral working in microseconds.
pub trait IntervalPeripheral {
    /// Starts the periodic interrupt. Returns false if no hardware channel is free.
    fn begin(&mut self, period_us: u32) -> bool;

    fn update(&mut self, period_us: u32);

    fn end(&mut self);

    fn set_priority(&mut self, priority: u8);
}

pub struct IntervalTimer<'a, P> {
    peripheral: P,
    handler: Option<&'a dyn TickHandler>,
}

impl<'a, P: IntervalPeripheral> IntervalTimer<'a, P> {
    pub fn new(peripheral: P) -> Self {
        Self {
            peripheral,
            handler: None,
        }
    }

    pub fn peripheral(&self) -> &P {
        &self.peripheral
    }

    /// Call from the peripheral's interrupt.
    pub fn fire(&self) {
        if let Some(handler) = self.handler {
            handler.on_tick();
        }
    }
}

fn period_micros(period_ms: u16) -> u32 {
    u32::from(period_ms) * 1000
}

impl<'a, P: IntervalPeripheral> PeriodicTimer<'a> for IntervalTimer<'a, P> {
    fn start(&mut self, period_ms: u16, handler: &'a dyn TickHandler) -> Result<(), HalError> {
        if !self.peripheral.begin(period_micros(period_ms)) {
            return Err(HalError::TimerUnavailable);
        }
        self.peripheral.set_priority(TIME_BASE_PRIORITY);
        self.handler = Some(handler);
        Ok(())
    }

    fn set_period(&mut self, period_ms: u16) -> Result<(), HalError> {
        self.peripheral.update(period_micros(period_ms));
        Ok(())
    }

    fn stop(&mut self) {
        self.peripheral.end();
        self.handler = None;
    }
}
