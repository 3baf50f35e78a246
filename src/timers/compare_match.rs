use crate::platform::{HalError, PeriodicTimer, TickHandler};

pub const PRESCALER: u32 = 1024;

/// 16-bit timers usable as the time base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerChannel {
    Timer1,
    Timer3,
    Timer4,
    Timer5,
}

impl TimerChannel {
    /// Unknown timer numbers fall back to timer 1.
    pub fn from_number(number: u8) -> Self {
        match number {
            1 => TimerChannel::Timer1,
            3 => TimerChannel::Timer3,
            4 => TimerChannel::Timer4,
            5 => TimerChannel::Timer5,
            other => {
                warn!("Timer {} is not supported, using timer 1", other);
                TimerChannel::Timer1
            }
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            TimerChannel::Timer1 => 1,
            TimerChannel::Timer3 => 3,
            TimerChannel::Timer4 => 4,
            TimerChannel::Timer5 => 5,
        }
    }
}

/// Register access for a CTC timer. Implemented by the board on top of its PAC.
pub trait CompareMatchRegisters {
    /// Clear-on-compare mode, prescaler [`PRESCALER`], compare interrupt enabled.
    fn enable_ctc(&mut self, channel: TimerChannel, compare: u16) -> Result<(), HalError>;

    fn set_compare(&mut self, channel: TimerChannel, compare: u16);

    fn disable(&mut self, channel: TimerChannel);
}

/// Compare register value giving one match every `period_ms` at `cpu_hz`.
///
/// `(cpu_hz / 1024) * period_ms / 1000 - 1`, capped at the 16-bit register width. At 16 MHz the
/// cap is hit above ~4.19 s.
pub fn compare_value(cpu_hz: u32, period_ms: u16) -> u16 {
    let ticks = u64::from(cpu_hz / PRESCALER) * u64::from(period_ms) / 1000;
    let compare = ticks.saturating_sub(1);
    if compare > u64::from(u16::MAX) {
        warn!("Period of {}ms does not fit the compare register, capping", period_ms);
        return u16::MAX;
    }
    compare as u16
}

pub struct CompareMatchTimer<'a, R> {
    registers: R,
    channel: TimerChannel,
    cpu_hz: u32,
    handler: Option<&'a dyn TickHandler>,
}

impl<'a, R: CompareMatchRegisters> CompareMatchTimer<'a, R> {
    pub fn new(registers: R, timer_number: u8, cpu_hz: u32) -> Self {
        Self {
            registers,
            channel: TimerChannel::from_number(timer_number),
            cpu_hz,
            handler: None,
        }
    }

    pub fn channel(&self) -> TimerChannel {
        self.channel
    }

    pub fn registers(&self) -> &R {
        &self.registers
    }

    /// Call from the compare-match vector of [`channel`](Self::channel).
    pub fn fire(&self) {
        if let Some(handler) = self.handler {
            handler.on_tick();
        }
    }
}

impl<'a, R: CompareMatchRegisters> PeriodicTimer<'a> for CompareMatchTimer<'a, R> {
    fn start(&mut self, period_ms: u16, handler: &'a dyn TickHandler) -> Result<(), HalError> {
        let compare = compare_value(self.cpu_hz, period_ms);
        self.registers.enable_ctc(self.channel, compare)?;
        self.handler = Some(handler);
        Ok(())
    }

    fn set_period(&mut self, period_ms: u16) -> Result<(), HalError> {
        let compare = compare_value(self.cpu_hz, period_ms);
        self.registers.set_compare(self.channel, compare);
        Ok(())
    }

    fn stop(&mut self) {
        self.registers.disable(self.channel);
        self.handler = None;
    }
}
