use crate::platform::{HalError, PeriodicTimer, TickHandler};

/// Periodic callback timer run from software.
///
/// Call [`poll`](Self::poll) often, with a millisecond timestamp. Deadlines advance by whole
/// periods so a late poll does not shift the phase of later ticks.
pub struct SoftwareTimer<'a> {
    period_ms: u16,
    /// `None` right after (re)start, armed by the next poll.
    deadline_ms: Option<u32>,
    running: bool,
    handler: Option<&'a dyn TickHandler>,
}

impl<'a> SoftwareTimer<'a> {
    pub const fn new() -> Self {
        Self {
            period_ms: 0,
            deadline_ms: None,
            running: false,
            handler: None,
        }
    }

    pub fn period_ms(&self) -> u16 {
        self.period_ms
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Fires the handler at most once. Returns whether it fired.
    pub fn poll(&mut self, now_ms: u32) -> bool {
        if !self.running {
            return false;
        }
        let Some(handler) = self.handler else {
            return false;
        };
        let Some(deadline) = self.deadline_ms else {
            self.deadline_ms = Some(now_ms.wrapping_add(u32::from(self.period_ms)));
            return false;
        };
        // signed distance handles the u32 millisecond wrap
        if (now_ms.wrapping_sub(deadline) as i32) < 0 {
            return false;
        }
        self.deadline_ms = Some(deadline.wrapping_add(u32::from(self.period_ms)));
        handler.on_tick();
        true
    }
}

impl<'a> Default for SoftwareTimer<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> PeriodicTimer<'a> for SoftwareTimer<'a> {
    fn start(&mut self, period_ms: u16, handler: &'a dyn TickHandler) -> Result<(), HalError> {
        if self.running {
            return Err(HalError::AlreadyBound);
        }
        self.period_ms = period_ms;
        self.deadline_ms = None;
        self.handler = Some(handler);
        self.running = true;
        Ok(())
    }

    fn set_period(&mut self, period_ms: u16) -> Result<(), HalError> {
        self.period_ms = period_ms;
        self.deadline_ms = None;
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
        self.deadline_ms = None;
        self.handler = None;
    }
}
