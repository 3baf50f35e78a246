// Board glue: the sensor edge and the time base both run as embassy tasks, which call into
// whatever handler the tachometer bound through `SensorInput` / `PeriodicTimer`.

use core::cell::Cell;

use embassy_futures::select::{select, Either};
use embassy_rp::gpio::{Input, Pull};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Ticker};
use irq_tachometer::{EdgeHandler, HalError, PeriodicTimer, SensorInput, TickHandler};
use portable_atomic::{AtomicBool, AtomicU16, Ordering};

use crate::SensorResources;

static EDGE_HANDLER: Mutex<CriticalSectionRawMutex, Cell<Option<&'static dyn EdgeHandler>>> =
    Mutex::new(Cell::new(None));
static TICK_HANDLER: Mutex<CriticalSectionRawMutex, Cell<Option<&'static dyn TickHandler>>> =
    Mutex::new(Cell::new(None));

/// Pull chosen by the tachometer, sent once the edge handler is in place.
static SENSOR_ARMED: Signal<CriticalSectionRawMutex, Pull> = Signal::new();

/// 0 while stopped.
static TICK_PERIOD_MS: AtomicU16 = AtomicU16::new(0);
static TICK_PERIOD_CHANGED: Signal<CriticalSectionRawMutex, ()> = Signal::new();

static SENSOR_TAKEN: AtomicBool = AtomicBool::new(false);

/// The sensor pin, owned by [`pulse_task`].
pub struct EdgeTaskInput {
    pull: Pull,
}

impl EdgeTaskInput {
    /// Only one instance may exist, the pin belongs to a single task.
    pub fn take() -> Option<Self> {
        if SENSOR_TAKEN.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(Self { pull: Pull::None })
    }
}

impl SensorInput<'static> for EdgeTaskInput {
    fn configure_pull_up(&mut self) -> Result<(), HalError> {
        self.pull = Pull::Up;
        Ok(())
    }

    fn attach_rising_edge(&mut self, handler: &'static dyn EdgeHandler) -> Result<(), HalError> {
        EDGE_HANDLER.lock(|h| h.set(Some(handler)));
        SENSOR_ARMED.signal(self.pull);
        Ok(())
    }

    fn detach(&mut self) {
        EDGE_HANDLER.lock(|h| h.set(None));
    }
}

/// Time base on an embassy `Ticker`, run by [`time_base_task`].
pub struct TickerTimer {
    running: bool,
}

impl TickerTimer {
    pub fn new() -> Self {
        Self { running: false }
    }
}

impl PeriodicTimer<'static> for TickerTimer {
    fn start(&mut self, period_ms: u16, handler: &'static dyn TickHandler) -> Result<(), HalError> {
        if self.running {
            return Err(HalError::AlreadyBound);
        }
        TICK_HANDLER.lock(|h| h.set(Some(handler)));
        self.running = true;
        self.set_period(period_ms)
    }

    fn set_period(&mut self, period_ms: u16) -> Result<(), HalError> {
        TICK_PERIOD_MS.store(period_ms, Ordering::Release);
        TICK_PERIOD_CHANGED.signal(());
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
        TICK_HANDLER.lock(|h| h.set(None));
        TICK_PERIOD_MS.store(0, Ordering::Release);
        TICK_PERIOD_CHANGED.signal(());
    }
}

#[embassy_executor::task]
pub async fn pulse_task(r: SensorResources) {
    let pull = SENSOR_ARMED.wait().await;
    let mut sensor = Input::new(r.sensor_pin, pull);
    defmt::info!("Sensor input armed");
    loop {
        sensor.wait_for_rising_edge().await;
        if let Some(handler) = EDGE_HANDLER.lock(|h| h.get()) {
            handler.on_edge();
        }
    }
}

#[embassy_executor::task]
pub async fn time_base_task() {
    loop {
        let period_ms = TICK_PERIOD_MS.load(Ordering::Acquire);
        if period_ms == 0 {
            TICK_PERIOD_CHANGED.wait().await;
            continue;
        }

        defmt::debug!("Time base running every {}ms", period_ms);
        let mut ticker = Ticker::every(Duration::from_millis(u64::from(period_ms)));
        loop {
            match select(ticker.next(), TICK_PERIOD_CHANGED.wait()).await {
                Either::First(()) => {
                    if let Some(handler) = TICK_HANDLER.lock(|h| h.get()) {
                        handler.on_tick();
                    }
                }
                Either::Second(()) => break,
            }
        }
    }
}
