//! The measurement object tying capture, time base and filter to the platform.
//!
//! ```text
//! sensor edge -> on_pulse_edge  (debounce, count)
//! timer tick  -> on_timer_tick  (drain, Hz/rpm, filter, revolutions, new-data flag)
//! foreground  -> getters / setters / resets, all through AtomicChannel
//! ```
//!
//! There is no global instance. [`Tachometer::initialize`] hands `&self` to the sensor input and
//! the timer as their callbacks, so any number of instances can run on different pins and
//! timers. The instance has to outlive those bindings, which on target usually means a
//! `static_cell::StaticCell`.

use core::marker::PhantomData;

use portable_atomic::{AtomicBool, Ordering};

use crate::channel::AtomicChannel;
use crate::config::{validate_filter_parameters, validate_sample_period, Config};
use crate::errors::TachometerError;
use crate::platform::{EdgeHandler, MicrosClock, PeriodicTimer, SensorInput, TickHandler};
use crate::pulse_capture::PulseCapture;
use crate::reading::Reading;
use crate::time_base::TimeBase;

pub struct Tachometer<'a, C, S, T> {
    clock: C,
    sensor: AtomicChannel<S>,
    timer: AtomicChannel<T>,
    config: AtomicChannel<Config>,
    /// What `reset_system` goes back to.
    initial_config: Config,
    capture: AtomicChannel<PulseCapture>,
    time_base: AtomicChannel<TimeBase>,
    new_data: AtomicBool,
    initialized: AtomicBool,
    _bindings: PhantomData<&'a ()>,
}

impl<'a, C, S, T> Tachometer<'a, C, S, T>
where
    C: MicrosClock + Sync + 'a,
    S: SensorInput<'a> + Send + 'a,
    T: PeriodicTimer<'a> + Send + 'a,
{
    pub fn new(config: Config, clock: C, sensor: S, timer: T) -> Self {
        Self {
            clock,
            sensor: AtomicChannel::new(sensor),
            timer: AtomicChannel::new(timer),
            config: AtomicChannel::new(config),
            initial_config: config,
            capture: AtomicChannel::new(PulseCapture::new()),
            time_base: AtomicChannel::new(TimeBase::new()),
            new_data: AtomicBool::new(false),
            initialized: AtomicBool::new(false),
            _bindings: PhantomData,
        }
    }

    /// Arms the sensor interrupt and starts the time base.
    ///
    /// Calling it again once armed does nothing. If either resource cannot be bound, nothing
    /// stays bound and the instance remains unarmed.
    pub fn initialize(&'a self) -> Result<(), TachometerError> {
        if self.initialized.load(Ordering::Acquire) {
            info!("Tachometer already initialized");
            return Ok(());
        }

        let period_ms = self.config.read().sample_period_ms();
        let edge_handler: &'a dyn EdgeHandler = self;
        let tick_handler: &'a dyn TickHandler = self;

        self.sensor
            .lock(|sensor| sensor.configure_pull_up())
            .map_err(|e| {
                error!("Sensor pin setup failed: {}", e);
                TachometerError::SensorUnavailable(e)
            })?;

        self.timer
            .lock(|timer| timer.start(period_ms, tick_handler))
            .map_err(|e| {
                error!("Time base timer could not be started: {}", e);
                TachometerError::TimerUnavailable(e)
            })?;

        if let Err(e) = self.sensor.lock(|sensor| sensor.attach_rising_edge(edge_handler)) {
            self.timer.lock(|timer| timer.stop());
            error!("Sensor edge interrupt could not be attached: {}", e);
            return Err(TachometerError::SensorUnavailable(e));
        }

        self.initialized.store(true, Ordering::Release);
        info!("Tachometer armed, sampling every {}ms", period_ms);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Edge interrupt entry point.
    pub fn on_pulse_edge(&self) {
        let now_us = self.clock.now_micros();
        critical_section::with(|cs| {
            let debounce_us = self.config.read_in(cs).debounce_micros();
            self.capture
                .lock_in(cs, |capture| capture.on_edge(now_us, debounce_us));
        });
    }

    /// Timer interrupt entry point, once per sample period.
    pub fn on_timer_tick(&self) {
        let result = critical_section::with(|cs| {
            let pulses = self.capture.lock_in(cs, PulseCapture::drain);
            let config = self.config.read_in(cs);
            self.time_base.lock_in(cs, |base| base.tick(pulses, &config))
        });
        self.new_data.store(true, Ordering::Release);
        trace!("{} pulses -> {} Hz, {} rpm", result.pulses_this_period, result.raw_frequency_hz, result.raw_rpm);
    }

    pub fn current_frequency_hz(&self) -> u32 {
        self.time_base.lock(|base| base.result().raw_frequency_hz)
    }

    pub fn current_rpm(&self) -> u32 {
        self.time_base.lock(|base| base.result().raw_rpm)
    }

    /// 0 while filtering is disabled, even though the filter keeps its state.
    pub fn filtered_frequency_hz(&self) -> u32 {
        self.filtered(|base| base.filter().filtered_frequency_hz())
    }

    /// 0 while filtering is disabled, even though the filter keeps its state.
    pub fn filtered_rpm(&self) -> u32 {
        self.filtered(|base| base.filter().filtered_rpm())
    }

    fn filtered(&self, f: impl FnOnce(&mut TimeBase) -> u32) -> u32 {
        critical_section::with(|cs| {
            if !self.config.read_in(cs).filter_enabled() {
                return 0;
            }
            self.time_base.lock_in(cs, f)
        })
    }

    pub fn total_revolutions(&self) -> u32 {
        self.time_base.lock(|base| base.result().total_revolutions)
    }

    /// Pulses counted during the last complete sample period.
    pub fn raw_pulse_count(&self) -> u32 {
        self.time_base.lock(|base| base.result().pulses_this_period)
    }

    pub fn pulse_interval_micros(&self) -> u32 {
        self.capture.lock(|capture| capture.pulse_interval_us())
    }

    /// True once per completed sample period; reading it clears it.
    pub fn is_new_data_available(&self) -> bool {
        self.new_data.swap(false, Ordering::AcqRel)
    }

    /// All outputs at once, without a timer tick landing between the individual reads.
    pub fn reading(&self) -> Reading {
        critical_section::with(|cs| {
            let filter_enabled = self.config.read_in(cs).filter_enabled();
            let pulse_interval_us = self.capture.lock_in(cs, |capture| capture.pulse_interval_us());
            self.time_base.lock_in(cs, |base| {
                let result = base.result();
                let filter = base.filter();
                Reading {
                    frequency_hz: result.raw_frequency_hz,
                    rpm: result.raw_rpm,
                    filtered_frequency_hz: filter_enabled.then(|| filter.filtered_frequency_hz()),
                    filtered_rpm: filter_enabled.then(|| filter.filtered_rpm()),
                    total_revolutions: result.total_revolutions,
                    pulses_this_period: result.pulses_this_period,
                    pulse_interval_us,
                }
            })
        })
    }

    pub fn config(&self) -> Config {
        self.config.read()
    }

    /// Zeroes every measurement: pulses, timestamps, frequency, RPM, revolutions and the filter.
    pub fn reset_counters(&self) {
        critical_section::with(|cs| {
            self.capture.lock_in(cs, PulseCapture::reset);
            self.time_base.lock_in(cs, TimeBase::reset);
            self.new_data.store(false, Ordering::Release);
        });
        debug!("Counters reset");
    }

    /// Restarts smoothing from the latest raw sample. Revolutions are untouched.
    pub fn reset_filters(&self) {
        self.time_base.lock(TimeBase::reset_filter);
        debug!("Filters reset");
    }

    /// Zeroes pulse and revolution counts. Filter state and edge timing are untouched.
    pub fn reset_revolution_counters(&self) {
        critical_section::with(|cs| {
            self.capture.lock_in(cs, PulseCapture::clear_count);
            self.time_base.lock_in(cs, TimeBase::reset_revolutions);
            self.new_data.store(false, Ordering::Release);
        });
        debug!("Revolution counters reset");
    }

    /// Everything [`reset_counters`](Self::reset_counters) does, plus going back to the
    /// configuration the instance was built with.
    ///
    /// If the timer refuses the original period, the running period is kept so the
    /// configuration keeps describing what the hardware does.
    pub fn reset_system(&self) {
        let initial = self.initial_config;
        let armed = self.is_initialized();
        critical_section::with(|cs| {
            self.capture.lock_in(cs, PulseCapture::reset);
            self.time_base.lock_in(cs, TimeBase::reset);
            self.new_data.store(false, Ordering::Release);

            let current = self.config.read_in(cs);
            let mut restored = initial;
            if armed && current.sample_period_ms() != initial.sample_period_ms() {
                if let Err(e) = self
                    .timer
                    .lock_in(cs, |timer| timer.set_period(initial.sample_period_ms()))
                {
                    warn!("Timer period could not be restored, keeping {}ms: {}", current.sample_period_ms(), e);
                    restored = restored.with_sample_period_of(&current);
                }
            }
            self.config.lock_in(cs, |config| *config = restored);
        });
        debug!("System reset to initial configuration");
    }

    /// Rejects periods under 100ms, leaving the old period running.
    pub fn set_sample_period(&self, period_ms: u16) -> Result<(), TachometerError> {
        let period_ms = validate_sample_period(period_ms).map_err(|e| {
            warn!("Rejected sample period: {}", e);
            e
        })?;
        let armed = self.is_initialized();
        critical_section::with(|cs| -> Result<(), TachometerError> {
            if armed {
                self.timer
                    .lock_in(cs, |timer| timer.set_period(period_ms))
                    .map_err(TachometerError::TimerUnavailable)?;
            }
            self.config
                .lock_in(cs, |config| config.set_sample_period(period_ms))
        })?;
        debug!("Sample period set to {}ms", period_ms);
        Ok(())
    }

    pub fn set_debounce_time(&self, debounce_micros: u16) {
        self.config
            .lock(|config| config.set_debounce_micros(debounce_micros));
    }

    /// Disabling hides the filtered outputs but keeps the filter history as it is.
    pub fn set_filtering_enabled(&self, enabled: bool) {
        self.config.lock(|config| config.set_filter_enabled(enabled));
    }

    /// Alpha in thousandths (1000 = no smoothing), window in 1..=20. A new window starts
    /// with an empty history.
    pub fn set_filter_parameters(&self, alpha: u16, window_size: u8) -> Result<(), TachometerError> {
        validate_filter_parameters(alpha, window_size).map_err(|e| {
            warn!("Rejected filter parameters: {}", e);
            e
        })?;
        critical_section::with(|cs| -> Result<(), TachometerError> {
            self.config
                .lock_in(cs, |config| config.set_filter_parameters(alpha, window_size))?;
            self.time_base
                .lock_in(cs, |base| base.filter_mut().clear_history());
            Ok(())
        })
    }

    /// Scoped access to the timer, e.g. to poll a [`SoftwareTimer`](crate::timers::SoftwareTimer)
    /// or to forward a hardware vector to it.
    pub fn with_timer<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.timer.lock(f)
    }

    pub fn with_sensor<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        self.sensor.lock(f)
    }
}

impl<'a, C, S, T> EdgeHandler for Tachometer<'a, C, S, T>
where
    C: MicrosClock + Sync + 'a,
    S: SensorInput<'a> + Send + 'a,
    T: PeriodicTimer<'a> + Send + 'a,
{
    fn on_edge(&self) {
        self.on_pulse_edge();
    }
}

impl<'a, C, S, T> TickHandler for Tachometer<'a, C, S, T>
where
    C: MicrosClock + Sync + 'a,
    S: SensorInput<'a> + Send + 'a,
    T: PeriodicTimer<'a> + Send + 'a,
{
    fn on_tick(&self) {
        self.on_timer_tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::HalError;
    use crate::timers::SoftwareTimer;
    use portable_atomic::AtomicU32;

    struct MockClock(AtomicU32);

    impl MockClock {
        fn new(start_us: u32) -> Self {
            MockClock(AtomicU32::new(start_us))
        }

        fn advance(&self, us: u32) {
            self.0.fetch_add(us, Ordering::Relaxed);
        }
    }

    impl MicrosClock for MockClock {
        fn now_micros(&self) -> u32 {
            self.0.load(Ordering::Relaxed)
        }
    }

    struct MockSensor<'a> {
        interrupt_capable: bool,
        pull_up: bool,
        handler: Option<&'a dyn EdgeHandler>,
    }

    impl<'a> MockSensor<'a> {
        fn new(interrupt_capable: bool) -> Self {
            MockSensor {
                interrupt_capable,
                pull_up: false,
                handler: None,
            }
        }

        fn fire(&self) {
            if let Some(handler) = self.handler {
                handler.on_edge();
            }
        }
    }

    impl<'a> SensorInput<'a> for MockSensor<'a> {
        fn configure_pull_up(&mut self) -> Result<(), HalError> {
            self.pull_up = true;
            Ok(())
        }

        fn attach_rising_edge(&mut self, handler: &'a dyn EdgeHandler) -> Result<(), HalError> {
            if !self.interrupt_capable {
                return Err(HalError::PinNotInterruptCapable);
            }
            self.handler = Some(handler);
            Ok(())
        }

        fn detach(&mut self) {
            self.handler = None;
        }
    }

    type TestTachometer<'a> = Tachometer<'a, &'a MockClock, MockSensor<'a>, SoftwareTimer<'a>>;

    fn tachometer<'a>(clock: &'a MockClock, config: Config) -> TestTachometer<'a> {
        Tachometer::new(config, clock, MockSensor::new(true), SoftwareTimer::new())
    }

    /// Software timer that can be told to refuse requests.
    #[derive(Default)]
    struct FlakyTimer<'a> {
        inner: SoftwareTimer<'a>,
        refuse_start: bool,
        refuse_period: bool,
    }

    impl<'a> PeriodicTimer<'a> for FlakyTimer<'a> {
        fn start(&mut self, period_ms: u16, handler: &'a dyn TickHandler) -> Result<(), HalError> {
            if self.refuse_start {
                return Err(HalError::TimerUnavailable);
            }
            self.inner.start(period_ms, handler)
        }

        fn set_period(&mut self, period_ms: u16) -> Result<(), HalError> {
            if self.refuse_period {
                return Err(HalError::TimerUnavailable);
            }
            self.inner.set_period(period_ms)
        }

        fn stop(&mut self) {
            self.inner.stop();
        }
    }

    fn config_1s() -> Config {
        Config::builder()
            .set_sample_period_ms(1000)
            .set_pulses_per_revolution(1)
            .set_debounce_micros(0)
            .build()
    }

    fn pulse(tach: &TestTachometer<'_>, clock: &MockClock, gap_us: u32) {
        clock.advance(gap_us);
        tach.with_sensor(|sensor| sensor.fire());
    }

    /// First call arms the software timer, later ones fire it once the period is up.
    fn tick(tach: &TestTachometer<'_>, now_ms: u32) -> bool {
        tach.with_timer(|timer| timer.poll(now_ms))
    }

    #[test]
    fn end_to_end_one_period() {
        let clock = MockClock::new(1_000);
        let tach = tachometer(&clock, config_1s());
        tach.initialize().unwrap();
        tick(&tach, 0);

        for _ in 0..120 {
            pulse(&tach, &clock, 5_000);
        }
        assert!(tick(&tach, 1000));

        assert_eq!(tach.current_frequency_hz(), 120);
        assert_eq!(tach.current_rpm(), 7_200);
        assert_eq!(tach.total_revolutions(), 120);
        assert_eq!(tach.raw_pulse_count(), 120);
        assert_eq!(tach.pulse_interval_micros(), 5_000);

        for _ in 0..30 {
            pulse(&tach, &clock, 5_000);
        }
        assert!(tick(&tach, 2000));
        assert_eq!(tach.current_frequency_hz(), 30);
        assert_eq!(tach.total_revolutions(), 150);
    }

    #[test]
    fn initialize_binds_once() {
        let clock = MockClock::new(0);
        let tach = tachometer(&clock, config_1s());
        assert!(!tach.is_initialized());
        assert_eq!(tach.initialize(), Ok(()));
        assert!(tach.is_initialized());
        // a second start on the software timer would fail, so this proves the no-op
        assert_eq!(tach.initialize(), Ok(()));
        assert!(tach.with_sensor(|sensor| sensor.pull_up));
        assert!(tach.with_timer(|timer| timer.is_running()));
    }

    #[test]
    fn initialize_fails_without_interrupt_pin() {
        let clock = MockClock::new(0);
        let tach: TestTachometer<'_> =
            Tachometer::new(config_1s(), &clock, MockSensor::new(false), SoftwareTimer::new());
        assert_eq!(
            tach.initialize(),
            Err(TachometerError::SensorUnavailable(HalError::PinNotInterruptCapable))
        );
        assert!(!tach.is_initialized());
        assert!(!tach.with_timer(|timer| timer.is_running()));
    }

    #[test]
    fn initialize_fails_without_timer() {
        let clock = MockClock::new(0);
        let timer = FlakyTimer {
            refuse_start: true,
            ..Default::default()
        };
        let tach = Tachometer::new(config_1s(), &clock, MockSensor::new(true), timer);
        assert_eq!(
            tach.initialize(),
            Err(TachometerError::TimerUnavailable(HalError::TimerUnavailable))
        );
        assert!(!tach.is_initialized());
        assert!(tach.with_sensor(|sensor| sensor.handler.is_none()));
        assert!(!tach.with_timer(|timer| timer.inner.is_running()));
    }

    #[test]
    fn debounce_change_applies_to_later_edges() {
        let clock = MockClock::new(0);
        let tach = tachometer(&clock, config_1s());
        tach.initialize().unwrap();
        tick(&tach, 0);

        pulse(&tach, &clock, 1_000);
        pulse(&tach, &clock, 300);
        tach.set_debounce_time(500);
        assert_eq!(tach.config().debounce_micros(), 500);
        pulse(&tach, &clock, 300);
        pulse(&tach, &clock, 300);
        tick(&tach, 1000);

        assert_eq!(tach.raw_pulse_count(), 3);
        assert_eq!(tach.pulse_interval_micros(), 600);
    }

    #[test]
    fn debounce_through_facade() {
        let clock = MockClock::new(10_000);
        let config = Config::builder().set_debounce_micros(100).build();
        let tach = tachometer(&clock, config);
        tach.initialize().unwrap();
        tick(&tach, 0);

        pulse(&tach, &clock, 0);
        pulse(&tach, &clock, 50);
        pulse(&tach, &clock, 100);
        tick(&tach, 1000);
        assert_eq!(tach.raw_pulse_count(), 2);
        assert_eq!(tach.pulse_interval_micros(), 150);
    }

    #[test]
    fn first_edge_after_reset_has_no_interval() {
        let clock = MockClock::new(0);
        let tach = tachometer(&clock, config_1s());
        tach.initialize().unwrap();
        pulse(&tach, &clock, 1_000);
        pulse(&tach, &clock, 2_000);
        assert_eq!(tach.pulse_interval_micros(), 2_000);

        tach.reset_counters();
        assert_eq!(tach.pulse_interval_micros(), 0);
        pulse(&tach, &clock, 700);
        assert_eq!(tach.pulse_interval_micros(), 0);
        pulse(&tach, &clock, 300);
        assert_eq!(tach.pulse_interval_micros(), 300);
    }

    #[test]
    fn new_data_is_consumed_once_per_tick() {
        let clock = MockClock::new(0);
        let tach = tachometer(&clock, config_1s());
        tach.initialize().unwrap();
        tick(&tach, 0);
        assert!(!tach.is_new_data_available());

        tick(&tach, 1000);
        assert!(tach.is_new_data_available());
        assert!(!tach.is_new_data_available());

        tick(&tach, 2000);
        assert!(tach.is_new_data_available());
        assert!(!tach.is_new_data_available());
    }

    #[test]
    fn sample_period_validation() {
        let clock = MockClock::new(0);
        let tach = tachometer(&clock, config_1s());
        tach.initialize().unwrap();

        assert_eq!(tach.set_sample_period(50), Err(TachometerError::SamplePeriodTooShort(50)));
        assert_eq!(tach.config().sample_period_ms(), 1000);
        assert_eq!(tach.with_timer(|timer| timer.period_ms()), 1000);

        assert_eq!(tach.set_sample_period(250), Ok(()));
        assert_eq!(tach.config().sample_period_ms(), 250);
        assert_eq!(tach.with_timer(|timer| timer.period_ms()), 250);

        // 3 pulses in 250ms
        tick(&tach, 0);
        for _ in 0..3 {
            pulse(&tach, &clock, 1_000);
        }
        assert!(tick(&tach, 250));
        assert_eq!(tach.current_frequency_hz(), 12);
        assert_eq!(tach.current_rpm(), 720);
    }

    #[test]
    fn sample_period_before_initialize_only_touches_config() {
        let clock = MockClock::new(0);
        let tach = tachometer(&clock, config_1s());
        assert_eq!(tach.set_sample_period(400), Ok(()));
        tach.initialize().unwrap();
        assert_eq!(tach.with_timer(|timer| timer.period_ms()), 400);
    }

    #[test]
    fn filter_parameter_validation() {
        let clock = MockClock::new(0);
        let tach = tachometer(&clock, config_1s());
        assert_eq!(
            tach.set_filter_parameters(1200, 5),
            Err(TachometerError::FilterAlphaOutOfRange(1200))
        );
        assert_eq!(
            tach.set_filter_parameters(500, 21),
            Err(TachometerError::WindowSizeOutOfRange(21))
        );
        assert_eq!(tach.config().filter_alpha(), 800);
        assert_eq!(tach.config().window_size(), 5);

        assert_eq!(tach.set_filter_parameters(1000, 3), Ok(()));
        assert_eq!(tach.config().filter_alpha(), 1000);
        assert_eq!(tach.config().window_size(), 3);
    }

    #[test]
    fn filtered_outputs_hidden_while_disabled() {
        let clock = MockClock::new(0);
        let config = Config::builder()
            .set_debounce_micros(0)
            .set_filtering(true)
            .set_filter_alpha(1000)
            .set_window_size(1)
            .build();
        let tach = tachometer(&clock, config);
        tach.initialize().unwrap();
        tick(&tach, 0);
        for _ in 0..40 {
            pulse(&tach, &clock, 1_000);
        }
        tick(&tach, 1000);
        assert_eq!(tach.filtered_frequency_hz(), 40);
        assert_eq!(tach.filtered_rpm(), 2_400);

        tach.set_filtering_enabled(false);
        assert_eq!(tach.filtered_frequency_hz(), 0);
        assert_eq!(tach.filtered_rpm(), 0);
        assert_eq!(tach.reading().filtered_frequency_hz, None);

        // no filtering happens while disabled, the old state comes back
        for _ in 0..10 {
            pulse(&tach, &clock, 1_000);
        }
        tick(&tach, 2000);
        tach.set_filtering_enabled(true);
        assert_eq!(tach.filtered_frequency_hz(), 40);
        assert_eq!(tach.current_frequency_hz(), 10);
    }

    #[test]
    fn moving_average_resumes_after_reenable() {
        let clock = MockClock::new(0);
        let config = Config::builder()
            .set_debounce_micros(0)
            .set_filtering(true)
            .set_filter_alpha(1000)
            .set_window_size(3)
            .build();
        let tach = tachometer(&clock, config);
        tach.initialize().unwrap();
        tick(&tach, 0);

        for (i, pulses) in [10u32, 20].into_iter().enumerate() {
            for _ in 0..pulses {
                pulse(&tach, &clock, 1_000);
            }
            tick(&tach, 1000 * (i as u32 + 1));
        }
        assert_eq!(tach.filtered_frequency_hz(), 15);

        tach.set_filtering_enabled(false);
        for _ in 0..90 {
            pulse(&tach, &clock, 1_000);
        }
        tick(&tach, 3000);
        assert_eq!(tach.filtered_frequency_hz(), 0);

        tach.set_filtering_enabled(true);
        assert_eq!(tach.filtered_frequency_hz(), 15);
        assert_eq!(tach.time_base.lock(|base| base.filter().history_len()), 2);

        // 10 and 20 are still in the window, the disabled period never entered it
        for _ in 0..30 {
            pulse(&tach, &clock, 1_000);
        }
        tick(&tach, 4000);
        assert_eq!(tach.filtered_frequency_hz(), 20);
        assert_eq!(tach.time_base.lock(|base| base.filter().history_len()), 3);
    }

    #[test]
    fn moving_average_through_facade() {
        let clock = MockClock::new(0);
        let config = Config::builder()
            .set_debounce_micros(0)
            .set_filtering(true)
            .set_filter_alpha(1000)
            .set_window_size(2)
            .build();
        let tach = tachometer(&clock, config);
        tach.initialize().unwrap();
        tick(&tach, 0);

        for (i, pulses) in [10u32, 20, 20].into_iter().enumerate() {
            for _ in 0..pulses {
                pulse(&tach, &clock, 1_000);
            }
            tick(&tach, 1000 * (i as u32 + 1));
            if i == 1 {
                assert_eq!(tach.filtered_frequency_hz(), 15);
                assert_eq!(tach.filtered_rpm(), 900);
            }
        }
        assert_eq!(tach.filtered_frequency_hz(), 20);
    }

    #[test]
    fn resets_do_not_cross_contaminate() {
        let clock = MockClock::new(0);
        let config = Config::builder()
            .set_debounce_micros(0)
            .set_filtering(true)
            .set_filter_alpha(500)
            .set_window_size(1)
            .build();
        let tach = tachometer(&clock, config);
        tach.initialize().unwrap();
        tick(&tach, 0);
        for _ in 0..100 {
            pulse(&tach, &clock, 1_000);
        }
        tick(&tach, 1000);
        assert_eq!(tach.filtered_frequency_hz(), 50);
        assert_eq!(tach.total_revolutions(), 100);

        tach.reset_filters();
        assert_eq!(tach.total_revolutions(), 100);
        assert_eq!(tach.filtered_frequency_hz(), 100);
        assert_eq!(tach.filtered_rpm(), 6_000);

        tach.reset_revolution_counters();
        assert_eq!(tach.total_revolutions(), 0);
        assert_eq!(tach.raw_pulse_count(), 0);
        assert_eq!(tach.filtered_frequency_hz(), 100);
        assert_eq!(tach.current_frequency_hz(), 100);
        assert_eq!(tach.pulse_interval_micros(), 1_000);

        tach.reset_counters();
        assert_eq!(tach.current_frequency_hz(), 0);
        assert_eq!(tach.current_rpm(), 0);
        assert_eq!(tach.filtered_frequency_hz(), 0);
        assert_eq!(tach.pulse_interval_micros(), 0);
        assert_eq!(tach.reading(), Reading {
            filtered_frequency_hz: Some(0),
            filtered_rpm: Some(0),
            ..Reading::default()
        });
    }

    #[test]
    fn resets_clear_pending_new_data() {
        let clock = MockClock::new(0);
        let tach = tachometer(&clock, config_1s());
        tach.initialize().unwrap();
        tick(&tach, 0);
        tick(&tach, 1000);
        tach.reset_revolution_counters();
        assert!(!tach.is_new_data_available());
    }

    #[test]
    fn reset_system_restores_configuration() {
        let clock = MockClock::new(0);
        let tach = tachometer(&clock, config_1s());
        tach.initialize().unwrap();

        tach.set_sample_period(200).unwrap();
        tach.set_debounce_time(900);
        tach.set_filtering_enabled(true);
        tach.set_filter_parameters(100, 10).unwrap();
        tick(&tach, 0);
        pulse(&tach, &clock, 1_000);
        tick(&tach, 200);
        assert_eq!(tach.total_revolutions(), 1);

        tach.reset_system();
        assert_eq!(tach.config(), config_1s());
        assert_eq!(tach.with_timer(|timer| timer.period_ms()), 1000);
        assert_eq!(tach.total_revolutions(), 0);
        assert_eq!(tach.current_frequency_hz(), 0);
        assert!(tach.is_initialized());
    }

    #[test]
    fn refused_timer_change_keeps_running_period() {
        let clock = MockClock::new(0);
        let tach = Tachometer::new(config_1s(), &clock, MockSensor::new(true), FlakyTimer::default());
        tach.initialize().unwrap();
        tach.set_sample_period(200).unwrap();
        tach.set_debounce_time(900);
        tach.with_timer(|timer| timer.refuse_period = true);

        assert_eq!(
            tach.set_sample_period(300),
            Err(TachometerError::TimerUnavailable(HalError::TimerUnavailable))
        );
        assert_eq!(tach.config().sample_period_ms(), 200);

        tach.reset_system();
        assert_eq!(tach.with_timer(|timer| timer.inner.period_ms()), 200);
        assert_eq!(tach.config().sample_period_ms(), 200);
        assert_eq!(tach.config().debounce_micros(), 0);

        // frequency is still computed against the period the timer really runs at
        tach.with_timer(|timer| timer.inner.poll(0));
        for _ in 0..4 {
            clock.advance(1_000);
            tach.with_sensor(|sensor| sensor.fire());
        }
        assert!(tach.with_timer(|timer| timer.inner.poll(200)));
        assert_eq!(tach.current_frequency_hz(), 20);
    }

    #[test]
    fn reading_snapshot() {
        let clock = MockClock::new(0);
        let tach = tachometer(&clock, config_1s());
        tach.initialize().unwrap();
        tick(&tach, 0);
        for _ in 0..6 {
            pulse(&tach, &clock, 2_500);
        }
        tick(&tach, 1000);
        assert_eq!(
            tach.reading(),
            Reading {
                frequency_hz: 6,
                rpm: 360,
                filtered_frequency_hz: None,
                filtered_rpm: None,
                total_revolutions: 6,
                pulses_this_period: 6,
                pulse_interval_us: 2_500,
            }
        );
    }

    #[test]
    fn frequency_only_mode() {
        let clock = MockClock::new(0);
        let config = Config::builder()
            .set_pulses_per_revolution(0)
            .set_debounce_micros(0)
            .build();
        let tach = tachometer(&clock, config);
        tach.initialize().unwrap();
        tick(&tach, 0);
        for _ in 0..9 {
            pulse(&tach, &clock, 1_000);
        }
        tick(&tach, 1000);
        assert_eq!(tach.current_frequency_hz(), 9);
        assert_eq!(tach.current_rpm(), 0);
        assert_eq!(tach.total_revolutions(), 0);
    }
}
