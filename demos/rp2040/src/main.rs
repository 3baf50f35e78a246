#![no_std]
#![no_main]
mod freq_counter;

use assign_resources::assign_resources;
use embassy_rp::peripherals;
use embassy_time::{Duration, Timer};
use irq_tachometer::{Config, EmbassyClock, ErrorSeverity, Tachometer};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use crate::freq_counter::{pulse_task, time_base_task, EdgeTaskInput, TickerTimer};

/// the number of pulses that the RPM signal undergoes in a full rotation of the driveshaft
const RPM_PULSES_PER_REV: u8 = 26;

/// above this the signal is noise, not an engine
const MAX_PLAUSIBLE_RPM: u32 = 9_000;

const REPORT_POLL_INTERVAL: Duration = Duration::from_millis(50);

type DemoTachometer = Tachometer<'static, EmbassyClock, EdgeTaskInput, TickerTimer>;

static TACHOMETER: StaticCell<DemoTachometer> = StaticCell::new();

assign_resources! {
    sensor: SensorResources {
        sensor_pin: PIN_16,
    }
}

#[embassy_executor::main]
async fn main(spawner: embassy_executor::Spawner) {
    let p = embassy_rp::init(Default::default());
    let r = split_resources!(p);

    spawner.spawn(pulse_task(r.sensor)).expect("failed to spawn pulse task");
    spawner.spawn(time_base_task()).expect("failed to spawn time base task");

    let config = Config::builder()
        .set_sample_period_ms(500)
        .set_debounce_micros(200)
        .set_pulses_per_revolution(RPM_PULSES_PER_REV)
        .set_filtering(true)
        .set_filter_alpha(600)
        .set_window_size(4)
        .build();

    let sensor = EdgeTaskInput::take().expect("sensor input taken twice");
    let tachometer: &'static DemoTachometer =
        TACHOMETER.init(Tachometer::new(config, EmbassyClock, sensor, TickerTimer::new()));

    if let Err(e) = tachometer.initialize() {
        defmt::error!("Tachometer init failed: {} ({})", e, e.severity());
        if e.severity() == ErrorSeverity::CompleteFailure {
            return;
        }
    }

    loop {
        if tachometer.is_new_data_available() {
            let reading = tachometer.reading();
            if reading.rpm > MAX_PLAUSIBLE_RPM {
                defmt::warn!("Insane RPM value: {}, restarting the filter", reading.rpm);
                tachometer.reset_filters();
            } else {
                defmt::info!("{}", reading);
            }
        }
        Timer::after(REPORT_POLL_INTERVAL).await;
    }
}
