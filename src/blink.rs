/*
 * The blink task: shows the measured distance as a blink rate.
 *
 * Each cycle copies the latest reading out of the shared store, picks a band
 * and drives a square wave whose half-period belongs to that band. Closer
 * objects blink faster. While the mode is inactive the band is always `Idle`,
 * so "armed but not measuring" looks different from any distance.
 */

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Timer};
use embedded_hal::digital::OutputPin;
use enum_ordinalize::Ordinalize;

use crate::config::Config;
use crate::sync::{ModeSignal, Reading, SharedReading};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Ordinalize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(usize)]
pub enum BlinkBand {
    Near,
    Medium,
    Far,
    // Not measuring, regardless of the last distance.
    Idle,
}

impl BlinkBand {
    /// Readings without an echo count as far: nothing is in range.
    pub fn classify(reading: &Reading, active: bool, config: &Config) -> Self {
        if !active {
            return BlinkBand::Idle;
        }
        if !reading.valid {
            return BlinkBand::Far;
        }

        if reading.distance_cm < config.near_threshold_cm {
            BlinkBand::Near
        } else if reading.distance_cm < config.medium_threshold_cm {
            BlinkBand::Medium
        } else {
            BlinkBand::Far
        }
    }
}

pub fn half_period(reading: &Reading, active: bool, config: &Config) -> Duration {
    config.half_period(BlinkBand::classify(reading, active, config))
}

pub struct BlinkActuator<'a, M: RawMutex, L, const N: usize> {
    line: L,
    reading: &'a SharedReading<M>,
    mode: &'a ModeSignal<M, N>,
    config: &'a Config,
    last: Reading,
}

impl<'a, M, L, const N: usize> BlinkActuator<'a, M, L, N>
where
    M: RawMutex,
    L: OutputPin,
{
    pub fn new(
        line: L,
        reading: &'a SharedReading<M>,
        mode: &'a ModeSignal<M, N>,
        config: &'a Config,
    ) -> Self {
        BlinkActuator {
            line,
            reading,
            mode,
            config,
            last: Reading::INITIAL,
        }
    }

    /// The copy the next cycle will be based on.
    pub fn last_reading(&self) -> Reading {
        self.last
    }

    /// Drive one full high/low cycle and return the half-period used.
    ///
    /// If the shared reading is locked for longer than the read timeout the
    /// previous copy is reused.
    pub async fn step(&mut self) -> Duration {
        if let Some(reading) = self.reading.read().await {
            self.last = reading;
        }

        let half = half_period(&self.last, self.mode.is_set(), self.config);

        if self.line.set_high().is_err() {
            warn!("blink line write failed");
        }
        Timer::after(half).await;
        if self.line.set_low().is_err() {
            warn!("blink line write failed");
        }
        Timer::after(half).await;

        half
    }

    pub async fn run(mut self) -> ! {
        info!("blink task started");
        loop {
            self.step().await;
        }
    }
}
