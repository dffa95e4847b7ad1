/*
 * The status task: mirrors the measuring mode on a status line.
 *
 * The mode flag is level-triggered and is cleared by the range sensor without
 * any wake-up, so this task cannot just sleep until the next event. Every
 * iteration samples the flag and drives the line first. While inactive it then
 * waits for "set" for at most one poll interval, while active it sleeps one
 * interval. A transition in either direction shows up within one poll interval.
 */

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::Timer;
use embedded_hal::digital::{OutputPin, PinState};

use crate::config::Config;
use crate::sync::ModeSignal;

pub struct StatusIndicator<'a, M: RawMutex, L, const N: usize> {
    line: L,
    mode: &'a ModeSignal<M, N>,
    config: &'a Config,
}

impl<'a, M, L, const N: usize> StatusIndicator<'a, M, L, N>
where
    M: RawMutex,
    L: OutputPin,
{
    pub fn new(line: L, mode: &'a ModeSignal<M, N>, config: &'a Config) -> Self {
        StatusIndicator { line, mode, config }
    }

    /// One iteration: drive the line to the current mode, then wait for the
    /// next change. Returns the level driven.
    pub async fn step(&mut self) -> bool {
        let active = self.mode.is_set();

        if self.line.set_state(PinState::from(active)).is_err() {
            warn!("status line write failed");
        }

        // A clear wakes nobody, so while active only a timer brings us back.
        if active {
            Timer::after(self.config.status_poll_interval).await;
        } else {
            self.mode
                .wait_until_set(self.config.status_poll_interval)
                .await;
        }

        active
    }

    pub async fn run(mut self) -> ! {
        info!("status task started");
        loop {
            self.step().await;
        }
    }
}
