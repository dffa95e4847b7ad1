/*
 * The range sensor task: the producer side of the system.
 *
 * The task is a two-state machine. While `Idle` it only polls the button, at a
 * slow cadence. While `Ranging` it also runs one trigger/echo cycle per loop
 * and publishes the result into the shared reading. Every accepted button
 * edge flips the state and sets or clears the mode flag to match, so the other
 * tasks can follow along.
 *
 * The echo is timed by polling the echo line against an explicit deadline.
 * There is no interrupt for the echo edges, and the polling is bounded, so a
 * missing or stuck echo costs at most two echo timeouts per cycle.
 */

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Instant, Timer, block_for};
use embedded_hal::digital::{InputPin, OutputPin};

use crate::config::{Config, SPEED_OF_SOUND_CM_PER_US};
use crate::sync::{ButtonEdge, ModeSignal, Reading, SharedReading};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorState {
    Idle,
    Ranging,
}

impl SensorState {
    pub fn toggled(self) -> Self {
        match self {
            SensorState::Idle => SensorState::Ranging,
            SensorState::Ranging => SensorState::Idle,
        }
    }

    /// Pause at the end of each loop iteration in this state.
    pub fn cadence(self, config: &Config) -> Duration {
        match self {
            SensorState::Idle => config.idle_poll_interval,
            SensorState::Ranging => config.ranging_interval,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RangingError {
    /// The echo line never went high before the deadline.
    EchoNeverRose,

    /// The echo line went high but did not return low before the deadline.
    EchoNeverFell,

    /// Driving the trigger or reading the echo line failed.
    Pin,
}

impl core::fmt::Display for RangingError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RangingError::EchoNeverRose => write!(f, "no echo within timeout"),
            RangingError::EchoNeverFell => write!(f, "echo did not end within timeout"),
            RangingError::Pin => write!(f, "ranging pin access failed"),
        }
    }
}

/// Convert the width of the echo pulse to a distance. The pulse covers the
/// round trip, hence the halving.
pub fn distance_cm(echo_high: Duration) -> f32 {
    echo_high.as_micros() as f32 * SPEED_OF_SOUND_CM_PER_US / 2.0
}

/*
 * Spin until the echo line reads `high`, or give up at `deadline`. Returns the
 * instant the level was first seen.
 */
fn wait_for_level<P: InputPin>(
    echo: &mut P,
    high: bool,
    deadline: Instant,
    on_timeout: RangingError,
) -> Result<Instant, RangingError> {
    loop {
        let now = Instant::now();
        if echo.is_high().map_err(|_| RangingError::Pin)? == high {
            return Ok(now);
        }
        if now >= deadline {
            return Err(on_timeout);
        }
    }
}

pub struct RangeSensor<'a, M: RawMutex, T, E, const N: usize> {
    trigger: T,
    echo: E,
    reading: &'a SharedReading<M>,
    mode: &'a ModeSignal<M, N>,
    button: &'a ButtonEdge,
    config: &'a Config,
    state: SensorState,
}

impl<'a, M, T, E, const N: usize> RangeSensor<'a, M, T, E, N>
where
    M: RawMutex,
    T: OutputPin,
    E: InputPin,
{
    /// The initial state follows the mode flag, which starts out inactive.
    pub fn new(
        trigger: T,
        echo: E,
        reading: &'a SharedReading<M>,
        mode: &'a ModeSignal<M, N>,
        button: &'a ButtonEdge,
        config: &'a Config,
    ) -> Self {
        let state = if mode.is_set() {
            SensorState::Ranging
        } else {
            SensorState::Idle
        };

        RangeSensor {
            trigger,
            echo,
            reading,
            mode,
            button,
            config,
            state,
        }
    }

    pub fn state(&self) -> SensorState {
        self.state
    }

    /// Take a pending button edge, if any, and flip the state.
    ///
    /// After a flip the task keeps throwing away edges until a whole quiet
    /// period passes without one, so one bouncy press toggles once however
    /// long it bounces. Returns whether the state changed.
    pub async fn poll_button(&mut self) -> bool {
        if !self.button.try_consume() {
            return false;
        }

        self.state = self.state.toggled();
        match self.state {
            SensorState::Ranging => {
                info!("sensor start");
                self.mode.set();
            }
            SensorState::Idle => {
                info!("sensor stop");
                self.mode.clear();
            }
        }

        loop {
            Timer::after(self.config.quiet_period).await;
            if !self.button.try_consume() {
                break;
            }
            debug!("button bounce rejected");
        }

        true
    }

    /// Run one trigger/echo cycle and return the measured distance.
    ///
    /// This busy-waits: a few microseconds for the trigger pulse, and up to
    /// one echo timeout per echo edge.
    pub fn measure(&mut self) -> Result<f32, RangingError> {
        self.trigger.set_low().map_err(|_| RangingError::Pin)?;
        block_for(self.config.trigger_settle);
        self.trigger.set_high().map_err(|_| RangingError::Pin)?;
        block_for(self.config.trigger_pulse);
        self.trigger.set_low().map_err(|_| RangingError::Pin)?;

        let rise = wait_for_level(
            &mut self.echo,
            true,
            Instant::now() + self.config.echo_timeout,
            RangingError::EchoNeverRose,
        )?;
        let fall = wait_for_level(
            &mut self.echo,
            false,
            rise + self.config.echo_timeout,
            RangingError::EchoNeverFell,
        )?;

        Ok(distance_cm(fall - rise))
    }

    /// Measure once and publish the result. A failed cycle still publishes,
    /// as a `Reading::no_echo`, so consumers can tell it from a far object.
    pub async fn range_once(&mut self) -> Reading {
        let reading = match self.measure() {
            Ok(distance_cm) => Reading::measured(distance_cm, Instant::now().as_millis()),
            Err(e) => {
                warn!("ranging failed: {}", e);
                Reading::no_echo(Instant::now().as_millis())
            }
        };

        self.reading.write(reading).await;
        reading
    }

    /// One iteration of the task loop.
    pub async fn step(&mut self) {
        self.poll_button().await;

        if self.state == SensorState::Ranging {
            self.range_once().await;
        }

        Timer::after(self.state.cadence(self.config)).await;
    }

    pub async fn run(mut self) -> ! {
        info!("range sensor task started");
        loop {
            self.step().await;
        }
    }
}
