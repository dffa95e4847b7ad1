/*
 * Timing and threshold configuration.
 *
 * All the numbers that shape the behaviour of the tasks live here, so that the
 * firmware can run with the board defaults while tests use much shorter
 * intervals. A `Config` is built once and handed to every task by reference.
 */

use embassy_time::Duration;
use enum_ordinalize::Ordinalize;

use crate::blink::BlinkBand;

/// Speed of sound in air at roughly 20°C, in centimetres per microsecond.
pub const SPEED_OF_SOUND_CM_PER_US: f32 = 0.0343;

/// Distance stored in the shared reading before the first measurement.
pub const INITIAL_DISTANCE_CM: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Low time on the trigger line before the pulse.
    pub trigger_settle: Duration,
    /// Width of the trigger pulse.
    pub trigger_pulse: Duration,
    /// Deadline for each echo edge, rising and falling separately.
    pub echo_timeout: Duration,

    /// Pause between ranging cycles while measuring.
    pub ranging_interval: Duration,
    /// Pause between button polls while idle.
    pub idle_poll_interval: Duration,
    /// Minimum time after an accepted button edge before another is honoured.
    pub quiet_period: Duration,

    pub write_lock_timeout: Duration,
    pub read_lock_timeout: Duration,

    /// Readings below this distance blink in the `Near` band.
    pub near_threshold_cm: f32,
    /// Readings below this distance (and not near) blink in the `Medium` band.
    pub medium_threshold_cm: f32,
    /// Blink half-periods, indexed by `BlinkBand::ordinal()`.
    pub half_periods: [Duration; BlinkBand::VARIANT_COUNT],

    /// How often the status line re-checks the mode.
    pub status_poll_interval: Duration,

    pub telemetry_interval: Duration,
    pub telemetry_topic: &'static str,
    pub broker: &'static str,
}

impl Config {
    pub const DEFAULT: Config = Config {
        trigger_settle: Duration::from_micros(2),
        trigger_pulse: Duration::from_micros(10),
        echo_timeout: Duration::from_millis(100),

        ranging_interval: Duration::from_millis(200),
        idle_poll_interval: Duration::from_millis(100),
        quiet_period: Duration::from_millis(300),

        write_lock_timeout: Duration::from_millis(50),
        read_lock_timeout: Duration::from_millis(10),

        near_threshold_cm: 10.0,
        medium_threshold_cm: 30.0,
        half_periods: [
            Duration::from_millis(100),  // Near
            Duration::from_millis(250),  // Medium
            Duration::from_millis(800),  // Far
            Duration::from_millis(1000), // Idle
        ],

        status_poll_interval: Duration::from_millis(100),

        telemetry_interval: Duration::from_secs(1),
        telemetry_topic: "sonar/distance",
        broker: "mqtt://broker.local:1883",
    };

    pub fn half_period(&self, band: BlinkBand) -> Duration {
        self.half_periods[band.ordinal()]
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::DEFAULT
    }
}
