//! Integration tests for the blink task and the distance to blink-rate mapping

mod common;
use common::*;

use embassy_futures::block_on;
use embassy_time::Duration;
use sonar::blink::half_period;
use sonar::{BlinkActuator, BlinkBand, Config, Reading};

const DEFAULTS: Config = Config::DEFAULT;

#[test]
fn documented_examples() {
    let near = Reading::measured(5.0, 1);
    let medium = Reading::measured(20.0, 1);
    let far = Reading::measured(50.0, 1);

    assert_eq!(BlinkBand::classify(&near, true, &DEFAULTS), BlinkBand::Near);
    assert_eq!(BlinkBand::classify(&medium, true, &DEFAULTS), BlinkBand::Medium);
    assert_eq!(BlinkBand::classify(&far, true, &DEFAULTS), BlinkBand::Far);

    assert_eq!(half_period(&near, true, &DEFAULTS), Duration::from_millis(100));
    assert_eq!(half_period(&medium, true, &DEFAULTS), Duration::from_millis(250));
    assert_eq!(half_period(&far, true, &DEFAULTS), Duration::from_millis(800));
}

#[test]
fn thresholds_are_exclusive_upper_bounds() {
    let at_near = Reading::measured(DEFAULTS.near_threshold_cm, 1);
    let at_medium = Reading::measured(DEFAULTS.medium_threshold_cm, 1);

    assert_eq!(BlinkBand::classify(&at_near, true, &DEFAULTS), BlinkBand::Medium);
    assert_eq!(BlinkBand::classify(&at_medium, true, &DEFAULTS), BlinkBand::Far);
}

#[test]
fn inactive_mode_forces_idle_period() {
    for distance in [0.0, 5.0, 20.0, 50.0, 400.0] {
        let reading = Reading::measured(distance, 1);
        assert_eq!(BlinkBand::classify(&reading, false, &DEFAULTS), BlinkBand::Idle);
        assert_eq!(half_period(&reading, false, &DEFAULTS), Duration::from_millis(1000));
    }
    assert_eq!(BlinkBand::classify(&Reading::no_echo(1), false, &DEFAULTS), BlinkBand::Idle);
}

#[test]
fn period_never_grows_as_distance_shrinks() {
    let mut previous = half_period(&Reading::measured(0.0, 1), true, &DEFAULTS);
    for step in 1..=200 {
        let distance = step as f32 * 0.5;
        let period = half_period(&Reading::measured(distance, 1), true, &DEFAULTS);
        assert!(period >= previous, "{distance}cm");
        previous = period;
    }
}

#[test]
fn missing_echo_blinks_as_far() {
    let reading = Reading::no_echo(1);
    assert_eq!(reading.distance_cm, 0.0);
    assert_eq!(BlinkBand::classify(&reading, true, &DEFAULTS), BlinkBand::Far);
    assert_eq!(BlinkBand::classify(&Reading::INITIAL, true, &DEFAULTS), BlinkBand::Far);
}

#[test]
fn step_drives_one_square_wave_cycle() {
    let config = test_config();
    let shared = shared_reading(&config);
    let mode = Mode::new();
    let line = MockOutput::new();

    let mut blinker = BlinkActuator::new(line.clone(), &shared, &mode, &config);

    // inactive: idle half-period
    assert_eq!(block_on(blinker.step()), config.half_period(BlinkBand::Idle));
    assert_eq!(line.history(), vec![true, false]);

    // active and close
    mode.set();
    assert!(block_on(shared.write(Reading::measured(5.0, 10))));
    line.clear();
    assert_eq!(block_on(blinker.step()), config.half_period(BlinkBand::Near));
    assert_eq!(line.history(), vec![true, false]);
    assert_eq!(blinker.last_reading(), Reading::measured(5.0, 10));
}

#[test]
fn step_follows_new_readings() {
    let config = test_config();
    let shared = shared_reading(&config);
    let mode = Mode::new();
    mode.set();

    let mut blinker = BlinkActuator::new(MockOutput::new(), &shared, &mode, &config);

    for (distance, band) in [
        (50.0, BlinkBand::Far),
        (20.0, BlinkBand::Medium),
        (5.0, BlinkBand::Near),
    ] {
        assert!(block_on(shared.write(Reading::measured(distance, 1))));
        assert_eq!(block_on(blinker.step()), config.half_period(band));
    }
}

#[test]
fn faulty_line_does_not_stop_the_cycle() {
    let config = test_config();
    let shared = shared_reading(&config);
    let mode = Mode::new();
    mode.set();

    let mut blinker = BlinkActuator::new(FaultyOutput, &shared, &mode, &config);

    assert!(block_on(shared.write(Reading::measured(5.0, 1))));
    assert_eq!(block_on(blinker.step()), config.half_period(BlinkBand::Near));
    assert_eq!(block_on(blinker.step()), config.half_period(BlinkBand::Near));
}
