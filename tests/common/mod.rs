//! Shared test infrastructure for the sonar integration tests

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Instant};
use embedded_hal::digital::{Error, ErrorKind, ErrorType, InputPin, OutputPin};
use sonar::{Config, MessageId, ModeSignal, Publisher, Reading, SharedReading};

pub type Shared = SharedReading<CriticalSectionRawMutex>;
pub type Mode = ModeSignal<CriticalSectionRawMutex, 2>;

// ============================================================================
// Configuration
// ============================================================================

/// Board defaults scaled down so a test finishes in milliseconds.
pub fn test_config() -> Config {
    Config {
        echo_timeout: Duration::from_millis(10),
        ranging_interval: Duration::from_millis(5),
        idle_poll_interval: Duration::from_millis(5),
        quiet_period: Duration::from_millis(60),
        write_lock_timeout: Duration::from_millis(20),
        read_lock_timeout: Duration::from_millis(20),
        half_periods: [
            Duration::from_millis(2),
            Duration::from_millis(3),
            Duration::from_millis(4),
            Duration::from_millis(5),
        ],
        status_poll_interval: Duration::from_millis(10),
        telemetry_interval: Duration::from_millis(5),
        ..Config::DEFAULT
    }
}

pub fn shared_reading(config: &Config) -> Shared {
    Shared::new(
        Reading::INITIAL,
        config.write_lock_timeout,
        config.read_lock_timeout,
    )
}

// ============================================================================
// Mock Pins
// ============================================================================

/// Output line that records every level it is driven to. Clones share the
/// same record, so a test can keep one while a task owns the other.
#[derive(Clone, Default)]
pub struct MockOutput {
    history: Rc<RefCell<Vec<bool>>>,
}

impl MockOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<bool> {
        self.history.borrow().clone()
    }

    pub fn level(&self) -> Option<bool> {
        self.history.borrow().last().copied()
    }

    pub fn clear(&self) {
        self.history.borrow_mut().clear();
    }
}

impl ErrorType for MockOutput {
    type Error = Infallible;
}

impl OutputPin for MockOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.history.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.history.borrow_mut().push(true);
        Ok(())
    }
}

/// Output line whose every write fails, e.g. a pin lost to a driver fault.
pub struct FaultyOutput;

#[derive(Debug)]
pub struct PinFault;

impl Error for PinFault {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

impl ErrorType for FaultyOutput {
    type Error = PinFault;
}

impl OutputPin for FaultyOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Err(PinFault)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Err(PinFault)
    }
}

/// Echo line with a fixed level: low models a missing echo, high a stuck one.
pub struct FixedEcho {
    high: bool,
}

impl FixedEcho {
    pub fn silent() -> Self {
        FixedEcho { high: false }
    }

    pub fn stuck() -> Self {
        FixedEcho { high: true }
    }
}

impl ErrorType for FixedEcho {
    type Error = Infallible;
}

impl InputPin for FixedEcho {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high)
    }
}

/// Echo line that produces one pulse per cycle, timed from the first poll
/// after the previous pulse ended.
pub struct ScriptedEcho {
    rise_after: Duration,
    high_for: Duration,
    armed_at: Option<Instant>,
}

impl ScriptedEcho {
    pub fn new(rise_after: Duration, high_for: Duration) -> Self {
        ScriptedEcho {
            rise_after,
            high_for,
            armed_at: None,
        }
    }

    fn level(&mut self) -> bool {
        let armed_at = *self.armed_at.get_or_insert_with(Instant::now);
        let elapsed = armed_at.elapsed();

        if elapsed >= self.rise_after + self.high_for {
            self.armed_at = None;
            false
        } else {
            elapsed >= self.rise_after
        }
    }
}

impl ErrorType for ScriptedEcho {
    type Error = Infallible;
}

impl InputPin for ScriptedEcho {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.level())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.level())
    }
}

// ============================================================================
// Mock Publisher
// ============================================================================

#[derive(Default)]
pub struct RecordingPublisher {
    pub fail_connect: bool,
    pub fail_publish: bool,
    pub endpoint: Option<String>,
    pub attempts: usize,
    pub sent: Vec<(String, Vec<u8>)>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_publish() -> Self {
        RecordingPublisher {
            fail_publish: true,
            ..Self::default()
        }
    }

    pub fn failing_connect() -> Self {
        RecordingPublisher {
            fail_connect: true,
            ..Self::default()
        }
    }

    pub fn payloads(&self) -> Vec<String> {
        self.sent
            .iter()
            .map(|(_, payload)| String::from_utf8(payload.clone()).unwrap())
            .collect()
    }
}

impl Publisher for RecordingPublisher {
    type Error = ();

    async fn connect(&mut self, endpoint: &str) -> Result<(), Self::Error> {
        if self.fail_connect {
            return Err(());
        }
        self.endpoint = Some(endpoint.to_string());
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<MessageId, Self::Error> {
        self.attempts += 1;
        if self.fail_publish {
            return Err(());
        }
        self.sent.push((topic.to_string(), payload.to_vec()));
        Ok(self.sent.len() as MessageId)
    }
}
