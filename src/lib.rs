/*
 * Ultrasonic range finder for the DESPI-M02 board.
 *
 * The library holds the concurrency core: the shared sensor reading, the
 * measuring-mode broadcast flag and the interrupt-to-task button handoff, plus
 * the tasks that use them. Everything here is generic over `embedded-hal` pins
 * and the `embassy-sync` raw mutex, so the board binary only has to construct
 * pins and spawn tasks.
 */

#![cfg_attr(not(test), no_std)]

// Must come first, the macros are textually scoped.
mod fmt;

pub mod blink;
pub mod config;
pub mod ranging;
pub mod status;
pub mod sync;
pub mod telemetry;

pub use blink::{BlinkActuator, BlinkBand};
pub use config::Config;
pub use ranging::{RangeSensor, RangingError, SensorState};
pub use status::StatusIndicator;
pub use sync::{ButtonEdge, ModeSignal, Reading, SharedReading};
pub use telemetry::{ConnectionEvent, MessageId, Publisher, Telemetry, TelemetryPublisher};
