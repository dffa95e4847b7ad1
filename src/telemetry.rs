/*
 * Outbound telemetry.
 *
 * The transport is behind the `Publisher` trait; the board uses a serial line,
 * tests use a recorder. `TelemetryPublisher` wraps a transport with the
 * connection bookkeeping and the logging, and `Telemetry` is the low-priority
 * task that forwards fresh readings.
 *
 * Every publish is a single best-effort attempt. Failures are logged and
 * counted, never retried, and never reported to the real-time tasks: the
 * telemetry task only ever reads the shared reading.
 */

use core::fmt::Write;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::Timer;
use heapless::String;

use crate::config::Config;
use crate::sync::{Reading, SharedReading};

pub type MessageId = u32;

pub const PAYLOAD_CAPACITY: usize = 96;

/// A message transport, e.g. an MQTT client.
#[allow(async_fn_in_trait)]
pub trait Publisher {
    type Error;

    async fn connect(&mut self, endpoint: &str) -> Result<(), Self::Error>;

    /// Send one message. No acknowledgement is awaited beyond what the
    /// transport itself needs to hand out an id.
    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<MessageId, Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionEvent {
    Connected,
    Disconnected,
    Error,
}

pub struct TelemetryPublisher<P> {
    publisher: P,
    started: bool,
    published: u32,
    failed: u32,
}

impl<P: Publisher> TelemetryPublisher<P> {
    pub fn new(publisher: P) -> Self {
        TelemetryPublisher {
            publisher,
            started: false,
            published: 0,
            failed: 0,
        }
    }

    /// Connect the transport. Publishing is refused until this succeeds.
    pub async fn begin(&mut self, endpoint: &str) -> bool {
        match self.publisher.connect(endpoint).await {
            Ok(()) => {
                self.started = true;
                self.on_event(ConnectionEvent::Connected);
                true
            }
            Err(_) => {
                self.on_event(ConnectionEvent::Error);
                false
            }
        }
    }

    pub fn on_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Connected => info!("connected to broker"),
            ConnectionEvent::Disconnected => {
                warn!("broker connection lost, transport will reconnect")
            }
            ConnectionEvent::Error => error!("broker connection error"),
        }
    }

    pub async fn publish(&mut self, topic: &str, payload: &[u8]) -> Option<MessageId> {
        if !self.started {
            error!("publish attempted before telemetry was started");
            self.failed += 1;
            return None;
        }

        match self.publisher.publish(topic, payload).await {
            Ok(id) => {
                self.published += 1;
                info!("telemetry sent, message id {}", id);
                Some(id)
            }
            Err(_) => {
                self.failed += 1;
                error!("telemetry send failed");
                None
            }
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn published(&self) -> u32 {
        self.published
    }

    pub fn failed(&self) -> u32 {
        self.failed
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }
}

/// Render a reading as the telemetry payload, e.g.
/// `{"distance_cm":12.50,"timestamp_ms":1234,"valid":true}`.
pub fn format_reading(reading: &Reading) -> String<PAYLOAD_CAPACITY> {
    let mut payload = String::new();
    // Cannot overflow for any f32/u64 pair; a truncated payload is sent as is.
    let _ = write!(
        payload,
        "{{\"distance_cm\":{:.2},\"timestamp_ms\":{},\"valid\":{}}}",
        reading.distance_cm, reading.timestamp_ms, reading.valid
    );
    payload
}

pub struct Telemetry<'a, M: RawMutex, P> {
    client: TelemetryPublisher<P>,
    reading: &'a SharedReading<M>,
    config: &'a Config,
    last_sent: u64,
}

impl<'a, M, P> Telemetry<'a, M, P>
where
    M: RawMutex,
    P: Publisher,
{
    pub fn new(publisher: P, reading: &'a SharedReading<M>, config: &'a Config) -> Self {
        Telemetry {
            client: TelemetryPublisher::new(publisher),
            reading,
            config,
            // The startup sentinel is not worth sending.
            last_sent: Reading::INITIAL.timestamp_ms,
        }
    }

    pub fn client(&self) -> &TelemetryPublisher<P> {
        &self.client
    }

    pub async fn begin(&mut self) -> bool {
        self.client.begin(self.config.broker).await
    }

    /// Publish the current reading if it is newer than the last one sent,
    /// then wait out the telemetry interval.
    pub async fn step(&mut self) -> Option<MessageId> {
        let mut sent = None;

        if let Some(reading) = self.reading.read().await {
            if self.last_sent != reading.timestamp_ms {
                // Recorded before sending: a failed send is not retried.
                self.last_sent = reading.timestamp_ms;
                let payload = format_reading(&reading);
                sent = self
                    .client
                    .publish(self.config.telemetry_topic, payload.as_bytes())
                    .await;
            }
        }

        Timer::after(self.config.telemetry_interval).await;
        sent
    }

    pub async fn run(mut self) -> ! {
        info!("telemetry task started");
        self.begin().await;
        loop {
            self.step().await;
        }
    }
}
