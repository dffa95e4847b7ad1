/*
 * The I/O module for the range finder.
 *
 * This module holds everything that is specific to the DESPI-M02 board: the
 * concrete Embassy tasks that run the library's generic task loops on real
 * pins, the button watcher that turns EXTI edges into button tokens, and a
 * telemetry transport over the USART. The intention is for this module and
 * `main` to be the only device-specific parts of the program.
 */

use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Input, Output};
use embassy_stm32::mode::Async;
use embassy_stm32::usart::{self, Uart};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Timer};
use embedded_hal::digital::{ErrorType, OutputPin};

use sonar::{
    BlinkActuator, ButtonEdge, MessageId, ModeSignal, Publisher, RangeSensor, SharedReading,
    StatusIndicator, Telemetry,
};

// The status task is the only one that parks on the mode flag, leave room for
// one more.
pub const MODE_WAITERS: usize = 2;

pub type Mode = ModeSignal<CriticalSectionRawMutex, MODE_WAITERS>;
pub type Shared = SharedReading<CriticalSectionRawMutex>;

pub type Sensor = RangeSensor<
    'static,
    CriticalSectionRawMutex,
    Output<'static>,
    Input<'static>,
    MODE_WAITERS,
>;
pub type Blinker = BlinkActuator<'static, CriticalSectionRawMutex, Output<'static>, MODE_WAITERS>;
pub type Status =
    StatusIndicator<'static, CriticalSectionRawMutex, ActiveLow<Output<'static>>, MODE_WAITERS>;
pub type Reporter = Telemetry<'static, CriticalSectionRawMutex, UartPublisher>;

// Deal with active-high or active-low, so that the tasks can just use easy to
// understand "high" for on.
pub struct ActiveLow<P>(pub P);

impl<P: ErrorType> ErrorType for ActiveLow<P> {
    type Error = P::Error;
}

impl<P: OutputPin> OutputPin for ActiveLow<P> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set_high()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set_low()
    }
}

/*
 * Runs on the highest-priority interrupt executor, so the token is raised from
 * interrupt context. Press bounce is left to the range sensor's quiet period.
 * Release bounce also produces falling edges, so after a press the watcher
 * stops listening until the button has been seen released for `settle`.
 */
#[embassy_executor::task]
pub async fn button_task(
    mut button: ExtiInput<'static>,
    edge: &'static ButtonEdge,
    settle: Duration,
) -> ! {
    loop {
        button.wait_for_falling_edge().await;
        edge.signal_from_interrupt();

        loop {
            button.wait_for_high().await;
            Timer::after(settle).await;
            if button.is_high() {
                break;
            }
        }
    }
}

#[embassy_executor::task]
pub async fn ranging_task(sensor: Sensor) -> ! {
    sensor.run().await
}

#[embassy_executor::task]
pub async fn blink_task(blinker: Blinker) -> ! {
    blinker.run().await
}

#[embassy_executor::task]
pub async fn status_task(status: Status) -> ! {
    status.run().await
}

#[embassy_executor::task]
pub async fn telemetry_task(telemetry: Reporter) -> ! {
    telemetry.run().await
}

/// Telemetry over the serial port, one `topic payload` line per message. A
/// bridge on the host side forwards the lines to the broker.
pub struct UartPublisher {
    uart: Uart<'static, Async>,
    next_id: MessageId,
}

impl UartPublisher {
    pub fn new(uart: Uart<'static, Async>) -> Self {
        UartPublisher { uart, next_id: 1 }
    }
}

impl Publisher for UartPublisher {
    type Error = usart::Error;

    async fn connect(&mut self, endpoint: &str) -> Result<(), Self::Error> {
        self.uart.write(b"CONNECT ").await?;
        self.uart.write(endpoint.as_bytes()).await?;
        self.uart.write(b"\n").await
    }

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<MessageId, Self::Error> {
        self.uart.write(topic.as_bytes()).await?;
        self.uart.write(b" ").await?;
        self.uart.write(payload).await?;
        self.uart.write(b"\n").await?;

        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        Ok(id)
    }
}
