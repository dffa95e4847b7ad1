#![no_std]
#![no_main]

// https://dev.to/theembeddedrustacean/embedded-rust-embassy-gpio-button-controlled-blinking-3ee6
// https://github.com/embassy-rs/embassy/blob/main/examples/stm32f4/src/bin/multiprio.rs

use defmt::info;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_stm32::exti::{Channel, ExtiInput};
use embassy_stm32::gpio::{Input, Level, Output, Pin, Pull, Speed};
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_stm32::usart::{self, Uart};
use embassy_stm32::{bind_interrupts, peripherals};
use {defmt_rtt as _, panic_halt as _};

use sonar::{
    BlinkActuator, ButtonEdge, Config, ModeSignal, RangeSensor, Reading, SharedReading,
    StatusIndicator, Telemetry,
};

mod io;

static CONFIG: Config = Config::DEFAULT;
static READING: io::Shared = SharedReading::new(
    Reading::INITIAL,
    Config::DEFAULT.write_lock_timeout,
    Config::DEFAULT.read_lock_timeout,
);
static MODE: io::Mode = ModeSignal::new();
static BUTTON: ButtonEdge = ButtonEdge::new();

// Two spare interrupt lines drive the preemptive executors. Lower number is
// more urgent: button edges first, then ranging, then thread mode.
static EXECUTOR_BUTTON: InterruptExecutor = InterruptExecutor::new();
static EXECUTOR_RANGING: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn UART4() {
    unsafe { EXECUTOR_BUTTON.on_interrupt() }
}

#[interrupt]
unsafe fn UART5() {
    unsafe { EXECUTOR_RANGING.on_interrupt() }
}

bind_interrupts!(struct Irqs {
    USART1 => usart::InterruptHandler<peripherals::USART1>;
});

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let peripherals = embassy_stm32::init(Default::default());
    info!("sonar starting");

    let trigger = Output::new(peripherals.PA0, Level::Low, Speed::Low);
    let echo = Input::new(peripherals.PA1, Pull::None);
    let blink = Output::new(peripherals.PB10, Level::Low, Speed::Low);
    // the on-board LED is active-low, start it off
    let status = io::ActiveLow(Output::new(peripherals.PE12, Level::High, Speed::Low));

    let button = ExtiInput::new(
        peripherals.PE11.degrade(),
        peripherals.EXTI11.degrade(),
        Pull::Up,
    );

    let uart = Uart::new(
        peripherals.USART1,
        peripherals.PA10,
        peripherals.PA9,
        Irqs,
        peripherals.DMA1_CH4,
        peripherals.DMA1_CH5,
        usart::Config::default(), // 115200 baud
    )
    .unwrap();

    interrupt::UART4.set_priority(Priority::P6);
    let button_spawner = EXECUTOR_BUTTON.start(interrupt::UART4);
    button_spawner
        .spawn(io::button_task(button, &BUTTON, CONFIG.quiet_period))
        .unwrap();

    interrupt::UART5.set_priority(Priority::P7);
    let ranging_spawner = EXECUTOR_RANGING.start(interrupt::UART5);
    ranging_spawner
        .spawn(io::ranging_task(RangeSensor::new(
            trigger, echo, &READING, &MODE, &BUTTON, &CONFIG,
        )))
        .unwrap();

    spawner
        .spawn(io::blink_task(BlinkActuator::new(
            blink, &READING, &MODE, &CONFIG,
        )))
        .unwrap();
    spawner
        .spawn(io::status_task(StatusIndicator::new(status, &MODE, &CONFIG)))
        .unwrap();
    spawner
        .spawn(io::telemetry_task(Telemetry::new(
            io::UartPublisher::new(uart),
            &READING,
            &CONFIG,
        )))
        .unwrap();

    info!("all tasks spawned");
}
