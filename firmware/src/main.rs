#![no_std]
#![no_main]

mod network;
mod sensors;
mod state;

use core::cell::RefCell;

use chain_counter::scope::scope;
use chain_counter::{ChainCounter, Consumer, LineWatcher, Outbox, Tunables, TruthText};
use cyw43_pio::PioSpi;
use defmt::{info, unwrap};
use embassy_executor::Spawner;
use embassy_net::{Config, Stack, StackResources};
use embassy_rp::{
    bind_interrupts,
    clocks::RoscRng,
    gpio::{Level, Output, Pin},
    peripherals::{DMA_CH0, PIN_10, PIN_11, PIN_2, PIN_23, PIN_25, PIN_3, PIN_4, PIN_5, PIO0},
    pio::{InterruptHandler, Pio},
};
use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex as BlockingMutex};
use embassy_sync::{mutex::Mutex, signal::Signal};
use embassy_time::{Duration, Instant, Ticker, Timer};
use rand::RngCore;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use state::{Telemetry, TELEMETRY_SLOTS};

type LED = PIN_11;
type LED2 = PIN_10;

pub type GypsyPin = PIN_2;
pub type UpPin = PIN_3;
pub type DownPin = PIN_4;
pub type ResetPin = PIN_5;

bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => InterruptHandler<PIO0>;
});

const SERVER_IP: embassy_net::IpAddress =
    embassy_net::IpAddress::Ipv4(embassy_net::Ipv4Address::new(192, 168, 1, 10));
const SERVER_PORT: u16 = 8375;
const WIFI_NETWORK: &str = "Bertie";
const WIFI_PASSWORD: &str = "12345678";

/// Base period of the line polling loop. Poll intervals are multiples of it.
const TICK: Duration = Duration::from_millis(10);
const CHAIN_LENGTH_PERIOD: Duration = Duration::from_secs(30);

static STATE: Mutex<CriticalSectionRawMutex, state::Context> = Mutex::new(state::Context::new());

type TelemetryOutbox = Outbox<Telemetry, TELEMETRY_SLOTS>;

/// Latest unsent value per Signal K path.
static OUTBOX: BlockingMutex<CriticalSectionRawMutex, RefCell<TelemetryOutbox>> =
    BlockingMutex::new(RefCell::new(Outbox::new()));
/// Raised whenever the outbox gains a value.
static OUTBOUND_READY: Signal<CriticalSectionRawMutex, ()> = Signal::new();

fn publish(telemetry: Telemetry) {
    OUTBOX.lock(|outbox| outbox.borrow_mut().put(telemetry.slot(), telemetry));
    OUTBOUND_READY.signal(());
}

/// Queues a value for the Signal K server, wrapped by the given constructor.
struct Publish<T>(fn(T) -> Telemetry);

impl<T> Consumer<T> for Publish<T> {
    fn on_value(&mut self, value: T) {
        publish((self.0)(value));
    }
}

#[embassy_executor::task]
async fn wifi_task(
    runner: cyw43::Runner<
        'static,
        Output<'static, PIN_23>,
        PioSpi<'static, PIN_25, PIO0, 0, DMA_CH0>,
    >,
) -> ! {
    runner.run().await
}

#[embassy_executor::task]
async fn net_task(stack: &'static Stack<cyw43::NetDriver<'static>>) -> ! {
    stack.run().await
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    let fw = include_bytes!("../cyw43-firmware/43439A0.bin");
    let clm = include_bytes!("../cyw43-firmware/43439A0_clm.bin");

    let pwr = Output::new(p.PIN_23, Level::Low);
    let cs = Output::new(p.PIN_25, Level::High);
    let mut pio = Pio::new(p.PIO0, Irqs);
    let spi = PioSpi::new(
        &mut pio.common,
        pio.sm0,
        pio.irq0,
        cs,
        p.PIN_24,
        p.PIN_29,
        p.DMA_CH0,
    );

    static CYW43_STATE: StaticCell<cyw43::State> = StaticCell::new();
    let state = CYW43_STATE.init(cyw43::State::new());
    let (net_device, mut control, runner) = cyw43::new(state, pwr, spi, fw).await;
    unwrap!(spawner.spawn(wifi_task(runner)));

    control.init(clm).await;
    control
        .set_power_management(cyw43::PowerManagementMode::PowerSave)
        .await;

    let config = Config::dhcpv4(Default::default());
    let seed = RoscRng.next_u64();

    // Init network stack
    static STACK: StaticCell<Stack<cyw43::NetDriver<'static>>> = StaticCell::new();
    static RESOURCES: StaticCell<StackResources<2>> = StaticCell::new();
    let stack = &*STACK.init(Stack::new(
        net_device,
        config,
        RESOURCES.init(StackResources::<2>::new()),
        seed,
    ));

    unwrap!(spawner.spawn(net_task(stack)));
    spawner
        .spawn(network::start_network(control, stack))
        .unwrap();

    let lines = sensors::WindlassLines::new(p.PIN_2, p.PIN_3, p.PIN_4, p.PIN_5);

    spawner
        .spawn(blink_and_update_task(Output::new(p.PIN_11, Level::Low)))
        .expect("cant spawn blink task");
    spawner
        .spawn(show_network_state(Output::new(p.PIN_10, Level::Low)))
        .expect("cant spawn network_show task");
    spawner
        .spawn(counter_task(lines))
        .expect("cant spawn counter task");
    spawner
        .spawn(chain_length_task())
        .expect("cant spawn chain length task");

    loop {
        Timer::after(Duration::from_secs(5)).await;
    }
}

#[embassy_executor::task]
async fn blink_and_update_task(mut led: Output<'static, LED>) -> ! {
    loop {
        blink(&mut led);
        update_serial().await;
        Timer::after(Duration::from_secs(1)).await;
    }
}

#[embassy_executor::task]
async fn show_network_state(mut led: Output<'static, LED2>) -> ! {
    loop {
        if STATE.lock().await.network_state == state::NetworkState::Connected {
            led.set_high();
        } else {
            led.set_low();
        }
        Timer::after(Duration::from_millis(50)).await;
    }
}

fn blink<T: Pin>(led: &mut Output<'_, T>) {
    led.toggle();
}

async fn update_serial() {
    let c = STATE.lock().await;
    info!("State: {}", *c);
}

/// Owns the whole measurement pipeline. Every line is sampled from this one
/// task, so the count is never touched concurrently.
#[embassy_executor::task]
async fn counter_task(mut lines: sensors::WindlassLines) -> ! {
    let (mut tunables, mut revision) = {
        let c = STATE.lock().await;
        (c.tunables, c.tunables_revision)
    };

    let mut counter = ChainCounter::new(
        &tunables,
        Publish(Telemetry::RodeDeployed),
        Publish(Telemetry::Scope),
    );
    let mut up_watcher = LineWatcher::new(tunables.up);
    let mut down_watcher = LineWatcher::new(tunables.down);
    let mut reset_watcher = LineWatcher::new(tunables.reset);
    let mut up_state = TruthText::new(Publish(Telemetry::UpButton));
    let mut down_state = TruthText::new(Publish(Telemetry::DownButton));

    let now = Instant::now().as_millis();
    up_state.on_value(up_watcher.baseline(&mut lines.up, now));
    down_state.on_value(down_watcher.baseline(&mut lines.down, now));
    reset_watcher.baseline(&mut lines.reset, now);
    counter.baseline(&mut lines.gypsy, now);
    counter.publish();

    let mut ticker = Ticker::every(TICK);
    loop {
        let now = Instant::now().as_millis();

        if let Some(level) = up_watcher.tick(&mut lines.up, now) {
            up_state.on_value(level);
        }
        if let Some(level) = down_watcher.tick(&mut lines.down, now) {
            down_state.on_value(level);
        }
        if let Some(level) = reset_watcher.tick(&mut lines.reset, now) {
            if counter.on_reset_button(level) {
                info!("Reset button pressed");
            }
        }
        counter.tick(&mut lines.gypsy, &mut lines.up, &mut lines.down, now);

        {
            let mut c = STATE.lock().await;
            if let Some(depth) = c.depth {
                counter.set_depth(depth);
            }
            if c.tunables_revision != revision {
                tunables = c.tunables;
                revision = c.tunables_revision;
                retune(
                    &tunables,
                    &mut counter,
                    &mut up_watcher,
                    &mut down_watcher,
                    &mut reset_watcher,
                );
            }
            c.rode = state::Rode {
                count: counter.count(),
                deployed_m: counter.deployed(),
                scope: scope(counter.deployed(), counter.depth()),
            };
        }

        ticker.next().await;
    }
}

fn retune<L: Consumer<f32>, S: Consumer<f32>>(
    tunables: &Tunables,
    counter: &mut ChainCounter<L, S>,
    up: &mut LineWatcher,
    down: &mut LineWatcher,
    reset: &mut LineWatcher,
) {
    info!("applying tunables: {}", tunables);
    counter.retune(tunables);
    up.retune(tunables.up);
    down.retune(tunables.down);
    reset.retune(tunables.reset);
}

#[embassy_executor::task]
async fn chain_length_task() -> ! {
    let mut report = Publish(Telemetry::ChainLength);
    loop {
        let length = STATE.lock().await.tunables.chain_length_m;
        report.on_value(length);
        Timer::after(CHAIN_LENGTH_PERIOD).await;
    }
}
