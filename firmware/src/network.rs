use chain_counter::signalk::{
    self, CodecError, Delta, Inbound, LineBuffer, SkOutput, Value, CHAIN_LENGTH_META,
    CHAIN_LENGTH_PATH, DEPTH_PATH, DOWN_BUTTON_META, DOWN_BUTTON_PATH, RODE_DEPLOYED_META,
    RODE_DEPLOYED_PATH, SCOPE_META, SCOPE_PATH, UP_BUTTON_META, UP_BUTTON_PATH,
};
use cyw43::{Control, NetDriver};
use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_net::tcp::{self, TcpSocket};
use embassy_net::Stack;
use embassy_time::{Duration, Timer};

use crate::state::{NetworkState, Telemetry};
use crate::STATE;
use crate::{OUTBOUND_READY, OUTBOX};

use crate::SERVER_IP;
use crate::SERVER_PORT;
use crate::WIFI_NETWORK;
use crate::WIFI_PASSWORD;

const DEPTH_PERIOD_MS: u32 = 1000;
const MESSAGE_SIZE: usize = 512;

#[derive(Format)]
enum SessionError {
    Tcp(tcp::Error),
    Codec(CodecError),
    Closed,
}

impl From<tcp::Error> for SessionError {
    fn from(e: tcp::Error) -> Self {
        SessionError::Tcp(e)
    }
}

impl From<CodecError> for SessionError {
    fn from(e: CodecError) -> Self {
        SessionError::Codec(e)
    }
}

/// One Signal K output per path we publish.
struct Outputs {
    rode: SkOutput,
    scope: SkOutput,
    chain_length: SkOutput,
    up: SkOutput,
    down: SkOutput,
}

impl Outputs {
    fn new() -> Self {
        Self {
            rode: SkOutput::new(RODE_DEPLOYED_PATH, Some(&RODE_DEPLOYED_META)),
            scope: SkOutput::new(SCOPE_PATH, Some(&SCOPE_META)),
            chain_length: SkOutput::new(CHAIN_LENGTH_PATH, Some(&CHAIN_LENGTH_META)),
            up: SkOutput::new(UP_BUTTON_PATH, Some(&UP_BUTTON_META)),
            down: SkOutput::new(DOWN_BUTTON_PATH, Some(&DOWN_BUTTON_META)),
        }
    }

    fn delta(&mut self, telemetry: Telemetry) -> Delta<'static> {
        match telemetry {
            Telemetry::RodeDeployed(m) => self.rode.delta(Value::Number(m)),
            Telemetry::Scope(ratio) => self.scope.delta(Value::Number(ratio)),
            Telemetry::ChainLength(m) => self.chain_length.delta(Value::Number(m)),
            Telemetry::UpButton(text) => self.up.delta(Value::Text(text)),
            Telemetry::DownButton(text) => self.down.delta(Value::Text(text)),
        }
    }

    fn resend_metadata(&mut self) {
        self.rode.resend_metadata();
        self.scope.resend_metadata();
        self.chain_length.resend_metadata();
        self.up.resend_metadata();
        self.down.resend_metadata();
    }
}

async fn join_network(control: &mut Control<'static>) -> bool {
    match control.join_wpa2(WIFI_NETWORK, WIFI_PASSWORD).await {
        Ok(_) => return true,
        Err(err) => {
            info!("join failed with status={}", err.status);
            return false;
        }
    }
}

async fn set_network_state(network_state: NetworkState) {
    STATE.lock().await.network_state = network_state;
}

#[embassy_executor::task]
pub async fn start_network(
    mut control: Control<'static>,
    stack: &'static Stack<NetDriver<'static>>,
) -> ! {
    let mut outputs = Outputs::new();
    let mut rx_buffer = [0; 4096];
    let mut tx_buffer = [0; 4096];

    loop {
        // join wifi network
        while !join_network(&mut control).await {
            Timer::after(Duration::from_secs(1)).await;
        }

        // Wait for DHCP
        while !stack.is_config_up() {
            Timer::after(Duration::from_millis(100)).await;
        }
        if let Some(config) = stack.config_v4() {
            info!("IP address: {}", config.address);
        }
        set_network_state(NetworkState::Joined).await;

        let server_endpoint = embassy_net::IpEndpoint::new(SERVER_IP, SERVER_PORT);

        while stack.is_link_up() {
            let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
            socket.set_timeout(Some(Duration::from_secs(30)));
            socket.set_keep_alive(Some(Duration::from_secs(10)));
            // connect to server
            if let Err(e) = socket.connect(server_endpoint).await {
                warn!("connect error: {}", e);
                Timer::after(Duration::from_secs(1)).await;
                continue;
            }
            info!("connected to Signal K server");
            set_network_state(NetworkState::Connected).await;

            outputs.resend_metadata();
            OUTBOX.lock(|outbox| outbox.borrow_mut().resend_all());
            if let Err(e) = run_session(&mut socket, &mut outputs).await {
                warn!("session ended: {}", e);
            }
            socket.abort();
            set_network_state(NetworkState::Joined).await;
            Timer::after(Duration::from_secs(1)).await;
        }

        warn!("WiFi link lost");
        set_network_state(NetworkState::Disconnected).await;
    }
}

async fn run_session(
    socket: &mut TcpSocket<'_>,
    outputs: &mut Outputs,
) -> Result<(), SessionError> {
    let mut message = [0u8; MESSAGE_SIZE];
    let mut lines = LineBuffer::<MESSAGE_SIZE>::new();

    send(socket, &mut message, signalk::unsubscribe_all).await?;
    send(socket, &mut message, |buf| {
        signalk::subscribe(DEPTH_PATH, DEPTH_PERIOD_MS, buf)
    })
    .await?;

    loop {
        while let Some(telemetry) = OUTBOX.lock(|outbox| outbox.borrow_mut().take()) {
            let delta = outputs.delta(telemetry);
            match send(socket, &mut message, |buf| delta.encode(buf)).await {
                Err(SessionError::Codec(e)) => warn!("dropping {}: {}", telemetry, e),
                result => result?,
            }
        }

        let event = select(OUTBOUND_READY.wait(), socket.read(lines.space())).await;
        match event {
            Either::First(()) => {}
            Either::Second(Ok(0)) => return Err(SessionError::Closed),
            Either::Second(Ok(n)) => {
                lines.commit(n);
                while let Some(line) = lines.pop_line() {
                    handle_line(&line).await;
                }
            }
            Either::Second(Err(e)) => return Err(e.into()),
        }
    }
}

/// Encodes one message into `buf`, terminates it with a newline and writes it out.
async fn send(
    socket: &mut TcpSocket<'_>,
    buf: &mut [u8; MESSAGE_SIZE],
    encode: impl FnOnce(&mut [u8]) -> Result<usize, CodecError>,
) -> Result<(), SessionError> {
    let n = encode(&mut buf[..MESSAGE_SIZE - 1])?;
    buf[n] = b'\n';

    let mut pending = &buf[..=n];
    while !pending.is_empty() {
        match socket.write(pending).await? {
            0 => return Err(SessionError::Closed),
            written => pending = &pending[written..],
        }
    }
    Ok(())
}

/// Applies one inbound line: depth deltas from our subscription, and tunable
/// PUTs. The server does not route PUTs to a TCP provider itself; they arrive
/// here when a server plugin handling the tunable paths relays the request
/// onto this connection.
async fn handle_line(line: &[u8]) {
    match Inbound::parse(line) {
        Ok(inbound @ Inbound::Delta(_)) => {
            if let Some(depth) = inbound.value_of(DEPTH_PATH) {
                STATE.lock().await.depth = Some(depth);
            }
        }
        Ok(Inbound::Put { path, value }) => {
            let mut c = STATE.lock().await;
            match c.set_tunable(path, value) {
                Ok(()) => info!("set {} = {}", path, value),
                Err(e) => warn!("rejected {} = {}: {}", path, value, e),
            }
        }
        Ok(Inbound::Ignored) => {}
        Err(e) => warn!("dropping inbound line: {}", e),
    }
}
