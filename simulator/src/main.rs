mod connection;
mod errors;
mod telemetry;

use clap::Parser;
use connection::{events_topic, DeviceConnection};
use rumqttc::{AsyncClient, ClientError, Event, Packet, QoS};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_DEVICE_ID: &str = "device001";

/// Simulated device publishing telemetry to the hub.
#[derive(Debug, Parser)]
#[command(name = "simulator", version)]
struct Args {
    /// Hub address and device credentials, e.g. "HostName=localhost;DeviceId=device001"
    #[arg(long, env = "DEVICE_CONNECTION_STRING", value_parser = DeviceConnection::parse)]
    connection_string: DeviceConnection,

    /// Overrides the connection string's DeviceId
    #[arg(long, env = "DEVICE_ID")]
    device_id: Option<String>,

    /// Milliseconds between readings
    #[arg(long, env = "INTERVAL_MS", default_value_t = 5000)]
    interval_ms: u64,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let conn = args.connection_string;
    let device_id = args
        .device_id
        .or_else(|| conn.device_id.clone())
        .unwrap_or_else(|| DEFAULT_DEVICE_ID.to_string());

    info!("Starting IoT Simulator");
    info!(
        "Hub: {}:{}, Device: {}, Interval: {}ms",
        conn.host, conn.port, device_id, args.interval_ms
    );

    let (client, mut eventloop) = AsyncClient::new(conn.mqtt_options(&device_id), 100);
    let (connected_tx, connected_rx) = oneshot::channel();

    tokio::spawn(async move {
        let mut connected_tx = Some(connected_tx);
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("Device connected to hub");
                    if let Some(tx) = connected_tx.take() {
                        let _ = tx.send(());
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Connection error: {}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    });

    if connected_rx.await.is_err() {
        error!("Connection task ended before the device connected");
        std::process::exit(1);
    }

    let topic = events_topic(&device_id);
    let mut rng = rand::thread_rng();
    let mut ticker = tokio::time::interval(Duration::from_millis(args.interval_ms.max(1)));

    loop {
        ticker.tick().await;

        let data = telemetry::generate(&mut rng, &device_id);
        let payload = match serde_json::to_string(&data) {
            Ok(p) => p,
            Err(e) => {
                error!("Failed to serialize telemetry: {}", e);
                continue;
            }
        };

        info!("Sending telemetry: {}", payload);

        match send_telemetry(&client, &topic, payload) {
            Ok(()) => debug!("Telemetry sent"),
            Err(e) => warn!("Send error: {}", e),
        }
    }
}

/// Queues one reading without waiting. While the hub is unreachable the
/// request queue fills up and further readings fail here instead of stalling
/// the interval loop.
fn send_telemetry(client: &AsyncClient, topic: &str, payload: String) -> Result<(), ClientError> {
    client.try_publish(topic, QoS::AtLeastOnce, false, payload)
}
