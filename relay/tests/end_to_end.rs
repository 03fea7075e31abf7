//! Needs a broker on localhost:1883 and a running relay on localhost:5000:
//!
//! ```text
//! HUB_CONNECTION_STRING="HostName=localhost" cargo run -p relay
//! cargo test -p relay --test end_to_end -- --ignored
//! ```

use futures_util::StreamExt;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message};

const RELAY_WS: &str = "ws://localhost:5000/ws";

fn telemetry(seq: u32) -> Value {
    json!({
        "deviceId": "e2e-device",
        "temperature": 30 + (seq % 8),
        "humidity": 60,
        "pressure": 1000,
        "vibration": 1.5,
        "batteryLevel": 90,
        "timestamp": "2024-05-01T10:00:00.000Z",
        "seq": seq
    })
}

async fn publisher(client_id: &str) -> AsyncClient {
    let mut mqtt_options = MqttOptions::new(client_id, "localhost", 1883);
    mqtt_options.set_keep_alive(Duration::from_secs(30));

    let (client, mut eventloop) = AsyncClient::new(mqtt_options, 1000);
    tokio::spawn(async move {
        loop {
            if let Err(e) = eventloop.poll().await {
                eprintln!("MQTT error: {}", e);
                break;
            }
        }
    });

    sleep(Duration::from_millis(500)).await;
    client
}

#[tokio::test]
#[ignore]
async fn test_viewer_receives_published_telemetry_in_order() {
    let (mut ws, _) = connect_async(RELAY_WS).await.expect("relay is not running");
    let client = publisher("e2e-order").await;

    let total = 20;
    for seq in 0..total {
        let payload = serde_json::to_vec(&telemetry(seq)).unwrap();
        client
            .publish("devices/e2e-device/messages/events", QoS::AtLeastOnce, false, payload)
            .await
            .unwrap();
    }

    let mut received = Vec::new();
    while received.len() < total as usize {
        let frame = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for telemetry")
            .expect("socket closed")
            .unwrap();

        if let Message::Text(text) = frame {
            let msg: Value = serde_json::from_str(&text).unwrap();
            assert_eq!(msg["channel"], "iot-data");
            if msg["payload"]["deviceId"] == "e2e-device" {
                received.push(msg["payload"].clone());
            }
        }
    }

    for (seq, payload) in received.iter().enumerate() {
        assert_eq!(payload, &telemetry(seq as u32));
    }
}

#[tokio::test]
#[ignore]
async fn test_bad_payload_does_not_stop_relay() {
    let (mut ws, _) = connect_async(RELAY_WS).await.expect("relay is not running");
    let client = publisher("e2e-bad-payload").await;

    client
        .publish("devices/e2e-device/messages/events", QoS::AtLeastOnce, false, "invalid json")
        .await
        .unwrap();
    let payload = serde_json::to_vec(&telemetry(1)).unwrap();
    client
        .publish("devices/e2e-device/messages/events", QoS::AtLeastOnce, false, payload)
        .await
        .unwrap();

    let start = Instant::now();
    loop {
        assert!(start.elapsed() < Duration::from_secs(5), "relay stopped forwarding");
        let Ok(Some(Ok(Message::Text(text)))) = timeout(Duration::from_secs(5), ws.next()).await else {
            continue;
        };
        let msg: Value = serde_json::from_str(&text).unwrap();
        if msg["payload"] == telemetry(1) {
            break;
        }
    }
}
