use crate::errors::{Error, Result};
use crate::model::HubEvent;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Device-to-cloud topic filter the relay consumes.
pub const TELEMETRY_TOPIC: &str = "devices/+/messages/events";

const DEFAULT_PORT: u16 = 1883;

/// Consumer group that reads the plain topic; any other group gets an MQTT
/// shared subscription so its members split the stream.
pub const DEFAULT_CONSUMER_GROUP: &str = "$Default";

/// Hub address and credentials in `Key=Value;Key=Value` form, e.g.
/// `HostName=localhost;Port=1883;ConsumerGroup=dashboards;SharedAccessKeyName=relay;SharedAccessKey=secret`.
#[derive(Clone, PartialEq)]
pub struct ConnectionString {
    pub host: String,
    pub port: u16,
    pub consumer_group: String,
    pub device_id: Option<String>,
    pub key_name: Option<String>,
    pub key: Option<String>,
}

impl ConnectionString {
    pub fn parse(raw: &str) -> Result<Self> {
        let mut host = None;
        let mut port = DEFAULT_PORT;
        let mut consumer_group = None;
        let mut device_id = None;
        let mut key_name = None;
        let mut key = None;

        for part in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, value) = part.split_once('=').ok_or_else(|| {
                Error::Config(format!("Malformed connection string segment: {}", name_only(part)))
            })?;
            let value = value.trim().to_string();

            match name.trim().to_ascii_lowercase().as_str() {
                "hostname" => host = Some(value),
                "port" => {
                    port = value
                        .parse()
                        .map_err(|_| Error::Config(format!("Invalid port: {}", value)))?
                }
                "consumergroup" => consumer_group = Some(value),
                "deviceid" => device_id = Some(value),
                "sharedaccesskeyname" => key_name = Some(value),
                "sharedaccesskey" => key = Some(value),
                other => debug!("Ignoring connection string key {}", other),
            }
        }

        let host = host
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::Config("Connection string has no HostName".to_string()))?;

        let consumer_group = consumer_group
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| DEFAULT_CONSUMER_GROUP.to_string());
        if consumer_group.contains(['/', '+', '#']) {
            return Err(Error::Config(format!(
                "Invalid consumer group: {}",
                consumer_group
            )));
        }

        Ok(Self {
            host,
            port,
            consumer_group,
            device_id,
            key_name,
            key,
        })
    }

    /// Topic filter to subscribe with for this consumer group.
    pub fn subscription(&self) -> String {
        if self.consumer_group == DEFAULT_CONSUMER_GROUP {
            TELEMETRY_TOPIC.to_string()
        } else {
            format!("$share/{}/{}", self.consumer_group, TELEMETRY_TOPIC)
        }
    }

    pub fn mqtt_options(&self, client_id: impl Into<String>) -> MqttOptions {
        let client_id = client_id.into();
        let mut options = MqttOptions::new(client_id.clone(), self.host.clone(), self.port);
        options.set_keep_alive(Duration::from_secs(30));
        options.set_clean_session(false);

        if let Some(key) = &self.key {
            let user = self
                .key_name
                .clone()
                .or_else(|| self.device_id.clone())
                .unwrap_or(client_id);
            options.set_credentials(user, key.clone());
        }

        options
    }
}

// Keeps secrets out of logs.
fn name_only(segment: &str) -> &str {
    segment.split('=').next().unwrap_or(segment)
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("consumer_group", &self.consumer_group)
            .field("device_id", &self.device_id)
            .field("key_name", &self.key_name)
            .field("key", &self.key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Consumes device telemetry from the hub and forwards every event, or the
/// error that prevented reading it, to `tx`.
///
/// Returns once the receiving side is gone. Reconnects are left to rumqttc.
pub async fn run_hub(
    conn: ConnectionString,
    client_id: String,
    tx: mpsc::Sender<Result<HubEvent>>,
) -> Result<()> {
    info!("Connecting to hub at {}", conn);

    let topic = conn.subscription();
    let (client, mut eventloop) = AsyncClient::new(conn.mqtt_options(client_id), 100);

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                info!("Connected to hub, session present: {}", ack.session_present);
                if !ack.session_present {
                    client.try_subscribe(topic.as_str(), QoS::AtLeastOnce)?;
                    info!("Subscribed to {} with QoS 1", topic);
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                debug!(
                    "Received message on topic {}, size: {} bytes",
                    publish.topic,
                    publish.payload.len()
                );

                let event = decode_event(&publish.topic, &publish.payload);
                if tx.send(event).await.is_err() {
                    info!("Relay stopped, closing hub consumer");
                    return Ok(());
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Hub connection lost, retrying in 1s");
                if tx.send(Err(Error::Connection(e))).await.is_err() {
                    return Ok(());
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

/// Turns a raw hub message into an event. The body is kept as whatever JSON
/// the device sent.
pub fn decode_event(topic: &str, payload: &[u8]) -> Result<HubEvent> {
    let body: Value = serde_json::from_slice(payload)?;
    Ok(HubEvent::new(device_from_topic(topic), body))
}

fn device_from_topic(topic: &str) -> Option<String> {
    let mut parts = topic.split('/');
    match (parts.next(), parts.next()) {
        (Some("devices"), Some(id)) if !id.is_empty() => Some(id.to_string()),
        _ => None,
    }
}
