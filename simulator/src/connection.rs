use crate::errors::ConnectionError;
use rumqttc::MqttOptions;
use std::time::Duration;

const DEFAULT_PORT: u16 = 1883;

/// Device connection string, `HostName=...;DeviceId=...;SharedAccessKey=...`.
#[derive(Clone, PartialEq)]
pub struct DeviceConnection {
    pub host: String,
    pub port: u16,
    pub device_id: Option<String>,
    pub key: Option<String>,
}

impl DeviceConnection {
    pub fn parse(raw: &str) -> Result<Self, ConnectionError> {
        let mut host = None;
        let mut port = DEFAULT_PORT;
        let mut device_id = None;
        let mut key = None;

        for part in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let Some((name, value)) = part.split_once('=') else {
                return Err(ConnectionError::Malformed(part.to_string()));
            };
            let value = value.trim().to_string();

            match name.trim().to_ascii_lowercase().as_str() {
                "hostname" => host = Some(value),
                "port" => {
                    port = value
                        .parse()
                        .map_err(|_| ConnectionError::InvalidPort(value.clone()))?
                }
                "deviceid" => device_id = Some(value),
                "sharedaccesskey" => key = Some(value),
                _ => {}
            }
        }

        let host = host
            .filter(|h| !h.is_empty())
            .ok_or(ConnectionError::MissingHost)?;

        Ok(Self {
            host,
            port,
            device_id,
            key,
        })
    }

    pub fn mqtt_options(&self, client_id: &str) -> MqttOptions {
        let mut options = MqttOptions::new(client_id, self.host.clone(), self.port);
        options.set_keep_alive(Duration::from_secs(30));
        options.set_clean_session(true);
        if let Some(key) = &self.key {
            options.set_credentials(client_id, key.clone());
        }
        options
    }
}

impl std::fmt::Debug for DeviceConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceConnection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("device_id", &self.device_id)
            .field("key", &self.key.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Device-to-cloud topic for `device_id`.
pub fn events_topic(device_id: &str) -> String {
    format!("devices/{}/messages/events", device_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let conn =
            DeviceConnection::parse("HostName=broker;DeviceId=device001;SharedAccessKey=abc=").unwrap();
        assert_eq!(conn.host, "broker");
        assert_eq!(conn.port, 1883);
        assert_eq!(conn.device_id.as_deref(), Some("device001"));
        assert_eq!(conn.key.as_deref(), Some("abc="));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(DeviceConnection::parse(""), Err(ConnectionError::MissingHost));
        assert_eq!(DeviceConnection::parse("DeviceId=x"), Err(ConnectionError::MissingHost));
        assert_eq!(
            DeviceConnection::parse("HostName=broker;Port=99999"),
            Err(ConnectionError::InvalidPort("99999".to_string()))
        );
        assert_eq!(
            DeviceConnection::parse("HostName=broker;garbage"),
            Err(ConnectionError::Malformed("garbage".to_string()))
        );
    }

    #[test]
    fn test_events_topic() {
        assert_eq!(events_topic("device001"), "devices/device001/messages/events");
    }
}
