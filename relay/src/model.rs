use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One timestamped set of sensor readings, as produced by a device.
///
/// The relay never needs this type to forward telemetry; it is only decoded
/// when severities are computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    pub device_id: String,
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub vibration: f64,
    pub battery_level: f64,
    pub timestamp: String,
}

/// A message consumed from the hub. `body` is the device payload, untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct HubEvent {
    pub device_id: Option<String>,
    pub body: Value,
}

impl HubEvent {
    pub fn new(device_id: Option<String>, body: Value) -> Self {
        Self { device_id, body }
    }

    /// Best-effort typed view of the payload.
    pub fn record(&self) -> Option<TelemetryRecord> {
        TelemetryRecord::deserialize(&self.body).ok()
    }
}

/// Frame pushed to every viewer.
#[derive(Debug, Clone, Serialize)]
pub struct ViewerMessage<'a> {
    pub channel: &'a str,
    pub payload: &'a Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_uses_camel_case() {
        let body = json!({
            "deviceId": "device001",
            "temperature": 31,
            "humidity": 50,
            "pressure": 1000,
            "vibration": 1.25,
            "batteryLevel": 90,
            "timestamp": "2024-05-01T10:00:00.000Z"
        });

        let event = HubEvent::new(None, body);
        let record = event.record().unwrap();
        assert_eq!(record.device_id, "device001");
        assert_eq!(record.battery_level, 90.0);
        assert_eq!(record.vibration, 1.25);
    }

    #[test]
    fn test_record_is_optional() {
        let event = HubEvent::new(None, json!({"hello": "world"}));
        assert!(event.record().is_none());
    }

    #[test]
    fn test_viewer_message_shape() {
        let payload = json!({"deviceId": "device001"});
        let msg = ViewerMessage {
            channel: "iot-data",
            payload: &payload,
        };
        let text = serde_json::to_string(&msg).unwrap();
        assert_eq!(text, r#"{"channel":"iot-data","payload":{"deviceId":"device001"}}"#);
    }
}
