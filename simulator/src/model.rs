use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single synthetic sensor reading, as submitted to the device API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Measurement {
    pub id: Uuid,
    pub device_serial_number: String,
    pub recorded_time: DateTime<Utc>,
    pub air_humidity: f64,
    pub carbon_monoxide: f64,
    pub temperature: f64,
}

/// Measurements handled as one delivery unit, in generation order.
pub type Batch = Vec<Measurement>;

/// Device record exchanged with the registration endpoint.
///
/// The API may answer in camelCase, so every field also accepts that spelling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Device {
    #[serde(alias = "serialNumber")]
    pub serial_number: String,
    #[serde(alias = "status")]
    pub status: String,
    #[serde(alias = "registrationDate")]
    pub registration_date: String,
    #[serde(alias = "firmwareVersion")]
    pub firmware_version: String,
    #[serde(alias = "secret")]
    pub secret: String,
    #[serde(alias = "inAlarm", default)]
    pub in_alarm: bool,
}

/// Credentials posted to the authentication endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthRequest<'a> {
    pub serial_number: &'a str,
    pub secret: &'a str,
}

impl<'a> From<&'a Device> for AuthRequest<'a> {
    fn from(device: &'a Device) -> Self {
        Self {
            serial_number: &device.serial_number,
            secret: &device.secret,
        }
    }
}

/// Record appended to the dead-letter file for every rejected batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedBatch {
    pub rejected_at: DateTime<Utc>,
    pub status: u16,
    pub measurements: Batch,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(n: u128) -> Measurement {
        Measurement {
            id: Uuid::from_u128(n),
            device_serial_number: "ABCDEF0123456789".to_string(),
            recorded_time: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, n as u32).unwrap(),
            air_humidity: 42.0,
            carbon_monoxide: 77.0,
            temperature: 21.0,
        }
    }

    #[test]
    fn test_measurement_wire_names() {
        let value = serde_json::to_value(sample(1)).unwrap();
        let obj = value.as_object().unwrap();

        for key in [
            "Id",
            "DeviceSerialNumber",
            "RecordedTime",
            "AirHumidity",
            "CarbonMonoxide",
            "Temperature",
        ] {
            assert!(obj.contains_key(key), "missing {}", key);
        }
        assert_eq!(obj["RecordedTime"], "2024-03-01T12:00:01Z");
    }

    #[test]
    fn test_batch_round_trip_preserves_order() {
        let batch: Batch = (0..5).map(sample).collect();
        let json = serde_json::to_string(&batch).unwrap();
        let decoded: Batch = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded, batch);
    }

    #[test]
    fn test_device_accepts_camel_case_response() {
        let body = r#"{
            "serialNumber": "ABC",
            "status": "healthy",
            "registrationDate": "2024-03-01T12:00:00",
            "firmwareVersion": "1.0.4",
            "secret": "CBA",
            "inAlarm": false
        }"#;

        let device: Device = serde_json::from_str(body).unwrap();
        assert_eq!(device.serial_number, "ABC");
        assert_eq!(device.secret, "CBA");
        assert!(!device.in_alarm);
    }

    #[test]
    fn test_auth_request_from_device() {
        let device = Device {
            serial_number: "ABC".to_string(),
            status: "healthy".to_string(),
            registration_date: "2024-03-01T12:00:00".to_string(),
            firmware_version: "1.0.4".to_string(),
            secret: "CBA".to_string(),
            in_alarm: false,
        };

        let json = serde_json::to_value(AuthRequest::from(&device)).unwrap();
        assert_eq!(json, serde_json::json!({"SerialNumber": "ABC", "Secret": "CBA"}));
    }
}
