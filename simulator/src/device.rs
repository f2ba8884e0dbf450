use crate::model::Device;
use chrono::{DateTime, Utc};
use rand::Rng;

const SERIAL_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SERIAL_LEN: usize = 16;

pub const DEFAULT_FIRMWARE: &str = "1.0.4";

/// Builds the identity this process registers as. Not persisted: every run is a new device.
pub fn mock_device(rng: &mut impl Rng, now: DateTime<Utc>, firmware_version: &str) -> Device {
    let serial_number = generate_serial_number(rng);
    let secret = serial_number.chars().rev().collect();

    Device {
        serial_number,
        status: "healthy".to_string(),
        registration_date: now.format("%Y-%m-%dT%H:%M:%S").to_string(),
        firmware_version: firmware_version.to_string(),
        secret,
        in_alarm: false,
    }
}

pub fn generate_serial_number(rng: &mut impl Rng) -> String {
    (0..SERIAL_LEN)
        .map(|_| SERIAL_CHARS[rng.gen_range(0..SERIAL_CHARS.len())] as char)
        .collect()
}
