// Shared test helpers
#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use vitalwatch::models::{Posture, VitalReading};

pub const TEST_CONFIG: &str = r#"
[server]
port = 8081
host = "0.0.0.0"

[database]
path = "data/test.db"
max_pool_size = 2
retention_days = 30

[live]
broadcast_capacity = 10

[access]
code = "letmein"

[relay]
endpoint = "http://127.0.0.1:9/send-report"
default_recipient = "doctor@example.com"

[prediction]
endpoint = "http://127.0.0.1:9/predict"

[monitoring]
prune_interval_secs = 3600
stats_log_interval_secs = 60

[patient]
patient_id = "P-1001"
name = "Jane Doe"
age = 67
blood_group = "O+"
phone = "555-0100"
email = "jane@example.com"
"#;

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
}

/// A fully populated reading `minutes` after `base_time()`.
pub fn reading(minutes: i64, temp: f64, hr: u32, spo2: f64, posture: &str) -> VitalReading {
    VitalReading {
        recorded_at: base_time() + Duration::minutes(minutes),
        temperature_c: Some(temp),
        heart_rate_bpm: Some(hr),
        spo2_percent: Some(spo2),
        posture: Some(Posture::from_label(posture)),
    }
}

/// Readings with only a posture, one per day starting at `base_time()`.
pub fn daily_postures(labels: &[&str]) -> Vec<VitalReading> {
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let mut r = VitalReading::at(base_time() + Duration::days(i as i64));
            r.posture = Some(Posture::from_label(label));
            r
        })
        .collect()
}
