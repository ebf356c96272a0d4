// Report assembly: patient identity + latest reading + window into an ordered document.

use super::distribution::distribute;
use super::thresholds::is_high_temperature;
use super::thresholds::is_low_spo2;
use super::trend::most_common_posture;
use crate::models::{PatientInfo, ReportDocument, ReportSection, VitalReading};

pub const REPORT_TITLE: &str = "Patient Health Report";
const PLACEHOLDER: &str = "--";
const NOT_AVAILABLE: &str = "Not Available";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

const HEART_RATE_LOW_BPM: u32 = 60;
const HEART_RATE_HIGH_BPM: u32 = 100;

/// Builds the report. Without a patient the reduced layout (vitals overview, trend table,
/// posture distribution) is produced instead of the full one.
pub fn assemble(
    patient: Option<&PatientInfo>,
    latest: Option<&VitalReading>,
    window: &[VitalReading],
) -> ReportDocument {
    let sections = match patient {
        Some(p) => vec![
            patient_section(p),
            vitals_section("Current Vital Signs", latest),
            trend_section(window),
            posture_section(window, "Percentage"),
            ReportSection::bullets("Health Summary", health_summary(p, latest, window)),
        ],
        None => vec![
            vitals_section("Vitals Overview", latest),
            trend_section(window),
            posture_section(window, "Percent"),
        ],
    };
    ReportDocument {
        title: REPORT_TITLE.to_string(),
        generated_at: None,
        sections,
    }
}

fn patient_section(p: &PatientInfo) -> ReportSection {
    let rows = [
        ("Patient ID", p.patient_id.clone()),
        ("Full Name", p.name.clone()),
        ("Age", format!("{} years", p.age)),
        ("Blood Group", p.blood_group.clone()),
        ("Phone", p.phone.clone()),
        ("Email", p.email.clone()),
    ]
    .into_iter()
    .map(|(k, v)| vec![k.to_string(), v])
    .collect();
    ReportSection::table("Patient Information", &["Field", "Value"], rows)
}

fn vitals_section(title: &str, latest: Option<&VitalReading>) -> ReportSection {
    let row = vec![
        fmt_temperature(latest.and_then(|r| r.temperature_c)),
        latest
            .and_then(|r| r.heart_rate_bpm)
            .map_or_else(|| PLACEHOLDER.to_string(), |hr| format!("{} bpm", hr)),
        latest
            .and_then(|r| r.spo2_percent)
            .map_or_else(|| PLACEHOLDER.to_string(), |s| format!("{}%", s)),
        latest
            .and_then(|r| r.posture.as_ref())
            .map_or_else(|| PLACEHOLDER.to_string(), |p| p.label().to_string()),
    ];
    ReportSection::table(
        title,
        &["Temperature", "Heart Rate", "SpO2", "Sleep Posture"],
        vec![row],
    )
}

fn trend_section(window: &[VitalReading]) -> ReportSection {
    let rows = window
        .iter()
        .map(|r| {
            vec![
                r.recorded_at.format(TIME_FORMAT).to_string(),
                fmt_temperature(r.temperature_c),
            ]
        })
        .collect();
    ReportSection::table("Temperature Trends", &["Time", "Temperature"], rows)
}

fn posture_section(window: &[VitalReading], percent_label: &str) -> ReportSection {
    let rows = distribute(window)
        .buckets
        .into_iter()
        .map(|b| {
            vec![
                b.posture.label().to_string(),
                b.count.to_string(),
                format!("{}%", b.percent_of_total),
            ]
        })
        .collect();
    ReportSection::table(
        "Sleep Posture Distribution",
        &["Posture", "Count", percent_label],
        rows,
    )
}

fn health_summary(
    p: &PatientInfo,
    latest: Option<&VitalReading>,
    window: &[VitalReading],
) -> Vec<String> {
    let temperature = match latest.and_then(|r| r.temperature_c) {
        Some(t) if is_high_temperature(t) => "Elevated Temperature",
        _ => "Normal Temperature",
    };
    let heart_rate = match latest.and_then(|r| r.heart_rate_bpm) {
        Some(hr) if hr > HEART_RATE_HIGH_BPM => "Elevated",
        Some(hr) if hr < HEART_RATE_LOW_BPM => "Low",
        Some(_) => "Normal",
        None => NOT_AVAILABLE,
    };
    let spo2 = match latest.and_then(|r| r.spo2_percent) {
        Some(s) if is_low_spo2(s) => "Below Normal",
        Some(_) => "Normal",
        None => NOT_AVAILABLE,
    };
    let posture = most_common_posture(window)
        .map_or_else(|| NOT_AVAILABLE.to_string(), |p| p.label().to_string());

    vec![
        format!("Patient: {} ({})", p.name, p.patient_id),
        format!("Current Status: {}", temperature),
        format!("Heart Rate: {}", heart_rate),
        format!("Oxygen Saturation: {}", spo2),
        format!("Most Common Sleep Position: {}", posture),
    ]
}

fn fmt_temperature(t: Option<f64>) -> String {
    t.map_or_else(|| PLACEHOLDER.to_string(), |t| format!("{}°C", t))
}
