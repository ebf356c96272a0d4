// Threshold evaluation of one reading. Pure; strict inequalities at every boundary.

use crate::models::{AlertCondition, MissingData, VitalField, VitalReading};

/// Above this (strictly) the temperature is high.
pub const HIGH_TEMPERATURE_C: f64 = 37.5;
/// Below this (strictly) the temperature is low.
pub const LOW_TEMPERATURE_C: f64 = 35.0;
/// Below this (strictly) SpO2 is low.
pub const LOW_SPO2_PERCENT: f64 = 95.0;

/// Alerts for `reading`: missing-data checks first (temperature, heart rate, SpO2, posture),
/// then high temperature, low temperature, low SpO2, abnormal posture.
pub fn evaluate(reading: Option<&VitalReading>) -> Vec<AlertCondition> {
    let Some(r) = reading else {
        return vec![AlertCondition::MissingData(MissingData::Reading)];
    };

    let mut out = Vec::new();
    let missing = [
        (VitalField::Temperature, r.temperature_c.is_none()),
        (VitalField::HeartRate, r.heart_rate_bpm.is_none()),
        (VitalField::Spo2, r.spo2_percent.is_none()),
        (VitalField::Posture, r.posture.is_none()),
    ];
    for (field, absent) in missing {
        if absent {
            out.push(AlertCondition::MissingData(MissingData::Field(field)));
        }
    }

    if let Some(t) = r.temperature_c {
        if is_high_temperature(t) {
            out.push(AlertCondition::HighTemperature);
        }
        if t < LOW_TEMPERATURE_C {
            out.push(AlertCondition::LowTemperature);
        }
    }
    if r.spo2_percent.is_some_and(is_low_spo2) {
        out.push(AlertCondition::LowSpo2);
    }
    if r.posture.as_ref().is_some_and(|p| !p.is_recognized()) {
        out.push(AlertCondition::AbnormalPosture);
    }
    out
}

pub fn is_high_temperature(t: f64) -> bool {
    t > HIGH_TEMPERATURE_C
}

pub fn is_low_spo2(s: f64) -> bool {
    s < LOW_SPO2_PERCENT
}

/// True when the reading breaches the high-temperature or low-SpO2 threshold.
pub fn is_flagged(r: &VitalReading) -> bool {
    r.temperature_c.is_some_and(is_high_temperature) || r.spo2_percent.is_some_and(is_low_spo2)
}
