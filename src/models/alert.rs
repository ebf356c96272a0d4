// Alert conditions derived from a single reading

use serde::Serialize;

/// Measured fields, in the order missing-data checks are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum VitalField {
    Temperature,
    HeartRate,
    Spo2,
    Posture,
}

/// What is missing: the whole reading, or one field of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "missing", content = "field")]
pub enum MissingData {
    Reading,
    Field(VitalField),
}

/// Recomputed on every evaluation; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "detail")]
pub enum AlertCondition {
    MissingData(MissingData),
    HighTemperature,
    LowTemperature,
    LowSpo2,
    AbnormalPosture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl AlertCondition {
    /// Caregiver-facing text.
    pub fn message(&self) -> &'static str {
        match self {
            AlertCondition::MissingData(MissingData::Reading) => "No vitals data available.",
            AlertCondition::MissingData(MissingData::Field(VitalField::Temperature)) => {
                "Temperature data missing."
            }
            AlertCondition::MissingData(MissingData::Field(VitalField::HeartRate)) => {
                "Heart rate data missing."
            }
            AlertCondition::MissingData(MissingData::Field(VitalField::Spo2)) => {
                "SpO2 data missing."
            }
            AlertCondition::MissingData(MissingData::Field(VitalField::Posture)) => {
                "Sleep posture data missing."
            }
            AlertCondition::HighTemperature => "High temperature detected!",
            AlertCondition::LowTemperature => "Low temperature detected!",
            AlertCondition::LowSpo2 => "Low SpO2 detected!",
            AlertCondition::AbnormalPosture => "Abnormal sleep posture detected!",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            AlertCondition::MissingData(_) => Severity::Low,
            AlertCondition::AbnormalPosture => Severity::Medium,
            AlertCondition::HighTemperature
            | AlertCondition::LowTemperature
            | AlertCondition::LowSpo2 => Severity::High,
        }
    }
}

/// Alert as sent to clients: the condition plus its rendered text and severity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertView {
    pub condition: AlertCondition,
    pub message: &'static str,
    pub severity: Severity,
}

impl From<AlertCondition> for AlertView {
    fn from(condition: AlertCondition) -> Self {
        Self {
            condition,
            message: condition.message(),
            severity: condition.severity(),
        }
    }
}
