// Trend summary and posture distribution over a window of readings

use serde::Serialize;

use super::{AlertView, Posture, VitalReading};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSummary {
    /// None when the window is empty (or, when excluding missing, has no temperatures).
    pub average_temperature_c: Option<f64>,
    pub most_common_posture: Option<Posture>,
    pub any_flagged: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostureBucket {
    pub posture: Posture,
    pub count: u32,
    pub percent_of_total: u32,
}

/// Always one bucket per fixed category, in order Right, Left, Supine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostureDistribution {
    pub total: u32,
    pub buckets: Vec<PostureBucket>,
}

impl PostureDistribution {
    pub fn bucket(&self, posture: &Posture) -> Option<&PostureBucket> {
        self.buckets.iter().find(|b| &b.posture == posture)
    }
}

/// Pushed to live subscribers: one new reading with its alerts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveUpdate {
    pub reading: VitalReading,
    pub alerts: Vec<AlertView>,
}
