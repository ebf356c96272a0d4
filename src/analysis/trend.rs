// Historical aggregation: average temperature, most common posture, flagged window.

use serde::Deserialize;

use super::thresholds::is_flagged;
use crate::models::{Posture, TrendSummary, VitalReading};

/// How readings without a temperature take part in the average.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AverageMode {
    /// Missing temperatures count as 0 and stay in the denominator.
    #[default]
    ZeroFill,
    /// Only readings that carry a temperature are averaged.
    ExcludeMissing,
}

pub fn summarize(readings: &[VitalReading]) -> TrendSummary {
    summarize_with(readings, AverageMode::default())
}

pub fn summarize_with(readings: &[VitalReading], mode: AverageMode) -> TrendSummary {
    TrendSummary {
        average_temperature_c: average_temperature(readings, mode),
        most_common_posture: most_common_posture(readings),
        any_flagged: readings.iter().any(is_flagged),
    }
}

pub fn average_temperature(readings: &[VitalReading], mode: AverageMode) -> Option<f64> {
    match mode {
        AverageMode::ZeroFill => {
            if readings.is_empty() {
                return None;
            }
            let sum: f64 = readings.iter().map(|r| r.temperature_c.unwrap_or(0.0)).sum();
            Some(sum / readings.len() as f64)
        }
        AverageMode::ExcludeMissing => {
            let temps: Vec<f64> = readings.iter().filter_map(|r| r.temperature_c).collect();
            if temps.is_empty() {
                return None;
            }
            Some(temps.iter().sum::<f64>() / temps.len() as f64)
        }
    }
}

/// Highest-count posture among present values (recognized or not). Ties go to the value
/// seen first in `readings`.
pub fn most_common_posture(readings: &[VitalReading]) -> Option<Posture> {
    // Insertion-ordered tally; windows are small so a linear scan is fine.
    let mut tally: Vec<(&Posture, u32)> = Vec::new();
    for p in readings.iter().filter_map(|r| r.posture.as_ref()) {
        match tally.iter_mut().find(|(seen, _)| *seen == p) {
            Some((_, n)) => *n += 1,
            None => tally.push((p, 1)),
        }
    }
    let mut best: Option<(&Posture, u32)> = None;
    for (p, n) in tally {
        if best.is_none_or(|(_, max)| n > max) {
            best = Some((p, n));
        }
    }
    best.map(|(p, _)| p.clone())
}
