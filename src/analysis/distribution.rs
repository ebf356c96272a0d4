// Posture distribution over the fixed categories Right, Left, Supine.

use crate::models::{Posture, PostureBucket, PostureDistribution, VitalReading};

/// Absent and unrecognized postures are dropped from every bucket and from the total.
pub fn distribute(readings: &[VitalReading]) -> PostureDistribution {
    let mut counts = [0u32; 3];
    for p in readings.iter().filter_map(|r| r.posture.as_ref()) {
        if let Some(i) = Posture::CATEGORIES.iter().position(|c| c == p) {
            counts[i] += 1;
        }
    }
    let total: u32 = counts.iter().sum();
    let buckets = Posture::CATEGORIES
        .iter()
        .zip(counts)
        .map(|(posture, count)| PostureBucket {
            posture: posture.clone(),
            count,
            percent_of_total: percent_half_up(count, total),
        })
        .collect();
    PostureDistribution { total, buckets }
}

/// round(count / total * 100), halves rounded up; 0 when total is 0.
fn percent_half_up(count: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let (count, total) = (count as u64, total as u64);
    ((count * 200 + total) / (2 * total)) as u32
}
