//! PM10/PM2.5 grade classification.
//!
//! Pure and deterministic. The canonical thresholds are the 8-tier
//! WHO-derived scale (2021 revision); each pollutant is classified against
//! its own column of `<=` cutoffs and the worse pollutant decides the final
//! tier.

use crate::model::GradeInfo;

struct GradeBand {
    pm10_max: u32,
    pm25_max: u32,
    emoji: &'static str,
    color: &'static str,
}

/// Ascending upper bounds; index + 1 is the tier.
const BANDS: [GradeBand; 8] = [
    GradeBand { pm10_max: 15, pm25_max: 8, emoji: "😊", color: "#4E7BEE" },
    GradeBand { pm10_max: 30, pm25_max: 15, emoji: "🙂", color: "#50A0E5" },
    GradeBand { pm10_max: 40, pm25_max: 20, emoji: "😐", color: "#53B77C" },
    GradeBand { pm10_max: 50, pm25_max: 25, emoji: "🤔", color: "#00B700" },
    GradeBand { pm10_max: 75, pm25_max: 37, emoji: "😕", color: "#FF8C00" },
    GradeBand { pm10_max: 100, pm25_max: 50, emoji: "😫", color: "#FF5400" },
    GradeBand { pm10_max: 150, pm25_max: 75, emoji: "😱", color: "#FF0000" },
    GradeBand { pm10_max: u32::MAX, pm25_max: u32::MAX, emoji: "💀", color: "#960018" },
];

/// Tier below which no warning is attached.
const WARNING_TIER: u8 = 5;

/// Classify a pair of concentrations (µg/m³) into a severity tier.
pub fn classify(pm10: u32, pm25: u32) -> GradeInfo {
    let pm10_tier = tier_for(pm10, |band| band.pm10_max);
    let pm25_tier = tier_for(pm25, |band| band.pm25_max);

    let tier = pm10_tier.max(pm25_tier);
    let band = &BANDS[usize::from(tier - 1)];

    GradeInfo {
        tier,
        emoji: band.emoji,
        color: band.color,
        warning: warning_message(tier),
    }
}

fn tier_for(value: u32, bound: impl Fn(&GradeBand) -> u32) -> u8 {
    for (index, band) in BANDS.iter().enumerate() {
        if value <= bound(band) {
            return (index + 1) as u8;
        }
    }
    BANDS.len() as u8
}

/// Human warning keyed by tier: silent below tier 5, escalating above.
pub fn warning_message(tier: u8) -> &'static str {
    match tier {
        t if t < WARNING_TIER => "",
        5 => "민감군은 실외활동을 자제하세요!",
        _ => "외출을 삼가세요!",
    }
}
