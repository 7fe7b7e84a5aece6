use std::cmp::Ordering;

use serde::Serialize;

/// Descriptive statistics over the valid scores of one assignment.
/// An empty input yields the all-zero record by convention, not an error:
/// "nobody graded yet" is an answer, not a failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub average: f64,
    pub max: f64,
    pub min: f64,
    pub median: f64,
    pub count: usize,
}

/// Unit-bucket frequency histogram: one bucket per integer score between
/// `min_score` and `max_score` inclusive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    pub freq: Vec<u32>,
    #[serde(rename = "minScore")]
    pub min_score: i64,
    #[serde(rename = "maxScore")]
    pub max_score: i64,
}

/// Fixed-bin histogram: ten uniform-width bins plus a final overflow bin
/// that the maximum always lands in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Histogram {
    pub freq: Vec<u32>,
    pub bin_width: f64,
    pub min: f64,
    pub max: f64,
}

const HISTOGRAM_BINS: usize = 10;

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Mean/median/min/max/count over already-filtered scores. Average and
/// median are rounded to two decimals for presentation.
pub fn summarize(scores: &[f64]) -> Stats {
    if scores.is_empty() {
        return Stats {
            average: 0.0,
            max: 0.0,
            min: 0.0,
            median: 0.0,
            count: 0,
        };
    }

    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let sum: f64 = sorted.iter().sum();
    let count = sorted.len();

    Stats {
        average: round2(sum / count as f64),
        max: sorted[count - 1],
        min: sorted[0],
        median: round2(median(&sorted)),
        count,
    }
}

/// One bucket per integer score value. Scores are rounded to the nearest
/// integer before binning; bounds derive from the same data, so the range
/// is inclusive and exhaustive by construction.
pub fn unit_distribution(scores: &[f64]) -> Distribution {
    if scores.is_empty() {
        return Distribution {
            freq: Vec::new(),
            min_score: 0,
            max_score: 0,
        };
    }

    let rounded: Vec<i64> = scores.iter().map(|s| s.round() as i64).collect();
    let min_score = rounded.iter().copied().min().unwrap_or(0);
    let max_score = rounded.iter().copied().max().unwrap_or(0);
    let range = (max_score - min_score + 1) as usize;

    let mut freq = vec![0u32; range];
    for s in &rounded {
        freq[(s - min_score) as usize] += 1;
    }

    Distribution {
        freq,
        min_score,
        max_score,
    }
}

/// Ten uniform bins over `[min, max]` plus the overflow bin. The maximum is
/// forced into the last bin so floating-point bin widths can never drop a
/// boundary score. A degenerate range (all scores equal) collapses into the
/// first bin.
pub fn tenths_histogram(scores: &[f64]) -> Histogram {
    if scores.is_empty() {
        return Histogram {
            freq: Vec::new(),
            bin_width: 0.0,
            min: 0.0,
            max: 0.0,
        };
    }

    let min = scores.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let bin_width = (max - min) / HISTOGRAM_BINS as f64;

    let mut freq = vec![0u32; HISTOGRAM_BINS + 1];
    for &s in scores {
        let idx = if bin_width <= 0.0 {
            0
        } else if s >= max {
            HISTOGRAM_BINS
        } else {
            (((s - min) / bin_width).floor() as usize).min(HISTOGRAM_BINS)
        };
        freq[idx] += 1;
    }

    Histogram {
        freq,
        bin_width,
        min,
        max,
    }
}
