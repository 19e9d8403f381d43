//! Duration sample reduction

use serde::Serialize;

use crate::common::config::TrimPolicy;
use crate::common::{Error, Result};

/// Average, minimum and maximum of a sample set
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    /// Samples that went into the summary
    pub count: usize,
}

/// Apply `policy` to `samples`, keeping the order of what remains
pub fn trim(samples: &[f64], policy: TrimPolicy) -> Vec<f64> {
    let mut kept = samples.to_vec();
    match policy {
        TrimPolicy::None => {}
        TrimPolicy::DropFirst => {
            if !kept.is_empty() {
                kept.remove(0);
            }
        }
        TrimPolicy::DropLast => {
            kept.pop();
        }
        TrimPolicy::DropFirstLast => {
            if !kept.is_empty() {
                kept.remove(0);
            }
            kept.pop();
        }
        TrimPolicy::DropMinMax => {
            if let Some(i) = position_of(&kept, |a, b| a < b) {
                kept.remove(i);
            }
            if let Some(i) = position_of(&kept, |a, b| a > b) {
                kept.remove(i);
            }
        }
    }
    kept
}

/// Index of the first sample that no other sample beats under `better`
fn position_of(samples: &[f64], better: impl Fn(f64, f64) -> bool) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &value) in samples.iter().enumerate() {
        match best {
            Some(b) if !better(value, samples[b]) => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Reduce samples to average, minimum and maximum
pub fn summarize(samples: &[f64]) -> Result<Summary> {
    if samples.is_empty() {
        return Err(Error::NotEnoughSamples { samples: 0 });
    }

    let sum: f64 = samples.iter().sum();
    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Ok(Summary {
        avg: sum / samples.len() as f64,
        min,
        max,
        count: samples.len(),
    })
}

/// Trim then summarize
pub fn reduce(samples: &[f64], policy: TrimPolicy) -> Result<Summary> {
    let kept = trim(samples, policy);
    if kept.is_empty() {
        return Err(Error::NotEnoughSamples {
            samples: samples.len(),
        });
    }
    summarize(&kept)
}
