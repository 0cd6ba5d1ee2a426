use super::error::InvalidScoreError;
use super::history::HistoryStore;
use super::models::{CategoryAggregate, CheckStatus, HealthCheckResult, Trend};
use serde::{Deserialize, Serialize};

pub const MAX_SCORE: u8 = 100;

/// Status cut-offs shared by every check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Thresholds {
    pub healthy: u8,
    pub warning: u8,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            healthy: 90,
            warning: 75,
        }
    }
}

impl Thresholds {
    pub fn status_for(&self, score: u8) -> CheckStatus {
        if score >= self.healthy {
            CheckStatus::Healthy
        } else if score >= self.warning {
            CheckStatus::Warning
        } else {
            CheckStatus::Critical
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedScore {
    pub score: u8,
    /// Original value when it had to be clamped into range.
    pub clamped_from: Option<f64>,
}

/// Rounds a raw score to an integer in `0..=100`.
///
/// Out-of-range values are clamped; NaN and infinities are rejected so they can
/// be kept out of every mean.
pub fn normalize_score(raw: f64) -> Result<NormalizedScore, InvalidScoreError> {
    if !raw.is_finite() {
        return Err(InvalidScoreError::NonNumeric);
    }
    let rounded = raw.round();
    if rounded < 0.0 || rounded > MAX_SCORE as f64 {
        tracing::warn!(raw, "{}", InvalidScoreError::OutOfRange(raw));
        return Ok(NormalizedScore {
            score: rounded.clamp(0.0, MAX_SCORE as f64) as u8,
            clamped_from: Some(raw),
        });
    }
    Ok(NormalizedScore {
        score: rounded as u8,
        clamped_from: None,
    })
}

/// Symmetric rule: improving above `previous + delta`, declining below
/// `previous - delta`, stable otherwise. With delta 2, 80 then 79 is stable.
pub fn classify_trend(current: u8, previous: Option<u8>, delta: u8) -> Trend {
    let Some(previous) = previous else {
        return Trend::Stable;
    };
    let (current, previous, delta) = (current as i16, previous as i16, delta as i16);
    if current > previous + delta {
        Trend::Improving
    } else if current < previous - delta {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// Rounded arithmetic mean, `None` when there is nothing to average.
pub fn mean_score<I>(scores: I) -> Option<u8>
where
    I: IntoIterator<Item = u8>,
{
    let (sum, count) = scores
        .into_iter()
        .fold((0u64, 0u64), |(sum, count), s| (sum + s as u64, count + 1));
    if count == 0 {
        return None;
    }
    Some((sum as f64 / count as f64).round() as u8)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub status: CheckStatus,
    pub trend: Trend,
    pub previous_score: Option<u8>,
}

#[derive(Debug, Clone, Copy)]
pub struct Scorer {
    thresholds: Thresholds,
    trend_delta: u8,
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(Thresholds::default(), 2)
    }
}

impl Scorer {
    pub fn new(thresholds: Thresholds, trend_delta: u8) -> Self {
        Self {
            thresholds,
            trend_delta,
        }
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Status and trend for a fresh score, read against history before this
    /// run's append. A missing score is critical and never trends.
    pub fn classify(&self, check_id: &str, score: Option<u8>, history: &HistoryStore) -> Classification {
        let previous_score = history.latest(check_id);
        match score {
            Some(score) => Classification {
                status: self.thresholds.status_for(score),
                trend: classify_trend(score, previous_score, self.trend_delta),
                previous_score,
            },
            None => Classification {
                status: CheckStatus::Critical,
                trend: Trend::Stable,
                previous_score,
            },
        }
    }

    /// Overall score across all valid scores plus how many contributed.
    pub fn overall(&self, results: &[HealthCheckResult]) -> (u8, usize, CheckStatus) {
        let scored: Vec<u8> = results.iter().filter_map(|r| r.score).collect();
        match mean_score(scored.iter().copied()) {
            Some(score) => (score, scored.len(), self.thresholds.status_for(score)),
            None => (0, 0, CheckStatus::Critical),
        }
    }
}

/// One aggregate per category, in the order given. Categories with no usable
/// score report 0 with `has_data == false`.
pub fn aggregate_categories(
    categories: &[String],
    results: &[HealthCheckResult],
) -> Vec<CategoryAggregate> {
    categories
        .iter()
        .map(|category| {
            let members: Vec<&HealthCheckResult> =
                results.iter().filter(|r| &r.category == category).collect();
            let count = |status: CheckStatus| members.iter().filter(|r| r.status == status).count();
            let mean = mean_score(members.iter().filter_map(|r| r.score));

            CategoryAggregate {
                category: category.clone(),
                total: members.len(),
                healthy: count(CheckStatus::Healthy),
                warning: count(CheckStatus::Warning),
                critical: count(CheckStatus::Critical),
                score: mean.unwrap_or(0),
                has_data: mean.is_some(),
            }
        })
        .collect()
}
