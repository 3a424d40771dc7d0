//! Reviewer scores and the ranking-score aggregation.
//!
//! Five fixed criteria, each scored 0-10. The ranking score is the
//! weighted mean rounded to 4 decimal places; weights come from explicit
//! configuration, never from ambient state.

use serde::{Deserialize, Serialize};

use super::error::WorkflowError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSet {
    pub originality: f64,
    pub objectivity: f64,
    pub organization: f64,
    pub methodology: f64,
    pub goal_adherence: f64,
}

impl ScoreSet {
    fn entries(&self) -> [(&'static str, f64); 5] {
        [
            ("originality", self.originality),
            ("objectivity", self.objectivity),
            ("organization", self.organization),
            ("methodology", self.methodology),
            ("goal_adherence", self.goal_adherence),
        ]
    }

    /// Every criterion must be a real number in [0, 10].
    pub fn validate(&self) -> Result<(), WorkflowError> {
        for (name, value) in self.entries() {
            if !value.is_finite() || !(0.0..=10.0).contains(&value) {
                return Err(WorkflowError::Validation(format!(
                    "score out of range (0-10): {}",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Per-criterion weights, default 1 each. Supplied by the host
/// configuration and read-only here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingWeights {
    pub originality: f64,
    pub objectivity: f64,
    pub organization: f64,
    pub methodology: f64,
    pub goal_adherence: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            originality: 1.0,
            objectivity: 1.0,
            organization: 1.0,
            methodology: 1.0,
            goal_adherence: 1.0,
        }
    }
}

impl RankingWeights {
    fn entries(&self) -> [f64; 5] {
        [
            self.originality,
            self.objectivity,
            self.organization,
            self.methodology,
            self.goal_adherence,
        ]
    }
}

/// Weighted mean of the five criterion scores, rounded to 4 decimal
/// places. A zero total weight yields 0.
pub fn aggregate(scores: &ScoreSet, weights: &RankingWeights) -> f64 {
    let w = weights.entries();
    let s = [
        scores.originality,
        scores.objectivity,
        scores.organization,
        scores.methodology,
        scores.goal_adherence,
    ];

    let total_weight: f64 = w.iter().sum();
    if total_weight <= 0.0 {
        return 0.0;
    }

    let weighted_sum: f64 = s.iter().zip(w.iter()).map(|(s, w)| s * w).sum();
    (weighted_sum / total_weight * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all(value: f64) -> ScoreSet {
        ScoreSet {
            originality: value,
            objectivity: value,
            organization: value,
            methodology: value,
            goal_adherence: value,
        }
    }

    #[test]
    fn perfect_scores_aggregate_to_ten_under_any_positive_weights() {
        let scores = all(10.0);
        assert_eq!(aggregate(&scores, &RankingWeights::default()), 10.0);

        let skewed = RankingWeights {
            originality: 3.0,
            objectivity: 0.5,
            organization: 2.0,
            methodology: 1.0,
            goal_adherence: 7.0,
        };
        assert_eq!(aggregate(&scores, &skewed), 10.0);
    }

    #[test]
    fn zero_total_weight_yields_zero() {
        let weights = RankingWeights {
            originality: 0.0,
            objectivity: 0.0,
            organization: 0.0,
            methodology: 0.0,
            goal_adherence: 0.0,
        };
        assert_eq!(aggregate(&all(8.0), &weights), 0.0);
    }

    #[test]
    fn weighted_mean_and_rounding() {
        let scores = ScoreSet {
            originality: 10.0,
            objectivity: 5.0,
            organization: 5.0,
            methodology: 5.0,
            goal_adherence: 5.0,
        };
        // Equal weights: (10 + 5*4) / 5 = 6.
        assert_eq!(aggregate(&scores, &RankingWeights::default()), 6.0);

        // Originality weighted double: (20 + 20) / 6 = 6.6667 after rounding.
        let weights = RankingWeights {
            originality: 2.0,
            ..RankingWeights::default()
        };
        assert_eq!(aggregate(&scores, &weights), 6.6667);
    }

    #[test]
    fn out_of_range_scores_fail_validation() {
        assert!(all(0.0).validate().is_ok());
        assert!(all(10.0).validate().is_ok());
        assert!(all(10.1).validate().is_err());
        assert!(all(-0.5).validate().is_err());
        assert!(all(f64::NAN).validate().is_err());
    }
}
