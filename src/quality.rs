//! Quality & value model (spec.md §4.4).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QualityModel {
    Off,
    Monotonic,
    Band,
}

impl Default for QualityModel {
    fn default() -> Self {
        QualityModel::Monotonic
    }
}

/// Maps an incidence angle to a quality score in `[0, 1]` (spec.md §4.4).
/// `incidence_deg` may be `None` when geometry is unavailable, in which
/// case the result is neutral (`1.0`).
pub fn quality(
    model: QualityModel,
    incidence_deg: Option<f64>,
    ideal_incidence_deg: f64,
    band_width_deg: f64,
) -> f64 {
    let Some(alpha) = incidence_deg else {
        return 1.0;
    };
    match model {
        QualityModel::Off => 1.0,
        QualityModel::Monotonic => (-0.02 * alpha.abs()).exp(),
        QualityModel::Band => {
            let z = (alpha.abs() - ideal_incidence_deg) / band_width_deg;
            (-(z * z)).exp()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiCriteriaWeights {
    pub priority: f64,
    pub geometry: f64,
    pub timing: f64,
}

impl MultiCriteriaWeights {
    pub fn balanced() -> Self {
        MultiCriteriaWeights { priority: 0.4, geometry: 0.4, timing: 0.2 }
    }

    pub fn priority_first() -> Self {
        MultiCriteriaWeights { priority: 0.7, geometry: 0.2, timing: 0.1 }
    }

    pub fn quality_first() -> Self {
        MultiCriteriaWeights { priority: 0.2, geometry: 0.7, timing: 0.1 }
    }

    pub fn urgent() -> Self {
        MultiCriteriaWeights { priority: 0.3, geometry: 0.2, timing: 0.5 }
    }

    pub fn archival() -> Self {
        MultiCriteriaWeights { priority: 0.5, geometry: 0.4, timing: 0.1 }
    }

    pub fn from_preset(name: &str) -> Option<Self> {
        match name {
            "balanced" => Some(Self::balanced()),
            "priority_first" => Some(Self::priority_first()),
            "quality_first" => Some(Self::quality_first()),
            "urgent" => Some(Self::urgent()),
            "archival" => Some(Self::archival()),
            _ => None,
        }
    }

    /// Clamps negative weights to zero, then normalises to sum to 1.
    /// All-zero weights normalise to equal thirds (spec.md §4.4 edge
    /// cases).
    pub fn normalized(&self) -> (f64, f64, f64) {
        let p = self.priority.max(0.0);
        let g = self.geometry.max(0.0);
        let t = self.timing.max(0.0);
        let sum = p + g + t;
        if sum <= 0.0 {
            (1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0)
        } else {
            (p / sum, g / sum, t / sum)
        }
    }
}

impl Default for MultiCriteriaWeights {
    fn default() -> Self {
        Self::balanced()
    }
}

/// Linear priority term: `priority in {1..5} -> (5 - priority) / 4`, so
/// priority 1 (highest) maps to 1.0 (spec.md §4.4).
pub fn priority_term(priority: u8) -> f64 {
    let p = priority.clamp(1, 5) as f64;
    (5.0 - p) / 4.0
}

/// Timing term from an opportunity's chronological rank `k` (0-indexed)
/// among `total` opportunities for the same (satellite, target) pair:
/// earlier ranks score higher. `total == 1` always scores `1.0`.
pub fn timing_term(rank: usize, total: usize) -> f64 {
    if total <= 1 {
        return 1.0;
    }
    (total - 1 - rank) as f64 / (total - 1) as f64
}

/// Composite value: convex combination of priority, geometry, and timing
/// terms under normalised weights (spec.md §4.4).
pub fn composite_value(
    weights: &MultiCriteriaWeights,
    priority: u8,
    quality_score: f64,
    rank: usize,
    total: usize,
) -> f64 {
    let (w_p, w_g, w_t) = weights.normalized();
    w_p * priority_term(priority) + w_g * quality_score + w_t * timing_term(rank, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_monotonic_is_strictly_decreasing() {
        let q10 = quality(QualityModel::Monotonic, Some(10.0), 35.0, 7.5);
        let q20 = quality(QualityModel::Monotonic, Some(20.0), 35.0, 7.5);
        let q30 = quality(QualityModel::Monotonic, Some(30.0), 35.0, 7.5);
        assert!(q10 > q20);
        assert!(q20 > q30);
    }

    #[test]
    fn test_band_peaks_at_ideal() {
        let at_ideal = quality(QualityModel::Band, Some(35.0), 35.0, 7.5);
        let off_ideal = quality(QualityModel::Band, Some(20.0), 35.0, 7.5);
        assert_abs_diff_eq!(at_ideal, 1.0, epsilon = 1e-9);
        assert!(off_ideal < at_ideal);
    }

    #[test]
    fn test_missing_incidence_is_neutral() {
        assert_eq!(quality(QualityModel::Monotonic, None, 35.0, 7.5), 1.0);
    }

    #[test]
    fn test_all_zero_weights_are_equal_thirds() {
        let w = MultiCriteriaWeights { priority: 0.0, geometry: 0.0, timing: 0.0 };
        let (p, g, t) = w.normalized();
        assert_abs_diff_eq!(p, 1.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(g, 1.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(t, 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_negative_weights_clamp_to_zero() {
        let w = MultiCriteriaWeights { priority: -1.0, geometry: 1.0, timing: 0.0 };
        let (p, g, _t) = w.normalized();
        assert_eq!(p, 0.0);
        assert_eq!(g, 1.0);
    }

    #[test]
    fn test_priority_normalisation_property() {
        // spec.md §8: value for (priority=1, q=1, tim=1) under balanced
        // weights equals 1 within 1e-9.
        let w = MultiCriteriaWeights::balanced();
        let v = composite_value(&w, 1, 1.0, 0, 1);
        assert_abs_diff_eq!(v, 1.0, epsilon = 1e-9);
    }
}
