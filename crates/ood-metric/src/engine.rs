//! Summary detection metrics over pooled anomaly scores.
//!
//! The OOD class is the positive class. Scores are swept from the highest to
//! the lowest distinct value with `score >= threshold` as the positive decision.

use std::cmp::Ordering;

use crate::{
    aggregator::ScorePool,
    error::{MetricError, MetricResult},
};

/// True-positive rate at which the false-positive rate is reported.
pub const TARGET_TPR: f64 = 0.95;

/// Final numbers of one evaluation run, as fractions in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionMetrics {
    /// Area under the precision-recall curve (average precision).
    pub auprc: f64,
    /// False-positive rate where the true-positive rate first reaches 95%.
    pub fpr_at_95_tpr: f64,
}

/// Cumulative counts at one distinct threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SweepPoint {
    true_positives: usize,
    false_positives: usize,
}

/// Computes AUPRC and FPR@95%TPR from a score pool.
pub struct MetricEngine;

impl MetricEngine {
    /// Finalizes a pool into summary metrics.
    ///
    /// Scores are laid out in-distribution first, then out-of-distribution,
    /// with the parallel label vector `[0, .., 0, 1, .., 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::InsufficientData`] if either pool is empty and
    /// [`MetricError::NonFiniteScore`] if any score is NaN.
    pub fn finalize(pool: &ScorePool) -> MetricResult<DetectionMetrics> {
        if pool.ood.is_empty() || pool.id.is_empty() {
            return Err(MetricError::InsufficientData {
                ood: pool.ood.len(),
                id: pool.id.len(),
            });
        }

        let scores: Vec<f32> = pool.id.iter().chain(&pool.ood).copied().collect();
        let labels: Vec<bool> = std::iter::repeat(false)
            .take(pool.id.len())
            .chain(std::iter::repeat(true).take(pool.ood.len()))
            .collect();

        Ok(DetectionMetrics {
            auprc: average_precision(&scores, &labels)?,
            fpr_at_95_tpr: fpr_at_tpr(&scores, &labels, TARGET_TPR)?,
        })
    }
}

/// Area under the precision-recall curve by the step rule.
///
/// `AP = sum_k (R_k - R_{k-1}) * P_k` over distinct thresholds in descending
/// order, with `R_0 = 0`.
///
/// # Errors
///
/// Returns an error if there are no positive or no negative labels, or if a
/// score is NaN.
pub fn average_precision(scores: &[f32], labels: &[bool]) -> MetricResult<f64> {
    let (points, positives, _) = sweep(scores, labels)?;

    let mut ap = 0.0;
    let mut previous_recall = 0.0;
    for point in points {
        let tp = point.true_positives as f64;
        let precision = tp / (point.true_positives + point.false_positives) as f64;
        let recall = tp / positives as f64;
        ap += (recall - previous_recall) * precision;
        previous_recall = recall;
    }

    Ok(ap)
}

/// False-positive rate at the highest threshold whose true-positive rate
/// reaches `target_tpr`.
///
/// # Errors
///
/// Returns an error if there are no positive or no negative labels, if a
/// score is NaN, or if `target_tpr` is outside `(0, 1]`.
pub fn fpr_at_tpr(scores: &[f32], labels: &[bool], target_tpr: f64) -> MetricResult<f64> {
    if !(target_tpr > 0.0 && target_tpr <= 1.0) {
        return Err(MetricError::InvalidConfiguration {
            reason: format!("target TPR must lie in (0, 1], got {target_tpr}"),
        });
    }

    let (points, positives, negatives) = sweep(scores, labels)?;

    let hit = points
        .iter()
        .find(|point| point.true_positives as f64 / positives as f64 >= target_tpr)
        .copied()
        // The lowest threshold accepts every positive.
        .unwrap_or(SweepPoint {
            true_positives: positives,
            false_positives: negatives,
        });

    Ok(hit.false_positives as f64 / negatives as f64)
}

/// Sorts scores descending and returns cumulative counts at the end of every
/// group of equal scores, plus the positive and negative totals.
fn sweep(scores: &[f32], labels: &[bool]) -> MetricResult<(Vec<SweepPoint>, usize, usize)> {
    if scores.len() != labels.len() {
        return Err(MetricError::InvalidTensorShape {
            expected: format!("{} labels", scores.len()),
            actual: format!("{} labels", labels.len()),
        });
    }

    let nan_count = scores.iter().filter(|s| s.is_nan()).count();
    if nan_count > 0 {
        return Err(MetricError::NonFiniteScore { count: nan_count });
    }

    let positives = labels.iter().filter(|&&l| l).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(MetricError::InsufficientData {
            ood: positives,
            id: negatives,
        });
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(Ordering::Equal));

    let mut points = Vec::new();
    let mut true_positives = 0;
    let mut false_positives = 0;
    for (rank, &index) in order.iter().enumerate() {
        if labels[index] {
            true_positives += 1;
        } else {
            false_positives += 1;
        }

        let group_ends = order
            .get(rank + 1)
            .is_none_or(|&next| scores[next] != scores[index]);
        if group_ends {
            points.push(SweepPoint {
                true_positives,
                false_positives,
            });
        }
    }

    Ok((points, positives, negatives))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rstest::rstest;

    use super::*;

    fn pool(ood: &[f32], id: &[f32]) -> ScorePool {
        ScorePool {
            ood: ood.to_vec(),
            id: id.to_vec(),
        }
    }

    #[test]
    fn perfectly_separated_pool_scores_perfectly() {
        // Image A of the two-image scenario; image B contributes nothing.
        let metrics = MetricEngine::finalize(&pool(&[0.9, 0.8], &[0.1, 0.2])).unwrap();

        assert_eq!(metrics.auprc, 1.0);
        assert_eq!(metrics.fpr_at_95_tpr, 0.0);
    }

    #[test]
    fn finalize_is_deterministic() {
        let data = pool(&[0.9, 0.3, 0.8, 0.55], &[0.1, 0.6, 0.2, 0.35, 0.8]);
        let first = MetricEngine::finalize(&data).unwrap();
        let second = MetricEngine::finalize(&data).unwrap();

        assert_eq!(first.auprc.to_bits(), second.auprc.to_bits());
        assert_eq!(first.fpr_at_95_tpr.to_bits(), second.fpr_at_95_tpr.to_bits());
    }

    #[test]
    fn average_precision_matches_reference_value() {
        // scikit-learn: average_precision_score([0, 0, 1, 1], [0.1, 0.4, 0.35, 0.8])
        let ap = average_precision(&[0.1, 0.4, 0.35, 0.8], &[false, false, true, true]).unwrap();
        assert_relative_eq!(ap, 0.833_333_333_333_333_4, epsilon = 1e-12);
    }

    #[test]
    fn average_precision_groups_tied_scores() {
        // A single threshold covering everything: precision 0.5 at recall 1.
        let ap = average_precision(&[0.5; 4], &[true, false, true, false]).unwrap();
        assert_relative_eq!(ap, 0.5, epsilon = 1e-12);
    }

    #[rstest]
    // TPR reaches 1.0 only at 0.3, where two of four negatives are above.
    #[case(&[0.9, 0.8, 0.3], &[0.5, 0.4, 0.2, 0.1], 0.5)]
    // Every positive scores above every negative.
    #[case(&[0.9, 0.8, 0.7], &[0.5, 0.4, 0.2, 0.1], 0.0)]
    // Every negative scores above every positive.
    #[case(&[0.1, 0.2], &[0.5, 0.6], 1.0)]
    fn fpr_at_95_tpr_cases(#[case] ood: &[f32], #[case] id: &[f32], #[case] expected: f64) {
        let metrics = MetricEngine::finalize(&pool(ood, id)).unwrap();
        assert_relative_eq!(metrics.fpr_at_95_tpr, expected, epsilon = 1e-12);
    }

    #[test]
    fn fpr_at_tpr_takes_first_threshold_reaching_target() {
        // 20 positives at 1.0..=0.05 interleaved with negatives; TPR hits 0.95
        // after 19 positives, at score 0.1, with one negative (0.17) above.
        let mut scores: Vec<f32> = (1..=20).map(|i| i as f32 * 0.05).collect();
        let mut labels = vec![true; 20];
        scores.extend([0.17, 0.02, 0.01]);
        labels.extend([false, false, false]);

        let fpr = fpr_at_tpr(&scores, &labels, 0.95).unwrap();
        assert_relative_eq!(fpr, 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn fpr_at_tpr_rejects_out_of_range_target() {
        let result = fpr_at_tpr(&[0.1, 0.9], &[false, true], 1.5);
        assert!(matches!(
            result,
            Err(MetricError::InvalidConfiguration { .. })
        ));
    }

    #[rstest]
    #[case(&[], &[0.1], 0, 1)]
    #[case(&[0.9], &[], 1, 0)]
    #[case(&[], &[], 0, 0)]
    fn finalize_requires_both_pools(
        #[case] ood: &[f32],
        #[case] id: &[f32],
        #[case] expected_ood: usize,
        #[case] expected_id: usize,
    ) {
        match MetricEngine::finalize(&pool(ood, id)) {
            Err(MetricError::InsufficientData { ood, id }) => {
                assert_eq!(ood, expected_ood);
                assert_eq!(id, expected_id);
            }
            other => panic!("Expected InsufficientData error, got {other:?}"),
        }
    }

    #[test]
    fn finalize_rejects_nan_scores() {
        let result = MetricEngine::finalize(&pool(&[0.9, f32::NAN], &[0.1]));
        assert!(matches!(
            result,
            Err(MetricError::NonFiniteScore { count: 1 })
        ));
    }

    #[test]
    fn infinite_scores_are_ordered() {
        let metrics =
            MetricEngine::finalize(&pool(&[f32::INFINITY], &[f32::NEG_INFINITY, -3.0])).unwrap();
        assert_eq!(metrics.auprc, 1.0);
        assert_eq!(metrics.fpr_at_95_tpr, 0.0);
    }
}
