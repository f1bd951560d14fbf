//! Ground-truth normalization into the `{0: in-distribution, 1: OOD, 255: ignore}`
//! convention used by the evaluation.
//!
//! Every benchmark rule is an ordered list of whole-mask value rewrites. Later
//! steps see the output of earlier ones, so the order is part of the rule.

use burn::{prelude::*, tensor::ElementConversion};

use crate::dataset::DatasetKind;

/// In-distribution label.
pub const ID_LABEL: i64 = 0;
/// Out-of-distribution label.
pub const OOD_LABEL: i64 = 1;
/// Pixels excluded from scoring.
pub const IGNORE_LABEL: i64 = 255;

/// A single whole-mask rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rewrite {
    /// Every element equal to `from` becomes `to`.
    Equal { from: i64, to: i64 },
    /// Every element strictly below `bound` becomes `to`.
    Below { bound: i64, to: i64 },
    /// Every element strictly between `low` and `high` becomes `to`.
    Between { low: i64, high: i64, to: i64 },
}

impl Rewrite {
    fn apply<B: Backend>(self, mask: Tensor<B, 2, Int>) -> Tensor<B, 2, Int> {
        match self {
            Self::Equal { from, to } => {
                let hit = mask.clone().equal_elem(from);
                mask.mask_fill(hit, to)
            }
            Self::Below { bound, to } => {
                let hit = mask.clone().lower_elem(bound);
                mask.mask_fill(hit, to)
            }
            Self::Between { low, high, to } => {
                let hit = mask
                    .clone()
                    .greater_elem(low)
                    .bool_and(mask.clone().lower_elem(high));
                mask.mask_fill(hit, to)
            }
        }
    }
}

const ROAD_ANOMALY: &[Rewrite] = &[Rewrite::Equal { from: 2, to: OOD_LABEL }];

const LOST_AND_FOUND: &[Rewrite] = &[
    Rewrite::Equal {
        from: 0,
        to: IGNORE_LABEL,
    },
    Rewrite::Equal { from: 1, to: ID_LABEL },
    Rewrite::Between {
        low: 1,
        high: 201,
        to: OOD_LABEL,
    },
];

// Step three rewrites the marker set by step one, so 14 ends as OOD and
// codes >= 20 are left untouched.
const STREET_HAZARDS: &[Rewrite] = &[
    Rewrite::Equal {
        from: 14,
        to: IGNORE_LABEL,
    },
    Rewrite::Below {
        bound: 20,
        to: ID_LABEL,
    },
    Rewrite::Equal {
        from: IGNORE_LABEL,
        to: OOD_LABEL,
    },
];

/// Normalizes raw ground-truth masks of one benchmark.
#[derive(Debug, Clone)]
pub struct LabelRemapper {
    dataset: DatasetKind,
}

impl LabelRemapper {
    pub const fn new(dataset: DatasetKind) -> Self {
        Self { dataset }
    }

    pub const fn dataset(&self) -> &DatasetKind {
        &self.dataset
    }

    /// The ordered rewrite steps of this benchmark. Empty means passthrough.
    #[must_use]
    pub const fn rewrites(&self) -> &'static [Rewrite] {
        match self.dataset {
            DatasetKind::RoadAnomaly => ROAD_ANOMALY,
            DatasetKind::LostAndFound => LOST_AND_FOUND,
            DatasetKind::StreetHazards => STREET_HAZARDS,
            DatasetKind::RoadObstacle21
            | DatasetKind::FishyscapesStatic
            | DatasetKind::Unknown => &[],
        }
    }

    /// Applies the benchmark's rewrites in order.
    pub fn remap<B: Backend>(&self, raw: Tensor<B, 2, Int>) -> Tensor<B, 2, Int> {
        self.rewrites()
            .iter()
            .fold(raw, |mask, rewrite| rewrite.apply(mask))
    }
}

/// Counts elements outside `{0, 1, 255}`.
///
/// Non-zero only for masks whose raw codes escape the benchmark rule, such as
/// StreetHazards codes of 20 and above.
pub fn count_unnormalized<B: Backend>(mask: Tensor<B, 2, Int>) -> usize {
    let known = mask
        .clone()
        .equal_elem(ID_LABEL)
        .int()
        .add(mask.clone().equal_elem(OOD_LABEL).int())
        .add(mask.clone().equal_elem(IGNORE_LABEL).int());
    let total = mask.dims().iter().product::<usize>();
    let known = known.sum().into_scalar().elem::<i64>();

    total - known as usize
}
