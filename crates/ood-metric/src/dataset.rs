//! Identification of the anomaly-segmentation benchmark being evaluated.
//!
//! Each benchmark ships its ground truth with its own pixel-code convention
//! and file layout. The kind is resolved once, before the dataset pass, and
//! then drives both label remapping and ground-truth path derivation.

use std::str::FromStr;

use burn::prelude::*;

use crate::error::MetricError;

/// Defines the benchmark whose ground-truth conventions apply.
#[derive(Config, Debug, PartialEq, Eq)]
pub enum DatasetKind {
    /// Road Anomaly (and Segment-Me-If-You-Can RoadAnomaly21): anomalies coded 2.
    RoadAnomaly,
    /// Lost and Found (Fishyscapes split): 0 ignore, 1 road, 2..=200 obstacles.
    LostAndFound,
    /// StreetHazards: anomaly class 14 among 0..=19 semantic codes.
    StreetHazards,
    /// Segment-Me-If-You-Can RoadObstacle21, masks already in {0, 1, 255}.
    RoadObstacle21,
    /// Fishyscapes Static, masks already in {0, 1, 255}.
    FishyscapesStatic,
    /// Any other dataset whose masks are assumed to be normalized.
    Unknown,
}

/// Substring hints in match order; the first hit wins.
const HINTS: [(&str, DatasetKind); 5] = [
    ("RoadAnomaly", DatasetKind::RoadAnomaly),
    ("LostAndFound", DatasetKind::LostAndFound),
    ("Streethazard", DatasetKind::StreetHazards),
    ("RoadObsticle21", DatasetKind::RoadObstacle21),
    ("fs_static", DatasetKind::FishyscapesStatic),
];

impl DatasetKind {
    /// Resolves the dataset from a path or dataset name by substring match.
    ///
    /// Falls back to [`DatasetKind::Unknown`] when no hint matches.
    #[must_use]
    pub fn from_hint(hint: &str) -> Self {
        HINTS
            .iter()
            .find(|(needle, _)| hint.contains(needle))
            .map_or(Self::Unknown, |(_, kind)| kind.clone())
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RoadAnomaly => "RoadAnomaly",
            Self::LostAndFound => "LostAndFound",
            Self::StreetHazards => "StreetHazards",
            Self::RoadObstacle21 => "RoadObstacle21",
            Self::FishyscapesStatic => "FishyscapesStatic",
            Self::Unknown => "Unknown",
        }
    }

    /// Extension swap `(from, to)` applied when deriving the ground-truth
    /// path from an image path, if the benchmark stores masks in another
    /// format than its images.
    #[must_use]
    pub const fn mask_extension_swap(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::RoadObstacle21 => Some(("webp", "png")),
            Self::RoadAnomaly | Self::FishyscapesStatic => Some(("jpg", "png")),
            Self::LostAndFound | Self::StreetHazards | Self::Unknown => None,
        }
    }
}

impl FromStr for DatasetKind {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "roadanomaly" | "roadanomaly21" => Ok(Self::RoadAnomaly),
            "lostandfound" | "fslostandfound" => Ok(Self::LostAndFound),
            "streethazards" | "streethazard" => Ok(Self::StreetHazards),
            "roadobstacle21" | "roadobsticle21" => Ok(Self::RoadObstacle21),
            "fishyscapesstatic" | "fsstatic" => Ok(Self::FishyscapesStatic),
            "unknown" => Ok(Self::Unknown),
            other => Err(MetricError::InvalidConfiguration {
                reason: format!("unknown dataset '{other}'"),
            }),
        }
    }
}
