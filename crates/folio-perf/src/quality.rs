//! Rendering settings per quality tier.

use serde::{Deserialize, Serialize};

use crate::classifier::QualityTier;

/// Rendering parameters consumed by the scene renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualitySettings {
    pub particle_count: u32,
    pub advanced_shading: bool,
    pub max_pixel_ratio: f64,
    pub shadows: bool,
    pub antialias: bool,
}

const LOW: QualitySettings = QualitySettings {
    particle_count: 500,
    advanced_shading: false,
    max_pixel_ratio: 1.0,
    shadows: false,
    antialias: false,
};

const MEDIUM: QualitySettings = QualitySettings {
    particle_count: 2_000,
    advanced_shading: false,
    max_pixel_ratio: 1.5,
    shadows: true,
    antialias: true,
};

const HIGH: QualitySettings = QualitySettings {
    particle_count: 5_000,
    advanced_shading: true,
    max_pixel_ratio: 2.0,
    shadows: true,
    antialias: true,
};

/// Settings bundle for `tier`.
pub const fn resolve_quality(tier: QualityTier) -> QualitySettings {
    match tier {
        QualityTier::Low => LOW,
        QualityTier::Medium => MEDIUM,
        QualityTier::High => HIGH,
    }
}

impl From<QualityTier> for QualitySettings {
    fn from(tier: QualityTier) -> Self {
        resolve_quality(tier)
    }
}
