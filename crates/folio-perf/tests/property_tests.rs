//! Property-based tests for classification and history invariants.

use folio_perf::prelude::*;
use folio_perf::{
    AlertEmitter, AlertEmitterConfig, ClassifierConfig, PerformanceHistory, QualityClassifier,
};
use proptest::prelude::*;

const COOLDOWN_MS: u64 = 5_000;

proptest! {
    #[test]
    fn test_tier_changes_respect_cooldown(
        samples in prop::collection::vec((20.0f64..70.0, 1u64..2_000), 1..200),
    ) {
        let config = ClassifierConfig::default()
            .with_history_capacity(3)
            .with_cooldown_ms(COOLDOWN_MS);
        let mut classifier = QualityClassifier::new(config, 0)
            .map_err(|err| TestCaseError::fail(err.to_string()))?;

        let mut now_ms = 0_u64;
        let mut last_change = 0_u64;
        for (fps, step) in samples {
            now_ms += step;
            let snapshot = PerformanceSnapshot::from_fps(fps, 0.0, now_ms);
            if let Some(change) = classifier.observe(snapshot) {
                prop_assert!(change.changed_at_ms - last_change >= COOLDOWN_MS);
                prop_assert_ne!(change.from, change.to);
                last_change = change.changed_at_ms;
            }
        }
    }

    #[test]
    fn test_history_never_exceeds_capacity(
        capacity in 1usize..64,
        fps in prop::collection::vec(0.0f64..240.0, 0..300),
    ) {
        let mut history = PerformanceHistory::new(capacity)
            .map_err(|err| TestCaseError::fail(err.to_string()))?;
        for (i, value) in fps.iter().enumerate() {
            history.push(PerformanceSnapshot::from_fps(*value, 0.0, i as u64));
            prop_assert!(history.len() <= capacity);
        }
        prop_assert_eq!(history.len(), fps.len().min(capacity));
    }

    #[test]
    fn test_resolution_is_deterministic(index in 0usize..3, repeats in 1usize..50) {
        let tiers = [QualityTier::Low, QualityTier::Medium, QualityTier::High];
        let tier = tiers.get(index).copied().unwrap_or(QualityTier::High);
        let first = resolve_quality(tier);
        for _ in 0..repeats {
            prop_assert_eq!(resolve_quality(tier), first);
        }
    }

    #[test]
    fn test_lower_fps_never_lowers_severity(a in 0.5f64..29.9, b in 0.5f64..29.9) {
        let (worse, better) = if a <= b { (a, b) } else { (b, a) };
        let severity = |fps: f64| -> Result<Option<AlertSeverity>, TestCaseError> {
            let mut emitter = AlertEmitter::new(AlertEmitterConfig::default())
                .map_err(|err| TestCaseError::fail(err.to_string()))?;
            Ok(emitter
                .observe(&PerformanceSnapshot::from_fps(fps, 0.0, 0))
                .iter()
                .find(|alert| alert.kind() == AlertKind::FrameRate)
                .map(PerformanceAlert::severity))
        };

        let worse = severity(worse)?;
        let better = severity(better)?;
        prop_assert!(worse.is_some() && better.is_some());
        prop_assert!(worse >= better);
    }
}
