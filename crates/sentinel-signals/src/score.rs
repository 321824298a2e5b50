//! Reduces detector verdicts to a technical score and blends it with an
//! external authority score.

use crate::types::{Severity, Signal};

/// Share of the blended score contributed by on-page signals.
pub const TECHNICAL_WEIGHT: f64 = 0.6;
/// Share of the blended score contributed by the authority provider.
pub const EXTERNAL_WEIGHT: f64 = 0.4;

const MAX_SCORE: u32 = 100;

#[must_use]
pub fn severity_weight(severity: Severity) -> u32 {
    match severity {
        Severity::Critical => 25,
        Severity::High => 15,
        Severity::Medium => 10,
        Severity::Low => 5,
    }
}

/// Sums the weights of detected signals, saturating at 100.
///
/// Order-independent, and adding a detected signal never lowers the result.
#[must_use]
pub fn technical_score(signals: &[Signal]) -> u8 {
    let total = signals
        .iter()
        .filter(|s| s.detected)
        .map(|s| severity_weight(s.severity))
        .fold(0_u32, u32::saturating_add)
        .min(MAX_SCORE);
    u8::try_from(total).unwrap_or(u8::MAX)
}

/// Blends the technical score with the provider's spam score.
///
/// Negative provider values (the "unknown" sentinel) count as zero; both
/// inputs are clamped to `0..=100` before weighting.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn blend(technical: u8, external: i32) -> u8 {
    let technical = f64::from(technical.min(100));
    let external = f64::from(external.clamp(0, 100));
    let blended = (EXTERNAL_WEIGHT * external + TECHNICAL_WEIGHT * technical).round();
    blended.clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detected(id: &str, severity: Severity) -> Signal {
        Signal {
            id: id.to_owned(),
            name: id.to_owned(),
            detected: true,
            severity,
            description: String::new(),
        }
    }

    fn clear(id: &str, severity: Severity) -> Signal {
        Signal {
            detected: false,
            ..detected(id, severity)
        }
    }

    #[test]
    fn weights_per_severity() {
        assert_eq!(severity_weight(Severity::Critical), 25);
        assert_eq!(severity_weight(Severity::High), 15);
        assert_eq!(severity_weight(Severity::Medium), 10);
        assert_eq!(severity_weight(Severity::Low), 5);
    }

    #[test]
    fn empty_signal_list_scores_zero() {
        assert_eq!(technical_score(&[]), 0);
    }

    #[test]
    fn only_detected_signals_count() {
        let signals = vec![
            detected("a", Severity::Critical),
            clear("b", Severity::Critical),
            detected("c", Severity::Low),
        ];
        assert_eq!(technical_score(&signals), 30);
    }

    #[test]
    fn technical_score_saturates_at_100() {
        let signals: Vec<Signal> = (0..10)
            .map(|i| detected(&format!("s{i}"), Severity::Critical))
            .collect();
        assert_eq!(technical_score(&signals), 100);
    }

    #[test]
    fn technical_score_ignores_order() {
        let mut signals = vec![
            detected("a", Severity::High),
            detected("b", Severity::Medium),
            clear("c", Severity::Low),
        ];
        let forward = technical_score(&signals);
        signals.reverse();
        assert_eq!(technical_score(&signals), forward);
    }

    #[test]
    fn detecting_more_never_lowers_score() {
        let mut signals = vec![clear("a", Severity::Low), clear("b", Severity::High)];
        let mut last = technical_score(&signals);
        for i in 0..signals.len() {
            signals[i].detected = true;
            let next = technical_score(&signals);
            assert!(next >= last);
            last = next;
        }
    }

    #[test]
    fn blend_weights_external_at_forty_percent() {
        assert_eq!(blend(0, 100), 40);
    }

    #[test]
    fn blend_clamps_negative_external_to_zero() {
        assert_eq!(blend(100, -5), 60);
    }

    #[test]
    fn blend_clamps_oversized_inputs() {
        assert_eq!(blend(255, 1_000), 100);
    }

    #[test]
    fn blend_rounds_to_nearest() {
        // 0.4 * 1 + 0.6 * 1 = 1.0; 0.4 * 3 + 0.6 * 0 = 1.2
        assert_eq!(blend(1, 1), 1);
        assert_eq!(blend(0, 3), 1);
        // 0.6 * 5 = 3.0; 0.4 * 4 = 1.6 -> 4.6
        assert_eq!(blend(5, 4), 5);
    }

    #[test]
    fn blend_is_monotonic_in_both_inputs() {
        for t in (0..=100).step_by(10) {
            for e in (0..=100).step_by(10) {
                assert!(blend(t + 5, e) >= blend(t, e));
                assert!(blend(t, e + 5) >= blend(t, e));
            }
        }
    }
}
