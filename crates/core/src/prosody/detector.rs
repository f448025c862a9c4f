//! Meter detection: exact lookup, then bounded fuzzy matching.
//!
//! A [`Detector`] holds an immutable library snapshot and its thresholds.
//! It keeps no state between calls and can be shared across threads.

use std::cmp::Ordering;
use std::sync::Arc;

use rayon::prelude::*;

use crate::config::DetectorConfig;
use crate::prosody::library::{MeterPatterns, PatternLibrary};
use crate::prosody::meters::meter;
use crate::prosody::similarity::{similarity, similarity_upper_bound};
use crate::types::{DetectionResult, RhythmPattern, Uncertainty, UncertaintyReason};

/// Slack for comparing similarities against configured thresholds.
pub(crate) const EPSILON: f64 = 1e-9;

/// Ranking order: confidence, then fewer variations, then the more common meter.
pub fn rank_order(a: &DetectionResult, b: &DetectionResult) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then(a.variations.cmp(&b.variations))
        .then(meter(a.meter).rank.cmp(&meter(b.meter).rank))
}

#[derive(Debug, Clone)]
pub struct Detector {
    library: Arc<PatternLibrary>,
    config: DetectorConfig,
}

impl Detector {
    pub fn new(library: Arc<PatternLibrary>, config: DetectorConfig) -> Self {
        Self { library, config }
    }

    pub fn library(&self) -> &Arc<PatternLibrary> {
        &self.library
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Best match of `pattern` within one meter, if it clears the threshold.
    fn best_in_meter(
        &self,
        pattern: &RhythmPattern,
        mp: &MeterPatterns,
    ) -> Option<DetectionResult> {
        if let Some(entry) = mp.patterns.get(pattern) {
            return Some(DetectionResult {
                meter: mp.id,
                confidence: 1.0,
                matched_pattern: pattern.clone(),
                is_exact_match: true,
                variations: entry.variations,
            });
        }

        let threshold = self.config.acceptance_threshold - EPSILON;
        let mut best: Option<(f64, u8, &RhythmPattern)> = None;
        for (candidate, entry) in &mp.patterns {
            if similarity_upper_bound(pattern.len(), candidate.len()) < threshold {
                continue;
            }
            let score = similarity(pattern, candidate);
            if score < threshold {
                continue;
            }
            let better = match best {
                None => true,
                Some((s, v, _)) => {
                    score > s + EPSILON || ((score - s).abs() <= EPSILON && entry.variations < v)
                }
            };
            if better {
                best = Some((score, entry.variations, candidate));
            }
        }

        best.map(|(score, variations, candidate)| DetectionResult {
            meter: mp.id,
            confidence: score,
            matched_pattern: candidate.clone(),
            is_exact_match: false,
            variations,
        })
    }

    /// Every meter that clears the acceptance threshold, ranked.
    pub fn detect_all(&self, pattern: &RhythmPattern) -> Vec<DetectionResult> {
        if pattern.is_empty() {
            return Vec::new();
        }
        let mut results: Vec<DetectionResult> = self
            .library
            .meters()
            .iter()
            .filter_map(|mp| self.best_in_meter(pattern, mp))
            .collect();
        results.sort_by(rank_order);

        log::debug!(
            "Detected {} candidate meters for {} ({} exact)",
            results.len(),
            pattern,
            results.iter().filter(|r| r.is_exact_match).count()
        );
        results
    }

    /// The `top_k` best meters for a pattern. Empty when nothing matches.
    pub fn detect(&self, pattern: &RhythmPattern, top_k: usize) -> Vec<DetectionResult> {
        let mut results = self.detect_all(pattern);
        results.truncate(top_k);
        results
    }

    /// Detect many patterns in parallel, preserving input order.
    pub fn detect_batch(
        &self,
        patterns: &[RhythmPattern],
        top_k: usize,
    ) -> Vec<Vec<DetectionResult>> {
        patterns
            .par_iter()
            .map(|p| self.detect(p, top_k))
            .collect()
    }

    /// Decide whether ranked results should be shown as one answer or several.
    pub fn classify(&self, results: &[DetectionResult]) -> Uncertainty {
        classify_uncertainty(results, &self.config)
    }
}

/// Uncertainty of a ranked result list.
///
/// Uncertain when the top confidence is low, or when the runner-up is
/// within the close-race margin. An empty list is not uncertain: it means
/// no meter was identified.
pub fn classify_uncertainty(results: &[DetectionResult], config: &DetectorConfig) -> Uncertainty {
    let Some(top) = results.first() else {
        return Uncertainty::default();
    };

    let margin = config.margin_for(top.confidence);
    let top_gap = results.get(1).map(|r| top.confidence - r.confidence);
    let low = top.confidence < config.low_confidence_threshold - EPSILON;
    let close = top_gap.is_some_and(|gap| gap < margin - EPSILON);

    let contenders = results
        .iter()
        .take_while(|r| top.confidence - r.confidence < margin - EPSILON)
        .map(|r| r.meter)
        .collect();

    let reason = if low {
        Some(UncertaintyReason::LowConfidence)
    } else if close {
        Some(UncertaintyReason::CloseCandidates)
    } else {
        None
    };

    Uncertainty {
        is_uncertain: reason.is_some(),
        reason,
        top_gap,
        contenders,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prosody::meters::METERS;
    use crate::types::MeterId;

    fn p(s: &str) -> RhythmPattern {
        s.parse().unwrap()
    }

    fn detector() -> Detector {
        Detector::new(Arc::new(PatternLibrary::build()), DetectorConfig::default())
    }

    fn result(meter: MeterId, confidence: f64) -> DetectionResult {
        DetectionResult {
            meter,
            confidence,
            matched_pattern: RhythmPattern::default(),
            is_exact_match: confidence == 1.0,
            variations: 0,
        }
    }

    #[test]
    fn test_every_base_pattern_detected_exactly() {
        let d = detector();
        for def in METERS {
            let results = d.detect(&p(&def.base_pattern()), 3);
            let top = &results[0];
            assert_eq!(top.meter, def.id, "{}", def.translit);
            assert!(top.is_exact_match);
            assert_eq!(top.confidence, 1.0);
            assert_eq!(top.variations, 0);
        }
    }

    #[test]
    fn test_single_substitution_is_fuzzy() {
        let d = detector();
        // Tawil base with the first symbol flipped
        let input = p("o/o/o//o/o/o//o/o//o/o/o");
        let results = d.detect(&input, 3);
        let top = &results[0];
        assert_eq!(top.meter, MeterId::Tawil);
        assert!(!top.is_exact_match);
        assert!(top.confidence < 1.0);
        assert!(top.confidence >= d.config().acceptance_threshold);
        assert!((top.confidence - 23.0 / 24.0).abs() < 1e-9);
        assert_eq!(top.matched_pattern, p(&meter(MeterId::Tawil).base_pattern()));

        let u = d.classify(&results);
        assert!(!u.is_uncertain);
        assert_eq!(u.contenders, vec![MeterId::Tawil]);
    }

    #[test]
    fn test_close_race_flags_both() {
        let d = detector();
        // Rajaz base is also Kamil with idmar in every foot
        let results = d.detect(&p("/o/o//o/o/o//o/o/o//o"), 3);
        assert_eq!(results[0].meter, MeterId::Rajaz);
        assert_eq!(results[1].meter, MeterId::Kamil);
        assert!(results[1].is_exact_match);
        assert_eq!(results[1].variations, 3);

        let u = d.classify(&results);
        assert!(u.is_uncertain);
        assert_eq!(u.reason, Some(UncertaintyReason::CloseCandidates));
        assert_eq!(u.contenders, vec![MeterId::Rajaz, MeterId::Kamil]);
        assert_eq!(u.top_gap, Some(0.0));
    }

    #[test]
    fn test_low_confidence() {
        let d = detector();
        let results = d.detect(&p("ooo/o//o/o/o//o/o//o/o//"), 3);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].meter, MeterId::Tawil);
        let u = d.classify(&results);
        assert!(u.is_uncertain);
        assert_eq!(u.reason, Some(UncertaintyReason::LowConfidence));
        assert_eq!(u.top_gap, None);
    }

    #[test]
    fn test_no_match_is_empty() {
        let d = detector();
        assert!(d.detect(&p("oooooooooooooooooooo"), 3).is_empty());
        assert!(d.detect(&RhythmPattern::default(), 3).is_empty());
        assert_eq!(d.classify(&[]), Uncertainty::default());
    }

    #[test]
    fn test_top_k_truncates() {
        let d = detector();
        let input = p("/o/o//o/o/o//o/o/o//o");
        assert_eq!(d.detect(&input, 1).len(), 1);
        assert!(d.detect_all(&input).len() >= 3);
        assert!(d.detect(&input, 0).is_empty());
    }

    #[test]
    fn test_tie_break_by_rank() {
        let mut results = vec![result(MeterId::Rajaz, 0.9), result(MeterId::Tawil, 0.9)];
        results.sort_by(rank_order);
        assert_eq!(results[0].meter, MeterId::Tawil);
    }

    #[test]
    fn test_tie_break_by_variations_first() {
        let mut a = result(MeterId::Tawil, 0.9);
        a.variations = 2;
        let b = result(MeterId::Rajaz, 0.9);
        let mut results = vec![a, b];
        results.sort_by(rank_order);
        assert_eq!(results[0].meter, MeterId::Rajaz);
    }

    #[test]
    fn test_classify_thresholds() {
        let config = DetectorConfig::default();
        // Top above 0.97: the 0.02 margin applies
        let u = classify_uncertainty(
            &[result(MeterId::Tawil, 1.0), result(MeterId::Basit, 0.97)],
            &config,
        );
        assert!(!u.is_uncertain);

        // Top below 0.97: the wider 0.05 margin applies
        let u = classify_uncertainty(
            &[result(MeterId::Tawil, 0.95), result(MeterId::Basit, 0.915)],
            &config,
        );
        assert!(u.is_uncertain);
        assert_eq!(u.reason, Some(UncertaintyReason::CloseCandidates));
        assert_eq!(u.contenders, vec![MeterId::Tawil, MeterId::Basit]);

        let u = classify_uncertainty(&[result(MeterId::Tawil, 0.92)], &config);
        assert!(!u.is_uncertain);
        assert_eq!(u.contenders, vec![MeterId::Tawil]);
    }

    #[test]
    fn test_detect_batch_matches_sequential() {
        let d = detector();
        let inputs: Vec<RhythmPattern> = METERS.iter().map(|m| p(&m.base_pattern())).collect();
        let batch = d.detect_batch(&inputs, 2);
        for (input, out) in inputs.iter().zip(&batch) {
            assert_eq!(out, &d.detect(input, 2));
        }
    }
}
