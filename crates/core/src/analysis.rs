//! Verse-level analysis.
//!
//! Splits a verse into hemistichs, encodes and detects each one against a
//! single library snapshot, then merges the per-hemistich rankings into a
//! verse ranking with an uncertainty verdict and a scansion.

use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;

use crate::config::AnalyzerConfig;
use crate::error::{ProsodyError, Result};
use crate::language::encode::{encode_detailed, Encoded};
use crate::prosody::detector::{rank_order, Detector, EPSILON};
use crate::prosody::library::{PatternLibrary, SharedLibrary};
use crate::prosody::meters::meter;
use crate::prosody::tafila::{scan_with_meter, segment, ScannedFoot, Segmentation};
use crate::types::{DetectionResult, MeterId, RhythmPattern, Uncertainty};

/// Characters that separate the two halves of a verse.
const HEMISTICH_SEPARATORS: &[char] = &['*', '…', '|', '\t', '\n', '\r'];

/// Split verse text into hemistichs.
///
/// Separators are `*`, `…`, `|`, tabs, line breaks, and runs of three or
/// more spaces. Empty pieces are dropped.
pub fn split_hemistichs(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut spaces = 0usize;

    fn flush(current: &mut String, parts: &mut Vec<String>) {
        let piece = current.trim();
        if !piece.is_empty() {
            parts.push(piece.to_string());
        }
        current.clear();
    }

    for ch in text.chars() {
        if ch == ' ' {
            spaces += 1;
            continue;
        }
        if spaces >= 3 {
            flush(&mut current, &mut parts);
        } else if spaces > 0 {
            current.push(' ');
        }
        spaces = 0;

        if HEMISTICH_SEPARATORS.contains(&ch) {
            flush(&mut current, &mut parts);
        } else {
            current.push(ch);
        }
    }
    flush(&mut current, &mut parts);
    parts
}

/// Merge per-hemistich rankings into one verse ranking.
///
/// A meter's verse confidence is the mean of its hemistich confidences,
/// counting a hemistich where it did not qualify as zero.
pub fn combine_hemistichs(
    per_hemistich: &[Vec<DetectionResult>],
    acceptance_threshold: f64,
) -> Vec<DetectionResult> {
    if per_hemistich.len() == 1 {
        return per_hemistich[0].clone();
    }
    let n = per_hemistich.len() as f64;
    let mut combined = Vec::new();

    for id in MeterId::ALL {
        let hits: Vec<Option<&DetectionResult>> = per_hemistich
            .iter()
            .map(|results| results.iter().find(|r| r.meter == id))
            .collect();
        if hits.iter().all(Option::is_none) {
            continue;
        }

        let confidence = hits.iter().flatten().map(|r| r.confidence).sum::<f64>() / n;
        if confidence < acceptance_threshold - EPSILON {
            continue;
        }
        let matched_pattern = hits
            .iter()
            .flatten()
            .fold(RhythmPattern::default(), |acc, r| acc.concat(&r.matched_pattern));
        combined.push(DetectionResult {
            meter: id,
            confidence,
            matched_pattern,
            is_exact_match: hits.iter().all(|h| h.is_some_and(|r| r.is_exact_match)),
            variations: hits
                .iter()
                .flatten()
                .fold(0u8, |acc, r| acc.saturating_add(r.variations)),
        });
    }

    combined.sort_by(rank_order);
    combined
}

/// What the caller could do to get a firmer answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    AddDiacritics,
}

/// Analysis of one hemistich.
#[derive(Debug, Clone, Serialize)]
pub struct HemistichAnalysis {
    pub text: String,
    pub normalized: String,
    pub has_diacritics: bool,
    pub pattern: RhythmPattern,
    /// Greedy foot breakdown
    pub segmentation: Segmentation,
    /// Foot-by-foot derivation under the verse's top meter, when it matches exactly
    pub scansion: Option<Vec<ScannedFoot>>,
    pub candidates: Vec<DetectionResult>,
}

/// Analysis of a full verse.
#[derive(Debug, Clone, Serialize)]
pub struct VerseAnalysis {
    pub text: String,
    pub hemistichs: Vec<HemistichAnalysis>,
    pub candidates: Vec<DetectionResult>,
    pub uncertainty: Uncertainty,
    pub recommendation: Option<Recommendation>,
    pub library_version: String,
}

impl VerseAnalysis {
    pub fn best(&self) -> Option<&DetectionResult> {
        self.candidates.first()
    }

    /// Full rhythm of the verse, hemistichs joined.
    pub fn pattern(&self) -> RhythmPattern {
        self.hemistichs
            .iter()
            .fold(RhythmPattern::default(), |acc, h| acc.concat(&h.pattern))
    }

    /// Serialize for JSON output, with display names for each meter.
    pub fn to_json_value(&self) -> serde_json::Value {
        let candidates: Vec<serde_json::Value> = self
            .candidates
            .iter()
            .map(|c| {
                let def = meter(c.meter);
                serde_json::json!({
                    "meter": c.meter,
                    "name": def.name,
                    "translit": def.translit,
                    "confidence": c.confidence,
                    "matched_pattern": c.matched_pattern,
                    "is_exact_match": c.is_exact_match,
                    "variations": c.variations,
                })
            })
            .collect();
        serde_json::json!({
            "text": self.text,
            "pattern": self.pattern(),
            "hemistichs": self.hemistichs,
            "candidates": candidates,
            "uncertainty": self.uncertainty,
            "recommendation": self.recommendation,
            "library_version": self.library_version,
        })
    }
}

/// The verse pipeline, holding a shared library and the runtime config.
#[derive(Debug, Clone)]
pub struct Analyzer {
    library: Arc<SharedLibrary>,
    config: AnalyzerConfig,
}

impl Analyzer {
    pub fn new(library: Arc<SharedLibrary>, config: AnalyzerConfig) -> Self {
        Self { library, config }
    }

    /// Build the library described by `config` and wrap it.
    pub fn from_config(config: AnalyzerConfig) -> Result<Self> {
        let library = PatternLibrary::load(config.patterns_file.as_deref())?;
        Ok(Self::new(Arc::new(SharedLibrary::new(library)), config))
    }

    pub fn library(&self) -> &Arc<SharedLibrary> {
        &self.library
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// A detector bound to the current library snapshot.
    pub fn detector(&self) -> Detector {
        Detector::new(self.library.snapshot(), self.config.detector.clone())
    }

    /// Encode one hemistich.
    pub fn encode(&self, text: &str, has_diacritics: Option<bool>) -> Result<Encoded> {
        encode_detailed(text, has_diacritics, &self.config.encode)
    }

    /// Analyze a verse of one or more hemistichs.
    pub fn analyze(&self, text: &str) -> Result<VerseAnalysis> {
        let parts = split_hemistichs(text);
        if parts.is_empty() {
            return Err(ProsodyError::EmptyInput);
        }

        let detector = self.detector();
        let top_k = self.config.detector.top_k;

        let mut kept = Vec::with_capacity(parts.len());
        let mut encoded = Vec::with_capacity(parts.len());
        let mut rankings = Vec::with_capacity(parts.len());
        for part in parts {
            match self.encode(&part, None) {
                Ok(e) => {
                    rankings.push(detector.detect_all(&e.pattern));
                    encoded.push(e);
                    kept.push(part);
                }
                // Punctuation or tatweel between separators
                Err(ProsodyError::EmptyInput) => {
                    log::debug!("Skipping empty hemistich {:?}", part)
                }
                Err(e) => return Err(e),
            }
        }
        if kept.is_empty() {
            return Err(ProsodyError::EmptyInput);
        }

        let ranking = combine_hemistichs(&rankings, self.config.detector.acceptance_threshold);
        let uncertainty = detector.classify(&ranking);
        let top_meter = ranking.first().map(|r| meter(r.meter));

        let hemistichs: Vec<HemistichAnalysis> = kept
            .into_iter()
            .zip(encoded)
            .zip(rankings)
            .map(|((text, e), mut candidates)| {
                candidates.truncate(top_k);
                HemistichAnalysis {
                    segmentation: segment(&e.pattern),
                    scansion: top_meter.and_then(|m| scan_with_meter(&e.pattern, m)),
                    text,
                    normalized: e.normalized,
                    has_diacritics: e.has_diacritics,
                    pattern: e.pattern,
                    candidates,
                }
            })
            .collect();

        let undiacritized = hemistichs.iter().any(|h| !h.has_diacritics);
        let recommendation = if undiacritized && (uncertainty.is_uncertain || ranking.is_empty()) {
            Some(Recommendation::AddDiacritics)
        } else {
            None
        };

        let mut candidates = ranking;
        candidates.truncate(top_k);

        log::debug!(
            "Analyzed {} hemistichs: top {:?}, uncertain {}",
            hemistichs.len(),
            candidates.first().map(|c| c.meter),
            uncertainty.is_uncertain
        );

        Ok(VerseAnalysis {
            text: text.to_string(),
            hemistichs,
            candidates,
            uncertainty,
            recommendation,
            library_version: detector.library().version().to_string(),
        })
    }

    /// Analyze many verses in parallel. One bad verse does not stop the rest.
    pub fn analyze_batch(&self, texts: &[String]) -> Vec<Result<VerseAnalysis>> {
        texts.par_iter().map(|t| self.analyze(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UncertaintyReason;

    const MUALLAQA: &str =
        "قِفَا نَبْكِ مِنْ ذِكْرَى حَبِيبٍ وَمَنْزِلِ * بِسِقْطِ اللِّوَى بَيْنَ الدَّخُولِ فَحَوْمَلِ";

    fn analyzer() -> Analyzer {
        Analyzer::new(
            Arc::new(SharedLibrary::new(PatternLibrary::build())),
            AnalyzerConfig::default(),
        )
    }

    fn result(meter: MeterId, confidence: f64, exact: bool) -> DetectionResult {
        DetectionResult {
            meter,
            confidence,
            matched_pattern: "/o".parse().unwrap(),
            is_exact_match: exact,
            variations: 1,
        }
    }

    #[test]
    fn test_split_hemistichs() {
        assert_eq!(split_hemistichs("a b * c d"), vec!["a b", "c d"]);
        assert_eq!(split_hemistichs("a b     c d"), vec!["a b", "c d"]);
        assert_eq!(split_hemistichs("a  b\tc"), vec!["a b", "c"]);
        assert_eq!(split_hemistichs("a … b | c"), vec!["a", "b", "c"]);
        assert_eq!(split_hemistichs("single"), vec!["single"]);
        assert!(split_hemistichs(" * ").is_empty());
    }

    #[test]
    fn test_combine_averages_and_penalizes_missing() {
        let first = vec![result(MeterId::Tawil, 1.0, true), result(MeterId::Basit, 0.9, false)];
        let second = vec![result(MeterId::Tawil, 0.9, false)];
        let combined = combine_hemistichs(&[first, second], 0.8);
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].meter, MeterId::Tawil);
        assert!((combined[0].confidence - 0.95).abs() < 1e-9);
        assert!(!combined[0].is_exact_match);
        assert_eq!(combined[0].variations, 2);
        assert_eq!(combined[0].matched_pattern.as_str(), "/o/o");
    }

    #[test]
    fn test_analyze_muallaqa_opening() {
        let a = analyzer().analyze(MUALLAQA).unwrap();
        assert_eq!(a.hemistichs.len(), 2);
        assert_eq!(a.hemistichs[0].pattern.as_str(), "//o/o//o/o/o//o/o//o//o");

        let best = a.best().unwrap();
        assert_eq!(best.meter, MeterId::Tawil);
        assert!(best.is_exact_match);
        assert_eq!(best.confidence, 1.0);
        assert_eq!(best.variations, 3);
        assert!(!a.uncertainty.is_uncertain);
        assert_eq!(a.recommendation, None);

        let scansion = a.hemistichs[0].scansion.as_ref().unwrap();
        let names: Vec<&str> = scansion.iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["فعولن", "مفاعيلن", "فعولن", "مفاعلن"]);
    }

    #[test]
    fn test_analyze_single_hemistich() {
        let a = analyzer()
            .analyze("قِفَا نَبْكِ مِنْ ذِكْرَى حَبِيبٍ وَمَنْزِلِ")
            .unwrap();
        assert_eq!(a.hemistichs.len(), 1);
        assert_eq!(a.best().unwrap().meter, MeterId::Tawil);
        assert!(a.candidates.len() <= 3);
    }

    #[test]
    fn test_analyze_empty_is_error() {
        assert!(matches!(analyzer().analyze("  "), Err(ProsodyError::EmptyInput)));
        assert!(matches!(analyzer().analyze(" * "), Err(ProsodyError::EmptyInput)));
    }

    #[test]
    fn test_empty_hemistich_is_skipped() {
        let a = analyzer()
            .analyze("قِفَا نَبْكِ مِنْ ذِكْرَى حَبِيبٍ وَمَنْزِلِ * ـــ")
            .unwrap();
        assert_eq!(a.hemistichs.len(), 1);
        let best = a.best().unwrap();
        assert_eq!(best.meter, MeterId::Tawil);
        assert!(best.is_exact_match);
    }

    #[test]
    fn test_final_maqsura_keeps_exact_match() {
        let a = analyzer()
            .analyze("قِفَا نَبْكِ مِنْ ذِكْرَى حَبِيبٍ وَمُرْتَضَى")
            .unwrap();
        let best = a.best().unwrap();
        assert_eq!(best.meter, MeterId::Tawil);
        assert!(best.is_exact_match);
        assert_eq!(best.confidence, 1.0);
    }

    #[test]
    fn test_undiacritized_unknown_recommends_diacritics() {
        let a = analyzer().analyze("كتب قلم").unwrap();
        assert!(a.candidates.is_empty());
        assert!(!a.uncertainty.is_uncertain);
        assert_eq!(a.recommendation, Some(Recommendation::AddDiacritics));
    }

    #[test]
    fn test_close_race_reason_survives_combination() {
        let first = vec![result(MeterId::Rajaz, 1.0, true), result(MeterId::Kamil, 1.0, true)];
        let combined = combine_hemistichs(&[first], 0.8);
        let u = crate::prosody::detector::classify_uncertainty(
            &combined,
            &crate::config::DetectorConfig::default(),
        );
        assert_eq!(u.reason, Some(UncertaintyReason::CloseCandidates));
    }

    #[test]
    fn test_analyze_batch_keeps_going() {
        let texts = vec!["".to_string(), MUALLAQA.to_string()];
        let out = analyzer().analyze_batch(&texts);
        assert!(out[0].is_err());
        assert_eq!(out[1].as_ref().unwrap().best().unwrap().meter, MeterId::Tawil);
    }

    #[test]
    fn test_json_output_has_names() {
        let a = analyzer().analyze(MUALLAQA).unwrap();
        let json = a.to_json_value();
        assert_eq!(json["candidates"][0]["meter"], "tawil");
        assert_eq!(json["candidates"][0]["name"], "الطويل");
        assert_eq!(json["hemistichs"].as_array().unwrap().len(), 2);
        assert_eq!(json["library_version"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn test_hot_swap_visible_to_next_call() {
        let an = analyzer();
        let before = an.analyze(MUALLAQA).unwrap().library_version;
        let mut sup = crate::prosody::library::Supplement::default();
        sup.insert(MeterId::Hazaj, "//o/o/o//o/o/o/".parse().unwrap());
        let next = an.library().snapshot().merged(&sup);
        an.library().swap(next);
        let after = an.analyze(MUALLAQA).unwrap().library_version;
        assert_ne!(before, after);
    }
}
