//! Runtime options for normalization, encoding and detection.
//!
//! Every struct deserializes with defaults filled in, so a config file only
//! needs the keys it wants to change.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ProsodyError, Result};

/// Environment variable that points at a supplementary pattern table.
pub const PATTERNS_ENV: &str = "BAHR_PATTERNS";

/// Orthographic normalization switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// Strip every diacritic
    pub remove_tashkeel: bool,
    /// Map hamza-bearing letters to their bare carriers
    pub unify_hamza: bool,
    /// Map alef maksura to yaa
    pub unify_alef_maqsura: bool,
    /// Drop the tatweel elongation character
    pub strip_tatweel: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            remove_tashkeel: false,
            unify_hamza: true,
            unify_alef_maqsura: true,
            strip_tatweel: true,
        }
    }
}

/// Options for turning text into a rhythm pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    pub normalize: NormalizeOptions,
    /// Lengthen the final short vowel of a hemistich
    pub saturate_final: bool,
    /// Drop an unvowelled word-initial alef unless it opens the verse
    pub elide_hamza_wasl: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            normalize: NormalizeOptions::default(),
            saturate_final: true,
            elide_hamza_wasl: true,
        }
    }
}

/// Detector thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Minimum similarity for a meter to be reported at all
    pub acceptance_threshold: f64,
    /// Top confidence below this is uncertain
    pub low_confidence_threshold: f64,
    /// Gap between the top two below this is a close race
    pub close_margin: f64,
    /// Close-race gap used when the top confidence is under `high_confidence_threshold`
    pub close_margin_low: f64,
    pub high_confidence_threshold: f64,
    /// Default number of candidates returned
    pub top_k: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.80,
            low_confidence_threshold: 0.90,
            close_margin: 0.02,
            close_margin_low: 0.05,
            high_confidence_threshold: 0.97,
            top_k: 3,
        }
    }
}

impl DetectorConfig {
    /// Close-race margin that applies for a given top confidence.
    pub fn margin_for(&self, top_confidence: f64) -> f64 {
        if top_confidence < self.high_confidence_threshold {
            self.close_margin_low
        } else {
            self.close_margin
        }
    }
}

/// Full analyzer configuration, as read from a JSON file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub encode: EncodeOptions,
    pub detector: DetectorConfig,
    /// Supplementary pattern table merged into the library at startup
    pub patterns_file: Option<PathBuf>,
}

impl AnalyzerConfig {
    /// Load from an optional JSON file, then apply the `BAHR_PATTERNS` override.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p).map_err(|source| ProsodyError::Io {
                    path: p.to_path_buf(),
                    source,
                })?;
                serde_json::from_str(&text)?
            }
            None => AnalyzerConfig::default(),
        };
        if let Ok(env_path) = std::env::var(PATTERNS_ENV) {
            if !env_path.is_empty() {
                config.patterns_file = Some(PathBuf::from(env_path));
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let c = DetectorConfig::default();
        assert_eq!(c.acceptance_threshold, 0.80);
        assert_eq!(c.top_k, 3);
        assert!(EncodeOptions::default().saturate_final);
        assert!(!NormalizeOptions::default().remove_tashkeel);
    }

    #[test]
    fn test_margin_for() {
        let c = DetectorConfig::default();
        assert_eq!(c.margin_for(1.0), 0.02);
        assert_eq!(c.margin_for(0.95), 0.05);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let c: AnalyzerConfig =
            serde_json::from_str(r#"{"detector": {"acceptance_threshold": 0.7}}"#).unwrap();
        assert_eq!(c.detector.acceptance_threshold, 0.7);
        assert_eq!(c.detector.low_confidence_threshold, 0.90);
        assert!(c.encode.elide_hamza_wasl);
        assert!(c.patterns_file.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"encode": {{"saturate_final": false}}, "detector": {{"top_k": 5}}}}"#)
            .unwrap();
        let c = AnalyzerConfig::load(Some(f.path())).unwrap();
        assert!(!c.encode.saturate_final);
        assert_eq!(c.detector.top_k, 5);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = AnalyzerConfig::load(Some(Path::new("/nonexistent/bahr.json"))).unwrap_err();
        assert!(matches!(err, ProsodyError::Io { .. }));
    }
}
